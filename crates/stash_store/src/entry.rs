/// One cached origin response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEntry {
    /// Assignment order within the current cache epoch, starting at 1.
    pub id: i64,
    /// Request path plus query string (`/a/b?x=1`).
    pub path: String,
    /// Raw response body as received from the origin.
    pub data: Vec<u8>,
}

impl CacheEntry {
    pub fn new(id: i64, path: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            id,
            path: path.into(),
            data,
        }
    }
}
