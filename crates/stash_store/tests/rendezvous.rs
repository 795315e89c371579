//! Two handles on the same database file behave like the server process and a
//! later `--clear-cache` process.

use stash_store::{ConfigStore, SqliteStore};

#[test]
fn second_handle_sees_port_written_by_first() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("nested").join("stash.sqlite");

    let server = SqliteStore::open(&db_path).expect("open server handle");
    let control = SqliteStore::open(&db_path).expect("open control handle");

    assert!(db_path.exists());
    assert_eq!(server.path(), Some(db_path.as_path()));
    assert_eq!(control.path(), server.path());
    assert_eq!(control.get_port().unwrap(), None);

    server.reset(3011, "https://example.org").unwrap();
    assert_eq!(control.get_port().unwrap(), Some(3011));
    assert_eq!(
        control.get_origin().unwrap().as_deref(),
        Some("https://example.org")
    );

    server.release().unwrap();
    assert_eq!(control.get_port().unwrap(), None);

    control.close().unwrap();
    server.close().unwrap();
}

#[test]
fn state_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("stash.sqlite");

    {
        let store = SqliteStore::open(&db_path).unwrap();
        store.reset(4242, "http://127.0.0.1:9999").unwrap();
        store.put("/kept", b"body").unwrap();
        store.close().unwrap();
    }

    let store = SqliteStore::open(&db_path).unwrap();
    assert_eq!(store.get_port().unwrap(), Some(4242));
    assert_eq!(store.get("/kept").unwrap().unwrap().data, b"body");
}

#[test]
fn cache_written_by_one_handle_is_cleared_by_the_other() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("stash.sqlite");

    let a = SqliteStore::open(&db_path).unwrap();
    let b = SqliteStore::open(&db_path).unwrap();

    a.put("/one", b"1").unwrap();
    a.put("/two", b"2").unwrap();
    assert_eq!(b.cache_len().unwrap(), 2);

    b.clear_all().unwrap();
    assert!(a.get("/one").unwrap().is_none());
    assert!(a.get("/two").unwrap().is_none());
}
