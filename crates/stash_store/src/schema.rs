//! SQLite schema for the proxy state.
//!
//! Tables:
//! - `cache`: one row per cached path
//! - `proxy_config`: exactly one row (`id = 1`) with the origin and port slots

pub(crate) const STORE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cache (
    id    INTEGER PRIMARY KEY AUTOINCREMENT,
    path  TEXT NOT NULL UNIQUE,
    data  BLOB NOT NULL
);

CREATE TABLE IF NOT EXISTS proxy_config (
    id          INTEGER PRIMARY KEY CHECK (id = 1),
    origin_url  TEXT,
    port_number INTEGER CHECK (port_number BETWEEN 0 AND 65535)
);

INSERT OR IGNORE INTO proxy_config (id, origin_url, port_number) VALUES (1, NULL, NULL);
"#;
