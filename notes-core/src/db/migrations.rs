use lazy_static::lazy_static;
use rusqlite_migration::{Migrations, M};

lazy_static! {
    pub static ref MIGRATIONS: Migrations<'static> = Migrations::new(vec![
        M::up(
            r#"
            CREATE TABLE IF NOT EXISTS notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,

                title TEXT NOT NULL,
                body TEXT NOT NULL DEFAULT '',
                tags TEXT NOT NULL DEFAULT '[]', -- json array of strings

                updated_at INTEGER NOT NULL, -- epoch milliseconds

                image_path TEXT,
                image_bytes BLOB
            );
        "#
        ),
        M::up("CREATE INDEX IF NOT EXISTS notes_updated_at ON notes (updated_at DESC);"),
    ]);
}
