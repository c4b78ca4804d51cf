//! SQLite FTS5 search index written next to the JSON reference.

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};

use crate::error::Result;
use crate::render::json::Page;
use crate::symbols::SymbolTable;

pub const DATABASE_DIR: &str = "search";
pub const DATABASE_FILE: &str = "index.db";

pub fn database_path(output_dir: &Path) -> PathBuf {
    output_dir.join(DATABASE_DIR).join(DATABASE_FILE)
}

/// Rebuilds the search database from scratch.
pub fn write_index(output_dir: &Path, table: &SymbolTable, pages: &[Page]) -> Result<()> {
    let path = database_path(output_dir);
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    if path.exists() {
        fs::remove_file(&path)?;
    }

    let mut conn = Connection::open(&path)?;
    init_schema(&conn)?;

    let tx = conn.transaction()?;
    {
        let mut insert = tx.prepare(
            r#"
            INSERT INTO entries (key, name, kind, file_path, line, doc)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )?;
        for (key, entry) in table {
            insert.execute(params![
                key,
                entry.name,
                entry.kind.as_str(),
                entry.location.file_path,
                entry.location.line,
                entry.doc,
            ])?;
        }

        for page in pages {
            insert.execute(params![
                format!("page:{}", page.title),
                page.title,
                "page",
                page.source,
                0,
                page.content,
            ])?;
        }
    }
    tx.commit()?;

    tracing::info!("Search index: {} entries", table.len() + pages.len());
    Ok(())
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS entries (
            key TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            file_path TEXT NOT NULL,
            line INTEGER NOT NULL,
            doc TEXT
        );

        CREATE VIRTUAL TABLE IF NOT EXISTS entries_fts USING fts5(
            name,
            key,
            doc,
            content='entries',
            content_rowid='rowid'
        );

        CREATE TRIGGER IF NOT EXISTS entries_ai AFTER INSERT ON entries BEGIN
            INSERT INTO entries_fts(rowid, name, key, doc)
            VALUES (new.rowid, new.name, new.key, new.doc);
        END;
        "#,
    )?;
    Ok(())
}
