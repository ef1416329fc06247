//! LanceDB connection and table housekeeping helpers.
use std::path::Path;

use lancedb::{connect, Connection, Table};

use medrag_core::error::Result;

use crate::storage_err;

pub async fn open_db(dir: &Path) -> Result<Connection> {
    connect(dir.to_string_lossy().as_ref()).execute().await.map_err(storage_err)
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let names = conn.table_names().execute().await.map_err(storage_err)?;
    Ok(names.iter().any(|n| n == name))
}

/// Open `name` if it exists.
pub async fn open_table(conn: &Connection, name: &str) -> Result<Option<Table>> {
    if !table_exists(conn, name).await? {
        return Ok(None);
    }
    let table = conn.open_table(name).execute().await.map_err(storage_err)?;
    Ok(Some(table))
}

/// On-disk directory lancedb uses for table `name` under `dir`.
pub fn table_dir(dir: &Path, name: &str) -> std::path::PathBuf {
    dir.join(format!("{name}.lance"))
}
