use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{DistanceType, Table};
use tracing::{debug, info};

use medrag_core::config::BackendKind;
use medrag_core::error::{Error, Result};
use medrag_core::types::{ChunkId, IndexEntry, SearchResult};

use crate::backend::IndexBackend;
use crate::schema::{validate_schema, CHUNK_ID};
use crate::search::{decode_chunk_ids, decode_entries, score_entries};
use crate::storage_err;
use crate::table::{open_db, open_table, table_dir};
use crate::writer::{create_chunk_table, insert_missing};

/// Extra candidates fetched past `k` on the first pass so that rows tied with
/// the k-th score are rescored and ordered by chunk id rather than by lancedb's
/// scan order. Wider ties double the window until the cut is clear.
pub const TIE_MARGIN: usize = 16;

/// Index stored as a lancedb table keyed by `chunk_id`.
pub struct LanceCollection {
    dir: PathBuf,
    table_name: String,
}

impl LanceCollection {
    pub fn new(dir: impl Into<PathBuf>, table_name: &str) -> Self {
        Self { dir: dir.into(), table_name: table_name.to_string() }
    }

    async fn nearest(&self, table: &Table, query: &[f32], limit: usize) -> Result<Vec<IndexEntry>> {
        let path = table_dir(&self.dir, &self.table_name);
        let mut stream = table
            .vector_search(query.to_vec())
            .map_err(storage_err)?
            .distance_type(DistanceType::Dot)
            .limit(limit)
            .execute()
            .await
            .map_err(storage_err)?;
        let mut candidates = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(storage_err)? {
            candidates.extend(decode_entries(&batch, &path)?);
        }
        Ok(candidates)
    }

    async fn open(&self) -> Result<Option<Table>> {
        if !self.dir.exists() {
            return Ok(None);
        }
        let conn = open_db(&self.dir).await?;
        open_table(&conn, &self.table_name).await
    }

    /// Open the table and return it with its vector dimension.
    async fn open_checked(&self) -> Result<(Table, usize)> {
        let table = self.open().await?.ok_or_else(|| Error::IndexNotFound(self.dir.clone()))?;
        let schema = table.schema().await.map_err(storage_err)?;
        let dim = validate_schema(&schema, &table_dir(&self.dir, &self.table_name))?;
        Ok((table, dim))
    }

    async fn read_ids(&self, table: &Table) -> Result<HashSet<ChunkId>> {
        let path = table_dir(&self.dir, &self.table_name);
        let mut stream = table
            .query()
            .select(Select::columns(&[CHUNK_ID]))
            .execute()
            .await
            .map_err(storage_err)?;
        let mut ids = HashSet::new();
        while let Some(batch) = stream.try_next().await.map_err(storage_err)? {
            ids.extend(decode_chunk_ids(&batch, &path)?);
        }
        Ok(ids)
    }
}

#[async_trait]
impl IndexBackend for LanceCollection {
    fn kind(&self) -> BackendKind {
        BackendKind::Collection
    }

    fn location(&self) -> &Path {
        &self.dir
    }

    async fn exists(&self) -> Result<bool> {
        Ok(self.open().await?.is_some())
    }

    async fn destroy(&self) -> Result<()> {
        let dir = table_dir(&self.dir, &self.table_name);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
            info!(table = %self.table_name, dir = %self.dir.display(), "dropped collection");
        }
        Ok(())
    }

    async fn chunk_ids(&self) -> Result<HashSet<ChunkId>> {
        match self.open().await? {
            Some(table) => self.read_ids(&table).await,
            None => Ok(HashSet::new()),
        }
    }

    async fn append(&self, entries: Vec<IndexEntry>) -> Result<usize> {
        let Some(first) = entries.first() else { return Ok(0) };
        let first_dim = first.embedding.len();

        let Some(table) = self.open().await? else {
            let mut seen = HashSet::new();
            let fresh: Vec<IndexEntry> = entries.into_iter().filter(|e| seen.insert(e.chunk_id.clone())).collect();
            fs::create_dir_all(&self.dir)?;
            let conn = open_db(&self.dir).await?;
            create_chunk_table(&conn, &self.table_name, &fresh, first_dim).await?;
            info!(table = %self.table_name, rows = fresh.len(), "created collection");
            return Ok(fresh.len());
        };

        let schema = table.schema().await.map_err(storage_err)?;
        let dim = validate_schema(&schema, &table_dir(&self.dir, &self.table_name))?;
        let mut seen = self.read_ids(&table).await?;
        let fresh: Vec<IndexEntry> = entries.into_iter().filter(|e| seen.insert(e.chunk_id.clone())).collect();
        if fresh.is_empty() {
            return Ok(0);
        }
        insert_missing(&table, &fresh, dim).await?;
        info!(table = %self.table_name, rows = fresh.len(), "appended to collection");
        Ok(fresh.len())
    }

    async fn count(&self) -> Result<usize> {
        let (table, _) = self.open_checked().await?;
        table.count_rows(None).await.map_err(storage_err)
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let (table, dim) = self.open_checked().await?;
        if query.len() != dim {
            return Err(Error::DimensionMismatch { expected: dim, actual: query.len() });
        }
        let total = table.count_rows(None).await.map_err(storage_err)?;
        if k == 0 || total == 0 {
            return Ok(Vec::new());
        }

        // Widen the candidate window until the weakest candidate scores below
        // the k-th one: nothing left unfetched can then tie with the cut.
        let mut limit = (k + TIE_MARGIN).min(total);
        loop {
            let candidates = self.nearest(&table, query, limit).await?;
            let mut ranked = score_entries(&candidates, query, candidates.len());
            let settled = match (ranked.get(k - 1), ranked.last()) {
                (Some(kth), Some(weakest)) => weakest.score < kth.score,
                _ => true,
            };
            if settled || limit >= total {
                debug!(candidates = ranked.len(), k, "rescored collection candidates");
                ranked.truncate(k);
                return Ok(ranked);
            }
            limit = (limit * 2).min(total);
        }
    }
}
