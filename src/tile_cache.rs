use anyhow::Result;
use chrono::Utc;
use sqlx::{sqlite::SqliteConnectOptions, SqlitePool};
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info};

pub const MAX_ZOOM: u32 = 22;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileKey {
    pub z: u32,
    pub x: u32,
    pub y: u32,
}

impl TileKey {
    /// `None` when the coordinates do not address a tile of the web mercator grid.
    pub fn new(z: u32, x: u32, y: u32) -> Option<Self> {
        if z > MAX_ZOOM {
            return None;
        }
        let side = 1u32 << z;
        (x < side && y < side).then_some(Self { z, x, y })
    }

    fn id(&self) -> String {
        format!("{}/{}/{}", self.z, self.x, self.y)
    }

    fn file_name(&self) -> String {
        format!("{}-{}-{}.tile", self.z, self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CachedTile {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Base-map tiles on disk, with size and access bookkeeping in SQLite.
pub struct TileCache {
    pool: SqlitePool,
    cache_dir: PathBuf,
    max_size_bytes: u64,
}

impl TileCache {
    pub async fn open(cache_dir: PathBuf, max_size_bytes: u64) -> Result<Self> {
        fs::create_dir_all(&cache_dir).await?;

        let opts = SqliteConnectOptions::new()
            .filename(cache_dir.join("tiles.db"))
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(opts).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS tiles (
                key TEXT PRIMARY KEY,
                file_name TEXT NOT NULL,
                content_type TEXT NOT NULL,
                size_bytes INTEGER NOT NULL,
                hit_count INTEGER NOT NULL DEFAULT 0,
                last_access_ms INTEGER NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool, cache_dir, max_size_bytes })
    }

    pub async fn get(&self, key: TileKey) -> Result<Option<CachedTile>> {
        let id = key.id();
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT file_name, content_type FROM tiles WHERE key = ?")
                .bind(&id)
                .fetch_optional(&self.pool)
                .await?;

        let Some((file_name, content_type)) = row else {
            debug!("tile miss: {}", id);
            return Ok(None);
        };

        match fs::read(self.cache_dir.join(&file_name)).await {
            Ok(bytes) => {
                sqlx::query("UPDATE tiles SET hit_count = hit_count + 1, last_access_ms = ? WHERE key = ?")
                    .bind(Utc::now().timestamp_millis())
                    .bind(&id)
                    .execute(&self.pool)
                    .await?;
                debug!("tile hit: {}", id);
                Ok(Some(CachedTile { content_type, bytes }))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                sqlx::query("DELETE FROM tiles WHERE key = ?").bind(&id).execute(&self.pool).await?;
                debug!("tile file vanished, dropped row: {}", id);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn put(&self, key: TileKey, content_type: &str, bytes: &[u8]) -> Result<()> {
        let file_name = key.file_name();
        fs::write(self.cache_dir.join(&file_name), bytes).await?;

        sqlx::query(
            "INSERT OR REPLACE INTO tiles (key, file_name, content_type, size_bytes, last_access_ms)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(key.id())
        .bind(&file_name)
        .bind(content_type)
        .bind(bytes.len() as i64)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        self.evict().await?;
        Ok(())
    }

    pub async fn total_size(&self) -> Result<u64> {
        let total: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(size_bytes), 0) FROM tiles")
            .fetch_one(&self.pool)
            .await?;
        Ok(total as u64)
    }

    /// Drops least recently used tiles until the cache fits its budget.
    async fn evict(&self) -> Result<()> {
        let mut total = self.total_size().await?;
        if total <= self.max_size_bytes {
            return Ok(());
        }

        let candidates: Vec<(String, String, i64)> = sqlx::query_as(
            "SELECT key, file_name, size_bytes FROM tiles ORDER BY last_access_ms ASC, hit_count ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut evicted = 0;
        for (key, file_name, size) in candidates {
            if total <= self.max_size_bytes {
                break;
            }
            if let Err(e) = fs::remove_file(self.cache_dir.join(&file_name)).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    return Err(e.into());
                }
            }
            sqlx::query("DELETE FROM tiles WHERE key = ?").bind(&key).execute(&self.pool).await?;
            total = total.saturating_sub(size as u64);
            evicted += 1;
        }
        info!("tile cache over budget, evicted {} tiles", evicted);
        Ok(())
    }
}
