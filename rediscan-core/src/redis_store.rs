use std::fmt;

use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};
use tracing::info;

use crate::error::{ScanError, StoreError};
use crate::store::{Cursor, KeyStore, KeyTtl, ScanBatch};

/// [`KeyStore`] backed by a Redis connection manager.
///
/// The manager reconnects on its own after a dropped connection, so a failed
/// batch can succeed on the engine's next retry without rebuilding the store.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("connection", &"ConnectionManager")
            .finish()
    }
}

impl RedisStore {
    /// Parse `url` and open a managed connection.
    ///
    /// Accepts the usual `redis://[user:password@]host:port[/db]` forms.
    pub async fn connect(url: &str) -> Result<Self, ScanError> {
        info!(url = %redacted(url), "connecting to redis");

        let client = redis::Client::open(url).map_err(|source| ScanError::InvalidUrl {
            url: redacted(url),
            source,
        })?;

        let conn = ConnectionManager::new(client)
            .await
            .map_err(|source| ScanError::Connect {
                url: redacted(url),
                source,
            })?;

        Ok(Self { conn })
    }
}

#[async_trait]
impl KeyStore for RedisStore {
    async fn scan_batch(
        &self,
        cursor: Cursor,
        pattern: &str,
        count: u64,
    ) -> Result<ScanBatch, StoreError> {
        let mut conn = self.conn.clone();

        let mut cmd = redis::cmd("SCAN");
        cmd.arg(cursor.0);
        if !pattern.is_empty() {
            cmd.arg("MATCH").arg(pattern);
        }
        cmd.arg("COUNT").arg(count);

        // Keys are binary safe; decode them one by one.
        let (next, keys): (u64, Vec<Vec<u8>>) = cmd.query_async(&mut conn).await?;

        Ok(ScanBatch::from_raw(keys, Cursor(next)))
    }

    async fn get_value(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        value.ok_or_else(|| StoreError::NotFound {
            key: key.to_string(),
        })
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl, StoreError> {
        let mut conn = self.conn.clone();
        let raw: i64 = conn.ttl(key).await?;
        Ok(KeyTtl::from_seconds(raw))
    }

    async fn delete(&self, key: &str) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();
        let removed: u64 = conn.del(key).await?;
        Ok(removed)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }
}

/// Strip the password from a redis URL before it reaches logs or errors.
pub(crate) fn redacted(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    // The host follows the last '@'; the password may contain more.
    let Some((userinfo, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match userinfo.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:***@{host}"),
        None => url.to_string(),
    }
}
