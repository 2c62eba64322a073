//! SQLite adapter.
//!
//! SQLite uses one persistent connection for the whole run. It is opened on
//! first use and closed by [`Adapter::disconnect`]; pinned and unpinned
//! queries share it.

use async_trait::async_trait;
use sqlx::{AnyConnection, Connection};

use super::{dry_run, execute, Adapter, QueryOptions, QueryOutput};
use crate::dialect::Dialect;
use crate::error::{MigrateError, MigrateResult};
use crate::operation::SqlParam;

pub struct SqliteAdapter {
    url: String,
    conn: Option<AnyConnection>,
}

impl SqliteAdapter {
    /// Create an adapter for `url`. No connection is opened yet.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            conn: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    async fn connection(&mut self) -> MigrateResult<&mut AnyConnection> {
        if self.conn.is_none() {
            sqlx::any::install_default_drivers();
            let conn = AnyConnection::connect(&self.url)
                .await
                .map_err(|e| MigrateError::Connection(e.to_string()))?;
            tracing::info!(url = %self.url, "connected to SQLite database");
            self.conn = Some(conn);
        }

        self.conn
            .as_mut()
            .ok_or_else(|| MigrateError::Connection("SQLite connection is not open".to_string()))
    }
}

#[async_trait]
impl Adapter for SqliteAdapter {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn supports_explicit_transactions(&self) -> bool {
        false
    }

    async fn get_client(&mut self) -> MigrateResult<()> {
        self.connection().await.map(|_| ())
    }

    /// The connection outlives the client handle; only `disconnect` closes it.
    async fn release_client(&mut self) -> MigrateResult<()> {
        Ok(())
    }

    async fn query(
        &mut self,
        sql: &str,
        params: &[SqlParam],
        options: QueryOptions,
    ) -> MigrateResult<QueryOutput> {
        if options.dry_run {
            return Ok(dry_run(Dialect::Sqlite, sql, params));
        }

        tracing::debug!(dialect = "sqlite", sql = sql.trim(), "executing");
        let conn = self.connection().await?;
        execute(conn, sql, params).await
    }

    async fn disconnect(&mut self) -> MigrateResult<()> {
        if let Some(conn) = self.conn.take() {
            conn.close()
                .await
                .map_err(|e| MigrateError::Connection(e.to_string()))?;
            tracing::info!("disconnected from SQLite database");
        }
        Ok(())
    }
}
