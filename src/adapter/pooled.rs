//! Pool-backed adapter shared by PostgreSQL and MySQL.

use std::marker::PhantomData;

use async_trait::async_trait;
use sqlx::any::{Any, AnyPoolOptions};
use sqlx::pool::PoolConnection;
use sqlx::AnyPool;

use super::{dry_run, execute, Adapter, QueryOptions, QueryOutput};
use crate::dialect::Dialect;
use crate::error::{MigrateError, MigrateResult};
use crate::operation::SqlParam;

/// What distinguishes one pooled dialect from another.
pub trait PoolFlavor: Send + Sync + 'static {
    const DIALECT: Dialect;

    /// Statement that drops every table and custom type, when supported.
    const DROP_ALL: Option<&'static str> = None;
}

/// An `AnyPool` plus the connection acquired for the migration transaction.
pub struct PooledAdapter<F: PoolFlavor> {
    pool: AnyPool,
    client: Option<PoolConnection<Any>>,
    _flavor: PhantomData<F>,
}

impl<F: PoolFlavor> PooledAdapter<F> {
    /// Connect a pool to `url`.
    pub async fn connect(url: &str) -> MigrateResult<Self> {
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| MigrateError::Connection(e.to_string()))?;

        tracing::info!(dialect = %F::DIALECT, "connected");
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: AnyPool) -> Self {
        Self {
            pool,
            client: None,
            _flavor: PhantomData,
        }
    }
}

#[async_trait]
impl<F: PoolFlavor> Adapter for PooledAdapter<F> {
    fn dialect(&self) -> Dialect {
        F::DIALECT
    }

    fn supports_explicit_transactions(&self) -> bool {
        true
    }

    async fn get_client(&mut self) -> MigrateResult<()> {
        if self.client.is_none() {
            let conn = self
                .pool
                .acquire()
                .await
                .map_err(|e| MigrateError::Connection(e.to_string()))?;
            self.client = Some(conn);
            tracing::debug!(dialect = %F::DIALECT, "acquired transactional client");
        }
        Ok(())
    }

    async fn release_client(&mut self) -> MigrateResult<()> {
        if self.client.take().is_some() {
            tracing::debug!(dialect = %F::DIALECT, "released transactional client");
        }
        Ok(())
    }

    async fn query(
        &mut self,
        sql: &str,
        params: &[SqlParam],
        options: QueryOptions,
    ) -> MigrateResult<QueryOutput> {
        if options.dry_run {
            return Ok(dry_run(F::DIALECT, sql, params));
        }

        tracing::debug!(dialect = %F::DIALECT, sql = sql.trim(), pinned = options.pinned, "executing");

        if options.pinned {
            self.get_client().await?;
            match self.client.as_mut() {
                Some(conn) => execute(&mut **conn, sql, params).await,
                None => Err(MigrateError::Connection("no client acquired".to_string())),
            }
        } else {
            execute(&self.pool, sql, params).await
        }
    }

    async fn disconnect(&mut self) -> MigrateResult<()> {
        self.release_client().await?;
        self.pool.close().await;
        tracing::info!(dialect = %F::DIALECT, "disconnected");
        Ok(())
    }

    async fn drop_all(&mut self, options: QueryOptions) -> MigrateResult<()> {
        match F::DROP_ALL {
            Some(sql) => self.query(sql, &[], options).await.map(|_| ()),
            None => Err(MigrateError::UnsupportedOperation {
                operation: "reset".to_string(),
                dialect: F::DIALECT,
                reason: Some("Database reset is only available for PostgreSQL."),
            }),
        }
    }
}
