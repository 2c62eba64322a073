//! Migration runner: `migrate`, `rollback`, `status` and `reset`.
//!
//! A run moves through [`RunState`]:
//!
//! ```text
//! Discovering -> Diffing -> Applying(0..n) -> Committed
//!                                          \-> RolledBack
//! ```
//!
//! File names are validated before the database is touched, and every
//! operation is translated before the first statement runs. Dialects that
//! support it apply the whole batch in one transaction on a pinned client.
//! The client is released and the adapter disconnected after every command,
//! whatever the outcome.

use crate::adapter::{Adapter, QueryOptions};
use crate::catalog::Catalog;
use crate::describe::describe;
use crate::error::{MigrateError, MigrateResult};
use crate::logger;
use crate::migration::Migration;
use crate::translator::{self, Statement};

/// Where a run currently is. A run with nothing to do stops in `Diffing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Discovering,
    Diffing,
    /// Executing the n-th migration of the batch.
    Applying(usize),
    Committed,
    /// The run failed; the transaction, if there was one, was rolled back.
    RolledBack,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrateOutcome {
    UpToDate,
    Applied(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackOutcome {
    /// The ledger was empty. Reported as a warning, not an error.
    NothingToRollback,
    RolledBack(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStatus {
    Applied,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub id: String,
    pub status: MigrationStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusReport {
    /// Every discovered migration, ascending.
    pub entries: Vec<StatusEntry>,
    /// Ledger entries with no matching migration.
    pub orphaned: Vec<String>,
}

impl StatusReport {
    pub fn applied_count(&self) -> usize {
        self.count(MigrationStatus::Applied)
    }

    pub fn pending_count(&self) -> usize {
        self.count(MigrationStatus::Pending)
    }

    fn count(&self, status: MigrationStatus) -> usize {
        self.entries.iter().filter(|e| e.status == status).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

/// A migration with its statements already translated.
struct Planned {
    id: String,
    steps: Vec<(String, Statement)>,
}

/// Sequences migrations through an adapter.
pub struct Runner<'a> {
    adapter: &'a mut dyn Adapter,
    catalog: Catalog,
    dry_run: bool,
    state: RunState,
}

impl<'a> Runner<'a> {
    pub fn new(adapter: &'a mut dyn Adapter, catalog: Catalog) -> Self {
        Self {
            adapter,
            catalog,
            dry_run: false,
            state: RunState::Idle,
        }
    }

    /// Print statements instead of executing them; the ledger is left alone.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Apply every pending migration.
    pub async fn migrate(&mut self) -> MigrateResult<MigrateOutcome> {
        let result = self.run_migrate().await;
        self.cleanup().await;
        result
    }

    /// Revert the most recently applied migration.
    pub async fn rollback(&mut self) -> MigrateResult<RollbackOutcome> {
        let result = self.run_rollback().await;
        self.cleanup().await;
        result
    }

    /// Report applied and pending migrations. Never changes the ledger.
    pub async fn status(&mut self) -> MigrateResult<StatusReport> {
        let result = self.run_status().await;
        self.cleanup().await;
        result
    }

    /// Drop every table and custom type, then migrate from scratch.
    ///
    /// Only PostgreSQL supports it.
    pub async fn reset(&mut self) -> MigrateResult<MigrateOutcome> {
        let result = self.run_reset().await;
        self.cleanup().await;
        result
    }

    fn enter(&mut self, state: RunState) {
        tracing::debug!(?state, dialect = %self.adapter.dialect(), "run state");
        self.state = state;
    }

    fn options(&self) -> QueryOptions {
        QueryOptions::new(self.dry_run)
    }

    fn transactional(&self) -> bool {
        self.adapter.supports_explicit_transactions() && !self.dry_run
    }

    fn check_dialect(&self) -> MigrateResult<()> {
        if self.catalog.dialect() != self.adapter.dialect() {
            return Err(MigrateError::Configuration(format!(
                "migrations are for {} but the adapter is {}",
                self.catalog.dialect(),
                self.adapter.dialect()
            )));
        }
        Ok(())
    }

    fn announce_dry_run(&self) {
        if self.dry_run {
            logger::info("Dry Run Mode: No changes will be made to the database.");
        }
    }

    async fn run_migrate(&mut self) -> MigrateResult<MigrateOutcome> {
        self.check_dialect()?;

        self.enter(RunState::Discovering);
        let all = self.catalog.discover(!self.dry_run)?;
        self.announce_dry_run();

        self.enter(RunState::Diffing);
        let completed = if self.dry_run {
            Vec::new()
        } else {
            self.read_ledger().await?
        };

        let pending: Vec<String> = all.into_iter().filter(|id| !completed.contains(id)).collect();
        if pending.is_empty() {
            logger::success("Database is up to date.");
            return Ok(MigrateOutcome::UpToDate);
        }

        logger::info(&format!("Found {} pending migrations.", pending.len()));

        let plan = pending
            .iter()
            .map(|id| self.plan(&self.catalog.load(id)?, Direction::Up))
            .collect::<MigrateResult<Vec<Planned>>>()?;

        self.run_batch(&plan, Direction::Up).await?;
        logger::success("All migrations completed successfully.");
        Ok(MigrateOutcome::Applied(pending))
    }

    async fn run_rollback(&mut self) -> MigrateResult<RollbackOutcome> {
        self.check_dialect()?;

        self.enter(RunState::Discovering);
        let all = self.catalog.discover(false)?;
        self.announce_dry_run();

        self.enter(RunState::Diffing);
        let mut completed = if self.dry_run {
            all
        } else {
            self.read_ledger().await?
        };
        completed.sort();

        let Some(last) = completed.pop() else {
            logger::warning("There are no applied migrations to roll back.");
            return Ok(RollbackOutcome::NothingToRollback);
        };

        let plan = self.plan(&self.catalog.load(&last)?, Direction::Down)?;
        self.run_batch(std::slice::from_ref(&plan), Direction::Down).await?;
        Ok(RollbackOutcome::RolledBack(last))
    }

    async fn run_status(&mut self) -> MigrateResult<StatusReport> {
        self.check_dialect()?;

        self.enter(RunState::Discovering);
        let all = self.catalog.discover(false)?;

        self.enter(RunState::Diffing);
        let options = QueryOptions::default();
        self.adapter.ensure_migrations_table(options).await?;
        let completed = self.adapter.get_completed_migrations(options).await?;

        let entries = all
            .iter()
            .map(|id| StatusEntry {
                id: id.clone(),
                status: if completed.contains(id) {
                    MigrationStatus::Applied
                } else {
                    MigrationStatus::Pending
                },
            })
            .collect();

        let orphaned = completed.into_iter().filter(|id| !all.contains(id)).collect();

        Ok(StatusReport { entries, orphaned })
    }

    async fn run_reset(&mut self) -> MigrateResult<MigrateOutcome> {
        self.check_dialect()?;

        logger::warning("ATTENTION: This will delete ALL data in your database.");
        logger::running("Dropping all tables...");
        self.adapter.drop_all(self.options()).await?;
        logger::success("All tables dropped.");

        logger::running("Re-running all migrations...");
        let outcome = self.run_migrate().await?;
        logger::success("Database reset and migrated successfully.");
        Ok(outcome)
    }

    /// Create the ledger table if needed and read it on the client the batch
    /// will run on.
    ///
    /// The ledger is read before `BEGIN`: MySQL commits implicitly around
    /// `CREATE TABLE`. Concurrent runners are not serialized.
    async fn read_ledger(&mut self) -> MigrateResult<Vec<String>> {
        let transactional = self.transactional();
        let options = self.options().pinned(transactional);

        if transactional {
            self.adapter.get_client().await?;
        }
        self.adapter.ensure_migrations_table(options).await?;
        self.adapter.get_completed_migrations(options).await
    }

    /// Translate a migration's operations for the active dialect.
    fn plan(&self, migration: &Migration, direction: Direction) -> MigrateResult<Planned> {
        let dialect = self.adapter.dialect();
        let operations = match direction {
            Direction::Up => migration.up(),
            Direction::Down => migration.down(),
        };

        let steps = operations
            .iter()
            .map(|op| -> MigrateResult<(String, Statement)> {
                let statement = translator::statement(op, dialect).inspect_err(|e| {
                    tracing::error!(migration = migration.id(), operation = op.kind(), error = %e, "translation failed");
                })?;
                Ok((describe(op), statement))
            })
            .collect::<MigrateResult<Vec<_>>>()?;

        Ok(Planned {
            id: migration.id().to_string(),
            steps,
        })
    }

    /// Execute a batch, inside one transaction where the adapter supports it.
    async fn run_batch(&mut self, plan: &[Planned], direction: Direction) -> MigrateResult<()> {
        let transactional = self.transactional();
        let options = self.options().pinned(transactional);

        if !self.dry_run {
            self.adapter.get_client().await?;
        }
        if transactional {
            self.adapter.begin(options).await?;
        }

        match self.apply(plan, direction, options).await {
            Ok(()) => {
                if transactional {
                    if let Err(e) = self.adapter.commit(options).await {
                        self.abort(transactional, options).await;
                        return Err(e);
                    }
                }
                self.enter(RunState::Committed);
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "migration failed");
                self.abort(transactional, options).await;
                Err(e)
            }
        }
    }

    async fn apply(&mut self, plan: &[Planned], direction: Direction, options: QueryOptions) -> MigrateResult<()> {
        for (i, planned) in plan.iter().enumerate() {
            self.enter(RunState::Applying(i));

            match direction {
                Direction::Up => logger::running(&format!("Running migration: {}", planned.id)),
                Direction::Down => logger::running(&format!("Rolling back migration: {}", planned.id)),
            }

            for (summary, statement) in &planned.steps {
                logger::step(summary);
                self.adapter
                    .query(&statement.sql, &statement.params, options)
                    .await?;
            }

            if !self.dry_run {
                match direction {
                    Direction::Up => self.adapter.add_migration(&planned.id, options).await?,
                    Direction::Down => self.adapter.remove_migration(&planned.id, options).await?,
                }
            }

            match direction {
                Direction::Up => logger::success(&format!("Finished migration: {}", planned.id)),
                Direction::Down => logger::success(&format!("Finished rollback: {}", planned.id)),
            }
        }
        Ok(())
    }

    async fn abort(&mut self, transactional: bool, options: QueryOptions) {
        if transactional {
            if let Err(e) = self.adapter.rollback(options).await {
                tracing::warn!(error = %e, "transaction rollback failed");
            }
        }
        self.enter(RunState::RolledBack);
    }

    async fn cleanup(&mut self) {
        if let Err(e) = self.adapter.release_client().await {
            tracing::warn!(error = %e, "failed to release client");
        }
        if let Err(e) = self.adapter.disconnect().await {
            tracing::warn!(error = %e, "failed to disconnect");
        }
    }
}
