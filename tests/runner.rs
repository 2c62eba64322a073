//! Runner behaviour against a recording in-memory adapter.

use std::collections::BTreeSet;

use async_trait::async_trait;
use lipgrate::operation::TableOptions;
use lipgrate::prelude::*;
use pretty_assertions::assert_eq;

/// Records every call and keeps the ledger in memory.
///
/// `BEGIN` snapshots the ledger and `ROLLBACK` restores it, so a failed
/// transactional run leaves the ledger as it was.
struct Recorder {
    dialect: Dialect,
    transactional: bool,
    fail_on: Option<&'static str>,
    ledger: BTreeSet<String>,
    snapshot: Option<BTreeSet<String>>,
    executed: Vec<String>,
    dry_runs: Vec<String>,
    /// For each ledger read: whether it ran on the acquired client.
    ledger_reads: Vec<bool>,
    ensured: usize,
    client_acquired: bool,
    released: usize,
    disconnected: usize,
}

impl Recorder {
    fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            transactional: dialect != Dialect::Sqlite,
            fail_on: None,
            ledger: BTreeSet::new(),
            snapshot: None,
            executed: Vec::new(),
            dry_runs: Vec::new(),
            ledger_reads: Vec::new(),
            ensured: 0,
            client_acquired: false,
            released: 0,
            disconnected: 0,
        }
    }

    fn with_ledger(mut self, ids: &[&str]) -> Self {
        self.ledger = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    fn failing_on(mut self, needle: &'static str) -> Self {
        self.fail_on = Some(needle);
        self
    }

    fn ledger(&self) -> Vec<&str> {
        self.ledger.iter().map(String::as_str).collect()
    }

    fn touched_database(&self) -> bool {
        !self.executed.is_empty() || self.ensured > 0 || self.client_acquired
    }
}

#[async_trait]
impl Adapter for Recorder {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn supports_explicit_transactions(&self) -> bool {
        self.transactional
    }

    async fn get_client(&mut self) -> MigrateResult<()> {
        self.client_acquired = true;
        Ok(())
    }

    async fn release_client(&mut self) -> MigrateResult<()> {
        self.released += 1;
        Ok(())
    }

    async fn query(&mut self, sql: &str, _params: &[SqlParam], options: QueryOptions) -> MigrateResult<QueryOutput> {
        if options.dry_run {
            self.dry_runs.push(sql.to_string());
            return Ok(QueryOutput::default());
        }

        if self.fail_on.is_some_and(|needle| sql.contains(needle)) {
            return Err(MigrateError::execution(sql, "relation does not exist"));
        }

        match sql {
            "BEGIN" => self.snapshot = Some(self.ledger.clone()),
            "COMMIT" => self.snapshot = None,
            "ROLLBACK" => {
                if let Some(snapshot) = self.snapshot.take() {
                    self.ledger = snapshot;
                }
            }
            _ => {}
        }
        self.executed.push(sql.to_string());
        Ok(QueryOutput::default())
    }

    async fn disconnect(&mut self) -> MigrateResult<()> {
        self.disconnected += 1;
        Ok(())
    }

    async fn ensure_migrations_table(&mut self, options: QueryOptions) -> MigrateResult<()> {
        self.ensured += 1;
        self.ledger_reads.push(options.pinned && self.client_acquired);
        Ok(())
    }

    async fn get_completed_migrations(&mut self, options: QueryOptions) -> MigrateResult<Vec<String>> {
        self.ledger_reads.push(options.pinned && self.client_acquired);
        Ok(self.ledger.iter().cloned().collect())
    }

    async fn add_migration(&mut self, id: &str, options: QueryOptions) -> MigrateResult<()> {
        assert!(!options.dry_run, "ledger written during a dry run");
        self.ledger.insert(id.to_string());
        Ok(())
    }

    async fn remove_migration(&mut self, id: &str, options: QueryOptions) -> MigrateResult<()> {
        assert!(!options.dry_run, "ledger written during a dry run");
        self.ledger.remove(id);
        Ok(())
    }

    async fn drop_all(&mut self, options: QueryOptions) -> MigrateResult<()> {
        if self.dialect != Dialect::Postgres {
            return Err(MigrateError::UnsupportedOperation {
                operation: "reset".to_string(),
                dialect: self.dialect,
                reason: Some("Database reset is only available for PostgreSQL."),
            });
        }
        self.query("DROP ALL", &[], options).await?;
        self.ledger.clear();
        Ok(())
    }
}

const A: &str = "lipgrade_20240101000000_users.json";
const B: &str = "lipgrade_20240102000000_posts.json";

fn table(id: &str, name: &'static str) -> Migration {
    Migration::from_fn(
        id,
        |m| {
            m.create_table(name, [("id", "increments"), ("title", "string")], TableOptions::default());
        },
        |m| {
            m.drop_table(name);
        },
    )
}

fn catalog(dialect: Dialect) -> Catalog {
    // Registered out of order; the runner sorts by identifier.
    Catalog::in_memory(dialect)
        .register(table(B, "posts"))
        .register(table(A, "users"))
}

fn creates(executed: &[String]) -> Vec<&str> {
    executed
        .iter()
        .filter(|sql| sql.starts_with("CREATE") || sql.starts_with("DROP TABLE"))
        .map(String::as_str)
        .collect()
}

#[tokio::test]
async fn test_migrate_applies_all_in_order_inside_one_transaction() {
    let mut db = Recorder::new(Dialect::Postgres);

    let mut runner = Runner::new(&mut db, catalog(Dialect::Postgres));
    let outcome = runner.migrate().await.unwrap();
    assert_eq!(outcome, MigrateOutcome::Applied(vec![A.to_string(), B.to_string()]));
    assert_eq!(runner.state(), RunState::Committed);

    assert_eq!(db.ledger(), vec![A, B]);
    assert_eq!(db.executed.first().map(String::as_str), Some("BEGIN"));
    assert_eq!(db.executed.last().map(String::as_str), Some("COMMIT"));
    assert_eq!(
        creates(&db.executed),
        vec![
            r#"CREATE TABLE IF NOT EXISTS users (id SERIAL PRIMARY KEY, title VARCHAR(255));"#,
            r#"CREATE TABLE IF NOT EXISTS posts (id SERIAL PRIMARY KEY, title VARCHAR(255));"#,
        ]
    );
    assert_eq!(db.released, 1);
    assert_eq!(db.disconnected, 1);
}

#[tokio::test]
async fn test_ledger_is_read_on_the_transactional_client() {
    let mut db = Recorder::new(Dialect::MySql).with_ledger(&[A]);
    Runner::new(&mut db, catalog(Dialect::MySql)).migrate().await.unwrap();
    assert_eq!(db.ledger_reads, vec![true, true]);

    let mut db = Recorder::new(Dialect::Postgres).with_ledger(&[A, B]);
    Runner::new(&mut db, catalog(Dialect::Postgres)).rollback().await.unwrap();
    assert_eq!(db.ledger_reads, vec![true, true]);
    assert_eq!(db.released, 1);

    // Without explicit transactions there is nothing to pin to.
    let mut db = Recorder::new(Dialect::Sqlite);
    Runner::new(&mut db, catalog(Dialect::Sqlite)).migrate().await.unwrap();
    assert_eq!(db.ledger_reads, vec![false, false]);
}

#[tokio::test]
async fn test_second_migrate_is_up_to_date() {
    let mut db = Recorder::new(Dialect::MySql);
    Runner::new(&mut db, catalog(Dialect::MySql)).migrate().await.unwrap();
    let executed = db.executed.len();

    let mut runner = Runner::new(&mut db, catalog(Dialect::MySql));
    assert_eq!(runner.migrate().await.unwrap(), MigrateOutcome::UpToDate);
    assert_eq!(runner.state(), RunState::Diffing);

    assert_eq!(db.executed.len(), executed);
    assert_eq!(db.ledger(), vec![A, B]);
    assert_eq!(db.disconnected, 2);
}

#[tokio::test]
async fn test_migrate_applies_only_pending() {
    let mut db = Recorder::new(Dialect::Sqlite).with_ledger(&[A]);

    let outcome = Runner::new(&mut db, catalog(Dialect::Sqlite)).migrate().await.unwrap();
    assert_eq!(outcome, MigrateOutcome::Applied(vec![B.to_string()]));

    assert_eq!(
        db.executed,
        vec!["CREATE TABLE IF NOT EXISTS posts (id INTEGER PRIMARY KEY AUTOINCREMENT, title TEXT);"]
    );
    assert_eq!(db.ledger(), vec![A, B]);
}

#[tokio::test]
async fn test_rollback_reverts_exactly_the_last_migration() {
    let mut db = Recorder::new(Dialect::Postgres).with_ledger(&[B, A]);

    let mut runner = Runner::new(&mut db, catalog(Dialect::Postgres));
    let outcome = runner.rollback().await.unwrap();
    assert_eq!(outcome, RollbackOutcome::RolledBack(B.to_string()));
    assert_eq!(runner.state(), RunState::Committed);

    assert_eq!(db.ledger(), vec![A]);
    assert_eq!(
        db.executed,
        vec!["BEGIN", "DROP TABLE IF EXISTS posts;", "COMMIT"]
    );
}

#[tokio::test]
async fn test_rollback_with_empty_ledger_warns() {
    let mut db = Recorder::new(Dialect::MySql);

    let outcome = Runner::new(&mut db, catalog(Dialect::MySql)).rollback().await.unwrap();
    assert_eq!(outcome, RollbackOutcome::NothingToRollback);
    assert!(db.executed.is_empty());
    assert_eq!(db.disconnected, 1);
}

#[tokio::test]
async fn test_rollback_of_missing_migration_fails() {
    let mut db = Recorder::new(Dialect::MySql).with_ledger(&["lipgrade_20990101000000_gone.json"]);

    let err = Runner::new(&mut db, catalog(Dialect::MySql)).rollback().await.unwrap_err();
    assert!(matches!(err, MigrateError::MissingMigration(id) if id.contains("gone")));
    assert_eq!(db.ledger(), vec!["lipgrade_20990101000000_gone.json"]);
}

#[tokio::test]
async fn test_dry_run_migrate_never_executes() {
    let mut db = Recorder::new(Dialect::Postgres).with_ledger(&[A]);

    let outcome = Runner::new(&mut db, catalog(Dialect::Postgres))
        .dry_run(true)
        .migrate()
        .await
        .unwrap();

    // The ledger is not consulted, so every migration is previewed.
    assert_eq!(outcome, MigrateOutcome::Applied(vec![A.to_string(), B.to_string()]));
    assert!(!db.touched_database());
    assert_eq!(db.ledger(), vec![A]);
    assert_eq!(db.dry_runs.len(), 2);
    assert!(db.dry_runs.iter().all(|sql| sql.starts_with("CREATE TABLE")));
}

#[tokio::test]
async fn test_dry_run_rollback_previews_latest_file() {
    let mut db = Recorder::new(Dialect::Sqlite);

    let outcome = Runner::new(&mut db, catalog(Dialect::Sqlite))
        .dry_run(true)
        .rollback()
        .await
        .unwrap();

    assert_eq!(outcome, RollbackOutcome::RolledBack(B.to_string()));
    assert!(!db.touched_database());
    assert_eq!(db.dry_runs, vec!["DROP TABLE IF EXISTS posts;"]);
}

#[tokio::test]
async fn test_failure_rolls_back_whole_batch() {
    let mut db = Recorder::new(Dialect::Postgres).failing_on("posts");

    let mut runner = Runner::new(&mut db, catalog(Dialect::Postgres));
    let err = runner.migrate().await.unwrap_err();
    assert!(matches!(err, MigrateError::Execution { ref sql, .. } if sql.contains("posts")));
    assert_eq!(runner.state(), RunState::RolledBack);

    assert!(db.ledger.is_empty());
    assert_eq!(db.executed.last().map(String::as_str), Some("ROLLBACK"));
    assert!(!db.executed.iter().any(|sql| sql == "COMMIT"));
    assert_eq!(db.released, 1);
    assert_eq!(db.disconnected, 1);
}

#[tokio::test]
async fn test_failure_without_transactions_keeps_earlier_migrations() {
    let mut db = Recorder::new(Dialect::Sqlite).failing_on("posts");

    let err = Runner::new(&mut db, catalog(Dialect::Sqlite)).migrate().await.unwrap_err();
    assert!(matches!(err, MigrateError::Execution { .. }));

    assert_eq!(db.ledger(), vec![A]);
    assert!(!db.executed.iter().any(|sql| sql == "BEGIN" || sql == "ROLLBACK"));
}

#[tokio::test]
async fn test_translation_error_fails_before_any_statement() {
    let mut db = Recorder::new(Dialect::Sqlite);
    let catalog = catalog(Dialect::Sqlite).register(Migration::from_fn(
        "lipgrade_20240103000000_fk.json",
        |m| {
            m.operation(
                serde_json::from_str(
                    r#"{"addForeignKey": {"table": "posts", "columns": "user_id", "name": "fk", "references": {"table": "users", "columns": "id"}}}"#,
                )
                .unwrap(),
            );
        },
        |_| {},
    ));

    let err = Runner::new(&mut db, catalog).migrate().await.unwrap_err();
    assert!(matches!(err, MigrateError::UnsupportedOperation { .. }));
    assert!(db.executed.is_empty());
    assert!(db.ledger.is_empty());
}

#[tokio::test]
async fn test_bad_file_name_fails_before_database() {
    let mut db = Recorder::new(Dialect::MySql);
    let catalog = catalog(Dialect::MySql).register(table("20240101_users.json", "users"));

    let err = Runner::new(&mut db, catalog).migrate().await.unwrap_err();
    assert!(matches!(err, MigrateError::NamingConvention { ref file } if file == "20240101_users.json"));
    assert!(!db.touched_database());
    assert_eq!(db.disconnected, 1);
}

#[tokio::test]
async fn test_dialect_mismatch_is_configuration_error() {
    let mut db = Recorder::new(Dialect::MySql);
    let err = Runner::new(&mut db, catalog(Dialect::Postgres)).migrate().await.unwrap_err();
    assert!(matches!(err, MigrateError::Configuration(_)));
}

#[tokio::test]
async fn test_status_reports_without_mutating() {
    let orphan = "lipgrade_20230101000000_old.json";
    let mut db = Recorder::new(Dialect::Postgres).with_ledger(&[A, orphan]);

    let report = Runner::new(&mut db, catalog(Dialect::Postgres)).status().await.unwrap();
    assert_eq!(
        report.entries,
        vec![
            StatusEntry { id: A.to_string(), status: MigrationStatus::Applied },
            StatusEntry { id: B.to_string(), status: MigrationStatus::Pending },
        ]
    );
    assert_eq!(report.orphaned, vec![orphan.to_string()]);
    assert_eq!(report.applied_count(), 1);
    assert_eq!(report.pending_count(), 1);

    assert!(db.executed.is_empty());
    assert_eq!(db.ledger(), vec![orphan, A]);
}

#[tokio::test]
async fn test_reset_drops_and_reapplies() {
    let mut db = Recorder::new(Dialect::Postgres).with_ledger(&[A, B]);

    let outcome = Runner::new(&mut db, catalog(Dialect::Postgres)).reset().await.unwrap();
    assert_eq!(outcome, MigrateOutcome::Applied(vec![A.to_string(), B.to_string()]));
    assert_eq!(db.executed.first().map(String::as_str), Some("DROP ALL"));
    assert_eq!(db.ledger(), vec![A, B]);
}

#[tokio::test]
async fn test_reset_requires_postgres() {
    let mut db = Recorder::new(Dialect::MySql).with_ledger(&[A]);

    let err = Runner::new(&mut db, catalog(Dialect::MySql)).reset().await.unwrap_err();
    assert!(err.to_string().contains("only available for PostgreSQL"));
    assert_eq!(db.ledger(), vec![A]);
    assert_eq!(db.disconnected, 1);
}
