//! PostgreSQL adapter.

use super::pooled::{PoolFlavor, PooledAdapter};
use crate::dialect::Dialect;

/// Drops every table and enum type in the `public` schema.
const DROP_ALL: &str = r#"
DO $do$ DECLARE
    r RECORD;
BEGIN
    FOR r IN (SELECT tablename FROM pg_tables WHERE schemaname = 'public') LOOP
        EXECUTE 'DROP TABLE IF EXISTS ' || quote_ident(r.tablename) || ' CASCADE';
    END LOOP;

    FOR r IN (
        SELECT t.typname
        FROM pg_type t
        JOIN pg_enum e ON t.oid = e.enumtypid
        JOIN pg_catalog.pg_namespace n ON n.oid = t.typnamespace
        WHERE n.nspname = 'public'
        GROUP BY t.typname
    ) LOOP
        EXECUTE 'DROP TYPE IF EXISTS ' || quote_ident(r.typname) || ' CASCADE';
    END LOOP;
END $do$;
"#;

pub struct Postgres;

impl PoolFlavor for Postgres {
    const DIALECT: Dialect = Dialect::Postgres;
    const DROP_ALL: Option<&'static str> = Some(DROP_ALL);
}

pub type PostgresAdapter = PooledAdapter<Postgres>;
