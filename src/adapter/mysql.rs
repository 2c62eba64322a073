//! MySQL adapter.

use super::pooled::{PoolFlavor, PooledAdapter};
use crate::dialect::Dialect;

pub struct MySql;

impl PoolFlavor for MySql {
    const DIALECT: Dialect = Dialect::MySql;
}

pub type MySqlAdapter = PooledAdapter<MySql>;
