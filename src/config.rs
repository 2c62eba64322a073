//! Project configuration from `lipgrate.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use url::Url;

use crate::dialect::Dialect;
use crate::error::{MigrateError, MigrateResult};

pub const FILE_NAME: &str = "lipgrate.toml";

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Database client, e.g. `postgresql`, `pg`, `mysql2` or `sqlite3`.
    pub client: Option<String>,
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub migrations: MigrationsConfig,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    /// SQLite database file.
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MigrationsConfig {
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
        }
    }
}

fn default_directory() -> PathBuf {
    PathBuf::from("./migrations")
}

impl Config {
    /// Find and load the configuration file.
    ///
    /// Checks `explicit` first, then `./lipgrate.toml`, then
    /// `<config dir>/lipgrate/lipgrate.toml`.
    pub fn load(explicit: Option<&Path>) -> MigrateResult<Self> {
        let path = match explicit {
            Some(path) if path.is_file() => path.to_path_buf(),
            Some(path) => {
                return Err(MigrateError::Configuration(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            None => Self::locate().ok_or_else(|| {
                MigrateError::Configuration(format!(
                    "{} not found. Run 'lipgrate init' first.",
                    FILE_NAME
                ))
            })?,
        };

        tracing::debug!(path = %path.display(), "loading config");
        Self::from_path(&path)
    }

    pub fn from_path(path: &Path) -> MigrateResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
            .map_err(|e| MigrateError::Configuration(format!("{}: {}", path.display(), e)))
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn locate() -> Option<PathBuf> {
        let local = PathBuf::from(FILE_NAME);
        if local.is_file() {
            return Some(local);
        }

        let global = dirs::config_dir()?.join("lipgrate").join(FILE_NAME);
        global.is_file().then_some(global)
    }

    pub fn dialect(&self) -> MigrateResult<Dialect> {
        match self.client.as_deref() {
            Some(client) => client.parse(),
            None => Err(MigrateError::Configuration(format!(
                "Missing 'client' in {}. Expected one of: mysql, postgresql, sqlite",
                FILE_NAME
            ))),
        }
    }

    pub fn migrations_dir(&self) -> &Path {
        &self.migrations.directory
    }

    /// The connection URL, taken verbatim or assembled from the fields.
    pub fn connection_url(&self) -> MigrateResult<String> {
        let dialect = self.dialect()?;
        let conn = &self.connection;

        if let Some(url) = &conn.url {
            return Ok(url.clone());
        }

        match dialect {
            Dialect::Sqlite => match &conn.filename {
                Some(filename) => Ok(format!("sqlite://{}?mode=rwc", filename)),
                None => Err(MigrateError::Configuration(
                    "SQLite needs 'connection.filename' or 'connection.url'".to_string(),
                )),
            },
            Dialect::Postgres | Dialect::MySql => build_url(dialect, conn),
        }
    }
}

fn build_url(dialect: Dialect, conn: &ConnectionConfig) -> MigrateResult<String> {
    let scheme = match dialect {
        Dialect::Postgres => "postgres",
        _ => "mysql",
    };
    let host = conn.host.as_deref().unwrap_or("localhost");

    let invalid = |what: &str| {
        MigrateError::Configuration(format!("Invalid connection {} for {}", what, dialect))
    };

    let mut url = Url::parse(&format!("{}://{}", scheme, host)).map_err(|_| invalid("host"))?;
    url.set_port(conn.port).map_err(|_| invalid("port"))?;
    if let Some(user) = &conn.user {
        url.set_username(user).map_err(|_| invalid("user"))?;
    }
    if let Some(password) = &conn.password {
        url.set_password(Some(password)).map_err(|_| invalid("password"))?;
    }
    if let Some(database) = &conn.database {
        url.set_path(database);
    }

    Ok(url.to_string())
}
