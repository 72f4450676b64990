use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::ConnectOptions as _;
use std::fmt;

use crate::config::Config;
use crate::error::DatabaseError;
use crate::secrets::DatabaseCredentials;

pub const DEFAULT_PORT: u16 = 3306;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatabaseEndpoint {
    pub host: String,
    pub port: u16,
    pub database: Option<String>,
}

impl DatabaseEndpoint {
    /// Function configuration wins field by field; the secret fills the gaps.
    pub fn resolve(
        config: &Config,
        credentials: &DatabaseCredentials,
    ) -> Result<Self, DatabaseError> {
        let host = config
            .host
            .clone()
            .or_else(|| credentials.host.clone())
            .filter(|host| !host.is_empty())
            .ok_or(DatabaseError::MissingHost)?;

        Ok(Self {
            host,
            port: config.port.or(credentials.port).unwrap_or(DEFAULT_PORT),
            database: config
                .dbname
                .clone()
                .or_else(|| credentials.dbname.clone())
                .filter(|database| !database.is_empty()),
        })
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    pub endpoint: DatabaseEndpoint,
    pub username: String,
    pub password: String,
}

impl ConnectOptions {
    pub fn new(endpoint: DatabaseEndpoint, credentials: &DatabaseCredentials) -> Self {
        Self {
            endpoint,
            username: credentials.username.clone(),
            password: credentials.password.clone(),
        }
    }
}

impl fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectOptions")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A live admin connection that runs DDL one statement at a time.
#[async_trait]
pub trait DdlConnection: Send + Sized {
    async fn execute(&mut self, statement: &str) -> Result<(), DatabaseError>;

    async fn close(self) -> Result<(), DatabaseError>;
}

#[async_trait]
pub trait Connector: Send + Sync {
    type Connection: DdlConnection;

    async fn connect(&self, options: &ConnectOptions) -> Result<Self::Connection, DatabaseError>;
}

pub struct MySqlConnector;

#[async_trait]
impl Connector for MySqlConnector {
    type Connection = MySqlConnection;

    async fn connect(&self, options: &ConnectOptions) -> Result<MySqlConnection, DatabaseError> {
        let mut mysql = MySqlConnectOptions::new()
            .host(&options.endpoint.host)
            .port(options.endpoint.port)
            .username(&options.username)
            .password(&options.password);
        if let Some(database) = &options.endpoint.database {
            mysql = mysql.database(database);
        }

        Ok(mysql.connect().await?)
    }
}

#[async_trait]
impl DdlConnection for MySqlConnection {
    async fn execute(&mut self, statement: &str) -> Result<(), DatabaseError> {
        // Text protocol: account management statements are not run as prepared statements.
        sqlx::Executor::execute(&mut *self, sqlx::raw_sql(statement)).await?;
        Ok(())
    }

    async fn close(self) -> Result<(), DatabaseError> {
        sqlx::Connection::close(self).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(host: Option<&str>, port: Option<u16>, dbname: Option<&str>) -> Config {
        Config {
            secret_id: "db".into(),
            region: "us-west-2".into(),
            host: host.map(Into::into),
            port,
            dbname: dbname.map(Into::into),
        }
    }

    fn credentials(
        host: Option<&str>,
        port: Option<u16>,
        dbname: Option<&str>,
    ) -> DatabaseCredentials {
        DatabaseCredentials {
            username: "admin".into(),
            password: "p@ss".into(),
            host: host.map(Into::into),
            port,
            dbname: dbname.map(Into::into),
        }
    }

    #[test]
    fn configuration_overrides_secret() {
        let endpoint = DatabaseEndpoint::resolve(
            &config(Some("proxy.internal"), Some(3307), Some("app")),
            &credentials(Some("db.rds"), Some(3306), Some("mysql")),
        )
        .unwrap();

        assert_eq!(
            endpoint,
            DatabaseEndpoint {
                host: "proxy.internal".into(),
                port: 3307,
                database: Some("app".into()),
            }
        );
    }

    #[test]
    fn falls_back_to_secret_per_field() {
        let endpoint = DatabaseEndpoint::resolve(
            &config(None, Some(3307), None),
            &credentials(Some("db.rds"), Some(3306), Some("mysql")),
        )
        .unwrap();

        assert_eq!(endpoint.host, "db.rds");
        assert_eq!(endpoint.port, 3307);
        assert_eq!(endpoint.database.as_deref(), Some("mysql"));
    }

    #[test]
    fn port_defaults_to_mysql() {
        let config = config(Some("db"), None, None);
        let endpoint = DatabaseEndpoint::resolve(&config, &credentials(None, None, None)).unwrap();

        assert_eq!(endpoint.port, DEFAULT_PORT);
        assert_eq!(endpoint.database, None);
    }

    #[test]
    fn empty_database_name_in_secret_is_ignored() {
        let config = config(Some("db"), None, None);
        let endpoint =
            DatabaseEndpoint::resolve(&config, &credentials(None, None, Some(""))).unwrap();

        assert_eq!(endpoint.database, None);
    }

    #[test]
    fn missing_host_is_an_error() {
        let config = config(None, None, None);
        let err = DatabaseEndpoint::resolve(&config, &credentials(None, None, None)).unwrap_err();

        assert!(matches!(err, DatabaseError::MissingHost));
    }

    #[test]
    fn debug_output_hides_password() {
        let options = ConnectOptions::new(
            DatabaseEndpoint {
                host: "db".into(),
                port: 3306,
                database: None,
            },
            &credentials(None, None, None),
        );

        assert!(!format!("{options:?}").contains("p@ss"));
    }
}
