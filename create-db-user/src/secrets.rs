use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use aws_sdk_secretsmanager::Client;
use serde::{Deserialize, Deserializer};
use std::fmt;

use crate::error::SecretError;

/// Admin credentials stored in the database secret.
///
/// RDS-managed secrets also carry the endpoint; those fields are optional
/// because the function configuration may provide them instead.
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct DatabaseCredentials {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default, deserialize_with = "port_from_string_or_number")]
    pub port: Option<u16>,
    #[serde(default)]
    pub dbname: Option<String>,
}

impl fmt::Debug for DatabaseCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .finish()
    }
}

impl DatabaseCredentials {
    pub fn from_secret_string(secret: &str) -> Result<Self, SecretError> {
        Ok(serde_json::from_str(secret)?)
    }
}

fn port_from_string_or_number<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Option::<Port>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Port::Number(port)) => Ok(Some(port)),
        Some(Port::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(Port::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid port {text:?}"))),
    }
}

#[async_trait]
pub trait SecretsProvider: Send + Sync {
    async fn get_secret_string(&self, secret_id: &str) -> Result<String, SecretError>;
}

pub struct SecretsManagerProvider {
    client: Client,
}

impl SecretsManagerProvider {
    pub async fn new(region: &str) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        Self {
            client: Client::new(&sdk_config),
        }
    }
}

#[async_trait]
impl SecretsProvider for SecretsManagerProvider {
    async fn get_secret_string(&self, secret_id: &str) -> Result<String, SecretError> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .send()
            .await
            .map_err(|e| SecretError::Service(DisplayErrorContext(e).to_string()))?;

        output
            .secret_string()
            .map(str::to_string)
            .ok_or_else(|| SecretError::MissingSecretString(secret_id.to_string()))
    }
}

pub async fn fetch_credentials<S>(
    secrets: &S,
    secret_id: &str,
) -> Result<DatabaseCredentials, SecretError>
where
    S: SecretsProvider + ?Sized,
{
    let secret = secrets.get_secret_string(secret_id).await?;
    DatabaseCredentials::from_secret_string(&secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_secret() {
        let creds =
            DatabaseCredentials::from_secret_string(r#"{"username":"admin","password":"p@ss"}"#)
                .unwrap();

        assert_eq!(creds.username, "admin");
        assert_eq!(creds.password, "p@ss");
        assert_eq!(creds.host, None);
        assert_eq!(creds.port, None);
        assert_eq!(creds.dbname, None);
    }

    #[test]
    fn accepts_rds_managed_secret_layout() {
        let creds = DatabaseCredentials::from_secret_string(
            r#"{
                "engine": "mysql",
                "username": "admin",
                "password": "p@ss",
                "host": "db.cluster.us-west-2.rds.amazonaws.com",
                "port": 3306,
                "dbname": "app",
                "dbInstanceIdentifier": "db"
            }"#,
        )
        .unwrap();

        assert_eq!(
            creds.host.as_deref(),
            Some("db.cluster.us-west-2.rds.amazonaws.com")
        );
        assert_eq!(creds.port, Some(3306));
        assert_eq!(creds.dbname.as_deref(), Some("app"));
    }

    #[test]
    fn accepts_port_as_string() {
        let creds = DatabaseCredentials::from_secret_string(
            r#"{"username":"admin","password":"x","port":"3307"}"#,
        )
        .unwrap();

        assert_eq!(creds.port, Some(3307));
    }

    #[test]
    fn rejects_secret_without_password() {
        let err = DatabaseCredentials::from_secret_string(r#"{"username":"admin"}"#).unwrap_err();

        assert!(matches!(err, SecretError::Malformed(_)));
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn rejects_non_json_secret() {
        let err = DatabaseCredentials::from_secret_string("admin:p@ss").unwrap_err();

        assert!(matches!(err, SecretError::Malformed(_)));
    }

    #[test]
    fn debug_output_hides_password() {
        let creds =
            DatabaseCredentials::from_secret_string(r#"{"username":"admin","password":"p@ss"}"#)
                .unwrap();

        let printed = format!("{creds:?}");
        assert!(printed.contains("admin"));
        assert!(!printed.contains("p@ss"));
    }
}
