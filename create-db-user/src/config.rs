use thiserror::Error;

pub const SECRET_ID_VAR: &str = "DB_SECRET_ARN";
pub const REGION_VAR: &str = "AWS_REGION";
pub const HOST_VAR: &str = "DB_HOST";
pub const PORT_VAR: &str = "DB_PORT";
pub const DBNAME_VAR: &str = "DB_NAME";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{var} is not a valid port: {value}")]
    InvalidPort { var: &'static str, value: String },
}

/// Settings the function needs for every invocation.
///
/// Endpoint fields are optional here; anything left unset is taken from the
/// secret payload instead (see `DatabaseEndpoint::resolve`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub secret_id: String,
    pub region: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub dbname: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port: Option<u16> = match non_empty(PORT_VAR) {
            Some(value) => Some(value.trim().parse().map_err(|_| ConfigError::InvalidPort {
                var: PORT_VAR,
                value,
            })?),
            None => None,
        };

        Ok(Self {
            secret_id: non_empty(SECRET_ID_VAR).ok_or(ConfigError::Missing(SECRET_ID_VAR))?,
            region: non_empty(REGION_VAR).ok_or(ConfigError::Missing(REGION_VAR))?,
            host: non_empty(HOST_VAR),
            port,
            dbname: non_empty(DBNAME_VAR),
        })
    }
}
