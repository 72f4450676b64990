use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use thiserror::Error;

/// MySQL caps account user names at 32 characters.
pub const MAX_USERNAME_LEN: usize = 32;

static USERNAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("valid regex"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsernameError {
    #[error("username is empty")]
    Empty,

    #[error("username is longer than {MAX_USERNAME_LEN} characters")]
    TooLong,

    #[error("username may only contain letters, digits, '_', '.' and '-'")]
    InvalidCharacters,
}

/// A user name that is safe to place inside a quoted MySQL account name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatabaseUsername(String);

impl DatabaseUsername {
    pub fn parse(value: &str) -> Result<Self, UsernameError> {
        if value.is_empty() {
            return Err(UsernameError::Empty);
        }
        if value.chars().count() > MAX_USERNAME_LEN {
            return Err(UsernameError::TooLong);
        }
        if !USERNAME_PATTERN.is_match(value) {
            return Err(UsernameError::InvalidCharacters);
        }

        Ok(Self(value.to_string()))
    }
}

impl fmt::Display for DatabaseUsername {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Statements that create an IAM-authenticated account and force TLS on it,
/// in execution order.
pub fn create_user_statements(username: &DatabaseUsername) -> [String; 2] {
    [
        format!("CREATE USER '{username}' IDENTIFIED WITH AWSAuthenticationPlugin AS 'RDS';"),
        format!("ALTER USER '{username}' REQUIRE SSL;"),
    ]
}
