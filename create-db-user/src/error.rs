use aws_lambda_events::apigw::ApiGatewayProxyResponse;
use aws_lambda_events::encodings::Body;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("{0}")]
    Service(String),

    #[error("secret {0} has no SecretString")]
    MissingSecretString(String),

    #[error("malformed secret payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("no database host configured or present in the secret")]
    MissingHost,

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Failure of one stage of the provisioning workflow.
///
/// The `Display` text is what the caller sees in the response body.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Failed to get secret: {0}")]
    SecretFetchFailed(SecretError),

    #[error("Failed to connect to DB: {0}")]
    ConnectFailed(DatabaseError),

    #[error("Failed to create user: {0}")]
    DdlFailed(DatabaseError),
}

impl ProvisionError {
    pub fn status_code(&self) -> i64 {
        match self {
            ProvisionError::InvalidInput(_) => 400,
            ProvisionError::SecretFetchFailed(_)
            | ProvisionError::ConnectFailed(_)
            | ProvisionError::DdlFailed(_) => 500,
        }
    }

    pub fn into_response(self) -> ApiGatewayProxyResponse {
        text_response(self.status_code(), self.to_string())
    }
}

pub fn text_response(status_code: i64, body: String) -> ApiGatewayProxyResponse {
    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );

    ApiGatewayProxyResponse {
        status_code,
        headers,
        body: Some(Body::Text(body)),
        ..Default::default()
    }
}

#[cfg(test)]
pub(crate) fn body_text(response: &ApiGatewayProxyResponse) -> &str {
    match &response.body {
        Some(Body::Text(text)) => text,
        other => panic!("expected a text body, got {other:?}"),
    }
}
