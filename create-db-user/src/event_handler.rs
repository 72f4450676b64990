use aws_lambda_events::apigw::{ApiGatewayProxyRequest, ApiGatewayProxyResponse};
use lambda_runtime::{Error, LambdaEvent};
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::config::Config;
use crate::database::{ConnectOptions, Connector, DatabaseEndpoint, DdlConnection};
use crate::ddl::{create_user_statements, DatabaseUsername};
use crate::error::{text_response, DatabaseError, ProvisionError};
use crate::secrets::{fetch_credentials, SecretsProvider};

#[derive(Debug, Default, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub username: String,
}

fn unmarshal_request(body: &str) -> Result<CreateUserRequest, String> {
    let value: Value = serde_json::from_str(body).map_err(|e| e.to_string())?;
    if !value.is_object() {
        return Err(format!("expected a JSON object, found {value}"));
    }
    serde_json::from_value(value).map_err(|e| e.to_string())
}

/// Validates the request body, collecting every problem into one message.
pub fn parse_request(body: Option<&str>) -> Result<DatabaseUsername, ProvisionError> {
    let mut problems = Vec::new();

    let request = match unmarshal_request(body.unwrap_or_default()) {
        Ok(request) => request,
        Err(e) => {
            problems.push(format!("failed to unmarshal request body: {e}"));
            CreateUserRequest::default()
        }
    };
    if request.username.is_empty() {
        problems.push("missing required field: username".to_string());
    }
    if !problems.is_empty() {
        return Err(ProvisionError::InvalidInput(problems.join("; ")));
    }

    DatabaseUsername::parse(&request.username)
        .map_err(|e| ProvisionError::InvalidInput(format!("invalid username: {e}")))
}

pub struct Provisioner<S, C> {
    config: Config,
    secrets: S,
    connector: C,
}

impl<S, C> Provisioner<S, C>
where
    S: SecretsProvider,
    C: Connector,
{
    pub fn new(config: Config, secrets: S, connector: C) -> Self {
        Self {
            config,
            secrets,
            connector,
        }
    }

    pub async fn provision_user(
        &self,
        body: Option<&str>,
    ) -> Result<DatabaseUsername, ProvisionError> {
        let username = parse_request(body)?;
        self.provision(&username).await?;
        Ok(username)
    }

    #[instrument(skip_all, fields(username = %username))]
    async fn provision(&self, username: &DatabaseUsername) -> Result<(), ProvisionError> {
        let credentials = fetch_credentials(&self.secrets, &self.config.secret_id)
            .await
            .map_err(ProvisionError::SecretFetchFailed)?;

        let endpoint = DatabaseEndpoint::resolve(&self.config, &credentials)
            .map_err(ProvisionError::ConnectFailed)?;
        info!(
            host = %endpoint.host,
            port = endpoint.port,
            "connecting as {}",
            credentials.username
        );

        let options = ConnectOptions::new(endpoint, &credentials);
        let mut connection = self
            .connector
            .connect(&options)
            .await
            .map_err(ProvisionError::ConnectFailed)?;

        let result = create_user(&mut connection, username).await;

        if let Err(e) = connection.close().await {
            warn!(error = %e, "failed to close database connection");
        }

        result.map_err(ProvisionError::DdlFailed)
    }
}

async fn create_user<D>(
    connection: &mut D,
    username: &DatabaseUsername,
) -> Result<(), DatabaseError>
where
    D: DdlConnection,
{
    let [create, require_ssl] = create_user_statements(username);

    connection.execute(&create).await?;
    if let Err(e) = connection.execute(&require_ssl).await {
        // No rollback: the account exists without the TLS requirement.
        warn!("user {username} was created but REQUIRE SSL failed");
        return Err(e);
    }

    Ok(())
}

pub(crate) async fn function_handler<S, C>(
    provisioner: &Provisioner<S, C>,
    event: LambdaEvent<ApiGatewayProxyRequest>,
) -> Result<ApiGatewayProxyResponse, Error>
where
    S: SecretsProvider,
    C: Connector,
{
    let response = match provisioner.provision_user(event.payload.body.as_deref()).await {
        Ok(username) => {
            info!("created user {username}");
            text_response(201, format!("User {username} created successfully!"))
        }
        Err(e) => {
            error!(status = e.status_code(), "{e}");
            e.into_response()
        }
    };

    Ok(response)
}
