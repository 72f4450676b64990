use lambda_runtime::{run, service_fn, tracing, Error};

mod config;
mod database;
mod ddl;
mod error;
mod event_handler;
mod secrets;

use config::Config;
use database::MySqlConnector;
use event_handler::{function_handler, Provisioner};
use secrets::SecretsManagerProvider;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();

    let config = Config::from_env()?;
    let secrets = SecretsManagerProvider::new(&config.region).await;
    let provisioner = Provisioner::new(config, secrets, MySqlConnector);

    run(service_fn(|event| function_handler(&provisioner, event))).await
}
