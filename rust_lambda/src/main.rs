use aws_config::BehaviorVersion;
use aws_sdk_s3::Client as S3Client;
use lambda_runtime::{run, service_fn, tracing, Error};
mod error;
mod event_handler;
mod model;
mod reconciler;
mod store;
mod validator;
use event_handler::function_handler;
use reconciler::Reconciler;
use store::S3NotificationStore;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::subscriber::fmt().json().init();
    let shared_config = aws_config::load_defaults(BehaviorVersion::v2025_01_17()).await;
    let reconciler = Reconciler::new(S3NotificationStore::new(S3Client::new(&shared_config)));
    let http_client = reqwest::Client::new();
    run(service_fn(|event| function_handler(event, &reconciler, &http_client))).await
}
