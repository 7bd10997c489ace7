use std::sync::Arc;

use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde_json::Value;
use tracing::{info, span, Level};

use s3crud::{config, handler, storage::Storage};

struct FunctionState {
    sdk_config: aws_config::SdkConfig,
    region: String,
    client: aws_sdk_s3::Client,
}

impl FunctionState {
    /// Client for the envelope's region, reusing the startup client when it matches.
    fn client_for(&self, region: Option<&str>) -> aws_sdk_s3::Client {
        match config::region_override(&self.region, region) {
            Some(region) => config::s3_client(&self.sdk_config, Some(region)),
            None => self.client.clone(),
        }
    }
}

async fn function_handler(
    state: Arc<FunctionState>,
    event: LambdaEvent<Value>,
) -> Result<Value, Error> {
    let (payload, context) = event.into_parts();

    let span = span!(Level::INFO, "function_handler", context = "function_handler");
    let request_id = context.request_id;

    let response = tokio::task::spawn_blocking(move || {
        let _e = span.enter();
        info!(request_id = %request_id, "called");

        let region = payload
            .get("aws_region")
            .and_then(Value::as_str)
            .map(str::to_string);
        let client = state.client_for(region.as_deref());

        handler::handle_value(&Storage::new(&client), payload)
    })
    .await??;

    Ok(response)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt().json().init();

    let endpoint_url = config::internal_endpoint_url();
    info!(endpoint_url = ?endpoint_url, "starting");

    let sdk_config = config::load_sdk_config(None, None, endpoint_url.as_deref()).await;
    let state = Arc::new(FunctionState {
        region: config::region_name(&sdk_config),
        client: config::s3_client(&sdk_config, None),
        sdk_config,
    });

    run(service_fn(move |event: LambdaEvent<Value>| {
        function_handler(state.clone(), event)
    }))
    .await
}
