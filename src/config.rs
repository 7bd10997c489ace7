use aws_config::{Region, SdkConfig};

use crate::dispatch::DEFAULT_FUNCTION_NAME;

/// Port LocalStack serves every service on.
const LOCALSTACK_PORT: u16 = 4566;

const FALLBACK_REGION: &str = "us-east-1";

/// Connection settings shared by every subcommand.
#[derive(clap::Args, Clone, Debug)]
pub struct AwsArgs {
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    #[arg(long, env = "AWS_PROFILE")]
    pub profile: Option<String>,

    /// Endpoint override, e.g. a LocalStack URL
    #[arg(long, env = "LOCALSTACK_ENDPOINT_URL")]
    pub endpoint_url: Option<String>,

    #[arg(long, env = "CRUD_FUNCTION_NAME", default_value = DEFAULT_FUNCTION_NAME)]
    pub function_name: String,
}

impl AwsArgs {
    pub async fn load_sdk_config(&self) -> SdkConfig {
        load_sdk_config(
            self.region.as_deref(),
            self.profile.as_deref(),
            self.endpoint_url.as_deref(),
        )
        .await
    }

    /// Region to put in task envelopes when no SDK config was loaded.
    pub fn region_or_default(&self) -> &str {
        self.region.as_deref().unwrap_or(FALLBACK_REGION)
    }
}

pub async fn load_sdk_config(
    region: Option<&str>,
    profile: Option<&str>,
    endpoint_url: Option<&str>,
) -> SdkConfig {
    let mut loader = aws_config::from_env();

    if let Some(region) = region {
        loader = loader.region(Region::new(region.to_string()));
    }
    if let Some(profile) = profile {
        loader = loader.profile_name(profile);
    }
    if let Some(url) = endpoint_url {
        loader = loader.endpoint_url(url);
    }

    loader.load().await
}

/// Endpoint the function uses to reach LocalStack from inside its container.
pub fn internal_endpoint_url() -> Option<String> {
    std::env::var("LOCALSTACK_HOSTNAME")
        .ok()
        .filter(|host| !host.is_empty())
        .map(|host| format!("http://{}:{}", host, LOCALSTACK_PORT))
}

pub fn region_name(sdk_config: &SdkConfig) -> String {
    sdk_config
        .region()
        .map(|region| region.to_string())
        .unwrap_or_else(|| FALLBACK_REGION.to_string())
}

/// Region a request should be served from when it differs from `current`.
///
/// An empty or missing request region keeps the current one.
pub fn region_override<'a>(current: &str, requested: Option<&'a str>) -> Option<&'a str> {
    requested.filter(|region| !region.is_empty() && *region != current)
}

/// S3 client for `sdk_config`, optionally pinned to another region.
///
/// Endpoint overrides get path-style addressing since LocalStack does not serve
/// virtual-hosted buckets by default.
pub fn s3_client(sdk_config: &SdkConfig, region: Option<&str>) -> aws_sdk_s3::Client {
    let mut builder = aws_sdk_s3::config::Builder::from(sdk_config);

    if let Some(region) = region {
        builder = builder.region(Region::new(region.to_string()));
    }
    if sdk_config.endpoint_url().is_some() {
        builder = builder.force_path_style(true);
    }

    aws_sdk_s3::Client::from_conf(builder.build())
}

pub fn lambda_client(sdk_config: &SdkConfig) -> aws_sdk_lambda::Client {
    aws_sdk_lambda::Client::new(sdk_config)
}
