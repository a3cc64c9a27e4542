use anyhow::{Context, Result};
use clap::Parser;
use std::{env, str::FromStr, time::Duration};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Bucket uploads are written to; also the fallback when streaming a record
    /// that carries no bucket.
    pub bucket: String,
    /// S3 endpoint used to sign URLs. Must be reachable by clients.
    pub s3_endpoint: String,
    pub s3_region: String,
    pub s3_access_key: String,
    pub s3_secret_key: String,
    pub request_timeout: Duration,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Video sharing API: uploads, catalog and streaming")]
pub struct Args {
    /// Host to bind to (overrides VIDSHARE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides VIDSHARE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides VIDSHARE_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Upload and default stream bucket (overrides VIDSHARE_BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Public S3 endpoint embedded in presigned URLs (overrides VIDSHARE_S3_EXTERNAL_ENDPOINT)
    #[arg(long)]
    pub s3_endpoint: Option<String>,

    /// Per-request deadline in seconds (overrides VIDSHARE_REQUEST_TIMEOUT_SECS)
    #[arg(long)]
    pub request_timeout_secs: Option<u64>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let migrate = args.migrate;
        Ok((Self::from_args(args)?, migrate))
    }

    /// Merge already-parsed CLI args over the environment.
    pub fn from_args(args: Args) -> Result<Self> {
        // --- Environment fallback ---
        let env_host = env_or("VIDSHARE_HOST", "0.0.0.0");
        let env_port = env_parse("VIDSHARE_PORT", 8080u16)?;
        let env_db = env_or("VIDSHARE_DATABASE_URL", "sqlite://./data/meta/vidshare.db");
        let env_bucket = env_or("VIDSHARE_BUCKET", "videos");
        let internal_endpoint = env_or("VIDSHARE_S3_ENDPOINT", "http://localhost:9000");
        // Browsers need the external address; fall back to the internal one.
        let env_endpoint = env::var("VIDSHARE_S3_EXTERNAL_ENDPOINT")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or(internal_endpoint);
        let env_timeout = env_parse("VIDSHARE_REQUEST_TIMEOUT_SECS", 30u64)?;

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            database_url: args.database_url.unwrap_or(env_db),
            bucket: args.bucket.unwrap_or(env_bucket),
            s3_endpoint: args.s3_endpoint.unwrap_or(env_endpoint),
            s3_region: env_or("VIDSHARE_S3_REGION", "us-east-1"),
            s3_access_key: env_or("VIDSHARE_S3_ACCESS_KEY", "minioadmin"),
            s3_secret_key: env_or("VIDSHARE_S3_SECRET_KEY", "minioadmin"),
            request_timeout: Duration::from_secs(
                args.request_timeout_secs.unwrap_or(env_timeout),
            ),
        };

        if cfg.bucket.trim().is_empty() {
            anyhow::bail!("bucket name must not be empty");
        }

        Ok(cfg)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.into())
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", key)),
    }
}
