//! Reader webhook receiver.
//!
//! Usage:
//!   WEBHOOK_SECRET=whsec_... STRIPE_API_KEY=sk_... reader-webhook --listen 0.0.0.0:4242

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::http::HeaderName;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reader_webhook::api::{ApiClient, ApiConfig, DEFAULT_API_BASE};
use reader_webhook::effects::LoggingSink;
use reader_webhook::server::{AppState, build_router};
use reader_webhook::webhooks::{Dispatcher, HandlerRegistry, UnknownStatusPolicy, WebhookConfig};

#[derive(Parser, Debug)]
#[command(name = "reader-webhook")]
#[command(about = "Verifies and dispatches terminal reader webhooks")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:4242")]
    listen: SocketAddr,

    /// Webhook signing secret
    #[arg(long, env = "WEBHOOK_SECRET", hide_env_values = true)]
    webhook_secret: String,

    /// Secret API key used for payment intent and file lookups
    #[arg(long, env = "STRIPE_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Base URL of the vendor API
    #[arg(long, default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// Version header sent with API requests, including any beta flags
    #[arg(long, env = "STRIPE_API_VERSION")]
    api_version: Option<String>,

    /// API request timeout in seconds
    #[arg(long, default_value_t = 10)]
    api_timeout_secs: u64,

    /// Maximum age of a signed delivery in seconds
    #[arg(long, default_value_t = 300)]
    tolerance_secs: u64,

    /// Header the signature is read from
    #[arg(long, default_value = "stripe-signature")]
    signature_header: String,

    /// What to do with actions whose status is not recognised (proceed or skip)
    #[arg(long, default_value_t = UnknownStatusPolicy::Proceed)]
    unknown_status: UnknownStatusPolicy,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reader_webhook=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let signature_header = HeaderName::try_from(args.signature_header.as_str())
        .with_context(|| format!("invalid signature header name {:?}", args.signature_header))?;

    let api = ApiClient::new(ApiConfig {
        api_key: args.api_key,
        base_url: args.api_base,
        timeout: Duration::from_secs(args.api_timeout_secs),
        api_version: args.api_version,
    })
    .context("failed to build API client")?;

    let registry = HandlerRegistry::with_builtin_handlers(Arc::new(api), Arc::new(LoggingSink));
    let config = WebhookConfig::new(args.webhook_secret)
        .with_tolerance(Duration::from_secs(args.tolerance_secs))
        .with_unknown_status(args.unknown_status);

    tracing::info!(
        config = ?config,
        registry = ?registry,
        "Dispatcher configured"
    );

    let dispatcher = Arc::new(Dispatcher::new(config, registry));
    let app = build_router(AppState::with_signature_header(dispatcher, signature_header));

    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;
    tracing::info!("listening on {}", args.listen);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
