use std::sync::Arc;

use clap::Parser;
use eventspotter::cli::{Args, init_logging, load_secret, open_database};
use eventspotter::rate_limit::RateLimitConfig;
use eventspotter::{ServerConfig, prune_stale_tokens, run_server};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(access_secret) = load_secret("ACCESS_JWT_SECRET", args.access_secret) else {
        std::process::exit(1);
    };
    let Some(refresh_secret) = load_secret("REFRESH_JWT_SECRET", args.refresh_secret) else {
        std::process::exit(1);
    };

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    prune_stale_tokens(&db, args.refresh_ttl_secs).await;

    let config = ServerConfig {
        db,
        access_secret,
        refresh_secret,
        access_ttl_secs: args.access_ttl_secs,
        refresh_ttl_secs: args.refresh_ttl_secs,
        rate_limits: Arc::new(RateLimitConfig::new()),
    };

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    let local_addr = listener.local_addr().unwrap();
    info!(address = %local_addr, "Listening");

    if let Err(e) = run_server(config, listener).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
