/// Clipstream server binary
use clipstream::{config::ServerConfig, context::AppContext, error::AppResult, jobs, server};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load configuration before logging so RUST_LOG from .env applies
    let config = ServerConfig::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clipstream=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    print_banner();
    tracing::info!(level = %config.logging.level, "configuration loaded");

    let ctx = Arc::new(AppContext::new(config).await?);

    let scheduler = Arc::new(jobs::JobScheduler::new(Arc::clone(&ctx)));
    scheduler.start();

    server::serve((*ctx).clone()).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
       _ _           _
   ___| (_)_ __  ___| |_ _ __ ___  __ _ _ __ ___
  / __| | | '_ \/ __| __| '__/ _ \/ _` | '_ ` _ \
 | (__| | | |_) \__ \ |_| | |  __/ (_| | | | | | |
  \___|_|_| .__/|___/\__|_|  \___|\__,_|_| |_| |_|
          |_|

        Video publication backend v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
