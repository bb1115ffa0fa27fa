use anyhow::Result;
use tracing_subscriber::EnvFilter;

use neobbs::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("neobbs=info")),
        )
        .init();

    let config = Config::from_env()?;
    neobbs::run(config).await
}
