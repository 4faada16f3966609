use noughts::NoughtsServer;
use tracing_subscriber::EnvFilter;

const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// First CLI argument, then `NOUGHTS_BIND`, then the default.
fn bind_addr(arg: Option<String>, env: Option<String>) -> String {
    arg.or(env)
        .filter(|addr| !addr.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_BIND.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr = bind_addr(
        std::env::args().nth(1),
        std::env::var("NOUGHTS_BIND").ok(),
    );

    let server = NoughtsServer::builder().bind(&addr).build().await?;
    tracing::info!(addr = %server.local_addr()?, "noughts room server listening");

    server.run().await?;
    Ok(())
}
