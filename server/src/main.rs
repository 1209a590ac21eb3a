use anyhow::Result;
use clap::Parser;
use fulltext_server::store::DocumentStore;
use fulltext_server::{router, AppState};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Directory for raw document bytes (wiped at startup)
    #[arg(long, default_value = "./store")]
    store: String,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 5001)]
    port: u16,
    /// Index the four "home sales" demo documents before serving
    #[arg(long, default_value_t = false)]
    seed_demo: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let state = AppState::new(DocumentStore::open(&args.store)?);
    if args.seed_demo {
        state.seed_demo()?;
    }
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, store = %args.store, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
