use clap::Parser;
use tandem_broker::{Broker, DEFAULT_BIND};

/// Fan-out broker for Tandem presence and chat.
#[derive(Parser, Debug)]
#[command(name = "tandem-broker", version, about)]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "TANDEM_BIND", default_value = DEFAULT_BIND)]
    bind: String,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.debug {
        "tandem_broker=debug,tandem_transport=debug"
    } else {
        "tandem_broker=info,tandem_transport=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let broker = Broker::builder().bind(&args.bind).build().await?;
    tracing::info!(addr = %broker.local_addr()?, "listening");

    tokio::select! {
        result = broker.run() => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
    }
    Ok(())
}
