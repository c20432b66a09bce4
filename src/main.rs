use std::path::PathBuf;

use chatrelay::config::ProxyConfig;
use chatrelay::proxy::{router, ProxyState};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "chatrelay")]
#[command(about = "Streaming relay between a chat widget and a language model service")]
#[command(version)]
struct Cli {
    /// Port to listen on
    #[arg(short, long, env = "CHATRELAY_PORT")]
    port: Option<u16>,

    /// Address to bind to
    #[arg(short, long, env = "CHATRELAY_BIND")]
    bind: Option<String>,

    /// Base URL of the upstream inference service
    #[arg(short, long, env = "CHATRELAY_UPSTREAM")]
    upstream: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, env = "CHATRELAY_VERBOSE")]
    verbose: bool,

    /// Config file path (optional)
    #[arg(short, long, env = "CHATRELAY_CONFIG")]
    config: Option<PathBuf>,
}

impl Cli {
    /// Load the config file, if any, and apply command line overrides.
    fn resolve(&self) -> Result<ProxyConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => ProxyConfig::from_file(path)?,
            None => ProxyConfig::default(),
        };

        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(bind) = &self.bind {
            config.bind = bind.clone();
        }
        if let Some(upstream) = &self.upstream {
            config.upstream_url = upstream.clone();
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "chatrelay=debug,tower_http=debug"
    } else {
        "chatrelay=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = cli.resolve()?;
    let addr = config.listen_addr()?;

    let state = ProxyState::new(&config.upstream_url, config.transport_options())?;
    info!("Relaying chat requests to {}", state.chat_url());

    let app = router(state);

    info!("Starting chatrelay on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_defaults() {
        let cli = Cli::parse_from(["chatrelay", "--port", "4000", "--upstream", "http://llm:9000"]);
        let config = cli.resolve().unwrap();

        assert_eq!(config.port, 4000);
        assert_eq!(config.upstream_url, "http://llm:9000");
        assert_eq!(config.bind, "0.0.0.0");
    }
}
