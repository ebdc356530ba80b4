//! Gateway entry point
//!
//! Run with:
//! ```bash
//! cargo run -p totalk-gateway
//! ```
//!
//! Configuration is read from `config/totalk.yaml` (optional) and `TOTALK__*`
//! environment variables.

use totalk_common::{init_tracing, AppConfig, TracingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_tracing(TracingConfig::for_environment(config.app.env));

    info!(
        env = ?config.app.env,
        address = %config.gateway.address(),
        "Configuration loaded"
    );

    if let Err(e) = totalk_gateway::run(config).await {
        error!(error = %e, "Gateway failed");
        std::process::exit(1);
    }
}
