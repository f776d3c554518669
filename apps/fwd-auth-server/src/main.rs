use clap::Parser;
use mimalloc::MiMalloc;

use fwd_auth_server::config::{Cli, ServerConfig};
use fwd_auth_server::server::{self, ServeError};
use fwd_auth_server::logging;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const EXIT_LISTEN: i32 = 1;
const EXIT_CONFIG: i32 = 2;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match ServerConfig::load(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("fwd-auth-server: {e}");
            std::process::exit(EXIT_CONFIG);
        }
    };

    logging::init(config.log_format)?;

    let forward_auth = match server::build(&config) {
        Ok(forward_auth) => forward_auth,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "invalid configuration");
            std::process::exit(EXIT_CONFIG);
        }
    };

    match server::run(&config, &forward_auth, server::shutdown_signal()).await {
        Err(ServeError::Listen(e)) if e.is_operator_error() => {
            tracing::error!(error = %e, "cannot start listener");
            eprintln!("fwd-auth-server: {e}");
            std::process::exit(EXIT_LISTEN);
        }
        result => result.map_err(Into::into),
    }
}
