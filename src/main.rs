use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use equiflow::api::{self, AppState};
use equiflow::auth::StaticTokenVerifier;
use equiflow::cli::Cli;
use equiflow::config::Config;
use equiflow::error::ApiResult;
use equiflow::store::{snapshot, Store};

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run(&cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> ApiResult<()> {
    let config = Config::load(cli)?;

    let db_path = match &config.db_path {
        Some(path) => path.clone(),
        None => snapshot::default_db_path()?,
    };
    let store = Store::open(&db_path)?;
    tracing::info!(db = %db_path.display(), "snapshot store opened");

    if config.tokens.is_empty() {
        tracing::warn!("no auth tokens configured; all protected routes will reject requests");
    }

    // The verifier is built once here and injected into the handlers; auth
    // state never lives in module globals.
    let verifier = Arc::new(StaticTokenVerifier::new(
        config.tokens.clone(),
        config.revoked.clone(),
    ));

    let state = AppState::new(store, verifier);
    api::serve(state, &config.bind_addr)
}
