use std::convert::TryFrom;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{event, Level};
use tracing_subscriber::EnvFilter;

use tally::auth::expiry::{Clock, SystemClock};
use tally::http::server::{AppState, Server, Settings};
use tally::provider::XeroClient;
use tally::session::MemoryStore;
use tally::util::cli::{is_informational, Config, Options};

const CLEAN_UP_EVERY: Duration = Duration::from_secs(15);

async fn tallyd(config: Config) -> Option<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let provider = Arc::new(XeroClient::new(config.provider.clone(), clock.clone()));

    let sessions = Arc::new(MemoryStore::new(config.session_ttl, clock.clone()));
    let worker = sessions.clone();
    tokio::spawn(async move {
        if let Err(e) = worker.start_clean_up_worker(CLEAN_UP_EVERY).await {
            event!(Level::ERROR, error = %e, "Session clean-up worker stopped");
        }
    });

    let state = AppState::new(provider, sessions, clock, Settings::from_config(&config));
    Server::new(state, config.port).serve().await;
    Some(())
}

#[tokio::main]
async fn main() -> Result<(), ()> {
    dotenv::dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tally=info,warp=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let opts = match Options::try_parse() {
        Ok(opts) => opts,
        Err(e) if is_informational(&e) => e.exit(),
        Err(e) => {
            event!(Level::ERROR, "configuration error: {}", e);
            return Err(());
        }
    };
    let config = match Config::try_from(opts) {
        Ok(config) => config,
        Err(e) => {
            event!(Level::ERROR, "{}", e);
            return Err(());
        }
    };

    tallyd(config).await.ok_or(())
}
