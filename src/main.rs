//! stream-replay - drive a conversation controller from a recorded session
//!
//! Reads JSON-lines stream updates and controller actions from a file (or
//! stdin when no path is given) and prints the resulting view as JSON.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::sync::Arc;
use stream_sync::replay::{parse_recording, replay, LoggingAdapter, LoggingStateWriter};
use stream_sync::{ConversationController, QueryThreadIdStore, SessionContext, SyncConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; stdout carries the resulting view
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stream_sync=info,stream_replay=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(io::stderr),
        )
        .init();

    let config = SyncConfig::from_env();

    let reader: Box<dyn BufRead> = match std::env::args().nth(1) {
        Some(path) => {
            tracing::info!(path = %path, "Reading recording");
            Box::new(BufReader::new(File::open(path)?))
        }
        None => Box::new(BufReader::new(io::stdin())),
    };
    let steps = parse_recording(reader)?;

    // Initial query string, as the browser shell would hold it
    let query = std::env::var("STREAM_SYNC_QUERY").unwrap_or_default();
    let store = Arc::new(QueryThreadIdStore::new(config.thread_param.clone(), query));
    let session = SessionContext::init(store);

    let mut controller =
        ConversationController::new(config, None, LoggingAdapter, LoggingStateWriter, session)
            .with_revalidator(Arc::new(|| tracing::info!("Thread list revalidation requested")));
    controller.connect();

    tracing::info!(steps = steps.len(), "Replaying recording");
    replay(&mut controller, steps).await?;

    println!("{}", serde_json::to_string_pretty(&controller.view())?);
    Ok(())
}
