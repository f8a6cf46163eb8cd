use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use tokio::{select, sync::Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    ledger::Ledger,
    storage::{JsonLedgerStore, LedgerStore},
    utils::clock::DefaultClock,
};

pub mod monitor;

pub use monitor::{RolloverMonitor, SharedLedger};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Represents the starting point for watch mode. Loads the ledger, then keeps
/// the rollover monitor polling in the foreground until the process is told
/// to stop.
pub async fn start_watch(dir: PathBuf, poll_interval: Duration) -> Result<()> {
    let store = JsonLedgerStore::new(dir)?;
    let (records, tapped_in) = store.load().await?;
    let ledger: SharedLedger = Arc::new(Mutex::new(Ledger::from_parts(
        records,
        tapped_in,
        Box::new(DefaultClock),
    )));

    let shutdown_token = CancellationToken::new();
    let monitor = RolloverMonitor::new(
        ledger,
        store,
        shutdown_token.clone(),
        poll_interval,
        Box::new(DefaultClock),
    );

    info!("Watching for day rollover");
    let (_, monitor_result) = tokio::join!(detect_shutdown(shutdown_token), monitor.run());

    monitor_result.inspect_err(|e| error!("Rollover monitor got an error {e:?}"))
}

/// Function for handling graceful shutdown of watch mode. Trips the token on
/// a termination signal so the monitor loop can wind down instead of leaking
/// its timer.
async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            cancelation.cancel();
        },
    };
}
