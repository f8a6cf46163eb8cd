use std::{sync::Arc, time::Duration};

use anyhow::Result;
use chrono::Timelike;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{ledger::Ledger, storage::LedgerStore, utils::clock::Clock};

/// Ledger handle the monitor shares with the rest of the process.
pub type SharedLedger = Arc<Mutex<Ledger>>;

/// Watches the wall clock and force-closes today's record during the last
/// second of its date, so no record stays open past its own calendar day.
pub struct RolloverMonitor<S> {
    ledger: SharedLedger,
    store: S,
    shutdown: CancellationToken,
    poll_interval: Duration,
    clock: Box<dyn Clock>,
}

impl<S: LedgerStore> RolloverMonitor<S> {
    pub fn new(
        ledger: SharedLedger,
        store: S,
        shutdown: CancellationToken,
        poll_interval: Duration,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            ledger,
            store,
            shutdown,
            poll_interval,
            clock,
        }
    }

    /// Executes the polling loop until cancellation.
    pub async fn run(self) -> Result<()> {
        let mut poll_point = self.clock.instant();
        loop {
            poll_point += self.poll_interval;

            if let Err(e) = self.check_rollover().await {
                error!("Encountered an error during rollover {e:?}");
            }

            tokio::select! {
                // Cancelation means we stop execution of the event loop and
                // leave the ledger to whoever runs the process next.
                _ = self.shutdown.cancelled() => {
                    return Ok(())
                }
                _ = self.clock.sleep_until(poll_point) => ()
            }
        }
    }

    /// One poll. Acts only during the last second of the day, and only while
    /// today's record is still open. One-shot cli invocations mutate the same
    /// slots while watch runs, so the decision is made on a fresh load, not
    /// on the state this process started with. Closing goes through the same
    /// tap-out logic a user action takes, followed by a save.
    async fn check_rollover(&self) -> Result<()> {
        let now = self.clock.time();
        if now.hour() != 23 || now.minute() != 59 || now.second() != 59 {
            return Ok(());
        }

        let today = now.date_naive();
        let mut ledger = self.ledger.lock().await;
        let (records, tapped_in) = self.store.load().await?;
        ledger.reload(records, tapped_in);
        if !ledger
            .record_for(today)
            .is_some_and(|record| record.is_open())
        {
            debug!("Rollover reached with nothing open for {today}");
            return Ok(());
        }

        if ledger.tap_out() {
            info!("Rollover closed the record for {today}");
            self.store
                .save(ledger.records(), ledger.is_tapped_in())
                .await?;
        }
        Ok(())
    }
}
