use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use tokio::time::Instant;

/// Represents an entity responsible for providing time across the application.
/// Attendance follows the wall clock of the machine, so readings come back in
/// [Local]. This can allow it to be swapped out for testing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Clock: Sync + Send + 'static {
    fn time(&self) -> DateTime<Local>;

    fn instant(&self) -> Instant;

    async fn sleep(&self, duration: Duration);

    async fn sleep_until(&self, instant: tokio::time::Instant);
}

pub struct DefaultClock;

#[async_trait]
impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Local> {
        Local::now()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    async fn sleep_until(&self, instant: tokio::time::Instant) {
        tokio::time::sleep_until(instant).await;
    }
}
