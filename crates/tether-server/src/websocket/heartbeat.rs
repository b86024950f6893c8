//! Heartbeat liveness monitoring.

use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;

use super::connection::ClientConnection;

/// Outcome of the heartbeat loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatResult {
    /// The client stopped sending frames within the timeout window.
    TimedOut,
    /// The heartbeat was cancelled externally.
    Cancelled,
}

/// Watch a connection's activity flag.
///
/// At each `interval` tick the alive flag is checked and reset. After
/// `timeout / interval` consecutive silent ticks (at least one) the
/// connection is considered dead.
pub async fn run_heartbeat(
    connection: Arc<ClientConnection>,
    interval: Duration,
    timeout: Duration,
    cancel: CancellationToken,
) -> HeartbeatResult {
    let mut check_interval = time::interval(interval);
    let interval_ms = interval.as_millis().max(1);
    let max_missed = (timeout.as_millis() / interval_ms).max(1);
    let mut missed: u128 = 0;

    loop {
        tokio::select! {
            _ = check_interval.tick() => {
                if connection.check_alive() {
                    missed = 0;
                } else {
                    missed += 1;
                    if missed >= max_missed {
                        return HeartbeatResult::TimedOut;
                    }
                }
            }
            () = cancel.cancelled() => {
                return HeartbeatResult::Cancelled;
            }
        }
    }
}
