//! Heartbeat scheduler
//!
//! Sends op 1 every `heartbeat_interval`, with the first beat delayed by
//! `interval * jitter` for `jitter` in `[0, 1)`. If the previous beat was not
//! acknowledged by the time the next one is due, the connection is a zombie:
//! the scheduler signals once and stops.

use crate::connection::Outbound;
use crate::protocol::Frame;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Pick the delay before the first heartbeat
#[must_use]
pub fn jittered_delay(interval: Duration) -> Duration {
    interval.mul_f64(rand::thread_rng().gen::<f64>())
}

/// Periodic heartbeat task bound to one socket
///
/// Dropping the scheduler cancels the task.
#[derive(Debug)]
pub struct HeartbeatScheduler {
    task: JoinHandle<()>,
    acked: Arc<AtomicBool>,
    interval: Duration,
}

impl HeartbeatScheduler {
    /// Start heartbeating with a random first delay
    pub(crate) fn start(
        interval: Duration,
        outbound: mpsc::Sender<Outbound>,
        sequence: watch::Receiver<Option<u64>>,
        zombie: mpsc::Sender<()>,
    ) -> Self {
        Self::start_with_delay(interval, jittered_delay(interval), outbound, sequence, zombie)
    }

    /// Start heartbeating with an explicit first delay
    pub(crate) fn start_with_delay(
        interval: Duration,
        first_delay: Duration,
        outbound: mpsc::Sender<Outbound>,
        sequence: watch::Receiver<Option<u64>>,
        zombie: mpsc::Sender<()>,
    ) -> Self {
        // Nothing is outstanding before the first beat
        let acked = Arc::new(AtomicBool::new(true));

        tracing::debug!(
            interval_ms = interval.as_millis(),
            first_delay_ms = first_delay.as_millis(),
            "Starting heartbeat"
        );

        let task = tokio::spawn(beat(
            interval,
            first_delay,
            acked.clone(),
            outbound,
            sequence,
            zombie,
        ));

        Self {
            task,
            acked,
            interval,
        }
    }

    /// Record a heartbeat ACK from the server
    pub fn ack(&self) {
        self.acked.store(true, Ordering::Release);
    }

    /// Check if the last heartbeat was acknowledged
    #[must_use]
    pub fn is_acked(&self) -> bool {
        self.acked.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Stop the task
    pub fn cancel(self) {
        self.task.abort();
    }
}

impl Drop for HeartbeatScheduler {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn beat(
    interval: Duration,
    first_delay: Duration,
    acked: Arc<AtomicBool>,
    outbound: mpsc::Sender<Outbound>,
    sequence: watch::Receiver<Option<u64>>,
    zombie: mpsc::Sender<()>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + first_delay, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        if !acked.swap(false, Ordering::AcqRel) {
            tracing::warn!(
                interval_ms = interval.as_millis(),
                "Heartbeat not acknowledged, connection zombied"
            );
            let _ = zombie.try_send(());
            return;
        }

        let seq = *sequence.borrow();
        if outbound.send(Outbound::Frame(Frame::heartbeat(seq))).await.is_err() {
            tracing::debug!("Writer closed, stopping heartbeat");
            return;
        }
        tracing::trace!(seq = ?seq, "Heartbeat sent");
    }
}
