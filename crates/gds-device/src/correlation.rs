//! Command/report correlation.
//!
//! One bounded FIFO per message kind holds (report, expiry) pairs published
//! by the transport's receive path. Command operations block on
//! [`PendingReports::wait_for`] with an explicit timeout; the receive path
//! itself never blocks here beyond a brief lock.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use gds_proto::{GdsMessage, MessageKind};
use gds_transport::CancelToken;
use tracing::{debug, warn};

/// Cap per queue; an unconsumed stream of unsolicited reports must not grow
/// without bound.
const MAX_PENDING: usize = 16;

/// How often a blocked waiter re-checks its cancellation token.
const CANCEL_POLL_SLICE: Duration = Duration::from_millis(25);

type Queues = [VecDeque<(GdsMessage, Instant)>; MessageKind::COUNT];

pub struct PendingReports {
    queues: Mutex<Queues>,
    available: Condvar,
}

impl PendingReports {
    pub fn new() -> Self {
        Self {
            queues: Mutex::new(std::array::from_fn(|_| VecDeque::new())),
            available: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Queues> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueue a report with expiry `now + ttl` and wake waiters.
    pub fn publish(&self, message: GdsMessage, ttl: Duration) {
        let kind = message.kind();
        let mut queues = self.lock();
        let queue = &mut queues[kind.index()];
        if queue.len() == MAX_PENDING {
            warn!(?kind, "pending report queue full; dropping oldest entry");
            queue.pop_front();
        }
        queue.push_back((message, Instant::now() + ttl));
        drop(queues);
        self.available.notify_all();
    }

    /// Block until a non-expired report of `kind` arrives, in FIFO order.
    ///
    /// Expired entries are discarded with a warning and never returned.
    /// Returns `None` when `timeout` elapses with no valid entry, or
    /// promptly once `cancel` fires; cancellation leaves the queue intact
    /// for future waiters.
    pub fn wait_for(
        &self,
        kind: MessageKind,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Option<GdsMessage> {
        let deadline = Instant::now() + timeout;
        let mut queues = self.lock();
        loop {
            while let Some((message, expiry)) = queues[kind.index()].pop_front() {
                if expiry <= Instant::now() {
                    warn!(?kind, "discarding stale report");
                    continue;
                }
                return Some(message);
            }

            if cancel.is_cancelled() {
                debug!(?kind, "report wait cancelled");
                return None;
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }

            let slice = (deadline - now).min(CANCEL_POLL_SLICE);
            let (guard, _timed_out) = self
                .available
                .wait_timeout(queues, slice)
                .unwrap_or_else(PoisonError::into_inner);
            queues = guard;
        }
    }

    /// Drain every queued entry for `kind`, expired or not. Called before a
    /// new command is issued so a leftover report from an earlier, unrelated
    /// request cannot satisfy it.
    pub fn clear_stale(&self, kind: MessageKind) {
        let mut queues = self.lock();
        let dropped = queues[kind.index()].len();
        if dropped > 0 {
            debug!(?kind, dropped, "clearing pending reports");
            queues[kind.index()].clear();
        }
    }

    /// Drain every queue.
    pub fn clear_all(&self) {
        let mut queues = self.lock();
        for queue in queues.iter_mut() {
            queue.clear();
        }
    }
}

impl Default for PendingReports {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use gds_proto::CrcData;
    use gds_transport::CancelToken;

    use super::*;

    fn crc(result: u32) -> GdsMessage {
        GdsMessage::CrcData(CrcData { result })
    }

    #[test]
    fn delivers_in_fifo_order() {
        let pending = PendingReports::new();
        pending.publish(crc(1), Duration::from_secs(5));
        pending.publish(crc(2), Duration::from_secs(5));

        let token = CancelToken::new();
        let first = pending.wait_for(MessageKind::CrcData, Duration::from_millis(10), &token);
        let second = pending.wait_for(MessageKind::CrcData, Duration::from_millis(10), &token);
        assert_eq!(first, Some(crc(1)));
        assert_eq!(second, Some(crc(2)));
    }

    #[test]
    fn expired_entry_is_discarded_not_returned() {
        let pending = PendingReports::new();
        pending.publish(crc(1), Duration::ZERO);
        thread::sleep(Duration::from_millis(5));

        let token = CancelToken::new();
        let got = pending.wait_for(MessageKind::CrcData, Duration::from_millis(10), &token);
        assert_eq!(got, None);
    }

    #[test]
    fn expired_entry_is_skipped_in_favor_of_valid_one() {
        let pending = PendingReports::new();
        pending.publish(crc(1), Duration::ZERO);
        pending.publish(crc(2), Duration::from_secs(5));
        thread::sleep(Duration::from_millis(5));

        let token = CancelToken::new();
        let got = pending.wait_for(MessageKind::CrcData, Duration::from_millis(10), &token);
        assert_eq!(got, Some(crc(2)));
    }

    #[test]
    fn times_out_with_none_when_nothing_arrives() {
        let pending = PendingReports::new();
        let token = CancelToken::new();
        let start = Instant::now();
        let got = pending.wait_for(MessageKind::CrcData, Duration::from_millis(30), &token);
        assert_eq!(got, None);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn wait_wakes_on_publish_from_another_thread() {
        let pending = Arc::new(PendingReports::new());
        let publisher = pending.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            publisher.publish(crc(7), Duration::from_secs(5));
        });

        let token = CancelToken::new();
        let got = pending.wait_for(MessageKind::CrcData, Duration::from_secs(2), &token);
        assert_eq!(got, Some(crc(7)));
        handle.join().unwrap();
    }

    #[test]
    fn cancellation_returns_none_and_preserves_queue() {
        let pending = Arc::new(PendingReports::new());
        let token = CancelToken::new();
        token.cancel();

        let got = pending.wait_for(MessageKind::CrcData, Duration::from_secs(5), &token);
        assert_eq!(got, None);

        // A later waiter still sees whatever is queued.
        pending.publish(crc(9), Duration::from_secs(5));
        let fresh = CancelToken::new();
        let got = pending.wait_for(MessageKind::CrcData, Duration::from_millis(10), &fresh);
        assert_eq!(got, Some(crc(9)));
    }

    #[test]
    fn cancellation_is_prompt() {
        let pending = Arc::new(PendingReports::new());
        let token = CancelToken::new();
        let canceller = token.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            canceller.cancel();
        });

        let start = Instant::now();
        let got = pending.wait_for(MessageKind::CrcData, Duration::from_secs(30), &token);
        assert_eq!(got, None);
        assert!(start.elapsed() < Duration::from_secs(1));
        handle.join().unwrap();
    }

    #[test]
    fn clear_stale_drops_valid_entries_too() {
        let pending = PendingReports::new();
        pending.publish(crc(1), Duration::from_secs(60));
        pending.clear_stale(MessageKind::CrcData);

        let token = CancelToken::new();
        let got = pending.wait_for(MessageKind::CrcData, Duration::from_millis(10), &token);
        assert_eq!(got, None);
    }

    #[test]
    fn queues_are_independent_per_kind() {
        let pending = PendingReports::new();
        pending.publish(crc(1), Duration::from_secs(5));

        let token = CancelToken::new();
        let got = pending.wait_for(MessageKind::DeviceState, Duration::from_millis(10), &token);
        assert_eq!(got, None);
        let got = pending.wait_for(MessageKind::CrcData, Duration::from_millis(10), &token);
        assert_eq!(got, Some(crc(1)));
    }

    #[test]
    fn bounded_queue_drops_oldest() {
        let pending = PendingReports::new();
        for n in 0..(MAX_PENDING as u32 + 2) {
            pending.publish(crc(n), Duration::from_secs(60));
        }

        let token = CancelToken::new();
        let got = pending.wait_for(MessageKind::CrcData, Duration::from_millis(10), &token);
        assert_eq!(got, Some(crc(2)));
    }
}
