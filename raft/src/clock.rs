//! Hybrid logical clock.
//!
//! One clock instance is shared by every partition in the process. Each
//! operation is a single read-modify-write under a mutex and returns a
//! timestamp strictly greater than any timestamp returned before it, which is
//! what lets the leader use timestamps as proposal ticket keys.

use std::sync::Mutex;

use chrono::Utc;

use crate::message::HybridTime;

/// A thread-safe hybrid logical clock combining wall-clock milliseconds with
/// a logical counter.
pub struct HybridClock {
    last: Mutex<HybridTime>,
}

impl HybridClock {
    /// Constructs a clock whose first event will be stamped at or after the
    /// current wall-clock time.
    pub fn new() -> Self {
        HybridClock {
            last: Mutex::new(HybridTime::default()),
        }
    }

    /// Returns a timestamp for a local event.
    pub fn local_event(&self) -> HybridTime {
        self.advance(None)
    }

    /// Returns a timestamp for an outgoing message.
    pub fn send_event(&self) -> HybridTime {
        self.advance(None)
    }

    /// Merges a remote timestamp into the clock and returns a timestamp
    /// greater than both the local clock and `remote`.
    pub fn receive_event(&self, remote: HybridTime) -> HybridTime {
        self.advance(Some(remote))
    }

    fn advance(&self, remote: Option<HybridTime>) -> HybridTime {
        let mut last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut next = HybridTime {
            physical: Utc::now().timestamp_millis(),
            counter: 0,
        };
        if next <= *last {
            next = HybridTime {
                physical: last.physical,
                counter: last.counter + 1,
            };
        }
        if let Some(remote) = remote {
            if next <= remote {
                next = HybridTime {
                    physical: remote.physical,
                    counter: remote.counter + 1,
                };
            }
        }

        *last = next;
        next
    }
}

impl Default for HybridClock {
    fn default() -> Self {
        HybridClock::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn strictly_increasing() {
        let clock = HybridClock::new();
        let mut last = clock.local_event();
        for _ in 0..10_000 {
            let next = clock.local_event();
            assert!(next > last);
            last = next;
        }
    }

    #[test]
    fn receive_dominates_remote() {
        let clock = HybridClock::new();
        let local = clock.local_event();
        let remote = HybridTime {
            physical: local.physical + 60_000,
            counter: 7,
        };

        let merged = clock.receive_event(remote);
        assert!(merged > remote);
        assert!(merged > local);

        // the merged timestamp keeps ordering subsequent local events
        assert!(clock.local_event() > merged);
    }

    #[test]
    fn receive_of_old_timestamp_stays_monotonic() {
        let clock = HybridClock::new();
        let before = clock.local_event();
        let stale = HybridTime {
            physical: before.physical - 60_000,
            counter: 0,
        };
        assert!(clock.receive_event(stale) > before);
    }

    #[test]
    fn concurrent_events_are_unique() {
        let clock = Arc::new(HybridClock::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let clock = Arc::clone(&clock);
                thread::spawn(move || (0..1_000).map(|_| clock.local_event()).collect::<Vec<_>>())
            })
            .collect();

        let mut all: Vec<HybridTime> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        let total = all.len();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), total);
    }
}
