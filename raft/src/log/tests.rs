//! Conformance tests shared by every [`LogStore`] implementation.

use crate::message::{HybridTime, LogEntry, RaftLogType};

use super::LogStore;

/// Defines the conformance test functions for a type implementing
/// [`LogStore`].
#[macro_export]
macro_rules! log_store_tests {
    ($ty:ty, $new:expr) => {
        $crate::log_store_test! { $ty, $new, test_store_empty }
        $crate::log_store_test! { $ty, $new, test_store_propose_then_read }
        $crate::log_store_test! { $ty, $new, test_store_commit_supersedes }
        $crate::log_store_test! { $ty, $new, test_store_partitions_are_independent }
        $crate::log_store_test! { $ty, $new, test_store_range }
        $crate::log_store_test! { $ty, $new, test_store_resumes_after_checkpoint }
    };
}

/// Defines a given conformance test function for a type implementing
/// [`LogStore`].
#[macro_export]
macro_rules! log_store_test {
    ($ty:ty, $new:expr, $test:ident) => {
        #[test]
        fn $test() {
            let store: $ty = $new;
            $crate::log::tests::$test(&store);
        }
    };
}

pub fn test_store_empty<S: LogStore>(store: &S) {
    assert_eq!(unwrap(store.get_max_log(0)), 0);
    assert_eq!(unwrap(store.get_current_term(0)), 0);
    assert_eq!(unwrap(store.exists(0, 1)), false);
    assert!(unwrap(store.read_logs(0)).is_empty());
    assert!(unwrap(store.read_logs_range(0, 0)).is_empty());
}

pub fn test_store_propose_then_read<S: LogStore>(store: &S) {
    for log in proposed_entries() {
        unwrap(store.propose(0, &log));
    }

    assert_eq!(unwrap(store.get_max_log(0)), 3);
    assert_eq!(unwrap(store.get_current_term(0)), 2);
    assert!(unwrap(store.exists(0, 1)));
    assert!(unwrap(store.exists(0, 3)));
    assert!(!unwrap(store.exists(0, 4)));

    let read = unwrap(store.read_logs(0));
    assert_eq!(ids(&read), vec![1, 2, 3]);
    assert!(read.iter().all(|log| log.entry_type() == RaftLogType::Proposed));
}

pub fn test_store_commit_supersedes<S: LogStore>(store: &S) {
    for log in proposed_entries() {
        unwrap(store.propose(0, &log));
    }
    let mut committed = proposed_entries().swap_remove(1);
    committed.set_entry_type(RaftLogType::Committed);
    unwrap(store.commit(0, &committed));

    // the committed record wins; ids and max are unchanged
    let read = unwrap(store.read_logs(0));
    assert_eq!(ids(&read), vec![1, 2, 3]);
    assert_eq!(read[1].entry_type(), RaftLogType::Committed);
    assert_eq!(read[1].data, committed.data);
    assert_eq!(unwrap(store.get_max_log(0)), 3);
}

pub fn test_store_partitions_are_independent<S: LogStore>(store: &S) {
    unwrap(store.propose(0, &entry(1, 1, RaftLogType::Proposed)));
    unwrap(store.propose(7, &entry(1, 9, RaftLogType::Proposed)));

    assert_eq!(unwrap(store.get_max_log(0)), 1);
    assert_eq!(unwrap(store.get_current_term(0)), 1);
    assert_eq!(unwrap(store.get_current_term(7)), 9);
    assert!(!unwrap(store.exists(3, 1)));
}

pub fn test_store_range<S: LogStore>(store: &S) {
    for log in proposed_entries() {
        unwrap(store.propose(0, &log));
    }

    assert_eq!(ids(&unwrap(store.read_logs_range(0, 0))), vec![1, 2, 3]);
    assert_eq!(ids(&unwrap(store.read_logs_range(0, 2))), vec![2, 3]);
    assert!(unwrap(store.read_logs_range(0, 4)).is_empty());
}

pub fn test_store_resumes_after_checkpoint<S: LogStore>(store: &S) {
    unwrap(store.commit(0, &entry(1, 1, RaftLogType::Committed)));
    unwrap(store.commit(0, &entry(2, 1, RaftLogType::CommittedCheckpoint)));
    unwrap(store.commit(0, &entry(3, 2, RaftLogType::Committed)));
    unwrap(store.propose(0, &entry(4, 2, RaftLogType::Proposed)));

    // replay starts past the checkpoint, full range still sees everything
    assert_eq!(ids(&unwrap(store.read_logs(0))), vec![3, 4]);
    assert_eq!(ids(&unwrap(store.read_logs_range(0, 1))), vec![1, 2, 3, 4]);
    assert_eq!(unwrap(store.get_max_log(0)), 4);
}

//
// internal
//

fn unwrap<T, E: core::fmt::Display>(result: Result<T, E>) -> T {
    result.unwrap_or_else(|err| panic!("log store operation failed: {}", err))
}

fn ids(entries: &[LogEntry]) -> Vec<u64> {
    entries.iter().map(|log| log.id).collect()
}

fn entry(id: u64, term: u64, entry_type: RaftLogType) -> LogEntry {
    LogEntry {
        id,
        term,
        entry_type: entry_type as i32,
        log_type: String::from("test"),
        data: vec![id as u8; id as usize],
        time: HybridTime {
            physical: 1_000 + id as i64,
            counter: 0,
        },
    }
}

fn proposed_entries() -> Vec<LogEntry> {
    vec![
        entry(1, 1, RaftLogType::Proposed),
        entry(2, 1, RaftLogType::Proposed),
        entry(3, 2, RaftLogType::Proposed),
    ]
}
