//! The write-ahead log worker: single owner of a partition's durable indices.
//!
//! One worker runs per partition. It owns `propose_index` (the next id to
//! assign) and `commit_index` (the next id to commit) and serializes every
//! read and write against the shared [`LogStore`], so the indices never need
//! a lock. The state machine talks to it through [`WalHandle`], whose calls
//! block on a reply channel.

use std::sync::Arc;
use std::thread;

use core::fmt;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use log::{debug, info};

use crate::events::ReplicationEvents;
use crate::log::LogStore;
use crate::message::{HybridTime, LogEntry, RaftLogType};

/// A request processed by the WAL worker.
pub enum WalMessage {
    /// Replays the durable log once per worker lifetime and returns the
    /// recovered commit index.
    Recover {
        reply: Sender<Result<u64, WalError>>,
    },
    /// Returns the highest id persisted for the partition.
    MaxLog {
        reply: Sender<Result<u64, WalError>>,
    },
    /// Returns the highest term persisted for the partition.
    CurrentTerm {
        reply: Sender<Result<u64, WalError>>,
    },
    /// Leader path: assigns ids to the batch and appends it durably.
    Propose {
        term: u64,
        time: HybridTime,
        logs: Vec<LogEntry>,
        reply: Sender<Result<Vec<LogEntry>, WalError>>,
    },
    /// Leader path: flips the batch to its committed form durably.
    Commit {
        term: u64,
        time: HybridTime,
        logs: Vec<LogEntry>,
        reply: Sender<Result<(u64, Vec<LogEntry>), WalError>>,
    },
    /// Follower path: applies whichever entries of the batch arrive exactly
    /// in sequence.
    ProposeOrCommit {
        term: u64,
        time: HybridTime,
        logs: Vec<LogEntry>,
        reply: Sender<Result<i64, WalError>>,
    },
    /// Returns the resolved entries with ids at or past `from_id`.
    Range {
        from_id: u64,
        reply: Sender<Result<Vec<LogEntry>, WalError>>,
    },
}

/// An error from the WAL worker.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum WalError {
    /// The backing log store failed.
    Store(String),
    /// The worker thread is gone and can no longer answer.
    WorkerGone,
}

/// The state machine's handle to a partition's WAL worker.
#[derive(Clone)]
pub struct WalHandle {
    sender: Sender<WalMessage>,
}

/// Spawns the WAL worker for a partition and returns its handle.
pub fn spawn<S: LogStore>(
    partition: u32,
    store: Arc<S>,
    events: Arc<dyn ReplicationEvents>,
) -> WalHandle {
    let (sender, receiver) = unbounded();
    let _ = thread::spawn(move || {
        WalWorker {
            partition,
            store,
            events,
            propose_index: 0,
            commit_index: 0,
            recovered: false,
        }
        .run(receiver)
    });
    WalHandle { sender }
}

//
// WalHandle impls
//

impl WalHandle {
    pub fn recover(&self) -> Result<u64, WalError> {
        self.ask(|reply| WalMessage::Recover { reply })
    }

    pub fn max_log(&self) -> Result<u64, WalError> {
        self.ask(|reply| WalMessage::MaxLog { reply })
    }

    pub fn current_term(&self) -> Result<u64, WalError> {
        self.ask(|reply| WalMessage::CurrentTerm { reply })
    }

    pub fn propose(
        &self,
        term: u64,
        time: HybridTime,
        logs: Vec<LogEntry>,
    ) -> Result<Vec<LogEntry>, WalError> {
        self.ask(|reply| WalMessage::Propose {
            term,
            time,
            logs,
            reply,
        })
    }

    pub fn commit(
        &self,
        term: u64,
        time: HybridTime,
        logs: Vec<LogEntry>,
    ) -> Result<(u64, Vec<LogEntry>), WalError> {
        self.ask(|reply| WalMessage::Commit {
            term,
            time,
            logs,
            reply,
        })
    }

    pub fn propose_or_commit(
        &self,
        term: u64,
        time: HybridTime,
        logs: Vec<LogEntry>,
    ) -> Result<i64, WalError> {
        self.ask(|reply| WalMessage::ProposeOrCommit {
            term,
            time,
            logs,
            reply,
        })
    }

    pub fn range(&self, from_id: u64) -> Result<Vec<LogEntry>, WalError> {
        self.ask(|reply| WalMessage::Range { from_id, reply })
    }

    fn ask<R>(
        &self,
        message: impl FnOnce(Sender<Result<R, WalError>>) -> WalMessage,
    ) -> Result<R, WalError> {
        let (reply, response) = bounded(1);
        self.sender
            .send(message(reply))
            .map_err(|_| WalError::WorkerGone)?;
        response.recv().map_err(|_| WalError::WorkerGone)?
    }
}

//
// WalWorker
//

struct WalWorker<S> {
    partition: u32,
    store: Arc<S>,
    events: Arc<dyn ReplicationEvents>,
    /// Next id to assign on proposal.
    propose_index: u64,
    /// Next id to commit.
    commit_index: u64,
    recovered: bool,
}

impl<S: LogStore> WalWorker<S> {
    fn run(mut self, receiver: Receiver<WalMessage>) {
        for message in receiver {
            match message {
                WalMessage::Recover { reply } => {
                    let _ = reply.send(self.recover());
                }
                WalMessage::MaxLog { reply } => {
                    let _ = reply.send(self.store.get_max_log(self.partition).map_err(store_err));
                }
                WalMessage::CurrentTerm { reply } => {
                    let _ = reply.send(
                        self.store
                            .get_current_term(self.partition)
                            .map_err(store_err),
                    );
                }
                WalMessage::Propose {
                    term,
                    time,
                    logs,
                    reply,
                } => {
                    let _ = reply.send(self.propose(term, time, logs));
                }
                WalMessage::Commit { logs, reply, .. } => {
                    let _ = reply.send(self.commit(logs));
                }
                WalMessage::ProposeOrCommit { logs, reply, .. } => {
                    let _ = reply.send(self.propose_or_commit(logs));
                }
                WalMessage::Range { from_id, reply } => {
                    let _ = reply.send(
                        self.store
                            .read_logs_range(self.partition, from_id)
                            .map_err(store_err),
                    );
                }
            }
        }
    }

    /// Replays committed entries into the embedder and rebuilds the indices.
    /// Runs at most once; later calls return the already-recovered index.
    fn recover(&mut self) -> Result<u64, WalError> {
        if self.recovered {
            return Ok(self.commit_index);
        }

        let mut commit_index = 0;
        for log in self.store.read_logs(self.partition).map_err(store_err)? {
            match log.entry_type() {
                RaftLogType::Committed | RaftLogType::CommittedCheckpoint => {
                    commit_index = log.id + 1;
                    if !self.events.replication_restored(&log.log_type, &log.data) {
                        self.events.replication_error(&log);
                    }
                }
                RaftLogType::Proposed | RaftLogType::ProposedCheckpoint => {
                    debug!(
                        "partition {} skipping uncommitted log {} during recovery",
                        self.partition, log.id
                    );
                }
            }
        }
        if commit_index == 0 {
            commit_index = self.store.get_max_log(self.partition).map_err(store_err)? + 1;
        }

        self.commit_index = commit_index;
        self.propose_index = commit_index;
        self.recovered = true;
        info!(
            "partition {} recovered with commit index {}",
            self.partition, commit_index
        );
        Ok(commit_index)
    }

    /// Assigns consecutive ids starting at `propose_index` and appends every
    /// entry durably. Checkpoint entries keep their checkpoint form.
    fn propose(
        &mut self,
        term: u64,
        time: HybridTime,
        mut logs: Vec<LogEntry>,
    ) -> Result<Vec<LogEntry>, WalError> {
        for log in &mut logs {
            log.id = self.propose_index;
            log.term = term;
            log.time = time;
            if log.entry_type().is_checkpoint() {
                log.set_entry_type(RaftLogType::ProposedCheckpoint);
            } else {
                log.set_entry_type(RaftLogType::Proposed);
            }
            self.store.propose(self.partition, log).map_err(store_err)?;
            self.propose_index += 1;
        }
        Ok(logs)
    }

    /// Writes the committed record for every entry of an already-proposed
    /// batch and advances `commit_index` past it.
    fn commit(&mut self, mut logs: Vec<LogEntry>) -> Result<(u64, Vec<LogEntry>), WalError> {
        for log in &mut logs {
            log.set_entry_type(log.entry_type().committed_form());
            self.store.commit(self.partition, log).map_err(store_err)?;
            self.commit_index = log.id + 1;
            if self.propose_index < self.commit_index {
                self.propose_index = self.commit_index;
            }
        }
        Ok((self.commit_index, logs))
    }

    /// Follower apply: validates the batch against the strict id sequence,
    /// then applies the acceptable entries. Returns -1 when the whole batch
    /// is out of sequence.
    fn propose_or_commit(&mut self, mut logs: Vec<LogEntry>) -> Result<i64, WalError> {
        logs.sort_by_key(|log| log.id);

        let mut next_propose = self.propose_index;
        let mut next_commit = self.commit_index;
        let mut accepted = Vec::with_capacity(logs.len());
        for log in logs {
            match log.entry_type() {
                RaftLogType::Proposed | RaftLogType::ProposedCheckpoint
                    if log.id == next_propose =>
                {
                    next_propose += 1;
                    accepted.push(log);
                }
                RaftLogType::Committed | RaftLogType::CommittedCheckpoint
                    if log.id == next_commit =>
                {
                    next_commit += 1;
                    if next_propose < next_commit {
                        next_propose = next_commit;
                    }
                    accepted.push(log);
                }
                _ => {
                    debug!(
                        "partition {} skipping out-of-sequence log {}",
                        self.partition, log
                    );
                }
            }
        }
        if accepted.is_empty() {
            return Ok(-1);
        }

        for log in accepted {
            match log.entry_type() {
                RaftLogType::Proposed | RaftLogType::ProposedCheckpoint => {
                    self.store.propose(self.partition, &log).map_err(store_err)?;
                    self.propose_index = log.id + 1;
                }
                RaftLogType::Committed | RaftLogType::CommittedCheckpoint => {
                    self.store.commit(self.partition, &log).map_err(store_err)?;
                    self.commit_index = log.id + 1;
                    if self.propose_index < self.commit_index {
                        self.propose_index = self.commit_index;
                    }
                    if !self.events.replication_received(&log.log_type, &log.data) {
                        self.events.replication_error(&log);
                    }
                }
            }
        }
        Ok(self.commit_index as i64)
    }
}

//
// WalError impls
//

impl fmt::Display for WalError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalError::Store(reason) => write!(fmt, "log store failed: {}", reason),
            WalError::WorkerGone => write!(fmt, "wal worker is gone"),
        }
    }
}

fn store_err<E: fmt::Display>(err: E) -> WalError {
    WalError::Store(err.to_string())
}
