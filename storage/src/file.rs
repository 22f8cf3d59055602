//! An append-only file-backed [`LogStore`].

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use core::fmt;

use log::warn;
use prost::Message;

use raft::log::{after_last_checkpoint, LogStore};
use raft::message::LogEntry;

/// A [`LogStore`] writing one append-only file per partition.
///
/// Records are length-prefixed protobuf frames. A record supersedes any
/// earlier record with the same id, so a commit is one more appended frame,
/// never a rewrite. Every append is fsynced before the call returns. On
/// open, a partition's file is scanned once to rebuild the resolved
/// id-to-record index; reads are then served from memory.
pub struct FileLogStore {
    dir: PathBuf,
    partitions: Mutex<HashMap<u32, PartitionFile>>,
}

/// An error from the file store.
#[derive(Debug)]
pub enum FileStoreError {
    Io(io::Error),
    Encode(prost::EncodeError),
}

struct PartitionFile {
    file: File,
    index: BTreeMap<u64, LogEntry>,
}

impl FileLogStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    /// Partition files are opened lazily on first access.
    pub fn open(dir: impl Into<PathBuf>) -> Result<FileLogStore, FileStoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(FileLogStore {
            dir,
            partitions: Mutex::new(HashMap::new()),
        })
    }

    /// The file holding a partition's records.
    pub fn partition_path(&self, partition: u32) -> PathBuf {
        self.dir.join(format!("partition-{}.wal", partition))
    }

    fn with_partition<R>(
        &self,
        partition: u32,
        fun: impl FnOnce(&mut PartitionFile) -> Result<R, FileStoreError>,
    ) -> Result<R, FileStoreError> {
        use std::collections::hash_map::Entry;

        let mut partitions = self.lock();
        let opened = match partitions.entry(partition) {
            Entry::Occupied(occupied) => occupied.into_mut(),
            Entry::Vacant(vacant) => {
                vacant.insert(PartitionFile::open(&self.partition_path(partition))?)
            }
        };
        fun(opened)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u32, PartitionFile>> {
        self.partitions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PartitionFile {
    fn open(path: &Path) -> Result<PartitionFile, FileStoreError> {
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)?;

        let mut raw = Vec::new();
        file.read_to_end(&mut raw)?;

        let mut index = BTreeMap::new();
        let mut offset = 0usize;
        while raw.len() - offset >= 4 {
            let mut len = [0u8; 4];
            len.copy_from_slice(&raw[offset..offset + 4]);
            let len = u32::from_be_bytes(len) as usize;
            let start = offset + 4;
            if raw.len() - start < len {
                break;
            }
            match LogEntry::decode(&raw[start..start + len]) {
                Ok(entry) => {
                    index.insert(entry.id, entry);
                }
                Err(err) => {
                    warn!(
                        "dropping unreadable record at offset {} in {}: {}",
                        offset,
                        path.display(),
                        err
                    );
                    break;
                }
            }
            offset = start + len;
        }
        if offset < raw.len() {
            // a torn tail from an interrupted append; everything before it
            // is intact
            warn!(
                "ignoring {} trailing bytes in {}",
                raw.len() - offset,
                path.display()
            );
        }

        Ok(PartitionFile { file, index })
    }

    fn append(&mut self, entry: &LogEntry) -> Result<(), FileStoreError> {
        let mut frame = Vec::with_capacity(4 + entry.encoded_len());
        frame.extend_from_slice(&(entry.encoded_len() as u32).to_be_bytes());
        entry.encode(&mut frame)?;
        self.file.write_all(&frame)?;
        self.file.sync_data()?;
        self.index.insert(entry.id, entry.clone());
        Ok(())
    }
}

impl LogStore for FileLogStore {
    type Error = FileStoreError;

    fn propose(&self, partition: u32, log: &LogEntry) -> Result<(), Self::Error> {
        self.with_partition(partition, |opened| opened.append(log))
    }

    fn commit(&self, partition: u32, log: &LogEntry) -> Result<(), Self::Error> {
        self.with_partition(partition, |opened| opened.append(log))
    }

    fn read_logs(&self, partition: u32) -> Result<Vec<LogEntry>, Self::Error> {
        self.with_partition(partition, |opened| {
            let entries: Vec<LogEntry> = opened.index.values().cloned().collect();
            Ok(after_last_checkpoint(&entries).cloned().collect())
        })
    }

    fn read_logs_range(&self, partition: u32, start_id: u64) -> Result<Vec<LogEntry>, Self::Error> {
        self.with_partition(partition, |opened| {
            Ok(opened
                .index
                .range(start_id..)
                .map(|(_, entry)| entry.clone())
                .collect())
        })
    }

    fn get_max_log(&self, partition: u32) -> Result<u64, Self::Error> {
        self.with_partition(partition, |opened| {
            Ok(opened.index.keys().next_back().copied().unwrap_or(0))
        })
    }

    fn get_current_term(&self, partition: u32) -> Result<u64, Self::Error> {
        self.with_partition(partition, |opened| {
            Ok(opened
                .index
                .values()
                .map(|entry| entry.term)
                .max()
                .unwrap_or(0))
        })
    }

    fn exists(&self, partition: u32, id: u64) -> Result<bool, Self::Error> {
        self.with_partition(partition, |opened| Ok(opened.index.contains_key(&id)))
    }
}

//
// FileStoreError impls
//

impl fmt::Display for FileStoreError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStoreError::Io(err) => write!(fmt, "log file i/o failed: {}", err),
            FileStoreError::Encode(err) => write!(fmt, "log record encoding failed: {}", err),
        }
    }
}

impl std::error::Error for FileStoreError {}

impl From<io::Error> for FileStoreError {
    fn from(err: io::Error) -> Self {
        FileStoreError::Io(err)
    }
}

impl From<prost::EncodeError> for FileStoreError {
    fn from(err: prost::EncodeError) -> Self {
        FileStoreError::Encode(err)
    }
}
