//! Content-hash index of the destination directory.
//!
//! The index is seeded once from the files already on disk and then grows as
//! new images are written. A hash is a member only while a file with those
//! bytes exists (or is being written under a live [`HashReservation`]).
//!
//! # Concurrency
//!
//! [`HashIndex::reserve`] performs the membership test and the insertion as a
//! single critical section, so two concurrent fetches of identical bytes can
//! never both pass the duplicate check. [`HashIndex::reserve_when_settled`]
//! additionally waits out another fetch's pending write, so the loser only
//! reports a duplicate once the winner's file is actually on disk.

use std::fmt;
use std::path::Path;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use tokio::sync::Notify;
use tracing::{debug, info, instrument};

use super::error::SetupError;

/// SHA-256 digest over a file's full byte content.
///
/// Used for equality only, never as an integrity guarantee.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Hashes a byte slice.
    #[must_use]
    pub fn of(bytes: &[u8]) -> Self {
        Self(Sha256::digest(bytes).into())
    }

    /// Lowercase hex representation.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryState {
    /// A fetch holds a reservation and is writing the file.
    Pending,
    /// A file with this content exists in the directory.
    Stored,
}

/// Set of content hashes present in the destination directory.
///
/// Designed to be wrapped in `Arc` and shared by every fetch of a batch.
#[derive(Debug, Default)]
pub struct HashIndex {
    entries: DashMap<ContentHash, EntryState>,
    /// Woken whenever a pending reservation is committed or released.
    settled: Notify,
}

impl HashIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index from every regular file in `dir`.
    ///
    /// Entries that cannot be read are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::ScanDir`] if the directory itself cannot be listed.
    #[instrument(fields(dir = %dir.display()))]
    pub async fn load(dir: &Path) -> Result<Self, SetupError> {
        let scan_error = |source| SetupError::ScanDir {
            path: dir.to_path_buf(),
            source,
        };
        let index = Self::new();
        let mut entries = tokio::fs::read_dir(dir).await.map_err(scan_error)?;

        while let Some(entry) = entries.next_entry().await.map_err(scan_error)? {
            let path = entry.path();
            let is_file = tokio::fs::metadata(&path)
                .await
                .is_ok_and(|meta| meta.is_file());
            if !is_file {
                continue;
            }
            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(error) => {
                    debug!(path = %path.display(), %error, "skipping unreadable file");
                    continue;
                }
            };
            match tokio::task::spawn_blocking(move || ContentHash::of(&bytes)).await {
                Ok(hash) => {
                    index.insert(hash);
                }
                Err(error) => {
                    debug!(path = %path.display(), %error, "skipping file, hashing task failed");
                }
            }
        }

        info!(hashes = index.len(), "indexed existing files");
        Ok(index)
    }

    /// Returns true if the hash is stored or currently reserved.
    #[must_use]
    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.entries.contains_key(hash)
    }

    /// Records a stored hash. Returns true if it was not already stored.
    pub fn insert(&self, hash: ContentHash) -> bool {
        self.entries.insert(hash, EntryState::Stored) != Some(EntryState::Stored)
    }

    /// Atomically checks for the hash and reserves it if absent.
    ///
    /// Returns `None` when the hash is already stored or reserved by another
    /// fetch. The reservation is released on drop unless committed.
    #[must_use]
    pub fn reserve(&self, hash: ContentHash) -> Option<HashReservation<'_>> {
        match self.entries.entry(hash) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(EntryState::Pending);
                Some(HashReservation {
                    index: self,
                    hash,
                    committed: false,
                })
            }
        }
    }

    /// Like [`reserve`](Self::reserve), but waits while another fetch holds a
    /// pending reservation on the same hash.
    ///
    /// Returns `None` only once the hash is stored. If the pending write is
    /// released instead, the caller gets the reservation and writes the file.
    pub async fn reserve_when_settled(&self, hash: ContentHash) -> Option<HashReservation<'_>> {
        loop {
            let settled = self.settled.notified();
            tokio::pin!(settled);
            settled.as_mut().enable();

            let stored = match self.entries.entry(hash) {
                Entry::Vacant(slot) => {
                    slot.insert(EntryState::Pending);
                    return Some(HashReservation {
                        index: self,
                        hash,
                        committed: false,
                    });
                }
                Entry::Occupied(entry) => *entry.get() == EntryState::Stored,
            };
            if stored {
                return None;
            }

            debug!(hash = %hash, "waiting for pending write of identical content");
            settled.await;
        }
    }

    /// Number of hashes with a stored file.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| *entry.value() == EntryState::Stored)
            .count()
    }

    /// Returns true if no stored hashes are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pending claim on a content hash, held while its file is written.
#[derive(Debug)]
pub struct HashReservation<'a> {
    index: &'a HashIndex,
    hash: ContentHash,
    committed: bool,
}

impl HashReservation<'_> {
    /// The reserved hash.
    #[must_use]
    pub fn hash(&self) -> ContentHash {
        self.hash
    }

    /// Marks the hash as stored once its file is on disk.
    pub fn commit(mut self) {
        self.index.entries.insert(self.hash, EntryState::Stored);
        self.committed = true;
        self.index.settled.notify_waiters();
    }
}

impl Drop for HashReservation<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.index
                .entries
                .remove_if(&self.hash, |_, state| *state == EntryState::Pending);
            self.index.settled.notify_waiters();
        }
    }
}
