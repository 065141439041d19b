//! BLAKE3 content fingerprints.
//!
//! # Overview
//!
//! A [`Fingerprint`] is a digest plus the scope it covers:
//!
//! - Files smaller than the large-file threshold (1 MiB) are hashed in full,
//!   giving [`FingerprintScope::Full`].
//! - Files at or above the threshold are hashed over a fixed leading window
//!   (8 KiB), giving [`FingerprintScope::PartialPrefix`]. Files that share a
//!   size and a prefix but differ later are NOT told apart. The grouper marks
//!   such groups as `Potential` so callers can see the difference.
//!
//! The scope is chosen from the size recorded at scan time, so every member of
//! a size bucket gets the same scope.
//!
//! # Example
//!
//! ```no_run
//! use dupmerge::scanner::{FileEntry, FingerprintScope, Hasher};
//! use std::path::Path;
//!
//! let hasher = Hasher::new();
//! let entry = FileEntry::from_path(Path::new("photo.jpg")).unwrap();
//! let fp = hasher.fingerprint(&entry).unwrap();
//! if fp.scope == FingerprintScope::PartialPrefix {
//!     println!("only the first bytes were compared");
//! }
//! ```

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{FileEntry, FingerprintError};

/// A BLAKE3 digest.
pub type Hash = [u8; 32];

/// Files at or above this size get a prefix fingerprint.
pub const LARGE_FILE_THRESHOLD: u64 = 1024 * 1024;

/// Length of the leading window hashed for large files.
pub const PREFIX_BYTES: u64 = 8 * 1024;

const BUFFER_SIZE: usize = 64 * 1024;

/// How much of the file a digest covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerprintScope {
    /// The entire content.
    Full,
    /// Only a bounded leading window.
    PartialPrefix,
}

/// Digest of a file's content together with its scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    /// BLAKE3 digest
    #[serde(with = "hex_digest")]
    pub digest: Hash,
    /// Portion of the file the digest covers
    pub scope: FingerprintScope,
}

impl Fingerprint {
    /// Create a fingerprint.
    #[must_use]
    pub fn new(digest: Hash, scope: FingerprintScope) -> Self {
        Self { digest, scope }
    }

    /// Digest as lowercase hex.
    #[must_use]
    pub fn hex(&self) -> String {
        hash_to_hex(&self.digest)
    }
}

/// Streaming BLAKE3 hasher with a large-file prefix policy.
#[derive(Debug, Clone, Copy)]
pub struct Hasher {
    large_file_threshold: u64,
    prefix_bytes: u64,
}

impl Default for Hasher {
    fn default() -> Self {
        Self {
            large_file_threshold: LARGE_FILE_THRESHOLD,
            prefix_bytes: PREFIX_BYTES,
        }
    }
}

impl Hasher {
    /// Create a hasher with the default 1 MiB / 8 KiB policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the size at which prefix fingerprints take over.
    #[must_use]
    pub fn with_large_file_threshold(mut self, threshold: u64) -> Self {
        self.large_file_threshold = threshold;
        self
    }

    /// Set the prefix window length (at least 1 byte).
    #[must_use]
    pub fn with_prefix_bytes(mut self, bytes: u64) -> Self {
        self.prefix_bytes = bytes.max(1);
        self
    }

    /// Size at which prefix fingerprints take over.
    #[must_use]
    pub fn large_file_threshold(&self) -> u64 {
        self.large_file_threshold
    }

    /// Prefix window length.
    #[must_use]
    pub fn prefix_bytes(&self) -> u64 {
        self.prefix_bytes
    }

    /// Scope used for a file of the given size.
    #[must_use]
    pub fn scope_for(&self, size: u64) -> FingerprintScope {
        if size < self.large_file_threshold {
            FingerprintScope::Full
        } else {
            FingerprintScope::PartialPrefix
        }
    }

    /// Fingerprint a scanned file.
    ///
    /// # Errors
    ///
    /// Returns [`FingerprintError`] if the file cannot be opened or read.
    pub fn fingerprint(&self, entry: &FileEntry) -> Result<Fingerprint, FingerprintError> {
        let scope = self.scope_for(entry.size);
        let digest = match scope {
            FingerprintScope::Full => self.full_hash(&entry.path)?,
            FingerprintScope::PartialPrefix => self.prefix_hash(&entry.path)?,
        };
        log::trace!(
            "Fingerprinted {} ({:?}): {}",
            entry.path.display(),
            scope,
            hash_to_hex(&digest)
        );
        Ok(Fingerprint::new(digest, scope))
    }

    /// Hash the entire file content.
    ///
    /// # Errors
    ///
    /// Returns [`FingerprintError`] if the file cannot be opened or read.
    pub fn full_hash(&self, path: &Path) -> Result<Hash, FingerprintError> {
        let file = File::open(path).map_err(|e| FingerprintError::from_io(path, e))?;
        hash_reader(BufReader::with_capacity(BUFFER_SIZE, file), path)
    }

    /// Hash the leading window of the file.
    ///
    /// # Errors
    ///
    /// Returns [`FingerprintError`] if the file cannot be opened or read.
    pub fn prefix_hash(&self, path: &Path) -> Result<Hash, FingerprintError> {
        let file = File::open(path).map_err(|e| FingerprintError::from_io(path, e))?;
        hash_reader(file.take(self.prefix_bytes), path)
    }
}

fn hash_reader<R: Read>(mut reader: R, path: &Path) -> Result<Hash, FingerprintError> {
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];
    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(FingerprintError::from_io(path, e)),
        };
        hasher.update(&buffer[..n]);
    }
    Ok(*hasher.finalize().as_bytes())
}

/// Convert a digest to lowercase hex.
#[must_use]
pub fn hash_to_hex(hash: &Hash) -> String {
    blake3::Hash::from(*hash).to_hex().to_string()
}

/// Parse a 64-character hex digest.
#[must_use]
pub fn hex_to_hash(hex: &str) -> Option<Hash> {
    blake3::Hash::from_hex(hex).ok().map(|h| *h.as_bytes())
}

mod hex_digest {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{hash_to_hex, hex_to_hash, Hash};

    pub fn serialize<S: Serializer>(hash: &Hash, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hash_to_hex(hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Hash, D::Error> {
        let hex = String::deserialize(deserializer)?;
        hex_to_hash(&hex).ok_or_else(|| serde::de::Error::custom("invalid BLAKE3 hex digest"))
    }
}
