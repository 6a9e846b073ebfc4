//! Content fingerprints for duplicate detection.
//!
//! Files are hashed with SHA-256 in fixed-size chunks so memory use does not
//! grow with file size. A file that cannot be read gets
//! [`Fingerprint::Unknown`], which never matches anything, itself included.

use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Read size used when streaming file content.
const CHUNK_SIZE: usize = 4096;

/// Digest of a file's full byte content.
#[derive(Debug, Clone)]
pub enum Fingerprint {
    Digest([u8; 32]),
    /// The content could not be read.
    Unknown,
}

impl Fingerprint {
    /// Returns true when both fingerprints are known and equal.
    ///
    /// Deliberately not `PartialEq`: two unknown fingerprints are not duplicates.
    pub fn matches(&self, other: &Fingerprint) -> bool {
        match (self, other) {
            (Fingerprint::Digest(a), Fingerprint::Digest(b)) => a == b,
            _ => false,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Fingerprint::Digest(_))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fingerprint::Digest(bytes) => f.write_str(&hex::encode(bytes)),
            Fingerprint::Unknown => f.write_str("<unknown>"),
        }
    }
}

/// Hashes the file at `path`, degrading to [`Fingerprint::Unknown`] on any read error.
pub fn hash_file(path: &Path) -> Fingerprint {
    match File::open(path).and_then(hash_reader) {
        Ok(digest) => Fingerprint::Digest(digest),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "could not hash file");
            Fingerprint::Unknown
        }
    }
}

/// Streams `reader` to the end and returns its SHA-256 digest.
pub fn hash_reader<R: Read>(mut reader: R) -> io::Result<[u8; 32]> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; CHUNK_SIZE];
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..read]);
    }
    Ok(hasher.finalize().into())
}
