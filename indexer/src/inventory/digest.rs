//! Content digests
//!
//! MD5 is used for change detection only. It matches what plugin hosts
//! compare against and is not an integrity guarantee.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// 128-bit content digest
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; 16]);

impl Digest {
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Digest of an in-memory buffer
    pub fn of(data: &[u8]) -> Self {
        Self(md5::compute(data).0)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self)
    }
}

/// Stream `path` through MD5 in `chunk_size` reads
///
/// Returns the digest and the number of bytes hashed.
pub fn digest_file(path: &Path, chunk_size: usize) -> io::Result<(Digest, u64)> {
    let mut file = File::open(path)?;
    let mut buffer = vec![0u8; chunk_size.max(1)];
    let mut context = md5::Context::new();
    let mut size = 0u64;

    loop {
        let read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        context.consume(&buffer[..read]);
        size += read as u64;
    }

    Ok((Digest(context.compute().0), size))
}
