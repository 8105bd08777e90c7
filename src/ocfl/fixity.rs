//! Fixity-checked byte channels: thin wrappers around [`DigestReader`]/[`DigestWriter`] that add
//! an explicit, call-once comparison against an expected digest.

use std::io::{self, Read, Write};

use crate::ocfl::digest::{DigestReader, DigestWriter, HexDigest};
use crate::ocfl::error::{OcflError, Result};
use crate::ocfl::DigestAlgorithm;

/// Wraps a `Read` stream, computing its digest as it is consumed, and comparing it against an
/// expected value once the caller explicitly asks.
///
/// `check_fixity()` must be called after the stream has been fully read. Calling it earlier
/// produces an incomplete digest and is a programming error, not a data error -- the digest
/// comparison will (usually) simply not match.
pub struct FixityCheckReadChannel<R: Read> {
    inner: DigestReader<R>,
    algorithm: DigestAlgorithm,
    expected: HexDigest,
}

impl<R: Read> FixityCheckReadChannel<R> {
    pub fn new(algorithm: DigestAlgorithm, expected: HexDigest, reader: R) -> Self {
        Self {
            inner: algorithm.reader(reader),
            algorithm,
            expected,
        }
    }

    /// Compares the digest accumulated so far against the expected digest. Must be called after
    /// the wrapped reader has reached EOF; calling it before that is a logic error in the caller.
    ///
    /// Returns `Err(OcflError::FixityCheck)` on mismatch. Consumes the channel, so the compiler
    /// rejects any attempt to call this twice or to keep reading afterward.
    pub fn check_fixity(self) -> Result<()> {
        let algorithm = self.algorithm;
        let expected = self.expected;
        let actual = self.inner.finalize_hex();

        if actual == expected {
            Ok(())
        } else {
            Err(OcflError::FixityCheck {
                path: String::new(),
                algorithm: algorithm.to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
            })
        }
    }
}

impl<R: Read> Read for FixityCheckReadChannel<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

/// Wraps a `Write` stream, computing its digest as data is written, and comparing it against an
/// expected value once the caller explicitly asks.
///
/// `check_fixity()` must be called after every byte has been written and the stream flushed.
/// Calling it earlier is a programming error.
pub struct FixityCheckWriteChannel<W: Write> {
    inner: DigestWriter<W>,
    algorithm: DigestAlgorithm,
    expected: HexDigest,
}

impl<W: Write> FixityCheckWriteChannel<W> {
    pub fn new(algorithm: DigestAlgorithm, expected: HexDigest, writer: W) -> Self {
        Self {
            inner: algorithm.writer(writer),
            algorithm,
            expected,
        }
    }

    /// Compares the digest accumulated so far against the expected digest. See
    /// [`FixityCheckReadChannel::check_fixity`] for the call-once contract.
    pub fn check_fixity(self) -> Result<()> {
        let algorithm = self.algorithm;
        let expected = self.expected;
        let actual = self.inner.finalize_hex();

        if actual == expected {
            Ok(())
        } else {
            Err(OcflError::FixityCheck {
                path: String::new(),
                algorithm: algorithm.to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
            })
        }
    }
}

impl<W: Write> Write for FixityCheckWriteChannel<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn matching_digest_passes_fixity_check() {
        let input = b"testing\n".to_vec();
        let expected = DigestAlgorithm::Sha256.hash_hex(&mut input.as_slice()).unwrap();

        let mut channel =
            FixityCheckReadChannel::new(DigestAlgorithm::Sha256, expected, input.as_slice());
        let mut out = Vec::new();
        io::copy(&mut channel, &mut out).unwrap();

        assert!(channel.check_fixity().is_ok());
    }

    #[test]
    fn mismatched_digest_fails_fixity_check() {
        let input = b"testing\n".to_vec();
        let wrong = HexDigest::from("0".repeat(64));

        let mut channel =
            FixityCheckReadChannel::new(DigestAlgorithm::Sha256, wrong, input.as_slice());
        let mut out = Vec::new();
        io::copy(&mut channel, &mut out).unwrap();

        match channel.check_fixity() {
            Err(OcflError::FixityCheck { .. }) => {}
            other => panic!("expected FixityCheck error, got {:?}", other),
        }
    }

    #[test]
    fn write_channel_computes_digest_over_written_bytes() {
        let expected = DigestAlgorithm::Md5
            .hash_hex(&mut "testing\n".as_bytes())
            .unwrap();

        let mut channel = FixityCheckWriteChannel::new(DigestAlgorithm::Md5, expected, Vec::new());
        io::copy(&mut "testing\n".as_bytes(), &mut channel).unwrap();

        assert!(channel.check_fixity().is_ok());
    }
}
