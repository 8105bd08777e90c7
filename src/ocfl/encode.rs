//! Path and filename constraints, plus the encoders and policy-driven mapper used to turn a
//! logical path into a content path that is safe to write to a given storage backend.

use std::borrow::Cow;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::ocfl::error::{OcflError, Result};

/// A rule a logical path, as a whole, must satisfy.
pub trait PathConstraint: Send + Sync {
    /// Returns `Err` describing the violation if `path` does not satisfy this constraint.
    fn check(&self, path: &str) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// A rule a single filename (path segment) must satisfy.
pub trait FileNameConstraint: Send + Sync {
    /// Returns `Err` describing the violation if `name` does not satisfy this constraint.
    fn check(&self, name: &str) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// Rejects `.` and `..` segments, empty segments, and empty paths.
pub struct NonEmptySegmentsConstraint;

impl PathConstraint for NonEmptySegmentsConstraint {
    fn check(&self, path: &str) -> Result<()> {
        if path.is_empty() {
            return Err(OcflError::PathConstraint("path must not be empty".to_string()));
        }
        for part in path.split('/') {
            if part.is_empty() || part == "." || part == ".." {
                return Err(OcflError::PathConstraint(format!(
                    "path segments may not be '.', '..', or empty; found in {}",
                    path
                )));
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "non-empty-segments"
    }
}

/// Rejects leading and trailing `/`.
pub struct NoLeadingTrailingSlashConstraint;

impl PathConstraint for NoLeadingTrailingSlashConstraint {
    fn check(&self, path: &str) -> Result<()> {
        if path.starts_with('/') || path.ends_with('/') {
            return Err(OcflError::PathConstraint(format!(
                "path may not start or end with '/': {}",
                path
            )));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "no-leading-trailing-slash"
    }
}

/// Rejects names reserved by Windows (`CON`, `NUL`, `COM1`, ...), regardless of extension.
///
/// This is kept separate from character-level escaping: a reserved device name is unsafe on a
/// real Windows filesystem even if it contains no character an encoder would otherwise need to
/// escape, so no `Encoder` can make it safe by transforming it -- it has to be rejected outright.
pub struct ReservedNameConstraint;

const WINDOWS_RESERVED: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

impl FileNameConstraint for ReservedNameConstraint {
    fn check(&self, name: &str) -> Result<()> {
        let stem = name.split('.').next().unwrap_or(name);
        if WINDOWS_RESERVED.iter().any(|r| r.eq_ignore_ascii_case(stem)) {
            return Err(OcflError::PathConstraint(format!(
                "filename is reserved on Windows: {}",
                name
            )));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "reserved-name"
    }
}

/// An ordered chain of path and filename constraints, applied to a single candidate logical
/// path.
#[derive(Default)]
pub struct PathConstraintProcessor {
    path_constraints: Vec<Box<dyn PathConstraint>>,
    name_constraints: Vec<Box<dyn FileNameConstraint>>,
}

impl PathConstraintProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path_constraint(mut self, constraint: impl PathConstraint + 'static) -> Self {
        self.path_constraints.push(Box::new(constraint));
        self
    }

    pub fn with_name_constraint(mut self, constraint: impl FileNameConstraint + 'static) -> Self {
        self.name_constraints.push(Box::new(constraint));
        self
    }

    /// Applies every configured constraint to `path`, returning the first violation found.
    pub fn apply(&self, path: &str) -> Result<()> {
        for constraint in &self.path_constraints {
            constraint.check(path)?;
        }

        for part in path.split('/') {
            for constraint in &self.name_constraints {
                constraint.check(part)?;
            }
        }

        Ok(())
    }
}

/// Named bundles of constraints and, via [`Encoder::encode`], escape-set selectors matching
/// common deployment targets.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ConstraintPolicy {
    /// No additional constraints beyond what OCFL itself requires.
    All,
    /// Safe to host on a case-sensitive Linux filesystem.
    Linux,
    /// Safe to host on Windows (reserved names, illegal characters).
    Windows,
    /// Safe to host on common cloud object stores.
    Cloud,
    /// Escapes every non-ASCII-alphanumeric byte, including `.` and `/`: the intersection of
    /// Windows, Linux, and Cloud, and then some.
    Conservative,
}

impl ConstraintPolicy {
    /// Structural validation for this policy. These checks are independent of whichever
    /// [`Encoder`] a [`LogicalPathMapper`] pairs the policy with: a `.`/`..` segment is never a
    /// valid logical path no matter how the content path ends up encoded, and a reserved Windows
    /// device name stays unsafe even after encoding, since encoding a name that contains no
    /// special characters is a no-op.
    pub fn processor(&self) -> PathConstraintProcessor {
        let base = PathConstraintProcessor::new()
            .with_path_constraint(NonEmptySegmentsConstraint)
            .with_path_constraint(NoLeadingTrailingSlashConstraint);

        match self {
            ConstraintPolicy::All | ConstraintPolicy::Linux | ConstraintPolicy::Cloud => base,
            ConstraintPolicy::Windows | ConstraintPolicy::Conservative => {
                base.with_name_constraint(ReservedNameConstraint)
            }
        }
    }

    /// Returns `true` if `ch` must be percent-encoded under this policy.
    ///
    /// `%` and ASCII control characters are always escaped, since `%` is the escape character
    /// itself and control characters are unsafe to leave bare everywhere. Beyond that, every
    /// policy but `Conservative` leaves `/` alone, since it is the logical-path separator, not
    /// part of any one segment's content.
    fn escapes(&self, ch: char) -> bool {
        if *self == ConstraintPolicy::Conservative {
            return !ch.is_ascii_alphanumeric();
        }

        if ch.is_ascii_control() || ch == ' ' || ch == '%' {
            return true;
        }

        match self {
            ConstraintPolicy::Windows => {
                matches!(ch, '<' | '>' | ':' | '"' | '|' | '?' | '*' | '\\')
            }
            ConstraintPolicy::Cloud => {
                matches!(
                    ch,
                    '\\' | '^' | '`' | '{' | '}' | '[' | ']' | '"' | '<' | '>' | '~' | '#' | '|'
                )
            }
            ConstraintPolicy::Linux | ConstraintPolicy::All => false,
            ConstraintPolicy::Conservative => unreachable!(),
        }
    }

    /// Whether non-ASCII bytes are percent-encoded under this policy. Only `Conservative` does
    /// -- every other policy leaves non-ASCII characters (e.g. `é`) untouched.
    fn escapes_non_ascii(&self) -> bool {
        *self == ConstraintPolicy::Conservative
    }
}

/// Strategies for turning a logical path into a content-path-safe string.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Encoder {
    /// Leaves the path untouched. Only safe when `ConstraintPolicy` already guarantees safety.
    Passthrough,
    /// Percent-encodes every character the paired `ConstraintPolicy` selects for escaping,
    /// across the whole path at once (so a policy that escapes `/` can do so).
    Url,
    /// Splits a digest into a pairtree-style sequence of short directory components.
    PairTree,
    /// Encodes the path as a hex digest of itself, discarding the original structure entirely.
    Digest,
}

/// The fixed safe set used by [`Encoder::PairTree`], which is unrelated to the
/// windows/linux/cloud/conservative policy scheme: pairtree components are always percent-
/// encoded the same way regardless of target host.
const PAIRTREE_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

impl Encoder {
    /// Encodes `path` under `policy`. `policy` only affects `Url`: it selects which characters
    /// get percent-encoded and whether `/` and non-ASCII bytes are among them. The other
    /// variants ignore it.
    pub fn encode(&self, path: &str, policy: ConstraintPolicy) -> Cow<str> {
        match self {
            Encoder::Passthrough => Cow::Borrowed(path),
            Encoder::Url => Cow::Owned(percent_encode_path(path, policy)),
            Encoder::PairTree => Cow::Owned(pairtree_encode(path)),
            Encoder::Digest => Cow::Owned(
                crate::ocfl::DigestAlgorithm::Sha256
                    .hash_hex(&mut path.as_bytes())
                    .expect("hashing an in-memory string cannot fail")
                    .to_string(),
            ),
        }
    }
}

/// Percent-encodes `path` one character at a time under `policy`'s escape rules. Operates on the
/// whole path string, not per segment, so a policy may choose to escape the `/` separator itself
/// (`Conservative` does; `Windows`/`Linux`/`Cloud`/`All` do not).
fn percent_encode_path(path: &str, policy: ConstraintPolicy) -> String {
    let escape_non_ascii = policy.escapes_non_ascii();
    let mut out = String::with_capacity(path.len());

    for ch in path.chars() {
        if ch.is_ascii() {
            if policy.escapes(ch) {
                push_percent_encoded_byte(&mut out, ch as u8);
            } else {
                out.push(ch);
            }
        } else if escape_non_ascii {
            let mut buf = [0u8; 4];
            for byte in ch.encode_utf8(&mut buf).as_bytes() {
                push_percent_encoded_byte(&mut out, *byte);
            }
        } else {
            out.push(ch);
        }
    }

    out
}

fn push_percent_encoded_byte(out: &mut String, byte: u8) {
    out.push('%');
    out.push_str(&format!("{:02x}", byte));
}

/// Splits `id` into two-character directory components (the pairtree "short" convention),
/// percent-encoding any character that is unsafe in a path segment first.
fn pairtree_encode(id: &str) -> String {
    let encoded = utf8_percent_encode(id, PAIRTREE_ENCODE_SET).to_string();
    let mut out = String::with_capacity(encoded.len() + encoded.len() / 2);

    let bytes = encoded.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let end = std::cmp::min(i + 2, bytes.len());
        out.push_str(&encoded[i..end]);
        out.push('/');
        i = end;
    }

    out
}

/// Combines a `ConstraintPolicy` with an `Encoder` to produce safe content paths from logical
/// paths, used by the storage layout and the inventory updater to validate and transform
/// caller-supplied paths in one place.
pub struct LogicalPathMapper {
    policy: ConstraintPolicy,
    processor: PathConstraintProcessor,
    encoder: Encoder,
}

impl LogicalPathMapper {
    pub fn new(policy: ConstraintPolicy, encoder: Encoder) -> Self {
        Self {
            policy,
            processor: policy.processor(),
            encoder,
        }
    }

    /// Validates `logical_path` against the configured constraints, then returns its encoded
    /// form. The path is encoded as a whole so that a policy which escapes `/` can do so; the
    /// constraint check runs first and is unaffected by the choice of encoder.
    pub fn map(&self, logical_path: &str) -> Result<String> {
        self.processor.apply(logical_path)?;
        Ok(self.encoder.encode(logical_path, self.policy).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_mapper_rejects_reserved_names() {
        let mapper = LogicalPathMapper::new(ConstraintPolicy::Windows, Encoder::Passthrough);
        assert!(mapper.map("a/CON/file.txt").is_err());
        assert!(mapper.map("a/con.txt").is_err());
    }

    #[test]
    fn rejects_empty_and_dot_segments() {
        let mapper = LogicalPathMapper::new(ConstraintPolicy::All, Encoder::Passthrough);
        assert!(mapper.map("").is_err());
        assert!(mapper.map("a/./b").is_err());
        assert!(mapper.map("a/../b").is_err());
        assert!(mapper.map("/a/b").is_err());
    }

    #[test]
    fn url_encoder_escapes_unsafe_characters() {
        let encoded = Encoder::Url.encode("a b#c", ConstraintPolicy::Conservative);
        assert_eq!("a%20b%23c", encoded);
    }

    #[test]
    fn pairtree_encoder_splits_into_two_character_components() {
        let encoded = Encoder::PairTree.encode("abcdefg", ConstraintPolicy::All);
        assert_eq!("ab/cd/ef/g/", encoded);
    }

    /// A path exercising every escape decision at once: reserved-on-Windows characters, a
    /// trailing space, `%`, `#`/`{`/`}`/`[`/`]` (left alone everywhere but `Conservative`), a
    /// `.` extension, a non-ASCII letter, and a non-Latin-script character.
    const MIXED_INPUT: &str = "tést/<bad>:Path 1/\\|obj/?8*%id/#{something}/[0]/۞.txt ";

    #[test]
    fn windows_mapper_escapes_reserved_characters_only() {
        let mapper = LogicalPathMapper::new(ConstraintPolicy::Windows, Encoder::Url);
        assert_eq!(
            "tést/%3cbad%3e%3aPath%201/%5c%7cobj/%3f8%2a%25id/#{something}/[0]/۞.txt%20",
            mapper.map(MIXED_INPUT).unwrap()
        );
    }

    #[test]
    fn linux_mapper_escapes_base_set_only() {
        let mapper = LogicalPathMapper::new(ConstraintPolicy::Linux, Encoder::Url);
        assert_eq!(
            "tést/<bad>:Path%201/\\|obj/?8*%25id/#{something}/[0]/۞.txt%20",
            mapper.map(MIXED_INPUT).unwrap()
        );
    }

    #[test]
    fn conservative_mapper_escapes_every_non_alphanumeric_byte() {
        let mapper = LogicalPathMapper::new(ConstraintPolicy::Conservative, Encoder::Url);
        assert_eq!(
            "t%c3%a9st%2f%3cbad%3e%3aPath%201%2f%5c%7cobj%2f%3f8%2a%25id%2f%23%7bsomething%7d%2f%5b0%5d%2f%db%9e%2etxt%20",
            mapper.map(MIXED_INPUT).unwrap()
        );
    }
}
