//! Bounded, `Copy` function-name storage (spec §3: "a bounded string up to
//! 255 bytes plus a terminator").
//!
//! Storing names by value rather than behind a pointer is what lets the
//! sampling signal handler read the current call-stack top without
//! dereferencing into a structure another thread — or a mid-mutation this
//! thread — could be touching.

use std::fmt;

/// Maximum encoded name length, matching the C originals's `char[256]` minus
/// the NUL terminator.
pub const MAX_NAME_LEN: usize = 255;

/// A function or scope name, truncated to [`MAX_NAME_LEN`] bytes and stored
/// inline so it can be copied by value onto a call stack frame.
#[derive(Clone, Copy)]
pub struct FunctionName {
    bytes: [u8; MAX_NAME_LEN],
    len: u8,
}

impl FunctionName {
    pub fn new(name: &str) -> Self {
        let truncated = &name.as_bytes()[..name.len().min(MAX_NAME_LEN)];
        let mut bytes = [0u8; MAX_NAME_LEN];
        bytes[..truncated.len()].copy_from_slice(truncated);
        FunctionName {
            bytes,
            len: truncated.len() as u8,
        }
    }

    pub fn as_str(&self) -> &str {
        // `new` only ever truncates at a byte index that came from a valid
        // `str`, but a multi-byte codepoint could straddle the cut. Fall
        // back to lossy conversion rather than panicking on a truncated
        // name.
        std::str::from_utf8(&self.bytes[..self.len as usize])
            .unwrap_or_else(|_| lossy_prefix(&self.bytes[..self.len as usize]))
    }
}

fn lossy_prefix(bytes: &[u8]) -> &str {
    let mut end = bytes.len();
    while end > 0 && std::str::from_utf8(&bytes[..end]).is_err() {
        end -= 1;
    }
    std::str::from_utf8(&bytes[..end]).unwrap_or("")
}

impl Default for FunctionName {
    fn default() -> Self {
        FunctionName {
            bytes: [0u8; MAX_NAME_LEN],
            len: 0,
        }
    }
}

impl PartialEq for FunctionName {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.bytes[..self.len as usize] == other.bytes[..other.len as usize]
    }
}

impl Eq for FunctionName {}

impl fmt::Debug for FunctionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FunctionName").field(&self.as_str()).finish()
    }
}

impl fmt::Display for FunctionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl From<&str> for FunctionName {
    fn from(name: &str) -> Self {
        FunctionName::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_short_names() {
        let n = FunctionName::new("my_function");
        assert_eq!(n.as_str(), "my_function");
    }

    #[test]
    fn truncates_long_names() {
        let long = "a".repeat(400);
        let n = FunctionName::new(&long);
        assert_eq!(n.as_str().len(), MAX_NAME_LEN);
    }

    #[test]
    fn equality_ignores_padding() {
        let a = FunctionName::new("f");
        let b = FunctionName::new("f");
        assert_eq!(a, b);
        assert_ne!(a, FunctionName::new("g"));
    }
}
