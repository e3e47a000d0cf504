use arrayvec::ArrayString;
use serde::{Deserialize, Serialize};

use crate::codec::normalize;

/// Text that always occupies exactly `N` bytes, right-padded with spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct FixedText<const N: usize>(ArrayString<N>);

impl<const N: usize> FixedText<N> {
    pub fn new(text: &str) -> Self {
        let mut inner = ArrayString::new();
        // normalize never yields more than N bytes
        inner.push_str(&normalize(text, N));
        Self(inner)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn trimmed(&self) -> &str {
        self.0.trim()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl<const N: usize> Default for FixedText<N> {
    fn default() -> Self {
        Self::new("")
    }
}

impl<const N: usize> From<String> for FixedText<N> {
    fn from(text: String) -> Self {
        Self::new(&text)
    }
}
