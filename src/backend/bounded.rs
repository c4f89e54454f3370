use std::fmt::{Display, Formatter};
use std::ops::Deref;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::errors::ValidationError;

/// A string that never exceeds `N` bytes.
///
/// Input that is too long is cut at the last character boundary that fits,
/// so the stored value is always valid UTF-8. Use [`BoundedString::try_new`]
/// where over-length input must be refused instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoundedString<const N: usize>(String);

impl<const N: usize> BoundedString<N> {
    pub const MAX_LEN: usize = N;

    pub fn new(value: impl AsRef<str>) -> Self {
        Self::truncating(value).0
    }

    /// Builds the value and reports whether anything was cut off.
    pub fn truncating(value: impl AsRef<str>) -> (Self, bool) {
        let value = value.as_ref();
        if value.len() <= N {
            return (Self(value.to_owned()), false);
        }

        let mut end = N;
        while !value.is_char_boundary(end) {
            end -= 1;
        }

        (Self(value[..end].to_owned()), true)
    }

    pub fn try_new(value: impl AsRef<str>) -> Result<Self, ValidationError> {
        let value = value.as_ref();
        if value.len() > N {
            return Err(ValidationError::TooLong {
                max: N,
                actual: value.len(),
            });
        }

        Ok(Self(value.to_owned()))
    }

    /// Falls back to `default` when `value` is blank, the way the entry forms
    /// fill in "Room" or "Prof" for empty boxes.
    pub fn or_default_text(value: &str, default: &str) -> Self {
        if value.trim().is_empty() {
            Self::new(default)
        } else {
            Self::new(value)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl<const N: usize> Deref for BoundedString<N> {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl<const N: usize> AsRef<str> for BoundedString<N> {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<const N: usize> Display for BoundedString<N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<const N: usize> From<&str> for BoundedString<N> {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<const N: usize> From<String> for BoundedString<N> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl<const N: usize> PartialEq<str> for BoundedString<N> {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl<const N: usize> PartialEq<&str> for BoundedString<N> {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl<const N: usize> Serialize for BoundedString<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de, const N: usize> Deserialize<'de> for BoundedString<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::new(raw))
    }
}
