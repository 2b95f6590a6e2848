//! Validated text primitives shared across the Clerk crates.
//!
//! - [`NonEmptyText`] for free text that must carry content (reasons, ward names).
//! - [`Key`] for machine identifiers: module keys, workflow state names, action names and
//!   payload field names.

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,

    /// The input was longer than [`Key::MAX_LEN`]
    #[error("Key exceeds maximum length of {max} characters")]
    TooLong { max: usize },

    /// The input contained a character outside `[A-Za-z0-9_]`
    #[error("Key contains invalid character '{0}' (only ASCII letters, digits and '_' allowed)")]
    InvalidCharacter(char),

    /// The input started with something other than an ASCII letter
    #[error("Key must start with an ASCII letter")]
    InvalidStart,
}

/// A string type that guarantees non-empty content.
///
/// The input is trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText`, trimming the input.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::Empty`] if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// A machine identifier such as `patient_clerking`, `markPaid` or `pending_payment`.
///
/// Keys are compared exactly (case-sensitive). They must start with an ASCII letter and may
/// contain ASCII letters, digits and underscores. Surrounding whitespace is trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(String);

impl Key {
    pub const MAX_LEN: usize = 64;

    /// Validates and wraps a machine identifier.
    ///
    /// # Errors
    ///
    /// Returns a [`TextError`] describing the first rule the input breaks.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        if trimmed.len() > Self::MAX_LEN {
            return Err(TextError::TooLong { max: Self::MAX_LEN });
        }
        if let Some(bad) = trimmed
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
        {
            return Err(TextError::InvalidCharacter(bad));
        }
        if !trimmed.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return Err(TextError::InvalidStart);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for Key {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Key::new(s)
    }
}

impl serde::Serialize for Key {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for Key {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Key::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_text_trims_input() {
        let text = NonEmptyText::new("  Ward 7  ").unwrap();
        assert_eq!(text.as_str(), "Ward 7");
    }

    #[test]
    fn non_empty_text_rejects_whitespace() {
        assert_eq!(NonEmptyText::new(" \t\n"), Err(TextError::Empty));
    }

    #[test]
    fn key_accepts_snake_and_camel_case() {
        assert_eq!(Key::new("patient_clerking").unwrap().as_str(), "patient_clerking");
        assert_eq!(Key::new("markPaid").unwrap().as_str(), "markPaid");
    }

    #[test]
    fn key_rejects_spaces_and_punctuation() {
        assert_eq!(
            Key::new("Pending assessment"),
            Err(TextError::InvalidCharacter(' '))
        );
        assert_eq!(Key::new("mark-paid"), Err(TextError::InvalidCharacter('-')));
    }

    #[test]
    fn key_rejects_leading_digit_or_underscore() {
        assert_eq!(Key::new("1st"), Err(TextError::InvalidStart));
        assert_eq!(Key::new("_hidden"), Err(TextError::InvalidStart));
    }

    #[test]
    fn key_rejects_overlong_input() {
        let long = "a".repeat(Key::MAX_LEN + 1);
        assert_eq!(
            Key::new(long),
            Err(TextError::TooLong { max: Key::MAX_LEN })
        );
    }

    #[test]
    fn key_deserialise_validates() {
        let ok: Key = serde_json::from_str("\"admissions\"").unwrap();
        assert_eq!(ok.as_str(), "admissions");

        let err = serde_json::from_str::<Key>("\"no way\"");
        assert!(err.is_err());
    }
}
