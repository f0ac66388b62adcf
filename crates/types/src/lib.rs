//! Validated primitive types shared across the CureNet core.
//!
//! These newtypes enforce small local invariants at construction time so the
//! wider crates can carry them around without re-checking:
//! - [`NonEmptyText`]: a trimmed string with at least one visible character
//! - [`PatientId`]: the opaque identity issued by the auth collaborator
//! - [`TrialId`]: the opaque document id of a trial in the catalog
//! - [`Rating`]: a participation rating bounded to 1..=10

use serde::{Deserialize, Serialize};

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("text cannot be empty")]
    Empty,
}

/// Errors that can occur when creating a [`Rating`].
#[derive(Debug, thiserror::Error)]
pub enum RatingError {
    /// The value fell outside the accepted 1..=10 band
    #[error("rating must be between 1 and 10, got {0}")]
    OutOfRange(u32),
}

/// A string type that guarantees non-empty content.
///
/// Input is trimmed of surrounding whitespace during construction; a result
/// with no visible characters is rejected.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText`, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `TextError::Empty` if the trimmed input has no characters.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Opaque identity of an authenticated patient.
///
/// Owned by the external auth collaborator; the core only references it to
/// scope which health record is active. No structure is assumed beyond
/// non-emptiness.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PatientId(String);

impl PatientId {
    /// Wraps an identity string issued by the auth collaborator.
    ///
    /// # Errors
    ///
    /// Returns `TextError::Empty` for an empty or whitespace-only identity.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        Ok(Self(NonEmptyText::new(input)?.0))
    }

    /// Returns the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PatientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for PatientId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        PatientId::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Opaque document id of a trial in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TrialId(String);

impl TrialId {
    /// Wraps a trial document id.
    ///
    /// # Errors
    ///
    /// Returns `TextError::Empty` for an empty or whitespace-only id.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        Ok(Self(NonEmptyText::new(input)?.0))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TrialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for TrialId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        TrialId::new(&s).map_err(serde::de::Error::custom)
    }
}

/// A participation rating bounded to the 1..=10 band the patients see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Rating(u8);

impl Rating {
    /// Creates a rating, rejecting values outside 1..=10.
    ///
    /// # Errors
    ///
    /// Returns `RatingError::OutOfRange` if the value is 0 or above 10.
    pub fn new(value: u32) -> Result<Self, RatingError> {
        if !(1..=10).contains(&value) {
            return Err(RatingError::OutOfRange(value));
        }
        Ok(Self(value as u8))
    }

    /// Returns the rating as an integer.
    pub fn get(self) -> u8 {
        self.0
    }
}

impl<'de> Deserialize<'de> for Rating {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = u32::deserialize(deserializer)?;
        Rating::new(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_text_trims_and_accepts() {
        let text = NonEmptyText::new("  Asthma  ").expect("should accept");
        assert_eq!(text.as_str(), "Asthma");
    }

    #[test]
    fn non_empty_text_rejects_whitespace_only() {
        let err = NonEmptyText::new("   ").expect_err("should reject whitespace");
        assert!(matches!(err, TextError::Empty));
    }

    #[test]
    fn patient_id_rejects_empty_identity() {
        let err = PatientId::new("").expect_err("should reject empty id");
        assert!(matches!(err, TextError::Empty));
    }

    #[test]
    fn ids_trim_like_non_empty_text() {
        assert_eq!(PatientId::new("  uid-1  ").expect("valid").as_str(), "uid-1");
        assert_eq!(TrialId::new("  t-9  ").expect("valid").as_str(), "t-9");
        let err = TrialId::new("   ").expect_err("should reject whitespace");
        assert!(matches!(err, TextError::Empty));
    }

    #[test]
    fn rating_accepts_bounds() {
        assert_eq!(Rating::new(1).expect("lower bound").get(), 1);
        assert_eq!(Rating::new(10).expect("upper bound").get(), 10);
    }

    #[test]
    fn rating_rejects_out_of_band_values() {
        assert!(matches!(
            Rating::new(0).expect_err("zero"),
            RatingError::OutOfRange(0)
        ));
        assert!(matches!(
            Rating::new(11).expect_err("eleven"),
            RatingError::OutOfRange(11)
        ));
    }

    #[test]
    fn rating_deserialises_from_json_number() {
        let rating: Rating = serde_json::from_str("8").expect("should parse");
        assert_eq!(rating.get(), 8);
        serde_json::from_str::<Rating>("0").expect_err("should reject zero");
    }
}
