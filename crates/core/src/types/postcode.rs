//! UK postcodes.

use core::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Outward code, optional space, inward code. Matched against uppercased input.
static POSTCODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z]{1,2}[0-9][A-Z0-9]?\s?[0-9][A-Z]{2}$").expect("Invalid regex")
});

/// Errors that can occur when parsing a [`Postcode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PostcodeError {
    #[error("postcode is required")]
    Empty,
    #[error("'{0}' is not a valid UK postcode")]
    Invalid(String),
}

/// A validated UK postcode in canonical form.
///
/// Input is matched case-insensitively and stored uppercase with exactly one
/// space before the three-character inward code.
///
/// ```
/// use furnish_core::Postcode;
///
/// assert_eq!(Postcode::parse("sw1a1aa").unwrap().as_str(), "SW1A 1AA");
/// assert_eq!(Postcode::parse(" m1 1ae ").unwrap().as_str(), "M1 1AE");
/// assert!(Postcode::parse("12345").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Postcode(String);

impl Postcode {
    /// Parse and normalize a postcode.
    ///
    /// # Errors
    ///
    /// Returns [`PostcodeError::Empty`] for blank input and
    /// [`PostcodeError::Invalid`] when the pattern does not match.
    pub fn parse(s: &str) -> Result<Self, PostcodeError> {
        let upper = s.trim().to_uppercase();
        if upper.is_empty() {
            return Err(PostcodeError::Empty);
        }
        if !POSTCODE_RE.is_match(&upper) {
            return Err(PostcodeError::Invalid(s.trim().to_owned()));
        }

        let compact: String = upper.chars().filter(|c| !c.is_whitespace()).collect();
        // The inward code is always the last three characters.
        let (outward, inward) = compact.split_at(compact.len() - 3);
        Ok(Self(format!("{outward} {inward}")))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The outward code (area and district), e.g. `SW1A`.
    #[must_use]
    pub fn outward(&self) -> &str {
        self.0.split(' ').next().unwrap_or_default()
    }
}

impl fmt::Display for Postcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Postcode {
    type Err = PostcodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Postcode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercase_without_space_is_normalized() {
        assert_eq!(Postcode::parse("sw1a1aa").unwrap().as_str(), "SW1A 1AA");
    }

    #[test]
    fn test_all_outward_shapes() {
        for (input, expected) in [
            ("M1 1AE", "M1 1AE"),
            ("b338th", "B33 8TH"),
            ("CR2 6XH", "CR2 6XH"),
            ("dn55 1pt", "DN55 1PT"),
            ("W1A 0AX", "W1A 0AX"),
            ("ec1a1bb", "EC1A 1BB"),
        ] {
            assert_eq!(Postcode::parse(input).unwrap().as_str(), expected);
        }
    }

    #[test]
    fn test_rejects_malformed() {
        assert_eq!(Postcode::parse("  "), Err(PostcodeError::Empty));
        for bad in ["12345", "SW1A 1A", "SW1A  1AA", "Q", "SW1A-1AA"] {
            assert!(
                matches!(Postcode::parse(bad), Err(PostcodeError::Invalid(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_outward() {
        assert_eq!(Postcode::parse("ec1a1bb").unwrap().outward(), "EC1A");
    }
}
