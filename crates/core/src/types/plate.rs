//! Vehicle licence plate.

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Errors that can occur when parsing a [`Plate`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PlateError {
    /// The input is empty after trimming.
    #[error("plate cannot be empty")]
    Empty,
    /// The input is too long.
    #[error("plate must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains a character that never appears on a plate.
    #[error("plate contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// A licence plate, normalized to uppercase.
///
/// Both the old `ABC-1234` and the Mercosul `ABC1D23` layouts are accepted;
/// only ASCII letters, digits and `-` are allowed.
///
/// ```
/// use garagem_core::Plate;
///
/// assert_eq!(Plate::parse(" abc1d23 ").unwrap().as_str(), "ABC1D23");
/// assert!(Plate::parse("").is_err());
/// ```
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Plate(String);

impl Plate {
    /// Maximum plate length.
    pub const MAX_LENGTH: usize = 10;

    /// Parse and normalize a plate.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, longer than
    /// [`Plate::MAX_LENGTH`] or contains anything other than ASCII letters,
    /// digits and `-`.
    pub fn parse(s: &str) -> Result<Self, PlateError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PlateError::Empty);
        }
        if s.chars().count() > Self::MAX_LENGTH {
            return Err(PlateError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if let Some(bad) = s.chars().find(|c| !c.is_ascii_alphanumeric() && *c != '-') {
            return Err(PlateError::InvalidCharacter(bad));
        }
        Ok(Self(s.to_ascii_uppercase()))
    }

    /// Returns the plate as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive prefix match.
    #[must_use]
    pub fn starts_with_ignore_case(&self, prefix: &str) -> bool {
        self.0.starts_with(&prefix.trim().to_ascii_uppercase())
    }
}

impl fmt::Display for Plate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Plate {
    type Err = PlateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Plate {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Plate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Plate {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Plate {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Plate {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
