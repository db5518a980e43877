//! Shared value types for the triage workspace.
//!
//! Contains validated text and the strongly-typed identifiers used across the engine, the API
//! adapter and the CLI. Identifiers come in two flavours:
//! - identifiers owned by the engine (assessments, queue entries, protocols, audit records) are
//!   random v4 UUIDs;
//! - identifiers owned by the surrounding clinic application (patients, staff, departments,
//!   doctors) are plain integers, because the engine only ever references them.

use std::fmt;
use std::str::FromStr;

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
    /// The input text exceeded the permitted length
    #[error("Text exceeds maximum length of {0} characters")]
    TooLong(usize),
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Maximum number of characters accepted by [`NonEmptyText::new`].
    pub const MAX_LEN: usize = 2_000;

    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace. If the trimmed
    /// result is empty, or longer than [`NonEmptyText::MAX_LEN`] characters, an error is returned.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        if trimmed.chars().count() > Self::MAX_LEN {
            return Err(TextError::TooLong(Self::MAX_LEN));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
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

/// Errors returned when parsing an identifier from text.
#[derive(Debug, thiserror::Error)]
#[error("invalid {kind} identifier: '{input}'")]
pub struct IdParseError {
    kind: &'static str,
    input: String,
}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Allocates a fresh random identifier.
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            pub fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            pub fn uuid(&self) -> uuid::Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                uuid::Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|_| IdParseError {
                        kind: $kind,
                        input: s.to_owned(),
                    })
            }
        }
    };
}

macro_rules! external_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<u64>().map(Self).map_err(|_| IdParseError {
                    kind: $kind,
                    input: s.to_owned(),
                })
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

uuid_id!(
    /// Identifier of a triage assessment.
    AssessmentId,
    "assessment"
);
uuid_id!(
    /// Identifier of a dispatch queue entry.
    QueueEntryId,
    "queue entry"
);
uuid_id!(
    /// Identifier of a clinical triage protocol.
    ProtocolId,
    "protocol"
);
uuid_id!(
    /// Identifier of an append-only reassessment audit record.
    ReassessmentId,
    "reassessment"
);
uuid_id!(
    /// Identifier of a recorded vital-signs snapshot.
    VitalSignsId,
    "vital signs"
);

external_id!(
    /// Patient identifier issued by the clinic's patient directory.
    PatientId,
    "patient"
);
external_id!(
    /// Staff member identifier issued by the identity provider.
    UserId,
    "user"
);
external_id!(
    /// Clinic department identifier.
    DepartmentId,
    "department"
);
external_id!(
    /// Doctor identifier.
    DoctorId,
    "doctor"
);
