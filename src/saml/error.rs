//! Error kinds for form validation and assertion rejection.

use serde::Serialize;
use thiserror::Error;

/// Message shown when a numeric field is not a usable number.
pub const ERROR_NOT_VALID_NUMBER: &str = "Not a valid number.";

/// Message shown when an optional field contains only whitespace.
pub const ERROR_ONLY_SPACES_FIELD_VALUE: &str = "The field should have a value different than spaces";

/// Form validation failure kinds.
///
/// These are user-correctable input errors. They are returned as values for
/// the configuration UI to render and never abort construction of the
/// configuration itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorKind {
    /// Non-numeric, negative, or larger than `i32::MAX`.
    NotValidNumber,
    /// Present but blank.
    OnlySpacesFieldValue,
    /// Group regex pattern does not compile.
    InvalidRegex,
    /// Only one of the group regex pattern/replacement is set.
    IncompleteRegexPair,
    /// Replacement refers to a capture group the pattern does not define.
    UnknownGroupReference,
}

impl ValidationErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotValidNumber => "ERROR_NOT_VALID_NUMBER",
            Self::OnlySpacesFieldValue => "ERROR_ONLY_SPACES_FIELD_VALUE",
            Self::InvalidRegex => "ERROR_INVALID_REGEX",
            Self::IncompleteRegexPair => "ERROR_INCOMPLETE_REGEX_PAIR",
            Self::UnknownGroupReference => "ERROR_UNKNOWN_GROUP_REFERENCE",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::NotValidNumber => ERROR_NOT_VALID_NUMBER,
            Self::OnlySpacesFieldValue => ERROR_ONLY_SPACES_FIELD_VALUE,
            Self::InvalidRegex => "The group regex pattern is not a valid regular expression",
            Self::IncompleteRegexPair => {
                "Group regex pattern and replacement must be set together"
            }
            Self::UnknownGroupReference => {
                "The group regex replacement refers to a capture group the pattern does not define"
            }
        }
    }
}

impl std::fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl std::error::Error for ValidationErrorKind {}

/// Reasons an assertion is rejected before a principal is built.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssertionError {
    /// IdP reported a non-success status.
    #[error("SAML authentication failed with status {0}")]
    StatusNotSuccess(String),

    /// Issuer does not match the configured IdP.
    #[error("invalid issuer: expected {expected}, got {actual}")]
    InvalidIssuer {
        /// Configured IdP entity id.
        expected: String,
        /// Issuer found in the assertion.
        actual: String,
    },

    /// `NotBefore` is still in the future.
    #[error("SAML assertion not yet valid")]
    NotYetValid,

    /// `NotOnOrAfter` has passed.
    #[error("SAML assertion has expired")]
    Expired,

    /// SP entity id is not among the audiences.
    #[error("audience restriction does not include {0}")]
    AudienceMismatch(String),

    /// Maximum authentication lifetime is configured but the assertion has no AuthnInstant.
    #[error("SAML assertion has no authentication instant")]
    MissingAuthnInstant,

    /// AuthnInstant lies further in the future than the clock skew allows.
    #[error("SAML authentication instant is in the future")]
    AuthnInFuture,

    /// The user authenticated longer ago than the maximum lifetime allows.
    #[error("authentication is older than the maximum lifetime of {0} seconds")]
    AuthnTooOld(i64),

    /// Neither the username attribute nor the NameID carries a user id.
    #[error("SAML assertion has no subject")]
    MissingSubject,
}
