//! Assertion condition checks.
//!
//! Operates on an assertion that has already been decoded and had its
//! signature verified; this module only decides whether its conditions allow
//! a login right now.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use super::config::SamlConfig;
use super::error::AssertionError;
use super::validation::MAX_SESSION_LIFETIME_SECS;

/// Top-level status code for a successful response.
pub const STATUS_SUCCESS: &str = "urn:oasis:names:tc:SAML:2.0:status:Success";

/// Decoded SAML assertion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedAssertion {
    /// Assertion ID.
    pub id: String,

    /// Issuer (IdP entity ID).
    pub issuer: String,

    /// Response status code, if the response carried one.
    #[serde(default)]
    pub status: Option<String>,

    /// Subject NameID value.
    #[serde(default)]
    pub name_id: Option<String>,

    /// NameID format.
    #[serde(default)]
    pub name_id_format: Option<String>,

    /// Audience restriction values.
    #[serde(default)]
    pub audiences: Vec<String>,

    #[serde(default)]
    pub not_before: Option<DateTime<Utc>>,

    #[serde(default)]
    pub not_on_or_after: Option<DateTime<Utc>>,

    /// When the user actually authenticated at the IdP.
    #[serde(default)]
    pub authn_instant: Option<DateTime<Utc>>,

    /// Session index from the authn statement (for Single Logout).
    #[serde(default)]
    pub session_index: Option<String>,

    /// Attribute statements flattened to name -> values.
    #[serde(default)]
    pub attributes: HashMap<String, Vec<String>>,
}

impl ParsedAssertion {
    /// All values of an attribute, empty if absent.
    pub fn attribute_values(&self, name: &str) -> &[String] {
        self.attributes
            .get(name)
            .map(|values| values.as_slice())
            .unwrap_or(&[])
    }

    /// First value of an attribute.
    pub fn first_attribute(&self, name: &str) -> Option<&str> {
        self.attribute_values(name).first().map(|s| s.as_str())
    }
}

/// Checks status, issuer, validity window, audience and authentication age.
pub struct AssertionValidator<'a> {
    config: &'a SamlConfig,
}

impl<'a> AssertionValidator<'a> {
    pub fn new(config: &'a SamlConfig) -> Self {
        Self { config }
    }

    /// Validate against the current time.
    pub fn validate(&self, assertion: &ParsedAssertion) -> Result<(), AssertionError> {
        self.validate_at(assertion, Utc::now())
    }

    /// Validate as if the current time were `now`.
    pub fn validate_at(
        &self,
        assertion: &ParsedAssertion,
        now: DateTime<Utc>,
    ) -> Result<(), AssertionError> {
        if let Some(ref status) = assertion.status {
            if status != STATUS_SUCCESS {
                return Err(AssertionError::StatusNotSuccess(status.clone()));
            }
        }

        if let Some(ref expected) = self.config.idp_entity_id {
            if &assertion.issuer != expected {
                return Err(AssertionError::InvalidIssuer {
                    expected: expected.clone(),
                    actual: assertion.issuer.clone(),
                });
            }
        }

        let skew = self.config.clock_skew();

        // A window edge outside the representable date range counts as outside the window
        if let Some(not_before) = assertion.not_before {
            match not_before.checked_sub_signed(skew) {
                Some(start) if now >= start => {}
                _ => return Err(AssertionError::NotYetValid),
            }
        }
        if let Some(not_on_or_after) = assertion.not_on_or_after {
            match not_on_or_after.checked_add_signed(skew) {
                Some(end) if now < end => {}
                _ => return Err(AssertionError::Expired),
            }
        }

        let sp_entity_id = self.config.sp_entity_id();
        if !assertion.audiences.is_empty()
            && !assertion.audiences.iter().any(|aud| aud == sp_entity_id)
        {
            return Err(AssertionError::AudienceMismatch(sp_entity_id.to_string()));
        }

        if let Some(authn_instant) = assertion.authn_instant {
            if authn_instant.signed_duration_since(now) > skew {
                return Err(AssertionError::AuthnInFuture);
            }
        }

        if let Some(lifetime) = self.config.maximum_session_lifetime() {
            let authn_instant = assertion
                .authn_instant
                .ok_or(AssertionError::MissingAuthnInstant)?;
            let allowed = Duration::seconds(lifetime.clamp(0, MAX_SESSION_LIFETIME_SECS)) + skew;
            if now.signed_duration_since(authn_instant) > allowed {
                return Err(AssertionError::AuthnTooOld(lifetime));
            }
        }

        debug!(
            assertion_id = %assertion.id,
            issuer = %assertion.issuer,
            "SAML assertion conditions satisfied"
        );
        Ok(())
    }
}
