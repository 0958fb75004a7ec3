//! Authenticated principal derived from a validated assertion.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::assertion::ParsedAssertion;
use super::authority::{Authority, GroupAuthority};
use super::config::SamlConfig;
use super::error::AssertionError;
use super::mapper::GroupRegexMapper;
use super::validation::MAX_SESSION_LIFETIME_SECS;

/// A user authenticated through SAML, with the authorities granted from
/// their group claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamlPrincipal {
    /// User identifier (username attribute, else NameID).
    pub user_id: String,

    /// IdP entity ID that issued the assertion.
    pub idp_entity_id: String,

    /// Group authorities, deduplicated in claim order.
    pub authorities: Vec<GroupAuthority>,

    /// When the user authenticated at the IdP (or when the assertion was
    /// accepted, if the IdP did not say).
    pub authenticated_at: DateTime<Utc>,

    /// End of the maximum authentication lifetime, if one is configured.
    pub expires_at: Option<DateTime<Utc>>,

    /// Session index from SAML assertion (for Single Logout).
    pub session_index: Option<String>,

    /// SAML assertion attributes as key → values.
    pub attributes: HashMap<String, Vec<String>>,
}

impl SamlPrincipal {
    /// Build a principal from an assertion whose conditions already passed.
    pub fn from_assertion(
        assertion: &ParsedAssertion,
        config: &SamlConfig,
        mapper: &GroupRegexMapper,
    ) -> Result<Self, AssertionError> {
        let user_id = config
            .username_attribute
            .as_deref()
            .and_then(|attr| assertion.first_attribute(attr))
            .or(assertion.name_id.as_deref())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(AssertionError::MissingSubject)?
            .to_string();

        let authorities = mapper.map_groups(
            assertion.attribute_values(&config.groups_attribute),
            config.advanced.as_ref(),
        );

        let authenticated_at = assertion.authn_instant.unwrap_or_else(Utc::now);
        let expires_at = config
            .maximum_session_lifetime()
            .map(|secs| {
                let lifetime = Duration::seconds(secs.clamp(0, MAX_SESSION_LIFETIME_SECS));
                authenticated_at
                    .checked_add_signed(lifetime)
                    .unwrap_or(DateTime::<Utc>::MAX_UTC)
            });

        Ok(Self {
            user_id,
            idp_entity_id: assertion.issuer.clone(),
            authorities,
            authenticated_at,
            expires_at,
            session_index: assertion.session_index.clone(),
            attributes: assertion.attributes.clone(),
        })
    }

    /// Check if the authentication has outlived the maximum lifetime.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() > at)
    }

    /// Whether the principal holds the given authority.
    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.iter().any(|a| a.authority() == authority)
    }

    /// Authority tokens as plain strings.
    pub fn authority_names(&self) -> Vec<&str> {
        self.authorities.iter().map(|a| a.authority()).collect()
    }
}
