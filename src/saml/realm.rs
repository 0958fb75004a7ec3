//! SAML security realm.
//!
//! Holds the active configuration and turns validated assertions into
//! principals.

use anyhow::{anyhow, Context, Result};
use std::sync::RwLock;
use tracing::{debug, info};

use super::assertion::{AssertionValidator, ParsedAssertion};
use super::authn_request::AuthnRequest;
use super::config::SamlConfig;
use super::mapper::GroupRegexMapper;
use super::principal::SamlPrincipal;

/// SAML realm that authenticates users from IdP assertions.
pub struct SamlRealm {
    /// Realm configuration, replaced wholesale on reconfigure.
    config: RwLock<SamlConfig>,
    /// Group rewrite cache shared by all authentications.
    mapper: GroupRegexMapper,
}

impl SamlRealm {
    /// Create a new realm with the given configuration.
    pub fn new(config: SamlConfig) -> Result<Self> {
        if config.enabled {
            config.validate().map_err(|e| anyhow!(e))?;
        }

        Ok(Self {
            config: RwLock::new(config),
            mapper: GroupRegexMapper::new(),
        })
    }

    /// Update configuration.
    pub fn reconfigure(&self, config: SamlConfig) -> Result<()> {
        if config.enabled {
            config.validate().map_err(|e| anyhow!(e))?;
        }

        let mut cfg = self
            .config
            .write()
            .map_err(|_| anyhow!("Config lock poisoned"))?;
        *cfg = config;

        info!("SAML realm reconfigured");
        Ok(())
    }

    /// Check if SAML is enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.read().map(|c| c.enabled).unwrap_or(false)
    }

    /// Get a clone of the current config.
    pub fn config(&self) -> Result<SamlConfig> {
        self.config
            .read()
            .map(|c| c.clone())
            .map_err(|_| anyhow!("Config lock poisoned"))
    }

    /// Group rewrite cache, exposed for inspection.
    pub fn mapper(&self) -> &GroupRegexMapper {
        &self.mapper
    }

    /// Create an AuthnRequest and return the redirect URL to the IdP.
    pub fn login_redirect(&self, relay_state: Option<&str>) -> Result<String> {
        let config = self.config()?;
        if !config.enabled {
            return Err(anyhow!("SAML is not enabled"));
        }

        let request = AuthnRequest::build(&config)?;
        request.redirect_url(&config, relay_state)
    }

    /// Validate an assertion and build the authenticated principal.
    pub fn authenticate(&self, assertion: &ParsedAssertion) -> Result<SamlPrincipal> {
        let config = self.config()?;
        if !config.enabled {
            return Err(anyhow!("SAML is not enabled"));
        }

        debug!(assertion_id = %assertion.id, "Processing SAML assertion");

        AssertionValidator::new(&config)
            .validate(assertion)
            .context("SAML assertion rejected")?;

        let principal = SamlPrincipal::from_assertion(assertion, &config, &self.mapper)
            .context("Failed to build SAML principal")?;

        info!(
            user_id = %principal.user_id,
            idp = %principal.idp_entity_id,
            authorities = principal.authorities.len(),
            "SAML authentication successful"
        );

        Ok(principal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::saml::advanced::AdvancedConfiguration;
    use crate::saml::error::AssertionError;
    use chrono::{Duration, Utc};

    fn test_config() -> SamlConfig {
        SamlConfig {
            enabled: true,
            entity_id: "https://sp.example.com".to_string(),
            acs_url: "https://sp.example.com/saml/acs".to_string(),
            idp_sso_url: Some("https://idp.example.com/sso".to_string()),
            idp_entity_id: Some("https://idp.example.com".to_string()),
            groups_attribute: "groups".to_string(),
            ..Default::default()
        }
    }

    fn test_assertion() -> ParsedAssertion {
        let now = Utc::now();
        let mut assertion = ParsedAssertion {
            id: "_assertion-1".to_string(),
            issuer: "https://idp.example.com".to_string(),
            name_id: Some("user@example.com".to_string()),
            audiences: vec!["https://sp.example.com".to_string()],
            not_before: Some(now - Duration::minutes(1)),
            not_on_or_after: Some(now + Duration::minutes(5)),
            authn_instant: Some(now),
            ..Default::default()
        };
        assertion.attributes.insert(
            "groups".to_string(),
            vec!["cn=admins,ou=groups".to_string(), "devs".to_string()],
        );
        assertion
    }

    #[test]
    fn test_realm_creation() {
        let realm = SamlRealm::new(test_config()).unwrap();
        assert!(realm.is_enabled());

        let disabled = SamlRealm::new(SamlConfig::default()).unwrap();
        assert!(!disabled.is_enabled());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = test_config();
        config.acs_url = String::new();
        assert!(SamlRealm::new(config).is_err());
    }

    #[test]
    fn test_authenticate_maps_groups() {
        let mut config = test_config();
        config.advanced = Some(AdvancedConfiguration::new(
            None,
            None,
            None,
            Some(600),
            Some("^cn=([^,]+),.*$".to_string()),
            Some("$1".to_string()),
        ));
        let realm = SamlRealm::new(config).unwrap();

        let principal = realm.authenticate(&test_assertion()).unwrap();
        assert_eq!(principal.user_id, "user@example.com");
        assert_eq!(principal.authority_names(), vec!["admins", "devs"]);
        assert!(principal.expires_at.is_some());
        assert_eq!(realm.mapper().cached_patterns(), 1);
    }

    #[test]
    fn test_authenticate_rejects_expired() {
        let realm = SamlRealm::new(test_config()).unwrap();
        let mut assertion = test_assertion();
        assertion.not_on_or_after = Some(Utc::now() - Duration::hours(1));

        let err = realm.authenticate(&assertion).unwrap_err();
        assert_eq!(
            err.downcast_ref::<AssertionError>(),
            Some(&AssertionError::Expired)
        );
    }

    #[test]
    fn test_out_of_range_dates_rejected_without_panic() {
        let mut config = test_config();
        config.advanced = Some(AdvancedConfiguration::without_group_regex(
            None,
            None,
            None,
            Some(3600),
        ));
        let realm = SamlRealm::new(config).unwrap();

        let mut far_expiry = test_assertion();
        far_expiry.not_on_or_after = Some(chrono::DateTime::<Utc>::MAX_UTC);
        assert!(realm.authenticate(&far_expiry).is_err());

        let mut far_authn = test_assertion();
        far_authn.authn_instant = Some(chrono::DateTime::<Utc>::MAX_UTC);
        let err = realm.authenticate(&far_authn).unwrap_err();
        assert_eq!(
            err.downcast_ref::<AssertionError>(),
            Some(&AssertionError::AuthnInFuture)
        );

        let mut tomorrow = test_assertion();
        tomorrow.authn_instant = Some(Utc::now() + Duration::days(1));
        assert!(realm.authenticate(&tomorrow).is_err());
    }

    #[test]
    fn test_oversized_clock_skew_rejected() {
        let mut config = test_config();
        config.clock_skew_secs = 9_000_000_000_000;
        assert!(SamlRealm::new(config).is_err());
    }

    #[test]
    fn test_unknown_replacement_reference_rejected() {
        let mut config = test_config();
        config.advanced = Some(AdvancedConfiguration::new(
            None,
            None,
            None,
            None,
            Some("^cn=([^,]+),.*$".to_string()),
            Some("$1_team".to_string()),
        ));
        let err = SamlRealm::new(config).err().unwrap();
        assert!(err.to_string().contains("ERROR_UNKNOWN_GROUP_REFERENCE"));
    }

    #[test]
    fn test_disabled_realm_refuses() {
        let realm = SamlRealm::new(SamlConfig::default()).unwrap();
        assert!(realm.authenticate(&test_assertion()).is_err());
        assert!(realm.login_redirect(None).is_err());
    }

    #[test]
    fn test_reconfigure_replaces_config() {
        let realm = SamlRealm::new(test_config()).unwrap();
        let principal = realm.authenticate(&test_assertion()).unwrap();
        assert!(principal.has_authority("cn=admins,ou=groups"));

        let mut config = test_config();
        config.advanced = Some(AdvancedConfiguration::new(
            None,
            None,
            None,
            None,
            Some("^cn=([^,]+),.*$".to_string()),
            Some("$1".to_string()),
        ));
        realm.reconfigure(config).unwrap();

        let principal = realm.authenticate(&test_assertion()).unwrap();
        assert!(principal.has_authority("admins"));
    }

    #[test]
    fn test_reconfigure_rejects_invalid_and_keeps_old() {
        let realm = SamlRealm::new(test_config()).unwrap();

        let mut bad = test_config();
        bad.advanced = Some(AdvancedConfiguration::new(
            None,
            None,
            None,
            None,
            Some("(".to_string()),
            Some("x".to_string()),
        ));
        assert!(realm.reconfigure(bad).is_err());
        assert_eq!(realm.config().unwrap(), test_config());
    }

    #[test]
    fn test_login_redirect() {
        let realm = SamlRealm::new(test_config()).unwrap();
        let url = realm.login_redirect(Some("/dashboard")).unwrap();
        assert!(url.starts_with("https://idp.example.com/sso?"));
        assert!(url.contains("SAMLRequest="));
        assert!(url.contains("RelayState="));
    }
}
