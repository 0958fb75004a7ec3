//! SAML realm configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::advanced::{AdvancedConfiguration, AdvancedConfigurationJson};
use super::validation::FieldValidator;

/// Largest accepted clock skew tolerance (one day).
pub const MAX_CLOCK_SKEW_SECS: i64 = 86_400;

/// SAML security realm configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SamlConfig {
    /// Enable SAML authentication.
    #[serde(default)]
    pub enabled: bool,

    /// SP Entity ID (used unless the advanced options override it).
    #[serde(default)]
    pub entity_id: String,

    /// Assertion Consumer Service URL (where IdP posts SAML response).
    #[serde(default)]
    pub acs_url: String,

    /// IdP SSO URL.
    #[serde(default)]
    pub idp_sso_url: Option<String>,

    /// IdP Entity ID; when set, the assertion issuer must match it.
    #[serde(default)]
    pub idp_entity_id: Option<String>,

    /// Attribute carrying the user id. The NameID is used when unset.
    #[serde(default)]
    pub username_attribute: Option<String>,

    /// Attribute carrying group memberships.
    #[serde(default = "default_groups_attribute")]
    pub groups_attribute: String,

    /// Clock skew tolerance in seconds.
    #[serde(default = "default_clock_skew")]
    pub clock_skew_secs: i64,

    /// Advanced protocol options.
    #[serde(default)]
    pub advanced: Option<AdvancedConfiguration>,
}

fn default_groups_attribute() -> String {
    "http://schemas.xmlsoap.org/claims/Group".to_string()
}

fn default_clock_skew() -> i64 {
    300 // 5 minutes
}

impl Default for SamlConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            entity_id: String::new(),
            acs_url: String::new(),
            idp_sso_url: None,
            idp_entity_id: None,
            username_attribute: None,
            groups_attribute: default_groups_attribute(),
            clock_skew_secs: default_clock_skew(),
            advanced: None,
        }
    }
}

impl SamlConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !self.enabled {
            return Ok(());
        }

        if self.sp_entity_id().is_empty() {
            return Err("SAML entity_id is required".to_string());
        }

        if self.acs_url.is_empty() {
            return Err("SAML acs_url is required".to_string());
        }

        if self.idp_sso_url.is_none() {
            return Err("SAML idp_sso_url is required".to_string());
        }

        if !(0..=MAX_CLOCK_SKEW_SECS).contains(&self.clock_skew_secs) {
            return Err(format!(
                "SAML clock_skew_secs must be between 0 and {}",
                MAX_CLOCK_SKEW_SECS
            ));
        }

        if let Some(ref advanced) = self.advanced {
            FieldValidator::check_advanced(advanced)
                .into_result()
                .map_err(|kind| format!("Invalid advanced configuration: {}", kind))?;
        }

        Ok(())
    }

    /// SP entity id sent to the IdP: the advanced override, else `entity_id`.
    pub fn sp_entity_id(&self) -> &str {
        self.advanced
            .as_ref()
            .and_then(|a| a.sp_entity_id())
            .unwrap_or(self.entity_id.as_str())
    }

    /// Clock skew tolerance, clamped to the accepted range.
    pub fn clock_skew(&self) -> Duration {
        Duration::seconds(self.clock_skew_secs.clamp(0, MAX_CLOCK_SKEW_SECS))
    }

    /// Maximum authentication lifetime in seconds, if configured.
    pub fn maximum_session_lifetime(&self) -> Option<i64> {
        self.advanced.as_ref().and_then(|a| a.maximum_session_lifetime())
    }
}

/// JSON configuration for reconfiguration from a config file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct SamlConfigJson {
    pub enabled: Option<bool>,
    pub entity_id: Option<String>,
    pub acs_url: Option<String>,
    pub idp_sso_url: Option<String>,
    pub idp_entity_id: Option<String>,
    pub username_attribute: Option<String>,
    pub groups_attribute: Option<String>,
    pub clock_skew_secs: Option<i64>,
    pub advanced: Option<AdvancedConfigurationJson>,
}

impl SamlConfigJson {
    /// Merge JSON config into existing config.
    ///
    /// The advanced block, when present, replaces the existing one wholesale.
    pub fn apply_to(&self, config: &mut SamlConfig) {
        if let Some(enabled) = self.enabled {
            config.enabled = enabled;
        }
        if let Some(ref entity_id) = self.entity_id {
            config.entity_id = entity_id.clone();
        }
        if let Some(ref acs_url) = self.acs_url {
            config.acs_url = acs_url.clone();
        }
        if let Some(ref url) = self.idp_sso_url {
            config.idp_sso_url = Some(url.clone());
        }
        if let Some(ref id) = self.idp_entity_id {
            config.idp_entity_id = Some(id.clone());
        }
        if let Some(ref attr) = self.username_attribute {
            config.username_attribute = Some(attr.clone());
        }
        if let Some(ref attr) = self.groups_attribute {
            config.groups_attribute = attr.clone();
        }
        if let Some(skew) = self.clock_skew_secs {
            config.clock_skew_secs = skew;
        }
        if let Some(ref advanced) = self.advanced {
            config.advanced = Some(AdvancedConfiguration::from(advanced.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled_config() -> SamlConfig {
        SamlConfig {
            enabled: true,
            entity_id: "https://sp.example.com".to_string(),
            acs_url: "https://sp.example.com/saml/acs".to_string(),
            idp_sso_url: Some("https://idp.example.com/sso".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = SamlConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.clock_skew_secs, 300);
        assert_eq!(config.groups_attribute, "http://schemas.xmlsoap.org/claims/Group");
        assert!(config.advanced.is_none());
    }

    #[test]
    fn test_validation() {
        let mut config = SamlConfig::default();
        assert!(config.validate().is_ok()); // disabled is valid

        config.enabled = true;
        assert!(config.validate().is_err()); // missing entity_id

        config.entity_id = "https://sp.example.com".to_string();
        assert!(config.validate().is_err()); // missing acs_url

        config.acs_url = "https://sp.example.com/saml/acs".to_string();
        assert!(config.validate().is_err()); // missing IdP SSO URL

        config.idp_sso_url = Some("https://idp.example.com/sso".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_clock_skew_bounds() {
        let mut config = enabled_config();
        config.clock_skew_secs = MAX_CLOCK_SKEW_SECS;
        assert!(config.validate().is_ok());

        config.clock_skew_secs = -1;
        assert!(config.validate().is_err());

        config.clock_skew_secs = 9_000_000_000_000;
        assert!(config.validate().unwrap_err().contains("clock_skew_secs"));
        assert_eq!(config.clock_skew(), Duration::seconds(MAX_CLOCK_SKEW_SECS));
    }

    #[test]
    fn test_advanced_override_satisfies_entity_id() {
        let mut config = enabled_config();
        config.entity_id = String::new();
        config.advanced = Some(AdvancedConfiguration::without_group_regex(
            None,
            None,
            Some("urn:sp:override".to_string()),
            None,
        ));
        assert!(config.validate().is_ok());
        assert_eq!(config.sp_entity_id(), "urn:sp:override");
    }

    #[test]
    fn test_invalid_advanced_rejected() {
        let mut config = enabled_config();
        config.advanced = Some(AdvancedConfiguration::new(
            None,
            None,
            None,
            None,
            Some("([".to_string()),
            Some("$1".to_string()),
        ));
        let err = config.validate().unwrap_err();
        assert!(err.contains("ERROR_INVALID_REGEX"));

        config.advanced = Some(AdvancedConfiguration::without_group_regex(
            None,
            None,
            None,
            Some(i64::from(i32::MAX) + 1),
        ));
        assert!(config.validate().unwrap_err().contains("ERROR_NOT_VALID_NUMBER"));
    }

    #[test]
    fn test_json_apply() {
        let json: SamlConfigJson = serde_json::from_str(
            r#"{
                "enabled": true,
                "entity-id": "https://sp.example.com",
                "acs-url": "https://sp.example.com/saml/acs",
                "idp-sso-url": "https://idp.example.com/sso",
                "groups-attribute": "memberOf",
                "advanced": {
                    "force-authn": true,
                    "sp-entity-id": "  ",
                    "maximum-session-lifetime": 600
                }
            }"#,
        )
        .unwrap();

        let mut config = SamlConfig::default();
        json.apply_to(&mut config);

        assert!(config.enabled);
        assert_eq!(config.groups_attribute, "memberOf");
        assert_eq!(config.clock_skew_secs, 300);
        assert_eq!(config.sp_entity_id(), "https://sp.example.com");
        assert_eq!(config.maximum_session_lifetime(), Some(600));
        assert!(config.advanced.as_ref().unwrap().force_authn());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_apply_replaces_advanced_wholesale() {
        let mut config = enabled_config();
        config.advanced = Some(AdvancedConfiguration::without_group_regex(
            Some(true),
            Some("urn:ctx".to_string()),
            None,
            Some(60),
        ));

        let json = SamlConfigJson {
            advanced: Some(AdvancedConfigurationJson {
                maximum_session_lifetime: Some(120),
                ..Default::default()
            }),
            ..Default::default()
        };
        json.apply_to(&mut config);

        let advanced = config.advanced.unwrap();
        assert!(!advanced.force_authn());
        assert_eq!(advanced.authn_context_class_ref(), None);
        assert_eq!(advanced.maximum_session_lifetime(), Some(120));
    }
}
