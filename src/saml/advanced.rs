//! Advanced SAML options.
//!
//! Optional protocol tuning knobs saved alongside the realm configuration:
//! forced re-authentication, requested authentication context, SP entity id
//! override, maximum authentication lifetime and the group rewrite pair.

use serde::{Deserialize, Serialize};

/// Immutable advanced SAML configuration.
///
/// Construction never fails. Optional strings are trimmed and empty values
/// become `None`; the lifetime and the regex pair are stored as given.
/// Range and syntax checks belong to [`super::validation::FieldValidator`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "AdvancedConfigurationJson", into = "AdvancedConfigurationJson")]
pub struct AdvancedConfiguration {
    force_authn: bool,
    authn_context_class_ref: Option<String>,
    sp_entity_id: Option<String>,
    maximum_session_lifetime: Option<i64>,
    group_regex_pattern: Option<String>,
    group_regex_replace: Option<String>,
}

impl AdvancedConfiguration {
    pub fn new(
        force_authn: Option<bool>,
        authn_context_class_ref: Option<String>,
        sp_entity_id: Option<String>,
        maximum_session_lifetime: Option<i64>,
        group_regex_pattern: Option<String>,
        group_regex_replace: Option<String>,
    ) -> Self {
        Self {
            force_authn: force_authn.unwrap_or(false),
            authn_context_class_ref: fix_empty_and_trim(authn_context_class_ref),
            sp_entity_id: fix_empty_and_trim(sp_entity_id),
            maximum_session_lifetime,
            group_regex_pattern,
            group_regex_replace,
        }
    }

    /// Build without a group rewrite pair.
    pub fn without_group_regex(
        force_authn: Option<bool>,
        authn_context_class_ref: Option<String>,
        sp_entity_id: Option<String>,
        maximum_session_lifetime: Option<i64>,
    ) -> Self {
        Self::new(
            force_authn,
            authn_context_class_ref,
            sp_entity_id,
            maximum_session_lifetime,
            None,
            None,
        )
    }

    pub fn force_authn(&self) -> bool {
        self.force_authn
    }

    pub fn authn_context_class_ref(&self) -> Option<&str> {
        self.authn_context_class_ref.as_deref()
    }

    pub fn sp_entity_id(&self) -> Option<&str> {
        self.sp_entity_id.as_deref()
    }

    /// Maximum authentication lifetime in seconds.
    pub fn maximum_session_lifetime(&self) -> Option<i64> {
        self.maximum_session_lifetime
    }

    pub fn group_regex_pattern(&self) -> Option<&str> {
        self.group_regex_pattern.as_deref()
    }

    pub fn group_regex_replace(&self) -> Option<&str> {
        self.group_regex_replace.as_deref()
    }

    /// The rewrite pair, when both halves are set and the pattern is non-empty.
    pub fn group_rewrite(&self) -> Option<(&str, &str)> {
        match (self.group_regex_pattern(), self.group_regex_replace()) {
            (Some(pattern), Some(replace)) if !pattern.is_empty() => Some((pattern, replace)),
            _ => None,
        }
    }
}

impl std::fmt::Display for AdvancedConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SamlAdvancedConfiguration{{forceAuthn={}, authnContextClassRef='{}', spEntityId='{}', maximumSessionLifetime={}, groupRegexPattern={}, groupRegexReplace={}}}",
            self.force_authn,
            self.authn_context_class_ref().unwrap_or("none"),
            self.sp_entity_id().unwrap_or("none"),
            self.maximum_session_lifetime
                .map(|secs| secs.to_string())
                .unwrap_or_else(|| "none".to_string()),
            self.group_regex_pattern().unwrap_or("none"),
            self.group_regex_replace().unwrap_or("none"),
        )
    }
}

/// Trim a value; blank or missing becomes `None`.
fn fix_empty_and_trim(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Raw advanced options as submitted by a configuration form.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct AdvancedConfigurationJson {
    pub force_authn: Option<bool>,
    pub authn_context_class_ref: Option<String>,
    pub sp_entity_id: Option<String>,
    pub maximum_session_lifetime: Option<i64>,
    pub group_regex_pattern: Option<String>,
    pub group_regex_replace: Option<String>,
}

impl From<AdvancedConfigurationJson> for AdvancedConfiguration {
    fn from(json: AdvancedConfigurationJson) -> Self {
        Self::new(
            json.force_authn,
            json.authn_context_class_ref,
            json.sp_entity_id,
            json.maximum_session_lifetime,
            json.group_regex_pattern,
            json.group_regex_replace,
        )
    }
}

impl From<AdvancedConfiguration> for AdvancedConfigurationJson {
    fn from(config: AdvancedConfiguration) -> Self {
        Self {
            force_authn: Some(config.force_authn),
            authn_context_class_ref: config.authn_context_class_ref,
            sp_entity_id: config.sp_entity_id,
            maximum_session_lifetime: config.maximum_session_lifetime,
            group_regex_pattern: config.group_regex_pattern,
            group_regex_replace: config.group_regex_replace,
        }
    }
}
