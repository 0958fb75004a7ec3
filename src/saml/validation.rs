//! Form field validation for the advanced options.
//!
//! Checks are advisory. They tell a configuration UI what to flag; they do
//! not gate construction of [`AdvancedConfiguration`].

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use super::advanced::{AdvancedConfiguration, AdvancedConfigurationJson};
use super::error::ValidationErrorKind;

/// Display name shown for the advanced options section.
pub const ADVANCED_CONFIGURATION_DISPLAY_NAME: &str = "Advanced Configuration";

/// Largest accepted maximum session lifetime, in seconds.
pub const MAX_SESSION_LIFETIME_SECS: i64 = i32::MAX as i64;

/// Outcome of a single field check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "error", rename_all = "snake_case")]
pub enum FormValidation {
    Ok,
    Error(ValidationErrorKind),
}

impl FormValidation {
    pub fn is_ok(&self) -> bool {
        matches!(self, FormValidation::Ok)
    }

    pub fn error(&self) -> Option<ValidationErrorKind> {
        match self {
            FormValidation::Ok => None,
            FormValidation::Error(kind) => Some(*kind),
        }
    }

    /// Convert to a `Result` for `?` chaining.
    pub fn into_result(self) -> Result<(), ValidationErrorKind> {
        match self {
            FormValidation::Ok => Ok(()),
            FormValidation::Error(kind) => Err(kind),
        }
    }
}

/// A single-field check taking the raw form value.
pub type FieldCheck = fn(Option<&str>) -> FormValidation;

/// A check taking the raw field value and the value of the field it depends on.
pub type DependentFieldCheck = fn(Option<&str>, Option<&str>) -> FormValidation;

/// Stateless checks over raw form values.
pub struct FieldValidator;

impl FieldValidator {
    /// Empty or missing is fine; present but all whitespace is not.
    pub fn check_non_blank_optional(value: Option<&str>) -> FormValidation {
        match value {
            None => FormValidation::Ok,
            Some(v) if v.is_empty() => FormValidation::Ok,
            Some(v) if v.trim().is_empty() => {
                FormValidation::Error(ValidationErrorKind::OnlySpacesFieldValue)
            }
            Some(_) => FormValidation::Ok,
        }
    }

    pub fn check_authn_context_class_ref(value: Option<&str>) -> FormValidation {
        Self::check_non_blank_optional(value)
    }

    pub fn check_sp_entity_id(value: Option<&str>) -> FormValidation {
        Self::check_non_blank_optional(value)
    }

    /// Lifetime must be an integer in `0..=i32::MAX`. Empty is allowed.
    pub fn check_maximum_session_lifetime(value: Option<&str>) -> FormValidation {
        let raw = match value {
            None => return FormValidation::Ok,
            Some(v) if v.is_empty() => return FormValidation::Ok,
            Some(v) => v,
        };

        match raw.parse::<i64>() {
            Ok(secs) => Self::check_lifetime_range(secs),
            Err(e) => {
                debug!(value = %raw, error = %e, "Maximum session lifetime is not a number");
                FormValidation::Error(ValidationErrorKind::NotValidNumber)
            }
        }
    }

    fn check_lifetime_range(secs: i64) -> FormValidation {
        if !(0..=MAX_SESSION_LIFETIME_SECS).contains(&secs) {
            return FormValidation::Error(ValidationErrorKind::NotValidNumber);
        }
        FormValidation::Ok
    }

    /// Pattern must compile. Empty is allowed.
    pub fn check_group_regex_pattern(value: Option<&str>) -> FormValidation {
        match value {
            None => FormValidation::Ok,
            Some(v) if v.is_empty() => FormValidation::Ok,
            Some(pattern) => match Regex::new(pattern) {
                Ok(_) => FormValidation::Ok,
                Err(e) => {
                    debug!(pattern = %pattern, error = %e, "Group regex pattern rejected");
                    FormValidation::Error(ValidationErrorKind::InvalidRegex)
                }
            },
        }
    }

    /// Pattern and replacement are set together or not at all.
    pub fn check_group_regex_pair(pattern: Option<&str>, replace: Option<&str>) -> FormValidation {
        let has_pattern = pattern.is_some_and(|p| !p.is_empty());
        if has_pattern != replace.is_some() {
            return FormValidation::Error(ValidationErrorKind::IncompleteRegexPair);
        }
        FormValidation::Ok
    }

    /// Replacement must be paired with a pattern and may only refer to capture
    /// groups that pattern defines.
    pub fn check_group_regex_replace(
        replace: Option<&str>,
        pattern: Option<&str>,
    ) -> FormValidation {
        let pair = Self::check_group_regex_pair(pattern, replace);
        if !pair.is_ok() {
            return pair;
        }

        match (pattern, replace) {
            (Some(pattern), Some(replace)) if !pattern.is_empty() => {
                Self::check_group_references(pattern, replace)
            }
            _ => FormValidation::Ok,
        }
    }

    fn check_group_references(pattern: &str, replace: &str) -> FormValidation {
        // An uncompilable pattern is reported against the pattern field
        let Ok(regex) = Regex::new(pattern) else {
            return FormValidation::Ok;
        };

        let unknown = template_references(replace)
            .into_iter()
            .find(|name| match name.parse::<usize>() {
                Ok(index) => index >= regex.captures_len(),
                Err(_) => !regex.capture_names().flatten().any(|n| n == *name),
            });

        match unknown {
            Some(name) => {
                debug!(pattern = %pattern, reference = %name, "Group regex replacement rejected");
                FormValidation::Error(ValidationErrorKind::UnknownGroupReference)
            }
            None => FormValidation::Ok,
        }
    }

    /// Run every field check over a raw form payload.
    ///
    /// Returns the failing fields by form name, in form order.
    pub fn check_form(form: &AdvancedConfigurationJson) -> Vec<(&'static str, ValidationErrorKind)> {
        let lifetime = form.maximum_session_lifetime.map(|secs| secs.to_string());
        let checks = [
            (
                "authn-context-class-ref",
                Self::check_authn_context_class_ref(form.authn_context_class_ref.as_deref()),
            ),
            ("sp-entity-id", Self::check_sp_entity_id(form.sp_entity_id.as_deref())),
            (
                "maximum-session-lifetime",
                Self::check_maximum_session_lifetime(lifetime.as_deref()),
            ),
            (
                "group-regex-pattern",
                Self::check_group_regex_pattern(form.group_regex_pattern.as_deref()),
            ),
            (
                "group-regex-replace",
                Self::check_group_regex_replace(
                    form.group_regex_replace.as_deref(),
                    form.group_regex_pattern.as_deref(),
                ),
            ),
        ];

        checks
            .into_iter()
            .filter_map(|(field, check)| check.error().map(|kind| (field, kind)))
            .collect()
    }

    /// Check an already constructed configuration, returning the first failure.
    pub fn check_advanced(config: &AdvancedConfiguration) -> FormValidation {
        let checks = [
            Self::check_authn_context_class_ref(config.authn_context_class_ref()),
            Self::check_sp_entity_id(config.sp_entity_id()),
            config
                .maximum_session_lifetime()
                .map(Self::check_lifetime_range)
                .unwrap_or(FormValidation::Ok),
            Self::check_group_regex_pattern(config.group_regex_pattern()),
            Self::check_group_regex_replace(
                config.group_regex_replace(),
                config.group_regex_pattern(),
            ),
        ];

        checks
            .into_iter()
            .find(|check| !check.is_ok())
            .unwrap_or(FormValidation::Ok)
    }
}

/// Capture group names referenced by a replacement template.
///
/// Follows the regex crate's expansion rules: `$$` is a literal dollar,
/// `${name}` is braced, and `$name` takes the longest run of letters, digits
/// and underscores (so `$1_team` names the group `1_team`).
fn template_references(template: &str) -> Vec<&str> {
    let mut refs = Vec::new();
    let mut rest = template;

    while let Some(pos) = rest.find('$') {
        rest = &rest[pos + 1..];

        if let Some(after) = rest.strip_prefix('$') {
            rest = after;
            continue;
        }

        if let Some(braced) = rest.strip_prefix('{') {
            if let Some(end) = braced.find('}') {
                refs.push(&braced[..end]);
                rest = &braced[end + 1..];
            }
            continue;
        }

        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        if len > 0 {
            refs.push(&rest[..len]);
            rest = &rest[len..];
        }
    }

    refs
}

/// Metadata a host UI queries to render and validate a configuration section.
pub trait Descriptor {
    fn display_name(&self) -> &'static str;

    /// Field name to check, in form order.
    fn validators(&self) -> Vec<(&'static str, FieldCheck)>;

    /// Run the check registered for `field`, if any.
    fn check_field(&self, field: &str, value: Option<&str>) -> Option<FormValidation> {
        self.validators()
            .into_iter()
            .find(|(name, _)| *name == field)
            .map(|(_, check)| check(value))
    }

    /// Fields whose check also needs another field: (field, depends on, check).
    fn dependent_validators(&self) -> Vec<(&'static str, &'static str, DependentFieldCheck)> {
        Vec::new()
    }

    /// Run the dependent check registered for `field`, if any.
    fn check_dependent_field(
        &self,
        field: &str,
        value: Option<&str>,
        depends_on_value: Option<&str>,
    ) -> Option<FormValidation> {
        self.dependent_validators()
            .into_iter()
            .find(|(name, _, _)| *name == field)
            .map(|(_, _, check)| check(value, depends_on_value))
    }
}

/// Descriptor for [`AdvancedConfiguration`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AdvancedConfigurationDescriptor;

impl Descriptor for AdvancedConfigurationDescriptor {
    fn display_name(&self) -> &'static str {
        ADVANCED_CONFIGURATION_DISPLAY_NAME
    }

    fn validators(&self) -> Vec<(&'static str, FieldCheck)> {
        vec![
            (
                "authn-context-class-ref",
                FieldValidator::check_authn_context_class_ref as FieldCheck,
            ),
            ("sp-entity-id", FieldValidator::check_sp_entity_id as FieldCheck),
            (
                "maximum-session-lifetime",
                FieldValidator::check_maximum_session_lifetime as FieldCheck,
            ),
            ("group-regex-pattern", FieldValidator::check_group_regex_pattern as FieldCheck),
        ]
    }

    fn dependent_validators(&self) -> Vec<(&'static str, &'static str, DependentFieldCheck)> {
        vec![(
            "group-regex-replace",
            "group-regex-pattern",
            FieldValidator::check_group_regex_replace as DependentFieldCheck,
        )]
    }
}
