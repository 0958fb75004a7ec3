//! Group name rewriting.
//!
//! Applies the configured pattern/replacement pair to raw SAML group
//! attribute values and produces [`GroupAuthority`] values. Compiled patterns
//! are cached by source string so each pattern is compiled once.

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

use super::advanced::AdvancedConfiguration;
use super::authority::GroupAuthority;

/// Maps raw group attribute values to authorities.
pub struct GroupRegexMapper {
    /// Compiled patterns: pattern source -> regex
    compiled: RwLock<HashMap<String, Arc<Regex>>>,
}

impl Default for GroupRegexMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupRegexMapper {
    pub fn new() -> Self {
        Self {
            compiled: RwLock::new(HashMap::new()),
        }
    }

    /// Number of patterns compiled so far.
    pub fn cached_patterns(&self) -> usize {
        self.compiled.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Get the compiled regex for `pattern`, compiling it on first use.
    pub fn compile(&self, pattern: &str) -> Result<Arc<Regex>> {
        {
            let compiled = self.compiled.read().map_err(|_| anyhow!("Lock poisoned"))?;
            if let Some(regex) = compiled.get(pattern) {
                return Ok(Arc::clone(regex));
            }
        }

        let regex = Arc::new(
            Regex::new(pattern)
                .with_context(|| format!("Invalid group regex pattern '{}'", pattern))?,
        );

        let mut compiled = self.compiled.write().map_err(|_| anyhow!("Lock poisoned"))?;
        // Another thread may have compiled it while we were unlocked
        let entry = compiled
            .entry(pattern.to_string())
            .or_insert_with(|| Arc::clone(&regex));
        debug!(pattern = %pattern, "Compiled group regex pattern");
        Ok(Arc::clone(entry))
    }

    /// Effective group name for one raw value.
    ///
    /// Without a complete rewrite pair the value passes through unchanged.
    /// With one, a matching value becomes the replacement template expanded
    /// with the first match's captures (`$1` / `${name}` syntax). Text outside
    /// the match is not kept, so an unanchored pattern still yields just the
    /// replacement. Values that do not match pass through. A blank result
    /// drops the group.
    pub fn map_group(
        &self,
        raw: &str,
        config: Option<&AdvancedConfiguration>,
    ) -> Option<GroupAuthority> {
        let rewrite = config.and_then(|c| c.group_rewrite());

        let group = match rewrite {
            None => raw.to_string(),
            Some((pattern, replace)) => match self.compile(pattern) {
                Ok(regex) => match regex.captures(raw) {
                    Some(caps) => {
                        let mut group = String::new();
                        caps.expand(replace, &mut group);
                        group
                    }
                    None => raw.to_string(),
                },
                Err(e) => {
                    warn!(error = %e, group = %raw, "Group rewrite skipped");
                    raw.to_string()
                }
            },
        };

        if group.trim().is_empty() {
            debug!(group = %raw, "Dropping blank group");
            return None;
        }

        Some(GroupAuthority::new(group))
    }

    /// Map all values of a group attribute, dropping blanks and duplicates.
    ///
    /// Order follows first appearance in `raw`.
    pub fn map_groups<S: AsRef<str>>(
        &self,
        raw: &[S],
        config: Option<&AdvancedConfiguration>,
    ) -> Vec<GroupAuthority> {
        let mut seen = HashSet::new();
        raw.iter()
            .filter_map(|value| self.map_group(value.as_ref(), config))
            .filter(|authority| seen.insert(authority.clone()))
            .collect()
    }
}
