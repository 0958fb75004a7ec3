//! Group authority granted from a SAML group attribute.

use serde::{Deserialize, Serialize};

/// A permission or role token attached to an authenticated principal.
pub trait Authority {
    /// The authority token.
    fn authority(&self) -> &str;
}

/// One group membership received in a SAML response.
///
/// The group name is kept verbatim. Callers are expected to pass a non-empty
/// name; nothing is checked here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupAuthority {
    group: String,
}

impl GroupAuthority {
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
        }
    }

    /// Consume the authority and return the group name.
    pub fn into_inner(self) -> String {
        self.group
    }
}

impl Authority for GroupAuthority {
    fn authority(&self) -> &str {
        &self.group
    }
}

impl std::fmt::Display for GroupAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.group)
    }
}

impl From<String> for GroupAuthority {
    fn from(group: String) -> Self {
        Self { group }
    }
}

impl From<&str> for GroupAuthority {
    fn from(group: &str) -> Self {
        Self::new(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_authority_is_group_name() {
        let authority = GroupAuthority::new("admins");
        assert_eq!(authority.authority(), "admins");
        assert_eq!(authority.to_string(), "admins");
        assert_eq!(GroupAuthority::from(authority.to_string()), authority);
    }

    #[test]
    fn test_equality_by_name() {
        let mut set = HashSet::new();
        set.insert(GroupAuthority::new("devs"));
        set.insert(GroupAuthority::from("devs"));
        set.insert(GroupAuthority::from("ops".to_string()));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let json = serde_json::to_string(&GroupAuthority::new("admins")).unwrap();
        assert_eq!(json, "\"admins\"");

        let parsed: GroupAuthority = serde_json::from_str("\"ops\"").unwrap();
        assert_eq!(parsed.into_inner(), "ops");
    }
}
