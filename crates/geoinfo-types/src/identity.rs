//! Identity types

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::{Role, TypesError};

/// Login identifier of a stored principal (the e-mail on the incident platform).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Parse a username, trimming surrounding whitespace
    pub fn parse(s: &str) -> Result<Self, TypesError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(TypesError::EmptyUsername);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Username {
    type Error = TypesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Username> for String {
    fn from(username: Username) -> Self {
        username.0
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Resolved principal: who the caller is and which roles they hold.
///
/// An empty role set is valid and describes a plain authenticated citizen
/// account without elevated access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: Username,
    #[serde(default)]
    pub roles: BTreeSet<Role>,
}

impl Identity {
    /// Create an identity from a username and its roles
    pub fn new(username: Username, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            username,
            roles: roles.into_iter().collect(),
        }
    }

    /// Check whether the identity holds a role
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Check whether the identity is an administrator
    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    /// Highest-privilege role held, if any
    pub fn primary_role(&self) -> Option<Role> {
        self.roles.iter().next_back().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_trims() {
        let username = Username::parse("  agent@geoinfo.ma ").unwrap();
        assert_eq!(username.as_str(), "agent@geoinfo.ma");
        assert_eq!(Username::parse("   "), Err(TypesError::EmptyUsername));
    }

    #[test]
    fn test_username_serde_rejects_empty() {
        let parsed: Result<Username, _> = serde_json::from_str("\"\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_identity_roles() {
        let identity = Identity::new(
            Username::parse("pro@geoinfo.ma").unwrap(),
            [Role::Professionnel, Role::Citoyen],
        );
        assert!(identity.has_role(Role::Professionnel));
        assert!(!identity.is_admin());
        assert_eq!(identity.primary_role(), Some(Role::Professionnel));
    }

    #[test]
    fn test_identity_without_roles() {
        let identity = Identity::new(Username::parse("citizen@geoinfo.ma").unwrap(), []);
        assert_eq!(identity.primary_role(), None);
    }
}
