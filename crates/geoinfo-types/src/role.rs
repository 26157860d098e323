//! Role labels

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::TypesError;

/// Role label carried by an identity and checked by role-gated rules.
///
/// Ordering follows privilege: `Citoyen < Professionnel < Admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Citizen reporting incidents
    Citoyen,
    /// Professional handling incidents for a sector
    Professionnel,
    /// Platform administrator
    Admin,
}

impl Role {
    /// All known roles, lowest privilege first
    pub const ALL: [Role; 3] = [Role::Citoyen, Role::Professionnel, Role::Admin];

    /// Upper-case label used on the wire and in policy files
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Citoyen => "CITOYEN",
            Self::Professionnel => "PROFESSIONNEL",
            Self::Admin => "ADMIN",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = TypesError;

    /// Accepts `ADMIN`, `admin` and the authority form `ROLE_ADMIN`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let upper = trimmed.to_ascii_uppercase();
        let label = upper.strip_prefix("ROLE_").unwrap_or(&upper);
        match label {
            "CITOYEN" => Ok(Self::Citoyen),
            "PROFESSIONNEL" => Ok(Self::Professionnel),
            "ADMIN" => Ok(Self::Admin),
            _ => Err(TypesError::UnknownRole(trimmed.to_string())),
        }
    }
}
