//! Request authorization policy
//!
//! An ordered list of `(path pattern, method, requirement)` rules evaluated
//! first-match-wins. More specific patterns must be declared before broader
//! ones. The last rule must be the `/**` catch-all requiring an
//! authenticated identity, so no path is left open by omission. If nothing
//! matches anyway the request is denied.

use geoinfo_types::Role;
use http::Method;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::{AuthError, PathPattern, PatternError, SecurityContext};

/// What a matching rule demands of the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Requirement {
    /// Allowed unconditionally, even with an invalid token
    Public,
    /// Bound identity must hold the role
    Role(Role),
    /// Any valid identity
    Authenticated,
}

impl std::fmt::Display for Requirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Public => f.write_str("public"),
            Self::Role(role) => write!(f, "role:{role}"),
            Self::Authenticated => f.write_str("authenticated"),
        }
    }
}

impl FromStr for Requirement {
    type Err = PolicyError;

    /// Parses `public`, `authenticated` or `role:<ROLE>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "public" | "permit_all" => Ok(Self::Public),
            "authenticated" => Ok(Self::Authenticated),
            _ => trimmed
                .split_once(':')
                .filter(|(kind, _)| kind.eq_ignore_ascii_case("role"))
                .and_then(|(_, role)| role.parse::<Role>().ok())
                .map(Self::Role)
                .ok_or_else(|| PolicyError::InvalidRequirement(trimmed.to_string())),
        }
    }
}

impl TryFrom<String> for Requirement {
    type Error = PolicyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Requirement> for String {
    fn from(requirement: Requirement) -> Self {
        requirement.to_string()
    }
}

/// One authorization rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRule {
    pub pattern: PathPattern,
    /// `None` matches any method
    pub method: Option<Method>,
    pub requirement: Requirement,
}

impl AuthRule {
    /// Rule applying to every method
    pub fn new(pattern: &str, requirement: Requirement) -> Result<Self, PolicyError> {
        Ok(Self {
            pattern: PathPattern::parse(pattern)?,
            method: None,
            requirement,
        })
    }

    /// Rule applying to one method only
    pub fn for_method(
        method: Method,
        pattern: &str,
        requirement: Requirement,
    ) -> Result<Self, PolicyError> {
        Ok(Self {
            method: Some(method),
            ..Self::new(pattern, requirement)?
        })
    }

    /// Terminal `/**` rule requiring authentication
    pub fn catch_all() -> Self {
        Self {
            pattern: PathPattern::catch_all(),
            method: None,
            requirement: Requirement::Authenticated,
        }
    }

    /// Whether the rule applies to every path and method
    pub fn is_catch_all(&self) -> bool {
        self.method.is_none() && self.pattern.is_catch_all()
    }

    pub fn matches(&self, path: &str, method: &Method) -> bool {
        self.method.as_ref().map_or(true, |m| m == method) && self.pattern.matches(path)
    }
}

/// Rule as written in configuration files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    pub requirement: Requirement,
}

impl TryFrom<RuleSpec> for AuthRule {
    type Error = PolicyError;

    fn try_from(spec: RuleSpec) -> Result<Self, Self::Error> {
        let method = match spec.method.as_deref().map(str::trim) {
            None | Some("*") | Some("") => None,
            Some(raw) => Some(
                Method::from_bytes(raw.to_ascii_uppercase().as_bytes())
                    .map_err(|_| PolicyError::InvalidMethod(raw.to_string()))?,
            ),
        };
        Ok(Self {
            pattern: PathPattern::parse(&spec.pattern)?,
            method,
            requirement: spec.requirement,
        })
    }
}

/// Why a request was denied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    /// No valid identity; `cause` carries the token error when one was presented
    Unauthenticated { cause: Option<AuthError> },
    /// Identity lacks the required role
    Forbidden { required: Role },
    /// No rule matched
    NoMatchingRule,
}

impl Denial {
    /// Error carrying the specific reason code
    pub fn into_error(self) -> AuthError {
        match self {
            Self::Unauthenticated { cause: Some(err) } => err,
            Self::Unauthenticated { cause: None } => AuthError::Unauthenticated,
            Self::Forbidden { required } => AuthError::Forbidden { required },
            Self::NoMatchingRule => AuthError::NoMatchingRule,
        }
    }
}

/// Authorization outcome for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Policy construction errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("the last rule must be the '/**' catch-all requiring authentication")]
    MissingCatchAll,

    #[error("rule #{index} ({pattern}) follows a catch-all and can never match")]
    UnreachableRule { index: usize, pattern: String },

    #[error("invalid requirement: {0}")]
    InvalidRequirement(String),

    #[error("invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// Validated, immutable rule list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationPolicy {
    rules: Vec<AuthRule>,
}

impl AuthorizationPolicy {
    /// Build a policy, enforcing the terminal catch-all invariant
    pub fn new(rules: Vec<AuthRule>) -> Result<Self, PolicyError> {
        if let Some(first_catch_all) = rules.iter().position(AuthRule::is_catch_all) {
            if let Some(unreachable) = rules.get(first_catch_all + 1) {
                return Err(PolicyError::UnreachableRule {
                    index: first_catch_all + 1,
                    pattern: unreachable.pattern.to_string(),
                });
            }
        }

        match rules.last() {
            Some(last)
                if last.is_catch_all() && last.requirement == Requirement::Authenticated => {}
            _ => return Err(PolicyError::MissingCatchAll),
        }

        Ok(Self { rules })
    }

    /// Build a policy from configuration entries
    pub fn from_specs(specs: Vec<RuleSpec>) -> Result<Self, PolicyError> {
        let rules = specs
            .into_iter()
            .map(AuthRule::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(rules)
    }

    pub fn rules(&self) -> &[AuthRule] {
        &self.rules
    }

    /// Decide whether a request may proceed
    pub fn evaluate(&self, path: &str, method: &Method, ctx: &SecurityContext) -> Decision {
        evaluate_rules(&self.rules, path, method, ctx)
    }

    /// Rules of the incident-reporting platform.
    ///
    /// Diagnostic endpoints (`/api/test`, `/api/debug/**`) are not public here
    /// and fall through to the authenticated catch-all; add them in a policy
    /// file for environments that need them.
    pub fn incident_platform() -> Self {
        use Requirement::{Public, Role as Needs};

        let public = [
            "/api/auth/**",
            "/api/health",
            "/api/incidents",
            "/api/incidents/by-email/**",
            "/api/incidents/carte",
            "/api/incidents/stats",
            "/api/statistiques",
            "/api/secteurs/**",
            "/api/provinces/**",
            "/uploads/**",
            "/api/public/**",
            "/swagger-ui/**",
            "/v3/api-docs/**",
            "/swagger-ui.html",
        ];

        let mut rules: Vec<AuthRule> = public
            .into_iter()
            .map(|pattern| rule(None, pattern, Public))
            .collect();

        rules.extend([
            rule(Some(Method::POST), "/api/citoyens/incidents", Public),
            rule(None, "/api/citoyens/**", Public),
            rule(None, "/api/admin/**", Needs(Role::Admin)),
            rule(None, "/api/professionnel/**", Needs(Role::Professionnel)),
            AuthRule::catch_all(),
        ]);

        Self { rules }
    }
}

fn rule(method: Option<Method>, pattern: &str, requirement: Requirement) -> AuthRule {
    AuthRule {
        pattern: PathPattern::parse(pattern).expect("built-in pattern is valid"),
        method,
        requirement,
    }
}

/// Walk `rules` in order and apply the first one matching the request.
///
/// Pure: the same inputs always give the same decision. Fails closed when no
/// rule matches.
pub fn evaluate_rules(
    rules: &[AuthRule],
    path: &str,
    method: &Method,
    ctx: &SecurityContext,
) -> Decision {
    let Some(rule) = rules.iter().find(|rule| rule.matches(path, method)) else {
        tracing::warn!(path, %method, "No authorization rule matched, denying");
        return Decision::Deny(Denial::NoMatchingRule);
    };

    let unauthenticated = || {
        Decision::Deny(Denial::Unauthenticated {
            cause: match ctx {
                SecurityContext::Rejected(err) => Some(err.clone()),
                _ => None,
            },
        })
    };

    match (rule.requirement, ctx) {
        (Requirement::Public, _) => Decision::Allow,
        (Requirement::Authenticated, SecurityContext::Authenticated(_)) => Decision::Allow,
        (Requirement::Role(required), SecurityContext::Authenticated(identity)) => {
            if identity.has_role(required) {
                Decision::Allow
            } else {
                Decision::Deny(Denial::Forbidden { required })
            }
        }
        _ => unauthenticated(),
    }
}
