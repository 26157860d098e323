//! Cross-origin request policy
//!
//! Evaluated before authentication on every request, preflights included.
//! A matched origin is echoed back verbatim, never as a bare `*`, so
//! credentialed requests keep working. An unmatched origin gets no CORS
//! headers at all and the browser blocks the response on its side; the
//! server does not treat that as an error.

use http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS, ACCESS_CONTROL_MAX_AGE,
    ACCESS_CONTROL_REQUEST_HEADERS, ACCESS_CONTROL_REQUEST_METHOD, ORIGIN, VARY,
};
use http::{HeaderMap, HeaderName, HeaderValue, Method, Request};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::glob::wildcard_match;
use crate::{PathPattern, PatternError};

/// `Vary` value for actual requests
pub const VARY_ACTUAL: &str = "Origin";
/// `Vary` value for preflight responses
pub const VARY_PREFLIGHT: &str =
    "Origin, Access-Control-Request-Method, Access-Control-Request-Headers";

/// Longest `Origin` value considered: scheme, a maximal DNS name and a port
pub const MAX_ORIGIN_LEN: usize = "https://".len() + 253 + ":65535".len();

/// CORS configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CorsConfigError {
    #[error("credentials cannot be combined with a bare '*' origin; use a pattern such as https://*.example.com")]
    WildcardOriginWithCredentials,

    #[error("credentials cannot be combined with a '*' exposed header list")]
    WildcardExposeWithCredentials,

    #[error("invalid origin pattern: {0}")]
    InvalidOrigin(String),

    #[error("invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("invalid header name: {0}")]
    InvalidHeader(String),

    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// Allowed origin, exact or with `*` wildcards.
///
/// `*` inside the host matches one or more host characters
/// (`https://*.ngrok-free.app`); a trailing `:*` accepts any port or none
/// (`http://localhost:*`). Comparison ignores ASCII case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginPattern {
    raw: String,
    base: String,
    any_port: bool,
}

impl OriginPattern {
    pub fn parse(raw: &str) -> Result<Self, CorsConfigError> {
        let normalized = raw.trim().trim_end_matches('/').to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(CorsConfigError::InvalidOrigin(raw.to_string()));
        }
        if normalized == "*" {
            return Ok(Self {
                raw: raw.to_string(),
                base: normalized,
                any_port: false,
            });
        }
        if !normalized.contains("://") {
            return Err(CorsConfigError::InvalidOrigin(raw.to_string()));
        }

        let (base, any_port) = match normalized.strip_suffix(":*") {
            Some(base) => (base.to_string(), true),
            None => (normalized, false),
        };

        Ok(Self {
            raw: raw.to_string(),
            base,
            any_port,
        })
    }

    /// Whether this is the unconstrained `*` origin
    pub fn is_any(&self) -> bool {
        self.base == "*"
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Check an `Origin` header value
    pub fn matches(&self, origin: &str) -> bool {
        if self.is_any() {
            return true;
        }
        let origin = origin.trim().to_ascii_lowercase();
        if self.base_matches(&origin) {
            return true;
        }
        if !self.any_port {
            return false;
        }
        match origin.rsplit_once(':') {
            Some((host, port))
                if host.contains("://")
                    && !port.is_empty()
                    && port.bytes().all(|b| b.is_ascii_digit()) =>
            {
                self.base_matches(host)
            }
            _ => false,
        }
    }

    fn base_matches(&self, candidate: &str) -> bool {
        wildcard_match(self.base.as_bytes(), candidate.as_bytes(), 1, &is_host_byte)
    }
}

fn is_host_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'.' || b == b'-'
}

/// Request headers a preflight may ask for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedHeaders {
    /// Mirror whatever the preflight requests
    Any,
    List(Vec<HeaderName>),
}

/// CORS settings for requests whose path matches `path`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsRule {
    pub path: PathPattern,
    pub allowed_origin_patterns: Vec<OriginPattern>,
    pub allowed_methods: Vec<Method>,
    pub allowed_headers: AllowedHeaders,
    pub exposed_headers: Vec<HeaderName>,
    pub allow_credentials: bool,
    pub max_age: Duration,
}

impl CorsRule {
    fn validate(&self) -> Result<(), CorsConfigError> {
        if self.allow_credentials && self.allowed_origin_patterns.iter().any(OriginPattern::is_any) {
            return Err(CorsConfigError::WildcardOriginWithCredentials);
        }
        Ok(())
    }

    /// Whether an `Origin` header value is allowed by this rule. Values
    /// longer than [`MAX_ORIGIN_LEN`] never are.
    pub fn allows_origin(&self, origin: &str) -> bool {
        origin.len() <= MAX_ORIGIN_LEN
            && self.allowed_origin_patterns.iter().any(|p| p.matches(origin))
    }

    fn method_allowed(&self, method: &str) -> bool {
        self.allowed_methods.iter().any(|m| m.as_str() == method)
    }

    /// Headers to grant for a preflight, or `None` when one is not allowed
    fn granted_headers(&self, requested: Option<&str>) -> Option<Option<String>> {
        let requested: Vec<String> = requested
            .unwrap_or_default()
            .split(',')
            .map(|h| h.trim().to_ascii_lowercase())
            .filter(|h| !h.is_empty())
            .collect();

        if requested.is_empty() {
            return Some(None);
        }

        match &self.allowed_headers {
            AllowedHeaders::Any => Some(Some(requested.join(", "))),
            AllowedHeaders::List(allowed) => {
                let all_allowed = requested
                    .iter()
                    .all(|h| allowed.iter().any(|a| a.as_str() == h.as_str()));
                all_allowed.then(|| Some(requested.join(", ")))
            }
        }
    }
}

/// CORS rule as written in configuration files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorsRuleSpec {
    #[serde(default = "default_cors_path")]
    pub path: String,
    pub allowed_origin_patterns: Vec<String>,
    #[serde(default = "default_cors_methods")]
    pub allowed_methods: Vec<String>,
    #[serde(default = "default_cors_headers")]
    pub allowed_headers: Vec<String>,
    #[serde(default)]
    pub exposed_headers: Vec<String>,
    #[serde(default)]
    pub allow_credentials: bool,
    /// Preflight cache lifetime in seconds
    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
}

fn default_cors_path() -> String {
    "/**".to_string()
}

fn default_cors_methods() -> Vec<String> {
    ["GET", "POST", "PUT", "DELETE", "OPTIONS", "PATCH"]
        .map(String::from)
        .to_vec()
}

fn default_cors_headers() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_cors_max_age() -> u64 {
    3600
}

impl TryFrom<CorsRuleSpec> for CorsRule {
    type Error = CorsConfigError;

    fn try_from(spec: CorsRuleSpec) -> Result<Self, Self::Error> {
        if spec.allow_credentials && spec.exposed_headers.iter().any(|h| h.trim() == "*") {
            return Err(CorsConfigError::WildcardExposeWithCredentials);
        }

        let allowed_origin_patterns = spec
            .allowed_origin_patterns
            .iter()
            .map(|o| OriginPattern::parse(o))
            .collect::<Result<Vec<_>, _>>()?;

        let allowed_methods = spec
            .allowed_methods
            .iter()
            .map(|m| {
                Method::from_bytes(m.trim().to_ascii_uppercase().as_bytes())
                    .map_err(|_| CorsConfigError::InvalidMethod(m.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let allowed_headers = if spec.allowed_headers.iter().any(|h| h.trim() == "*") {
            AllowedHeaders::Any
        } else {
            AllowedHeaders::List(parse_header_names(&spec.allowed_headers)?)
        };

        Ok(Self {
            path: PathPattern::parse(&spec.path)?,
            allowed_origin_patterns,
            allowed_methods,
            allowed_headers,
            exposed_headers: parse_header_names(&spec.exposed_headers)?,
            allow_credentials: spec.allow_credentials,
            max_age: Duration::from_secs(spec.max_age),
        })
    }
}

fn parse_header_names(names: &[String]) -> Result<Vec<HeaderName>, CorsConfigError> {
    names
        .iter()
        .map(|h| {
            HeaderName::from_bytes(h.trim().to_ascii_lowercase().as_bytes())
                .map_err(|_| CorsConfigError::InvalidHeader(h.clone()))
        })
        .collect()
}

/// CORS-relevant view of one request
#[derive(Debug, Clone, Copy)]
pub struct CorsRequest<'a> {
    pub path: &'a str,
    pub method: &'a Method,
    pub origin: Option<&'a str>,
    pub request_method: Option<&'a str>,
    pub request_headers: Option<&'a str>,
}

impl<'a> CorsRequest<'a> {
    /// Borrow the CORS fields out of an HTTP request
    pub fn from_request<B>(req: &'a Request<B>) -> Self {
        Self {
            path: req.uri().path(),
            method: req.method(),
            origin: header_str(req, &ORIGIN),
            request_method: header_str(req, &ACCESS_CONTROL_REQUEST_METHOD),
            request_headers: header_str(req, &ACCESS_CONTROL_REQUEST_HEADERS),
        }
    }

    /// Browser preflight: `OPTIONS` with `Origin` and a requested method
    pub fn is_preflight(&self) -> bool {
        *self.method == Method::OPTIONS && self.origin.is_some() && self.request_method.is_some()
    }
}

fn header_str<'a, B>(req: &'a Request<B>, name: &HeaderName) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

/// Result of CORS evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsDecision {
    /// No `Origin` header: not a cross-origin request
    NotCors,
    /// Cross-origin request not permitted; respond without CORS headers
    Rejected { preflight: bool },
    /// Permitted preflight; answer with these headers
    Preflight(HeaderMap),
    /// Permitted actual request; append these headers to the response
    Actual(HeaderMap),
}

/// Ordered CORS rules, first path match applies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsPolicy {
    rules: Vec<CorsRule>,
}

impl CorsPolicy {
    pub fn new(rules: Vec<CorsRule>) -> Result<Self, CorsConfigError> {
        for rule in &rules {
            rule.validate()?;
        }
        Ok(Self { rules })
    }

    pub fn from_specs(specs: Vec<CorsRuleSpec>) -> Result<Self, CorsConfigError> {
        let rules = specs
            .into_iter()
            .map(CorsRule::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(rules)
    }

    pub fn rules(&self) -> &[CorsRule] {
        &self.rules
    }

    /// Position of the first rule whose path pattern matches `path`
    pub fn rule_index(&self, path: &str) -> Option<usize> {
        self.rules.iter().position(|r| r.path.matches(path))
    }

    /// First rule whose path pattern matches `path`
    pub fn rule_for(&self, path: &str) -> Option<&CorsRule> {
        self.rule_index(path).map(|i| &self.rules[i])
    }

    /// Decide which CORS headers, if any, a request gets
    pub fn evaluate(&self, req: &CorsRequest<'_>) -> CorsDecision {
        let Some(origin) = req.origin else {
            return CorsDecision::NotCors;
        };
        let preflight = req.is_preflight();
        let rejected = CorsDecision::Rejected { preflight };

        let Some(rule) = self.rule_for(req.path) else {
            tracing::debug!(path = req.path, "No CORS rule for path");
            return rejected;
        };

        if !rule.allows_origin(origin) {
            tracing::debug!(path = req.path, origin_len = origin.len(), "Origin not allowed");
            return rejected;
        }

        let Ok(origin_value) = HeaderValue::from_str(origin) else {
            return rejected;
        };

        let mut headers = HeaderMap::new();
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin_value);
        if rule.allow_credentials {
            headers.insert(
                ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }

        if !preflight {
            if !rule.exposed_headers.is_empty() {
                if let Ok(value) = HeaderValue::from_str(&join_names(&rule.exposed_headers)) {
                    headers.insert(ACCESS_CONTROL_EXPOSE_HEADERS, value);
                }
            }
            headers.insert(VARY, HeaderValue::from_static(VARY_ACTUAL));
            return CorsDecision::Actual(headers);
        }

        let requested_method = req.request_method.unwrap_or_default().trim();
        if !rule.method_allowed(requested_method) {
            tracing::debug!(origin, requested_method, "Preflight method not allowed");
            return rejected;
        }

        let Some(granted) = rule.granted_headers(req.request_headers) else {
            tracing::debug!(origin, "Preflight requested a header that is not allowed");
            return rejected;
        };

        let methods = rule
            .allowed_methods
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        if let Ok(value) = HeaderValue::from_str(&methods) {
            headers.insert(ACCESS_CONTROL_ALLOW_METHODS, value);
        }
        if let Some(value) = granted.and_then(|g| HeaderValue::from_str(&g).ok()) {
            headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, value);
        }
        headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from(rule.max_age.as_secs()));
        headers.insert(VARY, HeaderValue::from_static(VARY_PREFLIGHT));

        CorsDecision::Preflight(headers)
    }

    /// Origins of the incident-reporting platform: local development,
    /// private networks for device testing, and hosted deployments.
    pub fn incident_platform() -> Self {
        let spec = CorsRuleSpec {
            path: default_cors_path(),
            allowed_origin_patterns: [
                "http://localhost:*",
                "https://localhost:*",
                "http://127.0.0.1:*",
                "https://127.0.0.1:*",
                "http://192.168.*.*:*",
                "https://192.168.*.*:*",
                "http://10.*.*.*:*",
                "https://10.*.*.*:*",
                "https://*.netlify.app",
                "https://*.ngrok-free.app",
                "https://*.ngrok-free.dev",
                "https://*.ngrok.io",
            ]
            .map(String::from)
            .to_vec(),
            allowed_methods: default_cors_methods(),
            allowed_headers: default_cors_headers(),
            exposed_headers: ["Authorization", "Content-Type", "Content-Disposition"]
                .map(String::from)
                .to_vec(),
            allow_credentials: true,
            max_age: default_cors_max_age(),
        };
        Self::from_specs(vec![spec]).expect("built-in CORS policy is valid")
    }
}

fn join_names(names: &[HeaderName]) -> String {
    names
        .iter()
        .map(HeaderName::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
