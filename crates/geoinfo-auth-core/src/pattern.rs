//! Ant-style request path patterns
//!
//! Syntax, segment by segment:
//! - `**` matches zero or more whole segments
//! - `*` matches any run of characters inside one segment
//! - `?` matches exactly one character inside one segment
//!
//! `/api/admin/**` therefore matches `/api/admin`, `/api/admin/x` and
//! `/api/admin/x/y`, and `/**` matches every path. Empty segments are
//! ignored, so a trailing slash does not change the outcome.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::glob::wildcard_match;

/// Error raised when a pattern string is not usable
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("path pattern must start with '/': {0}")]
    MissingLeadingSlash(String),

    #[error("'**' must occupy a whole segment: {0}")]
    PartialDoubleStar(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Glob(String),
    AnyDepth,
}

/// A compiled request path pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Compile a pattern
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        if !raw.starts_with('/') {
            return Err(PatternError::MissingLeadingSlash(raw.to_string()));
        }

        let segments = raw
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s == "**" {
                    Ok(Segment::AnyDepth)
                } else if s.contains("**") {
                    Err(PatternError::PartialDoubleStar(raw.to_string()))
                } else if s.contains(['*', '?']) {
                    Ok(Segment::Glob(s.to_string()))
                } else {
                    Ok(Segment::Literal(s.to_string()))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// Pattern matching every path (`/**`)
    pub fn catch_all() -> Self {
        Self {
            raw: "/**".to_string(),
            segments: vec![Segment::AnyDepth],
        }
    }

    /// Whether this pattern matches every path
    pub fn is_catch_all(&self) -> bool {
        self.segments.iter().all(|s| *s == Segment::AnyDepth) && !self.segments.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Test a request path (without query string) against the pattern.
    ///
    /// The path is normalised first: `.` segments are dropped and `..`
    /// removes the previous segment, so `/api/public/../admin` is matched
    /// as `/api/admin`.
    pub fn matches(&self, path: &str) -> bool {
        let normalized = normalize_segments(path);
        match_segments(&self.segments, &normalized)
    }
}

impl std::fmt::Display for PathPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for PathPattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PathPattern {
    type Error = PatternError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PathPattern> for String {
    fn from(pattern: PathPattern) -> Self {
        pattern.raw
    }
}

/// Split a path into segments, resolving `.` and `..`
pub(crate) fn normalize_segments(path: &str) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

fn match_segments(pattern: &[Segment], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((Segment::AnyDepth, rest)) => {
            (0..=path.len()).any(|skip| match_segments(rest, &path[skip..]))
        }
        Some((segment, rest)) => match path.split_first() {
            Some((head, tail)) => segment_matches(segment, head) && match_segments(rest, tail),
            None => false,
        },
    }
}

fn segment_matches(segment: &Segment, value: &str) -> bool {
    match segment {
        Segment::Literal(lit) => lit == value,
        Segment::Glob(glob) => wildcard_match(glob.as_bytes(), value.as_bytes(), 0, &|_| true),
        Segment::AnyDepth => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(raw: &str) -> PathPattern {
        PathPattern::parse(raw).unwrap()
    }

    #[test]
    fn test_literal_match() {
        assert!(p("/api/incidents").matches("/api/incidents"));
        assert!(p("/api/incidents").matches("/api/incidents/"));
        assert!(!p("/api/incidents").matches("/api/incidents/4"));
        assert!(!p("/api/incidents").matches("/api/incident"));
    }

    #[test]
    fn test_double_star_matches_zero_or_more_segments() {
        let admin = p("/api/admin/**");
        assert!(admin.matches("/api/admin"));
        assert!(admin.matches("/api/admin/x"));
        assert!(admin.matches("/api/admin/users/7/role"));
        assert!(!admin.matches("/api/administrators"));
        assert!(!admin.matches("/api"));
    }

    #[test]
    fn test_single_star_stays_in_segment() {
        let pattern = p("/api/*/stats");
        assert!(pattern.matches("/api/incidents/stats"));
        assert!(!pattern.matches("/api/incidents/2024/stats"));
        assert!(p("/swagger-ui*").matches("/swagger-ui.html"));
    }

    #[test]
    fn test_inner_double_star() {
        let pattern = p("/api/**/export");
        assert!(pattern.matches("/api/export"));
        assert!(pattern.matches("/api/a/b/export"));
        assert!(!pattern.matches("/api/a/b/export/csv"));
    }

    #[test]
    fn test_catch_all() {
        let all = PathPattern::catch_all();
        assert!(all.is_catch_all());
        assert!(all.matches("/"));
        assert!(all.matches("/anything/at/all"));
        assert!(p("/**").is_catch_all());
        assert!(!p("/api/**").is_catch_all());
        assert!(!p("/").is_catch_all());
    }

    #[test]
    fn test_dot_segments_are_resolved() {
        let public = p("/api/public/**");
        assert!(!public.matches("/api/public/../admin/users"));
        assert!(p("/api/admin/**").matches("/api/public/../admin/users"));
        assert!(public.matches("/api/./public/map"));
    }

    #[test]
    fn test_invalid_patterns() {
        assert_eq!(
            PathPattern::parse("api/x"),
            Err(PatternError::MissingLeadingSlash("api/x".to_string()))
        );
        assert!(matches!(
            PathPattern::parse("/api/a**"),
            Err(PatternError::PartialDoubleStar(_))
        ));
    }
}
