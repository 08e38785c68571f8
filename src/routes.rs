//! Static route table.
//!
//! SYSTEM CONTEXT
//! ==============
//! Declared once at start-up (built-in or loaded from YAML) and consulted
//! read-only by the navigation guard. Each route carries only the access
//! metadata the guard needs; views are mounted elsewhere.
//!
//! DESIGN
//! ======
//! Patterns are `/`-separated static segments and `:name` parameters.
//! Matching walks routes in declaration order and the first match wins, so
//! overlapping patterns resolve deterministically. Static segments match
//! regardless of ASCII case and percent-encoding, so `/Dashboard` and
//! `/dash%62oard` reach the same protected route as `/dashboard`.

#[cfg(test)]
#[path = "routes_test.rs"]
mod routes_test;

use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("route pattern must start with '/': {0}")]
    MissingLeadingSlash(String),

    #[error("route pattern has an empty parameter name: {0}")]
    EmptyParam(String),

    #[error("route pattern repeats parameter `{name}`: {pattern}")]
    DuplicateParam { pattern: String, name: String },

    #[error("route pattern declared twice: {0}")]
    DuplicatePattern(String),

    #[error("route name declared twice: {0}")]
    DuplicateName(String),

    #[error("route table parse failed: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("route table read failed ({path}): {source}")]
    Read { path: String, source: std::io::Error },
}

// =============================================================================
// PATTERN
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Static(String),
    Param(String),
}

/// Parsed path pattern such as `/emergency-dashboard/:userId`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoutePattern {
    segments: Vec<Segment>,
}

/// Parameters captured by a pattern match, keyed by parameter name.
pub type RouteParams = BTreeMap<String, String>;

impl RoutePattern {
    /// Parse a pattern string.
    ///
    /// # Errors
    ///
    /// Rejects patterns without a leading `/`, empty `:` parameters, and
    /// repeated parameter names.
    pub fn parse(raw: &str) -> Result<Self, RouteError> {
        let trimmed = raw.trim();
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Err(RouteError::MissingLeadingSlash(raw.to_owned()));
        };

        let mut seen = HashSet::new();
        let mut segments = Vec::new();
        for part in rest.split('/').filter(|p| !p.is_empty()) {
            if let Some(name) = part.strip_prefix(':') {
                if name.is_empty() {
                    return Err(RouteError::EmptyParam(raw.to_owned()));
                }
                if !seen.insert(name.to_owned()) {
                    return Err(RouteError::DuplicateParam { pattern: raw.to_owned(), name: name.to_owned() });
                }
                segments.push(Segment::Param(name.to_owned()));
            } else {
                segments.push(Segment::Static(part.to_owned()));
            }
        }
        Ok(Self { segments })
    }

    #[must_use]
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Case-folded static text per segment, `None` for parameters. Two
    /// patterns with the same shape match exactly the same paths.
    fn shape(&self) -> Vec<Option<String>> {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Static(s) => Some(s.to_ascii_lowercase()),
                Segment::Param(_) => None,
            })
            .collect()
    }

    /// Match an already-normalized path, returning captured parameters.
    ///
    /// Segments are percent-decoded first. Static segments compare
    /// ASCII-case-insensitively; parameter values keep their case.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<RouteParams> {
        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = RouteParams::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            let part = decode_segment(part);
            match segment {
                Segment::Static(expected) if expected.eq_ignore_ascii_case(&part) => {}
                Segment::Static(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), part.into_owned());
                }
            }
        }
        Some(params)
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            match segment {
                Segment::Static(s) => write!(f, "/{s}")?,
                Segment::Param(name) => write!(f, "/:{name}")?,
            }
        }
        Ok(())
    }
}

impl FromStr for RoutePattern {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RoutePattern {
    type Error = RouteError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoutePattern> for String {
    fn from(pattern: RoutePattern) -> Self {
        pattern.to_string()
    }
}

/// Percent-decode one path segment. Invalid UTF-8 after decoding keeps the
/// raw text, which then only matches parameters.
fn decode_segment(raw: &str) -> Cow<'_, str> {
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded,
        Err(_) => Cow::Borrowed(raw),
    }
}

/// Normalize a requested path for matching.
///
/// Drops `?query` and `#fragment`, forces a leading `/`, collapses empty
/// segments and ignores a trailing `/`.
#[must_use]
pub fn normalize_path(raw: &str) -> String {
    let end = raw.find(['?', '#']).unwrap_or(raw.len());
    let parts: Vec<&str> = raw[..end].split('/').filter(|p| !p.is_empty()).collect();
    format!("/{}", parts.join("/"))
}

// =============================================================================
// DESCRIPTOR
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDescriptor {
    pub name: String,
    pub path: RoutePattern,
    /// Routes without an explicit requirement are public.
    #[serde(default)]
    pub requires_auth: bool,
}

impl RouteDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>, path: RoutePattern, requires_auth: bool) -> Self {
        Self { name: name.into(), path, requires_auth }
    }
}

/// A successful route lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    pub route: &'a RouteDescriptor,
    pub params: RouteParams,
}

// =============================================================================
// TABLE
// =============================================================================

#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<RouteDescriptor>,
}

impl RouteTable {
    /// Build a table, keeping declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::DuplicateName`] or [`RouteError::DuplicatePattern`]
    /// when two routes share a name or an identical pattern.
    pub fn new(routes: Vec<RouteDescriptor>) -> Result<Self, RouteError> {
        let mut names = HashSet::new();
        let mut patterns = HashSet::new();
        for route in &routes {
            if !names.insert(route.name.as_str()) {
                return Err(RouteError::DuplicateName(route.name.clone()));
            }
            if !patterns.insert(route.path.shape()) {
                return Err(RouteError::DuplicatePattern(route.path.to_string()));
            }
        }
        Ok(Self { routes })
    }

    /// The VigiLERT client's route table.
    #[must_use]
    pub fn vigilert() -> Self {
        let page = |name: &str, segment: &str, requires_auth: bool| {
            RouteDescriptor::new(
                name,
                RoutePattern::from_segments(vec![Segment::Static(segment.to_owned())]),
                requires_auth,
            )
        };

        Self {
            routes: vec![
                RouteDescriptor::new("Home", RoutePattern::from_segments(Vec::new()), true),
                page("Login", "login", false),
                page("Register", "register", false),
                page("Dashboard", "dashboard", true),
                page("TripHistory", "trip-history", true),
                page("EmergencyContacts", "emergency-contacts", true),
                page("EmergencyContactLogin", "emergency-login", false),
                RouteDescriptor::new(
                    "EmergencyContactDashboard",
                    RoutePattern::from_segments(vec![
                        Segment::Static("emergency-dashboard".to_owned()),
                        Segment::Param("userId".to_owned()),
                    ]),
                    false,
                ),
            ],
        }
    }

    /// Parse a YAML sequence of `{name, path, requires_auth}` records.
    ///
    /// # Errors
    ///
    /// Returns parse errors and the validation errors of [`RouteTable::new`].
    pub fn from_yaml_str(raw: &str) -> Result<Self, RouteError> {
        let routes: Vec<RouteDescriptor> = serde_yaml::from_str(raw)?;
        Self::new(routes)
    }

    /// Read and parse a YAML route table file.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::Read`] when the file cannot be read, otherwise
    /// the errors of [`RouteTable::from_yaml_str`].
    pub fn from_yaml_file(path: &Path) -> Result<Self, RouteError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|source| RouteError::Read { path: path.display().to_string(), source })?;
        Self::from_yaml_str(&raw)
    }

    #[must_use]
    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&RouteDescriptor> {
        self.routes.iter().find(|r| r.name == name)
    }

    /// Find the first route matching `path` in declaration order.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<RouteMatch<'_>> {
        let path = normalize_path(path);
        let mut matches = self
            .routes
            .iter()
            .filter_map(|route| route.path.matches(&path).map(|params| RouteMatch { route, params }));

        let first = matches.next()?;
        let shadowed: Vec<&str> = matches.map(|m| m.route.name.as_str()).collect();
        if !shadowed.is_empty() {
            tracing::debug!(
                path = %path,
                chosen = %first.route.name,
                ?shadowed,
                "ambiguous route match; first declared route wins"
            );
        }
        Some(first)
    }

    /// Access requirement for `path`. Unknown paths are public.
    #[must_use]
    pub fn requires_auth(&self, path: &str) -> bool {
        self.resolve(path).is_some_and(|m| m.route.requires_auth)
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::vigilert()
    }
}
