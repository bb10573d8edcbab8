//! Path template compilation.
//!
//! # Responsibilities
//! - Accept one template or a list of alternatives (OR semantics)
//! - Split each template into literal and capture segments
//! - Reject empty paths and unnamed captures at registration time
//!
//! # Design Decisions
//! - Leading and trailing `/` are trimmed before splitting, so `/` compiles
//!   to a single empty literal segment that only the root path matches
//! - Literals are stored lower-cased; matching against them is case-insensitive
//! - Specificity is the total segment count

use crate::error::ConfigurationError;

/// One template or an ordered list of alternatives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathTemplate {
    One(String),
    Many(Vec<String>),
}

impl PathTemplate {
    /// The root template, used when registration omits a path.
    pub fn root() -> Self {
        PathTemplate::One("/".to_string())
    }

    /// Validate and return the alternatives in registration order.
    pub fn alternatives(&self) -> Result<Vec<&str>, ConfigurationError> {
        let alternatives: Vec<&str> = match self {
            PathTemplate::One(path) => vec![path.as_str()],
            PathTemplate::Many(paths) => paths.iter().map(String::as_str).collect(),
        };

        if alternatives.is_empty() || alternatives.iter().any(|p| p.is_empty()) {
            return Err(ConfigurationError::EmptyPath);
        }
        Ok(alternatives)
    }

    /// Compile every alternative into a descriptor.
    pub fn compile(&self) -> Result<Vec<RouteDescriptor>, ConfigurationError> {
        self.alternatives()?
            .into_iter()
            .map(RouteDescriptor::compile)
            .collect()
    }
}

impl Default for PathTemplate {
    fn default() -> Self {
        Self::root()
    }
}

impl From<&str> for PathTemplate {
    fn from(path: &str) -> Self {
        PathTemplate::One(path.to_string())
    }
}

impl From<String> for PathTemplate {
    fn from(path: String) -> Self {
        PathTemplate::One(path)
    }
}

impl From<Vec<String>> for PathTemplate {
    fn from(paths: Vec<String>) -> Self {
        PathTemplate::Many(paths)
    }
}

impl From<Vec<&str>> for PathTemplate {
    fn from(paths: Vec<&str>) -> Self {
        PathTemplate::Many(paths.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for PathTemplate {
    fn from(paths: &[&str]) -> Self {
        PathTemplate::Many(paths.iter().map(|p| p.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for PathTemplate {
    fn from(paths: [&str; N]) -> Self {
        PathTemplate::Many(paths.iter().map(|p| p.to_string()).collect())
    }
}

/// A single compiled segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Exact, case-insensitive text. Stored lower-cased.
    Literal(String),
    /// Binds whatever the path holds at this position.
    Capture(String),
}

impl Segment {
    fn parse(raw: &str, template: &str) -> Result<Self, ConfigurationError> {
        match raw.strip_prefix('{').and_then(|r| r.strip_suffix('}')) {
            Some(name) if name.trim().is_empty() => Err(ConfigurationError::EmptyCaptureName {
                template: template.to_string(),
            }),
            Some(name) => Ok(Segment::Capture(name.trim().to_string())),
            None => Ok(Segment::Literal(raw.to_lowercase())),
        }
    }
}

/// Compiled form of one template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescriptor {
    template: String,
    segments: Vec<Segment>,
}

impl RouteDescriptor {
    /// Compile one template string.
    pub fn compile(template: &str) -> Result<Self, ConfigurationError> {
        if template.is_empty() {
            return Err(ConfigurationError::EmptyPath);
        }

        let segments = template
            .trim_matches('/')
            .split('/')
            .map(|raw| Segment::parse(raw, template))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            template: template.to_string(),
            segments,
        })
    }

    /// The template as registered.
    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Score used to rank competing matches.
    pub fn specificity(&self) -> usize {
        self.segments.len()
    }
}
