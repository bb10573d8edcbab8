//! Route matching logic.
//!
//! # Responsibilities
//! - Segment a concrete pathname the same way templates are segmented
//! - Test the segments against one compiled descriptor
//! - Extract captured parameters and the descriptor's specificity
//!
//! # Design Decisions
//! - Segment counts must be equal; a template never matches as a prefix
//! - Literal segments compare case-insensitively (ASCII, URIs are ASCII)
//! - Capture values keep the case they arrived with
//! - No regex to guarantee O(n) matching

use std::collections::HashMap;

use crate::routing::template::{RouteDescriptor, Segment};

/// Successful match against one descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchResult {
    pub parameters: HashMap<String, String>,
    pub specificity: usize,
}

/// Split a pathname into segments using the template rules.
pub fn segments(pathname: &str) -> Vec<&str> {
    pathname.trim_matches('/').split('/').collect()
}

/// Match pre-split path segments against a descriptor.
pub fn match_path(path: &[&str], descriptor: &RouteDescriptor) -> Option<MatchResult> {
    let expected = descriptor.segments();
    if path.len() != expected.len() {
        return None;
    }

    let mut parameters = HashMap::new();
    for (value, segment) in path.iter().zip(expected) {
        match segment {
            Segment::Literal(literal) => {
                // Same Unicode folding as the stored literal.
                if value.to_lowercase() != *literal {
                    return None;
                }
            }
            Segment::Capture(name) => {
                parameters.insert(name.clone(), (*value).to_string());
            }
        }
    }

    Some(MatchResult {
        parameters,
        specificity: descriptor.specificity(),
    })
}
