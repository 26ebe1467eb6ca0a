//! Deep-link requests and pattern matching.
//!
//! A destination can declare any number of [`DeepLinkSpec`]s; a
//! [`DeepLinkRequest`] (uri, action, mime type — any subset) is matched
//! against the tree comprehensively: the anchor node first, then its
//! children, then back up through parents, preferring the best-scoring
//! match. Failures are `None`, never errors — requests arrive from outside
//! the app's control.

use smallvec::SmallVec;

use crate::graph::NavGraph;
use crate::saved_state::SavedState;
use crate::NodeIndex;

/// An incoming link: any subset of uri, action, and mime type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeepLinkRequest {
    pub uri: Option<String>,
    pub action: Option<String>,
    pub mime_type: Option<String>,
}

impl DeepLinkRequest {
    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            action: None,
            mime_type: None,
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// A link pattern registered on a destination.
///
/// Uri patterns support `{placeholder}` path segments and query values,
/// captured into the match's argument parcel as strings:
/// `app://users/{user}/posts?filter={filter}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeepLinkSpec {
    pub uri_pattern: Option<String>,
    pub action: Option<String>,
    pub mime_type: Option<String>,
}

impl DeepLinkSpec {
    pub fn from_uri_pattern(pattern: impl Into<String>) -> Self {
        Self {
            uri_pattern: Some(pattern.into()),
            action: None,
            mime_type: None,
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Matches `request` against this spec, producing captured arguments
    /// and a specificity score. Higher scores win when several
    /// destinations match the same request.
    pub fn matches(&self, request: &DeepLinkRequest) -> Option<(SavedState, i32)> {
        let mut args = SavedState::new();
        let mut score = 0;

        match (&self.uri_pattern, &request.uri) {
            (Some(pattern), Some(uri)) => {
                score += match_uri(pattern, uri, &mut args)?;
            }
            (Some(_), None) | (None, Some(_)) => return None,
            (None, None) => {}
        }

        match (&self.action, &request.action) {
            (Some(expected), Some(actual)) => {
                if expected != actual {
                    return None;
                }
                score += 2;
            }
            (Some(_), None) => return None,
            // A spec without an action accepts any request action.
            (None, _) => {}
        }

        match (&self.mime_type, &request.mime_type) {
            (Some(pattern), Some(actual)) => {
                score += match_mime(pattern, actual)?;
            }
            (Some(_), None) => return None,
            (None, _) => {}
        }

        Some((args, score))
    }
}

/// A successful comprehensive match.
#[derive(Debug, Clone)]
pub struct DeepLinkMatch {
    pub destination: NodeIndex,
    pub args: SavedState,
    pub score: i32,
}

fn split_uri(uri: &str) -> (&str, &str, &str) {
    let (scheme, rest) = match uri.split_once("://") {
        Some((scheme, rest)) => (scheme, rest),
        None => ("", uri),
    };
    let (path, query) = match rest.split_once('?') {
        Some((path, query)) => (path, query),
        None => (rest, ""),
    };
    (scheme, path, query)
}

fn segments(path: &str) -> SmallVec<[&str; 8]> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn placeholder(segment: &str) -> Option<&str> {
    segment
        .strip_prefix('{')
        .and_then(|inner| inner.strip_suffix('}'))
}

/// Matches a `{placeholder}` uri pattern, filling `args` with captures.
/// Returns a score favoring exact segments over captures.
fn match_uri(pattern: &str, uri: &str, args: &mut SavedState) -> Option<i32> {
    let (pattern_scheme, pattern_path, pattern_query) = split_uri(pattern);
    let (uri_scheme, uri_path, uri_query) = split_uri(uri);

    if pattern_scheme != uri_scheme {
        return None;
    }
    let mut score = 1;

    let pattern_segments = segments(pattern_path);
    let uri_segments = segments(uri_path);
    if pattern_segments.len() != uri_segments.len() {
        return None;
    }
    for (expected, actual) in pattern_segments.iter().zip(uri_segments.iter()) {
        match placeholder(expected) {
            Some(name) => args.put_str(name, *actual),
            None => {
                if expected != actual {
                    return None;
                }
                score += 2;
            }
        }
    }

    // Query placeholders are optional: absent parameters simply capture
    // nothing, present ones must line up with the pattern.
    for pair in pattern_query.split('&').filter(|p| !p.is_empty()) {
        let (key, value_pattern) = pair.split_once('=')?;
        let actual = uri_query
            .split('&')
            .filter_map(|p| p.split_once('='))
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v);
        match (placeholder(value_pattern), actual) {
            (Some(name), Some(value)) => args.put_str(name, value),
            (Some(_), None) => {}
            (None, Some(value)) => {
                if value != value_pattern {
                    return None;
                }
                score += 1;
            }
            (None, None) => return None,
        }
    }

    Some(score)
}

/// Wildcard mime match (`image/*`, `*/*`), scored by specificity.
fn match_mime(pattern: &str, actual: &str) -> Option<i32> {
    let (pattern_type, pattern_subtype) = pattern.split_once('/')?;
    let (actual_type, actual_subtype) = actual.split_once('/')?;
    let mut score = 0;
    if pattern_type != "*" {
        if pattern_type != actual_type {
            return None;
        }
        score += 2;
    }
    if pattern_subtype != "*" {
        if pattern_subtype != actual_subtype {
            return None;
        }
        score += 1;
    }
    Some(score)
}

impl NavGraph {
    fn match_deep_link_on(&self, node: NodeIndex, request: &DeepLinkRequest) -> Option<DeepLinkMatch> {
        self.node(node)
            .deep_links()
            .iter()
            .filter_map(|spec| spec.matches(request))
            .max_by_key(|(_, score)| *score)
            .map(|(args, score)| {
                log::debug!(
                    "Deep link matched destination {} with score {score}",
                    self.node(node).display_name()
                );
                DeepLinkMatch {
                    destination: node,
                    args,
                    score,
                }
            })
    }

    /// Best match for `request`, searching `from`, then its descendants,
    /// then upward through parents (skipping the child already searched).
    pub fn match_deep_link_comprehensive(
        &self,
        request: &DeepLinkRequest,
        from: NodeIndex,
        search_children: bool,
        search_parent: bool,
        last_visited: Option<NodeIndex>,
    ) -> Option<DeepLinkMatch> {
        let mut best = self.match_deep_link_on(from, request);

        if search_children {
            if let Some(data) = self.node(from).graph_data() {
                for (_, child) in data.children() {
                    if Some(child) == last_visited {
                        continue;
                    }
                    let candidate =
                        self.match_deep_link_comprehensive(request, child, true, false, None);
                    best = pick_best(best, candidate);
                }
            }
        }

        if search_parent && best.is_none() {
            if let Some(parent) = self.node(from).parent() {
                let candidate = self.match_deep_link_comprehensive(
                    request,
                    parent,
                    true,
                    true,
                    Some(from),
                );
                best = pick_best(best, candidate);
            }
        }

        best
    }
}

fn pick_best(a: Option<DeepLinkMatch>, b: Option<DeepLinkMatch>) -> Option<DeepLinkMatch> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if b.score > a.score { b } else { a }),
        (a, None) => a,
        (None, b) => b,
    }
}
