use std::collections::{HashMap, HashSet};

use super::template::{is_segment_char, RouteTemplate, TemplateError, TemplateSegment};

/// Outcome of validating the `<rest>` portion of a portal URL. Computed per
/// request, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// The path is whitelisted as-is.
    Valid(String),
    /// A recognized route with trailing garbage glued on; the payload is the
    /// route to redirect to.
    Corrected(String),
    /// Nothing matched; the payload is the fallback section.
    Unrecognized(String),
}

enum WildcardMatch {
    /// Every template segment matched and the path is exhausted.
    Full,
    /// Every template segment matched and the path continues with `/...`
    /// (sub-resource under a valid parent).
    SubPath,
    /// The final literal segment matched with glued garbage after it; the
    /// payload is the recognized prefix.
    Correctable(String),
    NoMatch,
}

/// The route whitelist, validated and indexed once at startup. Matching is
/// case-sensitive and pure: every input produces a decision.
///
/// Wildcard candidates are pre-bucketed by their first path segment so that
/// validation does not scan the whole table, with a catch-all bucket for
/// templates that open with `**`. Candidate order always equals registration
/// order, which is the tie-break contract: registrants must list more
/// specific prefixes before more general ones.
pub struct RoutePatternMatcher {
    literals: Vec<RouteTemplate>,
    literal_set: HashSet<String>,
    literal_index: HashMap<String, Vec<usize>>,
    wildcards: Vec<RouteTemplate>,
    wildcard_index: HashMap<String, Vec<usize>>,
    wildcard_catch_all: Vec<usize>,
    fallback: String,
}

impl RoutePatternMatcher {
    /// Build the matcher from whitelist entries. Entries containing `**`
    /// segments are registered as wildcard templates regardless of which list
    /// they arrive in. Malformed entries abort startup.
    pub fn build(
        literal_routes: &[&str],
        wildcard_routes: &[&str],
        fallback: &str,
    ) -> Result<Self, TemplateError> {
        let mut matcher = Self {
            literals: Vec::new(),
            literal_set: HashSet::new(),
            literal_index: HashMap::new(),
            wildcards: Vec::new(),
            wildcard_index: HashMap::new(),
            wildcard_catch_all: Vec::new(),
            fallback: fallback.to_string(),
        };
        for raw in literal_routes.iter().chain(wildcard_routes) {
            matcher.register(RouteTemplate::parse(raw)?);
        }
        Ok(matcher)
    }

    fn register(&mut self, template: RouteTemplate) {
        if template.is_literal() {
            let idx = self.literals.len();
            self.literal_set.insert(template.raw().to_string());
            if let Some(first) = template.first_literal_segment() {
                self.literal_index
                    .entry(first.to_string())
                    .or_default()
                    .push(idx);
            }
            self.literals.push(template);
        } else {
            let idx = self.wildcards.len();
            match template.first_literal_segment() {
                Some(first) => self
                    .wildcard_index
                    .entry(first.to_string())
                    .or_default()
                    .push(idx),
                None => self.wildcard_catch_all.push(idx),
            }
            self.wildcards.push(template);
        }
    }

    /// Validate a path suffix against the whitelist.
    ///
    /// Order of checks: exact literal, literal sub-path passthrough, wildcard
    /// match (full or sub-path), glued-garbage correction, fallback. The
    /// correction passes scan the full registration-order lists: a glued
    /// suffix can distort the first path segment itself (`repositories3124`),
    /// which would miss the first-segment buckets.
    pub fn validate(&self, raw_rest: &str) -> RouteDecision {
        let rest = raw_rest.split('?').next().unwrap_or("");
        let rest = rest.strip_prefix('/').unwrap_or(rest);
        if rest.is_empty() {
            return RouteDecision::Unrecognized(self.fallback.clone());
        }

        if self.literal_set.contains(rest) {
            return RouteDecision::Valid(rest.to_string());
        }

        let first = rest.split('/').next().unwrap_or(rest);

        // Sub-resource access under a whitelisted literal parent
        for &i in self.literal_index.get(first).into_iter().flatten() {
            let literal = self.literals[i].raw();
            if rest.len() > literal.len()
                && rest.starts_with(literal)
                && rest.as_bytes()[literal.len()] == b'/'
            {
                return RouteDecision::Valid(rest.to_string());
            }
        }

        for &i in self.wildcard_candidates(first) {
            match match_wildcard(&self.wildcards[i], rest) {
                WildcardMatch::Full | WildcardMatch::SubPath => {
                    return RouteDecision::Valid(rest.to_string());
                }
                _ => {}
            }
        }

        // Correction pass: literals first, then wildcards, registration order
        for literal in &self.literals {
            let literal = literal.raw();
            if rest.starts_with(literal)
                && glued_suffix(literal.chars().last(), &rest[literal.len()..])
            {
                return RouteDecision::Corrected(literal.to_string());
            }
        }
        for wildcard in &self.wildcards {
            if let WildcardMatch::Correctable(prefix) = match_wildcard(wildcard, rest) {
                return RouteDecision::Corrected(prefix);
            }
        }

        RouteDecision::Unrecognized(self.fallback.clone())
    }

    /// Indexed and catch-all wildcard candidates, merged back into
    /// registration order.
    fn wildcard_candidates<'s>(&'s self, first: &str) -> impl Iterator<Item = &'s usize> + 's {
        let indexed = self
            .wildcard_index
            .get(first)
            .map(|v| v.as_slice())
            .unwrap_or(&[]);
        MergedAscending {
            left: indexed,
            right: &self.wildcard_catch_all,
        }
    }
}

/// Merges two ascending index slices, preserving global registration order.
struct MergedAscending<'a> {
    left: &'a [usize],
    right: &'a [usize],
}

impl<'a> Iterator for MergedAscending<'a> {
    type Item = &'a usize;

    fn next(&mut self) -> Option<&'a usize> {
        match (self.left.first(), self.right.first()) {
            (Some(l), Some(r)) if l <= r => {
                self.left = &self.left[1..];
                Some(l)
            }
            (_, Some(r)) => {
                self.right = &self.right[1..];
                Some(r)
            }
            (Some(l), None) => {
                self.left = &self.left[1..];
                Some(l)
            }
            (None, None) => None,
        }
    }
}

fn match_wildcard(template: &RouteTemplate, rest: &str) -> WildcardMatch {
    let path: Vec<&str> = rest.split('/').collect();
    let segments = template.segments();
    if path.len() < segments.len() {
        return WildcardMatch::NoMatch;
    }

    for (i, segment) in segments.iter().enumerate() {
        let part = path[i];
        match segment {
            TemplateSegment::Literal(literal) => {
                if part != literal {
                    let last = i == segments.len() - 1 && i == path.len() - 1;
                    if last
                        && part.starts_with(literal.as_str())
                        && glued_suffix(literal.chars().last(), &part[literal.len()..])
                    {
                        let mut prefix = path[..i].join("/");
                        if !prefix.is_empty() {
                            prefix.push('/');
                        }
                        prefix.push_str(literal);
                        return WildcardMatch::Correctable(prefix);
                    }
                    return WildcardMatch::NoMatch;
                }
            }
            TemplateSegment::Wildcard => {
                if part.is_empty() || !part.chars().all(is_segment_char) {
                    return WildcardMatch::NoMatch;
                }
            }
        }
    }

    if path.len() == segments.len() {
        WildcardMatch::Full
    } else {
        WildcardMatch::SubPath
    }
}

/// The glued-garbage heuristic: a delimiter-free alphanumeric tail with a
/// digit next to a letter somewhere, including at the glue boundary with the
/// recognized prefix. Preserved as-is for compatibility; it will mis-correct
/// a future literal like `v2issues` registered alongside a `v2` prefix.
fn glued_suffix(prev: Option<char>, tail: &str) -> bool {
    if tail.is_empty() || !tail.chars().all(|c| c.is_ascii_alphanumeric()) {
        return false;
    }
    let chars: Vec<char> = prev.into_iter().chain(tail.chars()).collect();
    chars.windows(2).any(|pair| {
        (pair[0].is_ascii_digit() && pair[1].is_ascii_alphabetic())
            || (pair[0].is_ascii_alphabetic() && pair[1].is_ascii_digit())
    })
}
