pub mod matcher;
pub mod table;
pub mod template;

pub use matcher::{RouteDecision, RoutePatternMatcher};
pub use template::{RouteTemplate, TemplateError};

/// The three variable segments of a protected portal URL:
/// `/<namespace>/<role>/<username>/<rest>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalPath<'a> {
    pub role: &'a str,
    pub username: &'a str,
    /// Everything after the username segment, possibly empty, query stripped.
    pub rest: &'a str,
}

/// Split a request path under the protected namespace into its segments.
/// Returns `None` for paths outside the namespace or missing the role or
/// username segment.
pub fn split_portal_path<'a>(path: &'a str, namespace: &str) -> Option<PortalPath<'a>> {
    let path = path.split('?').next().unwrap_or(path);
    let p = path.strip_prefix('/')?;
    let p = p.strip_prefix(namespace)?;
    let p = p.strip_prefix('/')?;

    let mut segments = p.splitn(3, '/');
    let role = segments.next()?;
    let username = segments.next()?;
    if role.is_empty() || username.is_empty() {
        return None;
    }
    let rest = segments.next().unwrap_or("");

    Some(PortalPath {
        role,
        username,
        rest,
    })
}

/// Username segments accept the same character class as wildcard route
/// segments: letters, digits, `-`, `_`, `.`.
pub fn is_valid_username(segment: &str) -> bool {
    !segment.is_empty() && segment.chars().all(template::is_segment_char)
}
