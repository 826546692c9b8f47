use super::matcher::RoutePatternMatcher;
use super::template::TemplateError;

/// The portal route whitelist. This table is the wire format for what the
/// validator accepts; entries must be preserved exactly to preserve behavior.
///
/// Registration order matters for wildcard templates: more specific prefixes
/// precede more general ones (first-match-wins).
pub const LITERAL_ROUTES: &[&str] = &[
    // Home
    "dashboard",
    "profile",
    "profile/edit",
    "support",
    // Projects
    "projects",
    "projects/create",
    // Repositories
    "repositories",
    "repositories/create",
    // Tickets
    "tickets",
    "tickets/create",
    // APIs (no bare "apis" page; the catalog lists are routes of their own)
    "apis/create",
    "apis/catalog",
    // Reports
    "reports",
    "reports/create",
    // Teams
    "teams",
    "teams/create",
    // Documentation
    "documentation",
    // User administration
    "manage-users",
    "manage-users/create",
    "finalizar-impersonacion",
];

pub const WILDCARD_ROUTES: &[&str] = &[
    // Projects
    "projects/edit/**",
    "projects/view/**",
    // Repositories
    "repositories/view/**",
    "repositories/sync/**",
    // Tickets
    "tickets/view/**",
    "tickets/edit/**",
    // APIs
    "apis/edit/**",
    "apis/view/**",
    // Reports
    "reports/view/**",
    // Teams
    "teams/view/**",
    // Chatbot ticket API
    "chatbot/tickets/**",
    // Documentation
    "documentation/**",
    // User administration
    "manage-users/edit/**",
    "impersonate/**",
];

/// Build the matcher over the portal whitelist. Called once at startup; a
/// malformed entry is a configuration error and aborts the boot.
pub fn route_matcher(fallback: &str) -> Result<RoutePatternMatcher, TemplateError> {
    RoutePatternMatcher::build(LITERAL_ROUTES, WILDCARD_ROUTES, fallback)
}
