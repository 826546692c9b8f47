pub mod impersonation;
pub mod navigation;
pub mod reconcile;
pub mod session;

pub use impersonation::impersonation_guard_middleware;
pub use navigation::{navigation_middleware, RouteContext};
pub use reconcile::reconcile_middleware;
pub use session::{session_middleware, CurrentSession};

/// Outcome of a per-request security check. Every check terminates in one of
/// these; the middleware chain never surfaces a 5xx for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    Redirect(String),
}
