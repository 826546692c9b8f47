pub mod context;
pub mod store;

pub use context::{AuthContext, AuthOrigin, Role, TransientUser};
pub use store::{InMemorySessionStore, Session, SessionError, SessionStore, SharedSessionStore};
