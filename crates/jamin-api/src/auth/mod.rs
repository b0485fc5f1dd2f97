pub mod middleware;
pub mod session;

pub use middleware::{auth_middleware, AuthState};
pub use session::{JwtSessionProvider, Session, SessionClaims, SessionProvider, SESSION_COOKIE};
