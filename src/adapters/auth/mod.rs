//! Authentication adapters.
//!
//! Sessions are issued by the external auth service. These adapters verify
//! what it hands the browser:
//!
//! - `signed_cookie` - checks the HMAC signature on the session cookie
//! - `mock` - `SessionValidator` for tests
//!
//! The production `SessionValidator` reads the `session` table and lives in
//! `adapters::postgres`.

mod mock;
mod signed_cookie;

pub use mock::MockSessionValidator;
pub use signed_cookie::SignedSessionCookie;
