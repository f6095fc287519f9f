//! Request middleware: session resolution and the auth extractors built on it.

pub mod auth;

pub use auth::{auth_middleware, AuthRejection, AuthState, OptionalAuth, RequireAuth};
