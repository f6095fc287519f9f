//! Types shared by `billing` and `identity`: the signed-in caller, user ids
//! and the common error vocabulary.

mod auth;
mod errors;
mod ids;

pub use auth::{AuthError, AuthenticatedUser};
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::UserId;
