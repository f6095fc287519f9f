//! Domain layer - business rules with no infrastructure dependencies.

pub mod billing;
pub mod foundation;
pub mod identity;
