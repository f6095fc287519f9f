//! `payment` drives Stripe; `admin` reads the auth service's tables.

pub mod admin;
pub mod payment;
