//! SaaS Kit - billing and admin backend
//!
//! Stripe-backed checkout, webhook processing and payment status checks for
//! users signed in through an external auth service, plus read-only admin
//! pages over that service's tables.
//!
//! Layout follows ports and adapters: `domain` holds the rules, `ports` the
//! traits, `adapters` the Stripe/Postgres/HTTP implementations and
//! `application` the command and query handlers that tie them together.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
