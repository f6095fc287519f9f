//! Use cases, one handler per operation.
//!
//! A handler is built from the `Arc<dyn ...>` ports it needs and exposes a
//! single `handle`. HTTP state objects construct them per request.

pub mod handlers;
