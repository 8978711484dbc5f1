//! Tutor API Library Crate
//!
//! This library contains all the logic for the tutoring web service,
//! including configuration, the session store, API handlers and routing.
//! The `api` binary is a thin wrapper around this library.

pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
pub mod store;
