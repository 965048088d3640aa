//! Cart store, its collaborators, and the wiring shared by the `trolley` binary.

pub mod auth;
pub mod catalog;
pub mod config;
pub mod context;
pub mod notifications;
pub mod observability;
pub mod persistence;
pub mod store;
pub mod uuids;
