//! Common library for the VidTube backend
//!
//! This crate provides shared infrastructure used by the API service:
//! PostgreSQL connectivity, schema migrations, and database error types.

pub mod database;
pub mod error;
