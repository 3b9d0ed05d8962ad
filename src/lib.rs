//! Gift Guru: gift recommendations from Google Gemini.
//!
//! The server exposes a single recommendation endpoint; the `ask` binary is a
//! command-line client for it.

pub mod config;    // Environment-driven settings
pub mod gemini;    // Gemini API client
pub mod models;    // Request/response data models
pub mod prompt;    // Prompt composition
pub mod recommend; // Cleanup and parsing of model output
pub mod routes;    // HTTP route handlers
