//! AI Lead Prospecting API Library
//!
//! This library provides the core functionality for the lead prospecting
//! service: the lead query contract, the Gemini client, response
//! normalization and ranking, and the HTTP handlers behind the dashboard.
//!
//! # Modules
//!
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `gemini_client`: Upstream Gemini API client.
//! - `handlers`: HTTP request handlers and shared state.
//! - `leadgen`: Lead generation workflow (prompt, schema, orchestration).
//! - `models`: Core data models.
//! - `normalize`: Response normalization and ranking.

pub mod config;
pub mod errors;
pub mod gemini_client;
pub mod handlers;
pub mod leadgen;
pub mod models;
pub mod normalize;
