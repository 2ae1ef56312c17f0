//! Lead Qualifier API Library
//!
//! Scores sales leads from a checklist plus external verifications (ad
//! libraries, company registry) and classifies them into buy/follow/discard
//! tiers with a suggested bid ceiling.
//!
//! # Modules
//!
//! - `api`: HTTP layer (handlers, OpenAPI document).
//! - `core`: Scoring, classification and the qualification service.
//! - `integrations`: External collaborators (ad libraries, interpreter, registry).
//! - `cache_validator`: Checksummed cache entries.
//! - `circuit_breaker`: Circuit breaker for registry lookups.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.

pub mod api;
pub mod core;
pub mod integrations;

// Re-export primary modules for shared use in tests and other binaries
pub mod ad_interpreter;
pub mod ad_library;
pub mod cache_validator;
pub mod circuit_breaker;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod identifiers;
pub mod models;
pub mod openapi;
pub mod qualification;
pub mod registry;
pub mod scoring;
pub mod services;
pub mod verification;
pub mod verifier;
