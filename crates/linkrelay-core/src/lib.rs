#![deny(missing_docs)]
//! Link relay core library.
//!
//! Link extraction, platform classification, media resolution and the
//! per-message dispatch pipeline. Transports plug in through
//! [`dispatch::ChatGateway`].

/// Configuration management.
pub mod config;
/// Per-message dispatch pipeline.
pub mod dispatch;
/// URL extraction from free-form text.
pub mod links;
/// Resolved media items and kind inference.
pub mod media;
/// Platform detection.
pub mod platform;
/// Platform-specific media resolvers.
pub mod resolver;
/// Test doubles for the dispatch pipeline.
pub mod testing;
