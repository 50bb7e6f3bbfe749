//! Server-side components of the `griddle` kitchen.
//!
//! This module contains everything needed to run the WebSocket kitchen:
//! configuration, telemetry, the per-session preparation pool, the session
//! coordinator and the factory that turns each accepted connection into an
//! isolated session.
//!
//! ## Submodules
//!
//! - [`config`] - CLI/environment configuration and validation.
//! - [`error`] - Session-level error type.
//! - [`pool`] - Bounded fryer pool with slot-based backpressure.
//! - [`session`] - Per-connection coordinator and transport adapters.
//! - [`service`] - Session factory and HTTP router.
//! - [`telemetry`] - Structured logging and optional metrics.

pub mod config;
pub mod error;
pub mod pool;
pub mod service;
pub mod session;
pub mod telemetry;
