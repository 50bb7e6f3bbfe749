//! The per-session fryer pool.
//!
//! A [`PreparationPool`] owns a fixed set of fryer tasks that share one job
//! queue. Every job stands for one portion; a fryer holds it for the
//! configured duration and then reports `pancake-ready` on the session's
//! event stream.

mod job;
pub mod manager;
mod worker;

pub use manager::{PoolConfig, PreparationPool};
