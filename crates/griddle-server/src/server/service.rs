//! The kitchen session factory and its HTTP surface.

pub mod handler;

pub use handler::KitchenService;
