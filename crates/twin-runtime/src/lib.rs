//! `twin-runtime` - metadata binding protocol for interactive SVG digital twins.

#![forbid(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

/// Mock sensor API server.
pub mod api;
/// Element bindings, script handlers and listeners.
pub mod binding;
/// Live canvas driving the update protocol.
pub mod canvas;
/// Metadata change batches.
pub mod changes;
/// Component callbacks and registry.
pub mod component;
/// Built-in tank, pump, valve and sensor components.
pub mod components;
/// `twin.toml` configuration.
pub mod config;
/// Mutation-driven update coordinator.
pub mod coordinator;
mod datetime;
/// Runtime errors.
pub mod error;
/// Simulation data feed.
pub mod feed;
/// Standalone HTML document generation.
pub mod generate;
mod http;
/// Metadata store and dual-encoding codec.
pub mod metadata;
/// Resource folders.
pub mod resources;
/// Mock process plant.
pub mod sensors;
/// Editor session state.
pub mod session;
/// IDE web server.
pub mod web;

pub use canvas::Canvas;
pub use error::TwinError;
pub use metadata::MetadataRecord;
