// Expose modules for testing
pub mod config;
pub mod containers;
pub mod dispatcher;
pub mod domain;
pub mod entry;
pub mod ids;
pub mod recorder;
pub mod resource;
pub mod taskgraph;
pub mod trace;
