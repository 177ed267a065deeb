//! Main module for tex library functionality

pub mod config;
pub mod context;
pub mod definitions;
pub mod diagnostics;
pub mod engine;
pub mod latex;
pub mod loader;
pub mod modes;
pub mod range;
pub mod snapshot;
pub mod testing;
pub mod token;
pub mod tree;
