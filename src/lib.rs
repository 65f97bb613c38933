//! slnweave core library.
//!
//! Turns a YAML description of build targets, platforms and configurations
//! into IDE project descriptors and a solution manifest. The pipeline runs
//! [`manifest`] loading, [`graph`] construction, [`resolve`] row
//! resolution and [`emit`] rendering through the [`template`] compiler and
//! the idempotent [`output`] writer.

pub mod ast;
pub mod cli;
pub mod emit;
pub mod graph;
pub mod identify;
pub mod manifest;
pub mod model;
pub mod output;
pub mod resolve;
pub mod runner;
pub mod template;
