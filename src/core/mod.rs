// RawSleuth - core/mod.rs
//
// Core extraction logic: line dialects, observation tables, exclusion,
// statistics and the entity graph.
// Dependencies: standard library plus pure data crates (serde, chrono, regex,
// glob, walkdir).
// Must NOT depend on: app, platform, or spawn processes.

pub mod assemble;
pub mod dialect;
pub mod discovery;
pub mod exclusion;
pub mod graph;
pub mod metadata;
pub mod model;
pub mod stats;
pub mod table;
