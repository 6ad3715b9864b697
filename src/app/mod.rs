// RawSleuth - app/mod.rs
//
// Application layer: extraction orchestration, batch runs, exclusion loading.
// Dependencies: core, platform, util.

pub mod batch;
pub mod exclusions;
pub mod extract;
