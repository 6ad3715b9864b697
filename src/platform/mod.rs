// RawSleuth - platform/mod.rs
//
// Platform abstraction layer: directories, config files, external process
// execution and tool provisioning.
// Dependencies: standard library, directories, toml, util.
// Must NOT depend on: core, app.

pub mod config;
pub mod process;
pub mod tools;
