//! substrate-lib: ahead-of-time native builds for JVM applications
//!
//! This crate drives GraalVM `native-image` and the system C toolchain:
//! - `cache`: verified, versioned cache of the static-library bundles a build links against
//! - `target`: per-OS compile/link/run pipelines behind one trait
//! - `dispatch`: selects the pipeline for a configuration and runs it end to end
//! - `process`: external process execution with merged, streamed output

pub mod cache;
pub mod config;
pub mod consts;
pub mod dispatch;
pub mod platform;
pub mod process;
pub mod target;
pub mod util;
