mod cache_tests;
mod common;
#[cfg(unix)]
mod pipeline_tests;
