pub mod content_store;
pub mod error;
pub mod finalizer;
pub mod identity;
pub mod intake;
pub mod job_store;
pub mod ladder;
pub mod manifest;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod scratch;
pub mod service;
pub mod uploader;

#[cfg(test)]
pub(crate) mod testkit;
