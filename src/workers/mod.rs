pub mod monitor;
pub mod transcoder;
