pub mod config;
pub mod infrastructure;
pub mod media;
pub mod modules;
pub mod state;
pub mod workers;
