pub mod encoder;
pub mod packager;
pub mod probe;
