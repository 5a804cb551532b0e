pub mod clash;

pub use clash::{to_yaml_string, validate, write_yaml};
