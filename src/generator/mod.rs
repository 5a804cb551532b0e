//! Output side: reference validation and YAML serialization of an
//! assembled configuration.

pub mod yaml;

pub use yaml::{to_yaml_string, validate, write_yaml};
