//! Funnel definition loading and structural validation.

pub mod definition;
pub mod validation;

pub use definition::{FunnelError, load_funnel_file, parse_funnel_json, parse_funnel_yaml};
pub use validation::validate_funnel;
