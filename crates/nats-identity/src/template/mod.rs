//! Claims templates with `{{variable}}` placeholders.
//!
//! User templates are stored once and instantiated on every credential
//! read. Substitution is textual over the template's compact JSON form.

pub mod engine;
pub mod params;

pub use engine::{extract_variables, instantiate};
pub use params::parse_parameters;
