//! Authored graph: model and validation.

pub mod model;
pub mod validate;
