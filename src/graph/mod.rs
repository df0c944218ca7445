//! Graph model, structural validation and the JSON document form.

pub(crate) mod document;
pub(crate) mod model;
pub(crate) mod validate;
