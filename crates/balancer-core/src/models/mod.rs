//! Core data types: the site/endpoint model and the error taxonomy.

pub mod error;
pub mod site;
