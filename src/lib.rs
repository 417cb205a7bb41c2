//! Declarative mapping of BioCyc `ptools-xml` documents onto typed records,
//! with lazily resolved cross-references and a shared object cache.

pub mod atom_mappings;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod identity;
pub mod link;
pub mod models;
pub mod quantity;
pub mod record;
pub mod schema;
pub mod value;
pub mod xml;
