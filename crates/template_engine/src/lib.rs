//! Template Engine for configuration pipelines
//!
//! This crate resolves JSON configuration templates against layered variable
//! sources. Templates may embed `${path}` expressions in string values, inline other
//! template documents with `#include:name`, and gate object inclusion with an
//! `#includeIf` condition. The [`Merger`] combines a template graph with declared
//! variables and produces a resolved document plus a content fingerprint covering
//! every input it consulted.

mod context;
mod errors;
mod expression;
mod fingerprint;
mod merger;
mod resolver;

pub use context::{LayeredContext, SourceDocument};
pub use errors::{Error, Result};
pub use fingerprint::{document_hash, Fingerprint};
pub use merger::{
    check_variable_declarations, MergeMode, MergeResult, MergeSource, Merger, VARIABLE_NAMESPACE,
};
pub use resolver::{PathResolution, Resolver, TemplateLoader, INCLUDE_IF_KEY, INCLUDE_TOKEN};
