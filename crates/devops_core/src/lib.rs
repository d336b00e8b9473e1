//! Configuration pipeline core
//!
//! This crate drives environment specific configurations through their remote
//! lifecycle: merge templates and variables, validate and store the result on the
//! latest property version, provision edge hostnames, and activate on the staging
//! and production networks.
//!
//! State lives in a [`ProjectStore`]; remote calls go through a
//! [`papi_client::PropertyClient`]. Both are shared trait objects so they can be
//! replaced in tests.

pub mod environment;
pub mod errors;
pub mod hostnames;
pub mod naming;
pub mod pipeline;
pub mod record;
pub mod store;

#[cfg(test)]
mod test_support;

pub use environment::{
    CreateOptions, Environment, MergeOutcome, PromotionCheck, PromotionOutcome, PromotionStatus,
    SaveOutcome, ENTRY_TEMPLATE,
};
pub use errors::{DevOpsError, DevOpsResult};
pub use hostnames::{BoundEdgeHostname, HostnameIssue, HostnameProvisioner, ProvisionResult};
pub use naming::{NamingStrategy, PipelineNaming, SinglePropertyNaming};
pub use pipeline::{EnvironmentStatus, Pipeline};
pub use record::EnvironmentRecord;
pub use store::{
    to_pretty_json, validate_environment_names, CreateProjectRequest, FileProjectStore,
    ProjectInfo, ProjectStore,
};
