//! Resource and hostname naming schemes.

use papi_client::PropertyHostname;

#[cfg(test)]
#[path = "naming_tests.rs"]
mod tests;

const EDGESUITE_DOMAIN: &str = "edgesuite.net";
const EDGEKEY_DOMAIN: &str = "edgekey.net";

/// Decides how environments map onto remote resources.
pub trait NamingStrategy: Send + Sync {
    /// Name of the remote resource (and of the merged output file) for an environment.
    fn resource_name(&self, project: &str, environment: &str) -> String;

    /// Hostname records written when an environment is created.
    fn hostname_records(&self, project: &str, environment: &str, secure: bool)
        -> Vec<PropertyHostname>;
}

/// One resource per environment, named `{env}.{project}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineNaming;

impl NamingStrategy for PipelineNaming {
    fn resource_name(&self, project: &str, environment: &str) -> String {
        format!("{environment}.{project}")
    }

    fn hostname_records(
        &self,
        project: &str,
        environment: &str,
        secure: bool,
    ) -> Vec<PropertyHostname> {
        let name = self.resource_name(project, environment);
        vec![hostname_record(&name, secure)]
    }
}

/// A single resource named after the project.
#[derive(Debug, Clone, Copy, Default)]
pub struct SinglePropertyNaming;

impl NamingStrategy for SinglePropertyNaming {
    fn resource_name(&self, project: &str, _environment: &str) -> String {
        project.to_string()
    }

    fn hostname_records(
        &self,
        project: &str,
        _environment: &str,
        secure: bool,
    ) -> Vec<PropertyHostname> {
        vec![hostname_record(project, secure)]
    }
}

fn hostname_record(name: &str, secure: bool) -> PropertyHostname {
    let domain = if secure {
        EDGEKEY_DOMAIN
    } else {
        EDGESUITE_DOMAIN
    };
    PropertyHostname::new(name, format!("{name}.{domain}"))
}
