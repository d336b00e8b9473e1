//! Project storage.
//!
//! A project folder holds the shared templates, the variable definitions, and one
//! folder per environment with its record, variable values and hostnames:
//!
//! ```text
//! <project>/projectInfo.json
//! <project>/templates/main.json
//! <project>/environments/variableDefinitions.json
//! <project>/environments/<env>/envInfo.json
//! <project>/environments/<env>/variables.json
//! <project>/environments/<env>/hostnames.json
//! <project>/dist/<resource>.papi.json
//! ```

use papi_client::PropertyHostname;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use template_engine::{MergeSource, SourceDocument};
use tracing::{debug, info};

use crate::errors::{DevOpsError, DevOpsResult};
use crate::record::EnvironmentRecord;

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;

const PROJECT_INFO_FILE: &str = "projectInfo.json";
const ENVIRONMENTS_DIR: &str = "environments";
const TEMPLATES_DIR: &str = "templates";
const DIST_DIR: &str = "dist";
const CACHE_DIR: &str = "cache";
const DEFINITIONS_FILE: &str = "environments/variableDefinitions.json";
const SINGLE_PROPERTY_KEY: &str = "singleProperty";
const MIN_ENVIRONMENTS: usize = 2;
const MAX_ENVIRONMENTS: usize = 10;

/// Contents of `projectInfo.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    pub product_id: String,
    pub contract_id: String,
    pub group_id: u64,
    /// Environment names in promotion order
    pub environments: Vec<String>,
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProjectInfo {
    /// Whether the project was created with one resource for all environments.
    pub fn is_single_property(&self) -> bool {
        self.extra
            .get(SINGLE_PROPERTY_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// Parameters of a new project.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateProjectRequest {
    pub name: String,
    pub product_id: String,
    pub contract_id: String,
    pub group_id: u64,
    pub environments: Vec<String>,
    /// Reuse an existing project folder instead of failing.
    pub retry: bool,
    /// All environments share one resource named after the project.
    pub single_property: bool,
}

/// Owns reading and writing of everything persisted for one project.
///
/// Implementations are responsible for the on-disk (or in-memory) layout; callers
/// only deal in documents and records.
pub trait ProjectStore: Send + Sync {
    fn project_name(&self) -> &str;

    fn project_info(&self) -> DevOpsResult<ProjectInfo>;

    /// The persisted record of an environment, `None` before it is created.
    fn environment_record(&self, environment: &str) -> DevOpsResult<Option<EnvironmentRecord>>;

    fn store_environment_record(&self, record: &EnvironmentRecord) -> DevOpsResult<()>;

    fn hostnames(&self, environment: &str) -> DevOpsResult<Vec<PropertyHostname>>;

    fn store_hostnames(
        &self,
        environment: &str,
        hostnames: &[PropertyHostname],
    ) -> DevOpsResult<()>;

    fn variable_definitions(&self) -> DevOpsResult<SourceDocument>;

    fn variable_values(&self, environment: &str) -> DevOpsResult<SourceDocument>;

    fn template(&self, name: &str) -> DevOpsResult<SourceDocument>;

    /// Writes a merged document and returns the file name it was stored under.
    fn store_merged_document(&self, resource_name: &str, document: &Value)
        -> DevOpsResult<String>;
}

/// A single property project has one environment, named after the project.
fn validate_single_property(request: &CreateProjectRequest) -> DevOpsResult<()> {
    if request.environments != [request.name.as_str()] {
        return Err(DevOpsError::argument(
            format!(
                "A single property project has exactly one environment named '{}'",
                request.name
            ),
            "single_property_environment",
        ));
    }
    Ok(())
}

/// Checks the environment list of a new project.
pub fn validate_environment_names(names: &[String]) -> DevOpsResult<()> {
    if names.len() < MIN_ENVIRONMENTS {
        return Err(DevOpsError::argument(
            format!("Expecting at least {MIN_ENVIRONMENTS} environment names"),
            "need_more_env_names",
        ));
    }
    if names.len() > MAX_ENVIRONMENTS {
        return Err(DevOpsError::argument(
            format!("Number of environments should not exceed {MAX_ENVIRONMENTS}"),
            "too_many_env_names",
        ));
    }
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(DevOpsError::argument(
                format!("Duplicate environment name in argument list: {name}"),
                "duplicate_env_name",
            ));
        }
    }
    Ok(())
}

/// Serializes with four space indentation, the format of every project file.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;
    // serde_json only emits valid UTF-8
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// [`ProjectStore`] backed by a project folder on disk.
#[derive(Debug, Clone)]
pub struct FileProjectStore {
    root: PathBuf,
    project_name: String,
}

impl FileProjectStore {
    /// Opens the project `project` under `home`. The folder is not checked.
    pub fn open(home: impl AsRef<Path>, project: impl Into<String>) -> Self {
        let project_name = project.into();
        Self {
            root: home.as_ref().join(&project_name),
            project_name,
        }
    }

    /// Creates the folder structure and project info of a new project.
    ///
    /// # Errors
    ///
    /// - `Argument` when the environment list is invalid, or the folder exists and
    ///   `retry` is not set
    /// - `Io` when a folder or file cannot be written
    pub fn create(home: impl AsRef<Path>, request: &CreateProjectRequest) -> DevOpsResult<Self> {
        if request.single_property {
            validate_single_property(request)?;
        } else {
            validate_environment_names(&request.environments)?;
        }
        let store = Self::open(home, request.name.clone());
        if store.exists() && !request.retry {
            return Err(DevOpsError::argument(
                format!("Project folder '{}' already exists", store.root.display()),
                "project_folder_already_exists",
            ));
        }

        for dir in [CACHE_DIR, DIST_DIR, ENVIRONMENTS_DIR, TEMPLATES_DIR] {
            store.create_dir(&store.root.join(dir))?;
        }
        let mut info = ProjectInfo {
            product_id: request.product_id.clone(),
            contract_id: request.contract_id.clone(),
            group_id: request.group_id,
            environments: request.environments.clone(),
            name: request.name.clone(),
            extra: Map::new(),
        };
        if request.single_property {
            info.extra
                .insert(SINGLE_PROPERTY_KEY.to_string(), Value::Bool(true));
        }
        store.write_json(PROJECT_INFO_FILE, &info)?;

        if !store.root.join(DEFINITIONS_FILE).exists() {
            store.write_json(DEFINITIONS_FILE, &json!({"definitions": {}}))?;
        }
        for environment in &request.environments {
            store.create_dir(&store.root.join(ENVIRONMENTS_DIR).join(environment))?;
            let values = values_file(environment);
            if !store.root.join(&values).exists() {
                store.write_json(&values, &json!({}))?;
            }
        }

        info!(
            project = %request.name,
            environments = ?request.environments,
            "Created project folder"
        );
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn exists(&self) -> bool {
        self.root.exists()
    }

    fn create_dir(&self, path: &Path) -> DevOpsResult<()> {
        fs::create_dir_all(path).map_err(|source| DevOpsError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads a project file, `None` when it does not exist.
    fn read_json<T: DeserializeOwned>(&self, relative: &str) -> DevOpsResult<Option<T>> {
        let path = self.root.join(relative);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(source) if source.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(DevOpsError::Io { path, source }),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| DevOpsError::Json { path, source })
    }

    fn read_source(&self, relative: &str, message_id: &str) -> DevOpsResult<SourceDocument> {
        match self.read_json::<Value>(relative)? {
            Some(document) => Ok(SourceDocument::new(document, relative)),
            None => Err(DevOpsError::dependency(
                format!("'{}' does not exist!", self.root.join(relative).display()),
                message_id,
            )),
        }
    }

    fn write_json<T: Serialize + ?Sized>(&self, relative: &str, value: &T) -> DevOpsResult<()> {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            self.create_dir(parent)?;
        }
        let content =
            to_pretty_json(value).map_err(|source| DevOpsError::Json { path: path.clone(), source })?;
        fs::write(&path, content).map_err(|source| DevOpsError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "Wrote project file");
        Ok(())
    }
}

/// Orders the object keys of `next` the way they appear in `previous`, at every
/// level. Keys that only exist in `next` keep their relative order at the end.
fn keep_key_order(previous: &Value, next: Value) -> Value {
    match (previous, next) {
        (Value::Object(before), Value::Object(mut after)) => {
            let mut ordered = Map::with_capacity(after.len());
            for (key, old) in before {
                if let Some(value) = after.shift_remove(key) {
                    ordered.insert(key.clone(), keep_key_order(old, value));
                }
            }
            ordered.extend(after);
            Value::Object(ordered)
        }
        (Value::Array(before), Value::Array(after)) => Value::Array(
            after
                .into_iter()
                .enumerate()
                .map(|(index, value)| match before.get(index) {
                    Some(old) => keep_key_order(old, value),
                    None => value,
                })
                .collect(),
        ),
        (_, next) => next,
    }
}

fn environment_file(environment: &str, file: &str) -> String {
    format!("{ENVIRONMENTS_DIR}/{environment}/{file}")
}

fn values_file(environment: &str) -> String {
    environment_file(environment, "variables.json")
}

impl ProjectStore for FileProjectStore {
    fn project_name(&self) -> &str {
        &self.project_name
    }

    fn project_info(&self) -> DevOpsResult<ProjectInfo> {
        self.read_json(PROJECT_INFO_FILE)?.ok_or_else(|| {
            DevOpsError::dependency(
                format!(
                    "projectInfo file: {} does not exist!",
                    self.root.join(PROJECT_INFO_FILE).display()
                ),
                "missing_pipeline_info_file",
            )
        })
    }

    fn environment_record(&self, environment: &str) -> DevOpsResult<Option<EnvironmentRecord>> {
        self.read_json(&environment_file(environment, "envInfo.json"))
    }

    fn store_environment_record(&self, record: &EnvironmentRecord) -> DevOpsResult<()> {
        let relative = environment_file(&record.name, "envInfo.json");
        let mut document = serde_json::to_value(record).map_err(|source| DevOpsError::Json {
            path: self.root.join(&relative),
            source,
        })?;
        // An unreadable previous file is simply replaced.
        if let Ok(Some(previous)) = self.read_json::<Value>(&relative) {
            document = keep_key_order(&previous, document);
        }
        self.write_json(&relative, &document)
    }

    fn hostnames(&self, environment: &str) -> DevOpsResult<Vec<PropertyHostname>> {
        let relative = environment_file(environment, "hostnames.json");
        self.read_json(&relative)?.ok_or_else(|| {
            DevOpsError::dependency(
                format!("'{}' does not exist!", self.root.join(&relative).display()),
                "missing_hostnames_file",
            )
        })
    }

    fn store_hostnames(
        &self,
        environment: &str,
        hostnames: &[PropertyHostname],
    ) -> DevOpsResult<()> {
        self.write_json(&environment_file(environment, "hostnames.json"), hostnames)
    }

    fn variable_definitions(&self) -> DevOpsResult<SourceDocument> {
        self.read_source(DEFINITIONS_FILE, "missing_variable_definitions_file")
    }

    fn variable_values(&self, environment: &str) -> DevOpsResult<SourceDocument> {
        self.read_source(&values_file(environment), "missing_variables_file")
    }

    fn template(&self, name: &str) -> DevOpsResult<SourceDocument> {
        self.read_source(&format!("{TEMPLATES_DIR}/{name}"), "missing_template_file")
    }

    fn store_merged_document(
        &self,
        resource_name: &str,
        document: &Value,
    ) -> DevOpsResult<String> {
        let file_name = format!("{resource_name}.papi.json");
        self.write_json(&format!("{DIST_DIR}/{file_name}"), document)?;
        Ok(file_name)
    }
}

/// Presents one environment's inputs of a project as a merge source.
pub(crate) struct StoreMergeSource<'a> {
    pub(crate) store: &'a dyn ProjectStore,
    pub(crate) environment: &'a str,
}

impl MergeSource for StoreMergeSource<'_> {
    fn variable_definitions(&self) -> template_engine::Result<SourceDocument> {
        self.store.variable_definitions().map_err(source_error)
    }

    fn variable_values(&self) -> template_engine::Result<SourceDocument> {
        self.store
            .variable_values(self.environment)
            .map_err(source_error)
    }

    fn template(&self, name: &str) -> template_engine::Result<SourceDocument> {
        self.store.template(name).map_err(source_error)
    }
}

fn source_error(error: DevOpsError) -> template_engine::Error {
    template_engine::Error::Source(error.to_string())
}
