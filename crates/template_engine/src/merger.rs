//! Merges an entry template with declared variables into a configuration document.
//!
//! Variable values override the defaults from the variable definitions. Both are
//! exposed to templates under the [`VARIABLE_NAMESPACE`] key, so a variable named
//! `cpCode` is referenced as `${env.cpCode}`.

use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::context::{LayeredContext, SourceDocument};
use crate::errors::{Error, Result};
use crate::fingerprint::{document_hash, Fingerprint};
use crate::resolver::{PathResolution, Resolver, TemplateLoader};

#[cfg(test)]
#[path = "merger_tests.rs"]
mod tests;

/// Key under which variables are visible to template expressions.
pub const VARIABLE_NAMESPACE: &str = "env";

/// Provides the inputs of a merge.
pub trait MergeSource {
    /// Loads the variable definitions document (`{"definitions": {name: {type, default}}}`).
    fn variable_definitions(&self) -> Result<SourceDocument>;

    /// Loads the variable values document (`{name: value}`).
    fn variable_values(&self) -> Result<SourceDocument>;

    /// Loads a template by name.
    fn template(&self, name: &str) -> Result<SourceDocument>;
}

/// Whether the project declares its variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMode {
    /// Definitions and values are loaded, checked and exposed to templates.
    #[default]
    Declared,
    /// No definitions file exists; templates are resolved against an empty context.
    NoDeclarations,
}

/// The outcome of a merge.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeResult {
    /// Fully resolved configuration document
    pub document: Value,
    /// Hash of `document` alone
    pub document_hash: String,
    /// Hash over every input consulted by the merge
    pub fingerprint: String,
}

/// Combines templates and variables supplied by a [`MergeSource`].
pub struct Merger<'a, S: MergeSource + ?Sized> {
    source: &'a S,
    mode: MergeMode,
}

impl<'a, S: MergeSource + ?Sized> Merger<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            mode: MergeMode::Declared,
        }
    }

    pub fn with_mode(mut self, mode: MergeMode) -> Self {
        self.mode = mode;
        self
    }

    /// Resolves the entry template and fingerprints every consulted input.
    ///
    /// The fingerprint covers, in order: the definitions, the values, the entry
    /// template, then each included template as it is loaded.
    #[instrument(skip(self), fields(mode = ?self.mode))]
    pub fn merge(&self, entry: &str) -> Result<MergeResult> {
        let mut fingerprint = Fingerprint::new();
        let (context, template) = match self.mode {
            MergeMode::Declared => {
                let definitions = self.source.variable_definitions()?;
                let values = self.source.variable_values()?;
                fingerprint.update(&definitions.document);
                fingerprint.update(&values.document);
                let template = self.source.template(entry)?;
                fingerprint.update(&template.document);
                check_variable_declarations(&definitions, &values)?;
                (build_context(&definitions, &values)?, template)
            }
            MergeMode::NoDeclarations => {
                let template = self.source.template(entry)?;
                fingerprint.update(&template.document);
                (LayeredContext::new(), template)
            }
        };

        let document = {
            let loader = SourceLoader {
                source: self.source,
                fingerprint: Some(&mut fingerprint),
            };
            let mut resolver = Resolver::new(context).with_loader(Box::new(loader));
            resolver.resolve_template(entry, template.document)?
        };

        let document_hash = document_hash(&document);
        let fingerprint = fingerprint.digest();
        info!(
            entry = entry,
            fingerprint = %fingerprint,
            document_hash = %document_hash,
            "Merged configuration template"
        );
        Ok(MergeResult {
            document,
            document_hash,
            fingerprint,
        })
    }

    /// Translates a location in the merged document back to its template and
    /// variable sources. Never alters any state.
    #[instrument(skip(self))]
    pub fn resolve_path(&self, path: &str, entry: &str) -> Result<PathResolution> {
        let context = match self.mode {
            MergeMode::Declared => {
                let definitions = self.source.variable_definitions()?;
                let values = self.source.variable_values()?;
                build_context(&definitions, &values)?
            }
            MergeMode::NoDeclarations => LayeredContext::new(),
        };
        let template = self.source.template(entry)?;
        let loader = SourceLoader {
            source: self.source,
            fingerprint: None,
        };
        Resolver::new(context)
            .with_loader(Box::new(loader))
            .resolve_path(path, template)
    }
}

/// Checks that declarations and supplied values agree.
///
/// Both checks collect every offending name before failing. A declared variable
/// without default and without a supplied value produces [`Error::UnusedVariable`];
/// a supplied value for an undeclared name produces [`Error::UndefinedVariables`].
/// When both checks fail the former is returned and the latter is logged.
pub fn check_variable_declarations(
    definitions: &SourceDocument,
    values: &SourceDocument,
) -> Result<()> {
    let declared = declarations(definitions)?;
    let supplied = as_object(values)?;

    let missing: Vec<String> = declared
        .iter()
        .filter(|(name, definition)| {
            supplied.get(*name).map_or(true, Value::is_null)
                && definition.get("default").map_or(true, Value::is_null)
        })
        .map(|(name, _)| name.clone())
        .collect();

    let undeclared: Vec<String> = supplied
        .keys()
        .filter(|name| !declared.contains_key(*name))
        .cloned()
        .collect();

    let undeclared_error = (!undeclared.is_empty()).then(|| Error::UndefinedVariables {
        names: undeclared,
        definitions: definitions.origin.clone(),
        values: values.origin.clone(),
    });

    if !missing.is_empty() {
        if let Some(error) = undeclared_error {
            warn!(error = %error, "Additional variable declaration problem");
        }
        return Err(Error::UnusedVariable {
            names: missing,
            definitions: definitions.origin.clone(),
            values: values.origin.clone(),
        });
    }

    match undeclared_error {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

/// Builds the override-then-default context from values and definition defaults.
fn build_context(definitions: &SourceDocument, values: &SourceDocument) -> Result<LayeredContext> {
    let defaults: Map<String, Value> = declarations(definitions)?
        .iter()
        .map(|(name, definition)| {
            (
                name.clone(),
                definition.get("default").cloned().unwrap_or(Value::Null),
            )
        })
        .collect();

    let mut overrides = Map::new();
    overrides.insert(VARIABLE_NAMESPACE.to_string(), values.document.clone());
    let mut fallbacks = Map::new();
    fallbacks.insert(VARIABLE_NAMESPACE.to_string(), Value::Object(defaults));

    debug!(
        definitions = %definitions.origin,
        values = %values.origin,
        "Built layered variable context"
    );
    Ok(LayeredContext::new()
        .with_source(SourceDocument::new(
            Value::Object(overrides),
            values.origin.clone(),
        ))
        .with_source(SourceDocument::new(
            Value::Object(fallbacks),
            definitions.origin.clone(),
        )))
}

fn declarations(definitions: &SourceDocument) -> Result<&Map<String, Value>> {
    definitions
        .document
        .get("definitions")
        .and_then(Value::as_object)
        .ok_or_else(|| Error::InvalidDocument {
            origin: definitions.origin.clone(),
            reason: "expected a 'definitions' object".to_string(),
        })
}

fn as_object(values: &SourceDocument) -> Result<&Map<String, Value>> {
    values
        .document
        .as_object()
        .ok_or_else(|| Error::InvalidDocument {
            origin: values.origin.clone(),
            reason: "expected an object of variable values".to_string(),
        })
}

/// Loads includes from the merge source, optionally folding each into a fingerprint.
struct SourceLoader<'a, S: MergeSource + ?Sized> {
    source: &'a S,
    fingerprint: Option<&'a mut Fingerprint>,
}

impl<S: MergeSource + ?Sized> TemplateLoader for SourceLoader<'_, S> {
    fn load(&mut self, name: &str) -> Result<SourceDocument> {
        let include = self
            .source
            .template(name)
            .map_err(|e| Error::IncludeNotFound {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        if let Some(fingerprint) = self.fingerprint.as_deref_mut() {
            fingerprint.update(&include.document);
        }
        Ok(include)
    }
}
