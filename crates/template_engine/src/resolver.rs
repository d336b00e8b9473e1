//! Template resolution: expression evaluation, `#include:` inlining and `#includeIf`
//! conditional inclusion.

use serde_json::Value;
use tracing::{debug, instrument};

use crate::context::{child, LayeredContext, Lookup, SourceDocument};
use crate::errors::{Error, Result};
use crate::expression::{stringify, Expression, Part};

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;

/// Prefix marking a string value as a reference to another template document.
pub const INCLUDE_TOKEN: &str = "#include:";

/// Reserved object key holding the condition for conditional inclusion.
pub const INCLUDE_IF_KEY: &str = "#includeIf";

/// Loads template documents referenced by `#include:` directives.
pub trait TemplateLoader {
    /// Loads the named template, returning its content and origin.
    fn load(&mut self, name: &str) -> Result<SourceDocument>;
}

/// Diagnostic translation of a location inside a resolved document.
#[derive(Debug, Clone, PartialEq)]
pub struct PathResolution {
    /// Template file the location points into
    pub template: String,
    /// Files that supplied values for the final expression, in first use order
    pub variables: Vec<String>,
    /// Location relative to `template`
    pub location: String,
    /// Resolved value at the location, `None` when the path does not exist
    pub value: Option<Value>,
}

/// Resolves template documents against a [`LayeredContext`].
pub struct Resolver<'a> {
    context: LayeredContext,
    loader: Option<Box<dyn TemplateLoader + 'a>>,
    include_chain: Vec<String>,
}

impl<'a> Resolver<'a> {
    /// Creates a resolver without an include loader; `#include:` strings are left as text.
    pub fn new(context: LayeredContext) -> Self {
        Self {
            context,
            loader: None,
            include_chain: Vec::new(),
        }
    }

    pub fn with_loader(mut self, loader: Box<dyn TemplateLoader + 'a>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Resolves a named root template, guarding against it including itself.
    pub fn resolve_template(&mut self, name: &str, mut document: Value) -> Result<Value> {
        self.include_chain.push(name.to_string());
        let result = self.resolve_object(&mut document);
        self.include_chain.pop();
        result.map(|_| document)
    }

    /// Resolves a single string value.
    ///
    /// An include directive yields the fully resolved included document. A string
    /// consisting of exactly one expression yields the referenced value with its own
    /// type. Otherwise every expression is stringified into the surrounding text.
    pub fn resolve_string(&mut self, text: &str) -> Result<Value> {
        if let Some(name) = self.include_name(text)? {
            return self.include(&name);
        }
        if text.is_empty() {
            return Ok(Value::String(String::new()));
        }
        let mut provenance = Vec::new();
        self.evaluate(text, &mut provenance)
    }

    /// Resolves a document tree in place.
    ///
    /// Object and array children carrying [`INCLUDE_IF_KEY`] are removed from their
    /// parent when the condition evaluates to `false`; otherwise the key is stripped.
    pub fn resolve_object(&mut self, node: &mut Value) -> Result<()> {
        match node {
            Value::Array(items) => {
                let mut index = 0;
                while index < items.len() {
                    if self.resolve_child(&mut items[index])? {
                        index += 1;
                    } else {
                        items.remove(index);
                    }
                }
            }
            Value::Object(map) => {
                let keys: Vec<String> = map.keys().cloned().collect();
                for key in keys {
                    let keep = match map.get_mut(&key) {
                        Some(child) => self.resolve_child(child)?,
                        None => true,
                    };
                    if !keep {
                        map.shift_remove(&key);
                    }
                }
            }
            Value::String(text) => {
                let resolved = self.resolve_string(text)?;
                *node = resolved;
            }
            _ => {}
        }
        Ok(())
    }

    /// Walks a `/` delimited path through `root`, following include directives.
    ///
    /// When an include is crossed the reported template switches to the included
    /// file and the location restarts from there.
    #[instrument(skip(self, root), fields(origin = %root.origin))]
    pub fn resolve_path(&mut self, path: &str, root: SourceDocument) -> Result<PathResolution> {
        let mut template = root.origin;
        let mut current = Some(root.document);
        let mut variables = Vec::new();
        let mut location: Vec<&str> = Vec::new();

        for segment in path.split('/') {
            let Some(node) = current.take() else {
                break;
            };
            location.push(segment);
            let Some(found) = child(&node, segment).cloned() else {
                break;
            };

            current = match found {
                Value::String(text) => {
                    if let Some(name) = self.include_name(&text)? {
                        let included = self.load(&name)?;
                        template = included.origin;
                        location.clear();
                        Some(included.document)
                    } else if text.is_empty() {
                        Some(Value::String(text))
                    } else {
                        variables.clear();
                        Some(self.evaluate(&text, &mut variables)?)
                    }
                }
                other => Some(other),
            };
        }

        if let Some(value) = current.as_mut() {
            if value.is_object() || value.is_array() {
                self.resolve_object(value)?;
            }
        }

        debug!(template = %template, location = %location.join("/"), "Resolved path");
        Ok(PathResolution {
            template,
            variables,
            location: location.join("/"),
            value: current,
        })
    }

    fn resolve_child(&mut self, child: &mut Value) -> Result<bool> {
        if let Value::Object(map) = child {
            if let Some(condition) = map.shift_remove(INCLUDE_IF_KEY) {
                let include = match condition {
                    Value::String(text) => self.resolve_string(&text)?,
                    other => other,
                };
                if include == Value::Bool(false) {
                    debug!("Dropping conditionally included element");
                    return Ok(false);
                }
            }
        }
        self.resolve_object(child)?;
        Ok(true)
    }

    /// Returns the evaluated include name when `text` is an include directive and a
    /// loader is available.
    fn include_name(&self, text: &str) -> Result<Option<String>> {
        if self.loader.is_none() {
            return Ok(None);
        }
        match text.strip_prefix(INCLUDE_TOKEN) {
            Some(name) => {
                let mut provenance = Vec::new();
                let evaluated = self.evaluate(name, &mut provenance)?;
                Ok(Some(stringify(&evaluated)))
            }
            None => Ok(None),
        }
    }

    fn include(&mut self, name: &str) -> Result<Value> {
        if self.include_chain.iter().any(|entry| entry == name) {
            let mut chain = self.include_chain.clone();
            chain.push(name.to_string());
            return Err(Error::IncludeCycle { chain });
        }
        let included = self.load(name)?;
        debug!(include = name, origin = %included.origin, "Inlining template");
        self.resolve_template(name, included.document)
    }

    fn load(&mut self, name: &str) -> Result<SourceDocument> {
        match self.loader.as_mut() {
            Some(loader) => loader.load(name),
            None => Err(Error::IncludeNotFound {
                name: name.to_string(),
                reason: "no template loader configured".to_string(),
            }),
        }
    }

    /// Evaluates the expressions in `text`, recording the origin of every non-null
    /// value used.
    fn evaluate(&self, text: &str, provenance: &mut Vec<String>) -> Result<Value> {
        let expression = Expression::parse(text)?;

        if let Some(path) = expression.single_lookup() {
            return self.lookup(path, provenance).cloned();
        }

        let mut rendered = String::with_capacity(text.len());
        for part in expression.parts() {
            match part {
                Part::Literal(literal) => rendered.push_str(literal),
                Part::Lookup(path) => rendered.push_str(&stringify(self.lookup(path, provenance)?)),
            }
        }
        Ok(Value::String(rendered))
    }

    fn lookup(&self, path: &[String], provenance: &mut Vec<String>) -> Result<&Value> {
        match self.context.lookup(path) {
            Lookup::Found { value, origin } => {
                if let Some(origin) = origin {
                    if !provenance.iter().any(|known| known == origin) {
                        provenance.push(origin.to_string());
                    }
                }
                Ok(value)
            }
            Lookup::Undefined { key } => Err(Error::UndefinedVariable { key }),
        }
    }
}
