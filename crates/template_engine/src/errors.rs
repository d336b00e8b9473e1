use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Error types that can occur while resolving or merging configuration templates.
///
/// Variable lookups that fail are always reported through [`Error::UndefinedVariable`],
/// carrying the path segment that could not be resolved. Declaration consistency
/// problems are batched: one error lists every offending variable name.
///
/// # Examples
///
/// ```rust,ignore
/// use template_engine::Error;
///
/// match merger.merge("main.json") {
///     Ok(result) => println!("fingerprint: {}", result.fingerprint),
///     Err(Error::UndefinedVariable { key }) => eprintln!("no value for {key}"),
///     Err(Error::UnusedVariable { names, .. }) => eprintln!("missing values: {names:?}"),
///     Err(e) => eprintln!("merge failed: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A `${...}` expression referenced a path segment that no value source defines.
    ///
    /// The key is the first segment that could not be found, e.g. `badKey` for
    /// `${level1.level2.badKey.worseKey}` or `7` for an out of range list index.
    #[error("Undefined variable: '{key}'")]
    UndefinedVariable {
        /// The unresolved path segment
        key: String,
    },

    /// An expression could not be parsed.
    #[error("Invalid expression in '{text}': {reason}")]
    InvalidExpression {
        /// The text containing the expression
        text: String,
        /// What was wrong with it
        reason: String,
    },

    /// A template referenced through `#include:` could not be loaded.
    #[error("Can't load template include: '{name}'")]
    IncludeNotFound {
        /// Name of the include as written in the template
        name: String,
        /// Underlying load failure
        reason: String,
    },

    /// A template includes itself, directly or through other includes.
    #[error("Template include cycle detected: {}", .chain.join(" -> "))]
    IncludeCycle {
        /// The include chain, ending with the repeated template
        chain: Vec<String>,
    },

    /// Declared variables have neither a default value nor a supplied value.
    ///
    /// The naming follows the established error kind for this condition even though
    /// the variables are missing a value rather than unused.
    #[error(
        "Variables '{}' declared in '{definitions}' without default value and no value given in '{values}'",
        .names.join("', '")
    )]
    UnusedVariable {
        /// Offending variable names in declaration order
        names: Vec<String>,
        /// Origin of the variable definitions
        definitions: String,
        /// Origin of the variable values
        values: String,
    },

    /// Values were supplied for variables that are not declared.
    #[error(
        "Variables '{}' not declared in '{definitions}' but value assigned in '{values}'",
        .names.join("', '")
    )]
    UndefinedVariables {
        /// Offending variable names in supply order
        names: Vec<String>,
        /// Origin of the variable definitions
        definitions: String,
        /// Origin of the variable values
        values: String,
    },

    /// A definitions, values or template document has an unexpected shape.
    #[error("Invalid document '{origin}': {reason}")]
    InvalidDocument {
        /// Where the document was loaded from
        origin: String,
        /// Description of the problem
        reason: String,
    },

    /// The merge source failed to provide a document.
    #[error("Failed to load merge input: {0}")]
    Source(String),
}

/// Convenience result alias for template operations.
pub type Result<T> = std::result::Result<T, Error>;
