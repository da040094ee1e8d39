//! Schema type definitions for mod-contributed command trees.
//!
//! This module defines the data model shared by the whole pipeline. Schema
//! fragments are plain data: mod loaders hand them to the core as trees that
//! round-trip through JSON with [`serde`], the merger folds them into one
//! accumulated tree, and the parser consumes the result.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Value carried by a flag after parsing, or declared as a flag default.
///
/// Booleans come from bare flags (`--verbose`) and negative flags
/// (`--no-cache`), single strings from `--out file`, and lists from variadic
/// flags that accumulate values.
///
/// # Examples
///
/// ```
/// use cmdweave_core::FlagValue;
///
/// let v: FlagValue = serde_json::from_str("[\"a\", \"b\"]").unwrap();
/// assert_eq!(v, FlagValue::List(vec!["a".into(), "b".into()]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    /// Flag seen without a value (`true`) or negated (`false`).
    Bool(bool),
    /// Single string value.
    Text(String),
    /// Ordered accumulation of values.
    List(Vec<String>),
}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        FlagValue::Bool(value)
    }
}

impl From<&str> for FlagValue {
    fn from(value: &str) -> Self {
        FlagValue::Text(value.to_string())
    }
}

impl From<Vec<String>> for FlagValue {
    fn from(values: Vec<String>) -> Self {
        FlagValue::List(values)
    }
}

/// Value bound to a positional argument, or declared as an argument default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgumentValue {
    /// Single string value.
    Text(String),
    /// Values collected by a variadic argument.
    List(Vec<String>),
}

impl From<&str> for ArgumentValue {
    fn from(value: &str) -> Self {
        ArgumentValue::Text(value.to_string())
    }
}

impl From<Vec<String>> for ArgumentValue {
    fn from(values: Vec<String>) -> Self {
        ArgumentValue::List(values)
    }
}

/// Opaque handler reference attached to a command node.
///
/// The core never invokes actions; it only resolves script paths during
/// normalization and hands the reference to the external dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Script path contributed by a mod, relative to the mod's origin until
    /// normalization resolves it.
    Script(String),
    /// Registry key for an inline handler installed by the host process.
    Handler(String),
}

/// Provenance of a schema fragment: which mod contributed it.
///
/// Stamped onto fragment roots by the fold and propagated to subcommand
/// nodes during merging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModSource {
    /// Identity name of the contributing mod.
    pub name: String,
    /// Origin path when the mod was loaded from a schema file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<PathBuf>,
}

impl ModSource {
    /// Creates a provenance tag with no origin path.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            from: None,
        }
    }
}

/// Schema for a command flag.
///
/// Flags are declared as an ordered list; declaration order matters when two
/// flags share a `shorten` alias (the later declaration wins at lookup time).
///
/// # Examples
///
/// ```
/// use cmdweave_core::FlagSchema;
///
/// let output = FlagSchema::new("output")
///     .with_shorten("o")
///     .value_required()
///     .with_description("Write result to this path");
/// assert_eq!(output.name, "output");
/// assert!(output.value_required);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlagSchema {
    /// Long flag name, matched as `--name`.
    pub name: String,
    /// Single-character alias, matched as `-x`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shorten: Option<String>,
    /// Description for help rendering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the flag must be present.
    pub required: bool,
    /// Whether the flag must carry a string value rather than just being set.
    pub value_required: bool,
    /// Whether the flag is repeatable, collecting values into a list.
    pub variadic: bool,
    /// Closed set of allowed values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
    /// Value used when the flag is not supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<FlagValue>,
    /// Excluded from help rendering.
    pub hidden: bool,
}

impl FlagSchema {
    /// Creates a flag with the given long name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Sets the single-character alias.
    pub fn with_shorten(mut self, shorten: &str) -> Self {
        self.shorten = Some(shorten.to_string());
        self
    }

    /// Adds a description.
    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    /// Sets the default value.
    pub fn with_default(mut self, default: impl Into<FlagValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Restricts values to a closed set of choices.
    pub fn with_choices(mut self, choices: &[&str]) -> Self {
        self.choices = Some(choices.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Marks the flag as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Marks the flag as needing a string value.
    pub fn value_required(mut self) -> Self {
        self.value_required = true;
        self
    }

    /// Marks the flag as repeatable.
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }
}

/// Schema for a positional argument.
///
/// Arguments are consumed in declaration order. Only the last argument in a
/// list may be variadic, and once one argument is optional every later one
/// must be too; the normalizer repairs declarations that break these rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ArgumentSchema {
    /// Name of the argument, unique within its command.
    pub name: String,
    /// Description for help rendering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the argument may be omitted.
    pub optional: bool,
    /// Whether the argument collects every remaining positional token.
    pub variadic: bool,
    /// Closed set of allowed values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
    /// Value used when the argument is not supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<ArgumentValue>,
}

impl ArgumentSchema {
    /// Creates an argument with the given name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Adds a description.
    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    /// Marks the argument as omittable.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Marks the argument as collecting all remaining tokens.
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    /// Sets the default value.
    pub fn with_default(mut self, default: impl Into<ArgumentValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Restricts values to a closed set of choices.
    pub fn with_choices(mut self, choices: &[&str]) -> Self {
        self.choices = Some(choices.iter().map(|c| c.to_string()).collect());
        self
    }
}

/// Recursive schema node for a command.
///
/// This is the primary type in the crate. Mods contribute fragments shaped
/// like this; the merger folds them into one accumulated tree which the
/// parser then narrows subcommand by subcommand.
///
/// The `allow_unknown_flags`, `allow_unknown_arguments` and `hidden` fields
/// are tri-state so that a fragment which omits them does not clobber an
/// explicit setting from another mod during the shallow field merge.
///
/// # Examples
///
/// ```
/// use cmdweave_core::{ArgumentSchema, CommandSchema, FlagSchema};
///
/// let build = CommandSchema::new()
///     .with_flag(FlagSchema::new("verbose"))
///     .with_argument(ArgumentSchema::new("target").variadic());
/// let root = CommandSchema::new().with_command("build", build);
///
/// assert!(root.find_command("build").is_some());
/// assert!(root.find_command("build").unwrap().find_flag("verbose").is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CommandSchema {
    /// Description for help rendering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Subcommand tree, keyed by subcommand name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub commands: BTreeMap<String, CommandSchema>,
    /// Flags accepted at this node, in declaration order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<FlagSchema>,
    /// Positional arguments, in consumption order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<ArgumentSchema>,
    /// Handler reference, resolved externally.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    /// Accept flags not declared at this node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_unknown_flags: Option<bool>,
    /// Accept positional tokens beyond the declared arguments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_unknown_arguments: Option<bool>,
    /// Excluded from help rendering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    /// Which mod contributed this node. Set during the fold; fragments
    /// normally leave it empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ModSource>,
}

impl CommandSchema {
    /// Creates an empty command node.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a subcommand.
    pub fn with_command(mut self, name: &str, schema: CommandSchema) -> Self {
        self.commands.insert(name.to_string(), schema);
        self
    }

    /// Adds a flag declaration.
    pub fn with_flag(mut self, flag: FlagSchema) -> Self {
        self.flags.push(flag);
        self
    }

    /// Adds a positional argument declaration.
    pub fn with_argument(mut self, argument: ArgumentSchema) -> Self {
        self.arguments.push(argument);
        self
    }

    /// Sets the handler reference.
    pub fn with_action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    /// Adds a description.
    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    /// Finds a direct subcommand by name.
    pub fn find_command(&self, name: &str) -> Option<&CommandSchema> {
        self.commands.get(name)
    }

    /// Finds a flag by its long name. The later declaration wins when a
    /// fragment slipped duplicates past normalization.
    pub fn find_flag(&self, name: &str) -> Option<&FlagSchema> {
        self.flags.iter().rev().find(|flag| flag.name == name)
    }

    /// Builds the alias → long-name lookup for this node. When two flags
    /// share an alias the later declaration wins.
    ///
    /// # Examples
    ///
    /// ```
    /// use cmdweave_core::{CommandSchema, FlagSchema};
    ///
    /// let schema = CommandSchema::new()
    ///     .with_flag(FlagSchema::new("force").with_shorten("f"))
    ///     .with_flag(FlagSchema::new("file").with_shorten("f"));
    /// assert_eq!(schema.shorten_lookup().get("f").map(String::as_str), Some("file"));
    /// ```
    pub fn shorten_lookup(&self) -> HashMap<String, String> {
        let mut lookup = HashMap::new();
        for flag in &self.flags {
            if let Some(shorten) = &flag.shorten {
                lookup.insert(shorten.clone(), flag.name.clone());
            }
        }
        lookup
    }

    /// Whether undeclared flags are accepted at this node.
    pub fn allows_unknown_flags(&self) -> bool {
        self.allow_unknown_flags.unwrap_or(false)
    }

    /// Whether extra positional tokens are accepted at this node.
    pub fn allows_unknown_arguments(&self) -> bool {
        self.allow_unknown_arguments.unwrap_or(false)
    }
}

/// An independently contributed unit adding command schema to the CLI.
///
/// Mods are folded in installation order; later mods win direct conflicts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mod {
    /// Identity name of the mod.
    pub name: String,
    /// Entry path when the mod was loaded from a schema file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<PathBuf>,
    /// The command schema fragment contributed by the mod.
    pub schema: CommandSchema,
}

impl Mod {
    /// Creates an in-memory mod with no origin path.
    pub fn new(name: &str, schema: CommandSchema) -> Self {
        Self {
            name: name.to_string(),
            from: None,
            schema,
        }
    }

    /// Creates a mod loaded from a schema file.
    pub fn from_file(name: &str, from: impl Into<PathBuf>, schema: CommandSchema) -> Self {
        Self {
            name: name.to_string(),
            from: Some(from.into()),
            schema,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_schema_builder() {
        let flag = FlagSchema::new("message")
            .with_shorten("m")
            .value_required()
            .with_description("Commit message");

        assert_eq!(flag.name, "message");
        assert_eq!(flag.shorten.as_deref(), Some("m"));
        assert!(flag.value_required);
        assert!(!flag.variadic);
    }

    #[test]
    fn test_shorten_lookup_prefers_later_declaration() {
        let schema = CommandSchema::new()
            .with_flag(FlagSchema::new("force").with_shorten("f"))
            .with_flag(FlagSchema::new("file").with_shorten("f"));

        let lookup = schema.shorten_lookup();
        assert_eq!(lookup.get("f").map(String::as_str), Some("file"));
    }

    #[test]
    fn test_find_command() {
        let root = CommandSchema::new()
            .with_command("build", CommandSchema::new())
            .with_command("deploy", CommandSchema::new());

        assert!(root.find_command("build").is_some());
        assert!(root.find_command("test").is_none());
    }

    #[test]
    fn test_schema_round_trips_through_json() {
        let json = r#"{
            "description": "root",
            "commands": {
                "build": {
                    "flags": [
                        { "name": "output", "shorten": "o", "valueRequired": true }
                    ],
                    "arguments": [
                        { "name": "files", "variadic": true, "default": ["src"] }
                    ],
                    "action": { "script": "./build.js" }
                }
            },
            "allowUnknownFlags": true
        }"#;

        let schema: CommandSchema = serde_json::from_str(json).unwrap();
        assert!(schema.allows_unknown_flags());

        let build = schema.find_command("build").unwrap();
        assert_eq!(build.flags[0].name, "output");
        assert!(build.flags[0].value_required);
        assert_eq!(
            build.arguments[0].default,
            Some(ArgumentValue::List(vec!["src".into()]))
        );
        assert_eq!(build.action, Some(Action::Script("./build.js".into())));

        let back = serde_json::to_string(&schema).unwrap();
        let reparsed: CommandSchema = serde_json::from_str(&back).unwrap();
        assert_eq!(reparsed, schema);
    }
}
