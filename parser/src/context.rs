//! Parsed invocation state produced by the tokenizer.

use std::collections::BTreeMap;

use cmdweave_core::{Action, ArgumentValue, CommandSchema, FlagValue};
use serde::Serialize;

/// Everything the tokenizer extracted from one `argv` against one merged
/// schema.
///
/// The context is best-effort by construction: malformed input never fails
/// tokenization, it just lands in the `unknown_*` buckets. Rejection is the
/// job of [`validate_input`](crate::validate_input), which
/// `allow_invalid_inputs` bypasses for collaborators (such as help display)
/// that parse malformed input on purpose.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseContext {
    /// Raw tokens the context was parsed from.
    pub argv: Vec<String>,
    /// Subcommand names actually resolved, in descent order.
    pub subcommands: Vec<String>,
    /// Parsed positional arguments, keyed by argument name.
    pub arguments: BTreeMap<String, ArgumentValue>,
    /// Positional tokens with no remaining argument slot.
    pub unknown_arguments: Vec<String>,
    /// Parsed flags, keyed by long flag name.
    pub flags: BTreeMap<String, FlagValue>,
    /// Long flags not declared in the hint schema.
    pub unknown_flags: BTreeMap<String, FlagValue>,
    /// Shorten flags with no declared alias in the hint schema.
    pub unknown_shorten_flags: BTreeMap<String, FlagValue>,
    /// Handler reference of the resolved command, for the external dispatcher.
    pub action: Option<Action>,
    /// The schema node in scope after all subcommands were consumed.
    pub hint_schema: CommandSchema,
    /// Skip input validation entirely.
    pub allow_invalid_inputs: bool,
}

impl ParseContext {
    pub(crate) fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            ..Default::default()
        }
    }

    /// Marks the context as exempt from input validation.
    pub fn allow_invalid_inputs(mut self) -> Self {
        self.allow_invalid_inputs = true;
        self
    }

    /// Looks up a parsed flag by its long name.
    pub fn flag(&self, name: &str) -> Option<&FlagValue> {
        self.flags.get(name)
    }

    /// Looks up a parsed positional argument by name.
    pub fn argument(&self, name: &str) -> Option<&ArgumentValue> {
        self.arguments.get(name)
    }
}
