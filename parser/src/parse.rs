//! Stage-machine tokenizer turning raw `argv` into a [`ParseContext`].
//!
//! Tokenizing is best-effort and never rejects input: tokens that match
//! nothing land in the unknown buckets and judgment is deferred to
//! [`validate_input`](crate::validate_input). The machine moves through three
//! stages. It starts in `Subcommand`, descending the schema tree while tokens
//! keep matching subcommand names. The first token that is not a subcommand
//! switches it to `Argument` or, for `-`/`--` tokens, to `Flag`. Flag state
//! collects values for the pending flag; a satisfied single-value flag hands
//! the remaining bare tokens back to positional consumption. A bare `--`
//! stops flag parsing for the rest of the input.
//!
//! The moment the machine leaves `Subcommand` for good, the schema node in
//! scope is final, and every declared default is seeded into the context
//! before any flag or argument token is committed against it.

use std::collections::HashMap;

use cmdweave_core::{ArgumentValue, CommandSchema, FlagValue};
use tracing::debug;

use crate::context::ParseContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Subcommand,
    Argument,
    Flag,
}

/// Tokenizes `argv` against a merged schema.
///
/// # Examples
///
/// ```
/// use cmdweave_core::{ArgumentSchema, CommandSchema, FlagSchema};
/// use cmdweave_parser::parse;
///
/// let schema = CommandSchema::new().with_command(
///     "build",
///     CommandSchema::new()
///         .with_flag(FlagSchema::new("verbose"))
///         .with_argument(ArgumentSchema::new("files").variadic()),
/// );
///
/// let context = parse(&schema, &["build", "a", "b", "--verbose"]);
/// assert_eq!(context.subcommands, ["build"]);
/// ```
pub fn parse<S: AsRef<str>>(schema: &CommandSchema, argv: &[S]) -> ParseContext {
    let tokens: Vec<String> = argv.iter().map(|s| s.as_ref().to_string()).collect();
    let mut machine = Tokenizer::new(schema, tokens.clone());
    for token in &tokens {
        machine.consume(token);
    }
    machine.finish()
}

struct Tokenizer<'schema> {
    context: ParseContext,
    hint: &'schema CommandSchema,
    shorten_lookup: HashMap<String, String>,
    stage: Stage,
    pending_key: Option<String>,
    pending_value: FlagValue,
    pending_unknown_shorten: bool,
    next_argument_index: usize,
    flags_done: bool,
}

impl<'schema> Tokenizer<'schema> {
    fn new(schema: &'schema CommandSchema, argv: Vec<String>) -> Self {
        Self {
            context: ParseContext::new(argv),
            hint: schema,
            shorten_lookup: schema.shorten_lookup(),
            stage: Stage::Subcommand,
            pending_key: None,
            pending_value: FlagValue::Bool(true),
            pending_unknown_shorten: false,
            next_argument_index: 0,
            flags_done: false,
        }
    }

    fn consume(&mut self, token: &str) {
        if !self.flags_done {
            if let Some(rest) = token.strip_prefix('-') {
                self.finish_pending();
                if let Some(long) = rest.strip_prefix('-') {
                    if long.is_empty() {
                        // bare `--`: everything after is positional, even
                        // tokens that look like flags
                        self.flags_done = true;
                        self.set_stage(Stage::Argument);
                        return;
                    }
                    self.start_long_flag(long);
                    return;
                }
                // a bare `-` falls through with an empty key and surfaces
                // as an unknown shorten flag
                self.start_shorten_flag(rest);
                return;
            }
        }

        if self.stage == Stage::Flag {
            self.append_pending_value(token);
            return;
        }

        if self.stage == Stage::Subcommand {
            let hint = self.hint;
            if let Some(sub) = hint.find_command(token) {
                debug!(target: "cmdweave::parse", subcommand = token, "descending into subcommand");
                self.set_hint(sub);
                self.context.subcommands.push(token.to_string());
                return;
            }
            self.set_stage(Stage::Argument);
        }

        self.consume_argument(token);
    }

    fn start_long_flag(&mut self, raw: &str) {
        let (mut key, mut value) = split_value(raw);
        // negative flag sugar: `--no-cache` sets `cache` to false
        if let Some(stripped) = key.strip_prefix("no-") {
            key = stripped;
            value = FlagValue::Bool(false);
        }
        self.pending_key = Some(key.to_string());
        self.pending_value = value;
        self.set_stage(Stage::Flag);
    }

    fn start_shorten_flag(&mut self, raw: &str) {
        let (key, value) = split_value(raw);
        self.pending_value = value;
        match self.shorten_lookup.get(key) {
            Some(long) => self.pending_key = Some(long.clone()),
            None => {
                self.pending_key = Some(key.to_string());
                self.pending_unknown_shorten = true;
            }
        }
        self.set_stage(Stage::Flag);
    }

    /// Accumulates a bare token into the pending flag, or routes it to
    /// positional consumption once the pending flag is satisfied.
    fn append_pending_value(&mut self, token: &str) {
        if self.pending_key.is_none() {
            self.consume_argument(token);
            return;
        }
        // A single-value flag that already holds a string value is satisfied;
        // commit it and treat this token as positional.
        if !self.pending_is_variadic()
            && matches!(
                self.pending_value,
                FlagValue::Text(_) | FlagValue::List(_)
            )
        {
            self.finish_pending();
            self.consume_argument(token);
            return;
        }
        self.pending_value =
            match std::mem::replace(&mut self.pending_value, FlagValue::Bool(true)) {
                FlagValue::List(mut values) => {
                    values.push(token.to_string());
                    FlagValue::List(values)
                }
                FlagValue::Bool(true) => FlagValue::List(vec![token.to_string()]),
                // negative flag swallows any values that follow
                FlagValue::Bool(false) => FlagValue::Bool(false),
                FlagValue::Text(previous) => FlagValue::List(vec![previous, token.to_string()]),
            };
    }

    fn pending_is_variadic(&self) -> bool {
        if self.pending_unknown_shorten {
            return false;
        }
        let Some(key) = &self.pending_key else {
            return false;
        };
        self.hint
            .find_flag(key)
            .map(|flag| flag.variadic)
            .unwrap_or(false)
    }

    /// Commits the pending flag into the context and resets the pending
    /// state. Runs whenever a new flag token starts and once more at end of
    /// input.
    fn finish_pending(&mut self) {
        if self.stage != Stage::Flag {
            return;
        }
        let value = std::mem::replace(&mut self.pending_value, FlagValue::Bool(true));
        let unknown_shorten = std::mem::take(&mut self.pending_unknown_shorten);
        let Some(key) = self.pending_key.take() else {
            return;
        };

        if unknown_shorten {
            self.context
                .unknown_shorten_flags
                .insert(key, collapse(value));
            return;
        }

        let hint = self.hint;
        match hint.find_flag(&key) {
            Some(flag) if flag.variadic => {
                let mut incoming = match value {
                    FlagValue::Bool(_) => Vec::new(),
                    FlagValue::Text(single) => vec![single],
                    FlagValue::List(values) => values,
                };
                // variadic flags accumulate across occurrences, starting
                // from the seeded default
                let mut accumulated = match self.context.flags.remove(&key) {
                    Some(FlagValue::List(values)) => values,
                    _ => Vec::new(),
                };
                accumulated.append(&mut incoming);
                self.context.flags.insert(key, FlagValue::List(accumulated));
            }
            Some(_) => {
                self.context.flags.insert(key, collapse(value));
            }
            None => {
                self.context.unknown_flags.insert(key, collapse(value));
            }
        }
    }

    fn consume_argument(&mut self, token: &str) {
        let hint = self.hint;
        match hint.arguments.get(self.next_argument_index) {
            None => self.context.unknown_arguments.push(token.to_string()),
            Some(argument) if argument.variadic => {
                match self.context.arguments.get_mut(&argument.name) {
                    Some(ArgumentValue::List(values)) => values.push(token.to_string()),
                    _ => {
                        self.context.arguments.insert(
                            argument.name.clone(),
                            ArgumentValue::List(vec![token.to_string()]),
                        );
                    }
                }
            }
            Some(argument) => {
                self.context
                    .arguments
                    .insert(argument.name.clone(), ArgumentValue::Text(token.to_string()));
                self.next_argument_index += 1;
            }
        }
    }

    fn set_stage(&mut self, next: Stage) {
        self.collect_defaults();
        self.stage = next;
    }

    fn set_hint(&mut self, schema: &'schema CommandSchema) {
        self.hint = schema;
        self.shorten_lookup = schema.shorten_lookup();
    }

    /// Seeds declared defaults the moment the machine leaves the subcommand
    /// stage for good; variadic fields without a default start as empty
    /// lists so later accumulation always has a base.
    fn collect_defaults(&mut self) {
        if self.stage != Stage::Subcommand {
            return;
        }
        let hint = self.hint;
        for flag in &hint.flags {
            if let Some(default) = &flag.default {
                self.context
                    .flags
                    .insert(flag.name.clone(), default.clone());
            } else if flag.variadic {
                self.context
                    .flags
                    .insert(flag.name.clone(), FlagValue::List(Vec::new()));
            }
        }
        for argument in &hint.arguments {
            if let Some(default) = &argument.default {
                self.context
                    .arguments
                    .insert(argument.name.clone(), default.clone());
            } else if argument.variadic {
                self.context
                    .arguments
                    .insert(argument.name.clone(), ArgumentValue::List(Vec::new()));
            }
        }
    }

    fn finish(mut self) -> ParseContext {
        self.collect_defaults();
        self.finish_pending();
        self.context.action = self.hint.action.clone();
        self.context.hint_schema = self.hint.clone();
        self.context
    }
}

fn split_value(raw: &str) -> (&str, FlagValue) {
    match raw.split_once('=') {
        Some((key, value)) => (key, FlagValue::Text(value.to_string())),
        None => (raw, FlagValue::Bool(true)),
    }
}

/// Collapses a pending accumulator to its committed value; only the last
/// value survives when several were supplied without a separating flag.
fn collapse(value: FlagValue) -> FlagValue {
    match value {
        FlagValue::List(mut values) => match values.pop() {
            Some(last) => FlagValue::Text(last),
            None => FlagValue::Bool(true),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmdweave_core::{Action, ArgumentSchema, FlagSchema};

    fn build_schema() -> CommandSchema {
        CommandSchema::new().with_command(
            "build",
            CommandSchema::new()
                .with_flag(FlagSchema::new("verbose"))
                .with_flag(FlagSchema::new("o").with_shorten("o").value_required())
                .with_argument(ArgumentSchema::new("files").variadic())
                .with_action(Action::Handler("build".into())),
        )
    }

    #[test]
    fn test_round_trip_subcommand_flags_and_variadic_argument() {
        let schema = build_schema();
        let context = parse(&schema, &["build", "--verbose", "-o", "out.txt", "a", "b"]);

        assert_eq!(context.subcommands, ["build"]);
        assert_eq!(context.flag("verbose"), Some(&FlagValue::Bool(true)));
        assert_eq!(context.flag("o"), Some(&FlagValue::Text("out.txt".into())));
        assert_eq!(
            context.argument("files"),
            Some(&ArgumentValue::List(vec!["a".into(), "b".into()]))
        );
        assert!(context.unknown_arguments.is_empty());
        assert_eq!(context.action, Some(Action::Handler("build".into())));
    }

    #[test]
    fn test_negative_flag_forces_false() {
        let schema = CommandSchema::new().with_flag(FlagSchema::new("cache"));
        let context = parse(&schema, &["--no-cache"]);

        assert_eq!(context.flag("cache"), Some(&FlagValue::Bool(false)));
    }

    #[test]
    fn test_negative_flag_swallows_following_values() {
        let schema = CommandSchema::new().with_flag(FlagSchema::new("cache"));
        let context = parse(&schema, &["--no-cache", "ignored", "also-ignored"]);

        assert_eq!(context.flag("cache"), Some(&FlagValue::Bool(false)));
        assert!(context.unknown_arguments.is_empty());
    }

    #[test]
    fn test_variadic_flag_accumulates_across_occurrences() {
        let schema = CommandSchema::new().with_flag(FlagSchema::new("tag").variadic());
        let context = parse(&schema, &["--tag=a", "--tag=b"]);

        assert_eq!(
            context.flag("tag"),
            Some(&FlagValue::List(vec!["a".into(), "b".into()]))
        );
    }

    #[test]
    fn test_variadic_flag_collects_bare_values() {
        let schema = CommandSchema::new().with_flag(FlagSchema::new("tag").variadic());
        let context = parse(&schema, &["--tag", "a", "b", "--tag", "c"]);

        assert_eq!(
            context.flag("tag"),
            Some(&FlagValue::List(vec!["a".into(), "b".into(), "c".into()]))
        );
    }

    #[test]
    fn test_variadic_flag_appends_onto_seeded_default() {
        let schema = CommandSchema::new()
            .with_flag(FlagSchema::new("tag").variadic().with_default(vec!["x".to_string()]));
        let context = parse(&schema, &["--tag=y"]);

        assert_eq!(
            context.flag("tag"),
            Some(&FlagValue::List(vec!["x".into(), "y".into()]))
        );
    }

    #[test]
    fn test_variadic_flag_without_occurrence_keeps_default_seed() {
        let schema = CommandSchema::new().with_flag(FlagSchema::new("tag").variadic());
        let context = parse(&schema, &["positional"]);

        assert_eq!(context.flag("tag"), Some(&FlagValue::List(Vec::new())));
    }

    #[test]
    fn test_defaults_seed_even_when_input_is_all_subcommands() {
        let schema = CommandSchema::new().with_command(
            "build",
            CommandSchema::new()
                .with_flag(FlagSchema::new("mode").with_default("debug"))
                .with_argument(ArgumentSchema::new("target").with_default("all")),
        );
        let context = parse(&schema, &["build"]);

        assert_eq!(context.flag("mode"), Some(&FlagValue::Text("debug".into())));
        assert_eq!(
            context.argument("target"),
            Some(&ArgumentValue::Text("all".into()))
        );
    }

    #[test]
    fn test_typed_value_beats_seeded_default() {
        let schema =
            CommandSchema::new().with_flag(FlagSchema::new("mode").with_default("debug"));
        let context = parse(&schema, &["--mode=release"]);

        assert_eq!(
            context.flag("mode"),
            Some(&FlagValue::Text("release".into()))
        );
    }

    #[test]
    fn test_shorten_resolves_to_long_name() {
        let schema = CommandSchema::new().with_flag(FlagSchema::new("verbose").with_shorten("v"));
        let context = parse(&schema, &["-v"]);

        assert_eq!(context.flag("verbose"), Some(&FlagValue::Bool(true)));
        assert!(context.unknown_shorten_flags.is_empty());
    }

    #[test]
    fn test_unknown_shorten_is_routed_separately() {
        let schema = CommandSchema::new();
        let context = parse(&schema, &["-z", "value", "extra"]);

        assert_eq!(
            context.unknown_shorten_flags.get("z"),
            Some(&FlagValue::Text("value".into()))
        );
        assert_eq!(context.unknown_arguments, ["extra"]);
    }

    #[test]
    fn test_bare_dash_is_recorded_as_unknown_shorten_flag() {
        let schema = CommandSchema::new().with_argument(ArgumentSchema::new("name").optional());
        let context = parse(&schema, &["-"]);

        assert_eq!(
            context.unknown_shorten_flags.get(""),
            Some(&FlagValue::Bool(true))
        );
        assert!(context.arguments.is_empty());
    }

    #[test]
    fn test_unknown_long_flag_is_recorded_not_rejected() {
        let schema = CommandSchema::new();
        let context = parse(&schema, &["--bogus"]);

        assert_eq!(
            context.unknown_flags.get("bogus"),
            Some(&FlagValue::Bool(true))
        );
    }

    #[test]
    fn test_double_dash_ends_flag_parsing_permanently() {
        let schema = CommandSchema::new()
            .with_flag(FlagSchema::new("verbose"))
            .with_argument(ArgumentSchema::new("args").variadic());
        let context = parse(&schema, &["--", "--verbose", "-x"]);

        assert!(context.flags.is_empty());
        assert_eq!(
            context.argument("args"),
            Some(&ArgumentValue::List(vec!["--verbose".into(), "-x".into()]))
        );
    }

    #[test]
    fn test_equals_value_keeps_remainder_literal() {
        let schema = CommandSchema::new().with_flag(FlagSchema::new("define"));
        let context = parse(&schema, &["--define=key=value"]);

        assert_eq!(
            context.flag("define"),
            Some(&FlagValue::Text("key=value".into()))
        );
    }

    #[test]
    fn test_satisfied_single_value_flag_releases_later_tokens() {
        let schema = CommandSchema::new()
            .with_flag(FlagSchema::new("out").value_required())
            .with_argument(ArgumentSchema::new("first"))
            .with_argument(ArgumentSchema::new("second"));
        let context = parse(&schema, &["--out=o.txt", "a", "b"]);

        assert_eq!(context.flag("out"), Some(&FlagValue::Text("o.txt".into())));
        assert_eq!(
            context.argument("first"),
            Some(&ArgumentValue::Text("a".into()))
        );
        assert_eq!(
            context.argument("second"),
            Some(&ArgumentValue::Text("b".into()))
        );
    }

    #[test]
    fn test_unmatched_token_in_subcommand_stage_becomes_argument() {
        let schema = CommandSchema::new()
            .with_command("build", CommandSchema::new())
            .with_argument(ArgumentSchema::new("name"));
        let context = parse(&schema, &["deploy"]);

        assert!(context.subcommands.is_empty());
        assert_eq!(
            context.argument("name"),
            Some(&ArgumentValue::Text("deploy".into()))
        );
    }

    #[test]
    fn test_positional_overflow_lands_in_unknown_arguments() {
        let schema = CommandSchema::new().with_argument(ArgumentSchema::new("only"));
        let context = parse(&schema, &["one", "two", "three"]);

        assert_eq!(
            context.argument("only"),
            Some(&ArgumentValue::Text("one".into()))
        );
        assert_eq!(context.unknown_arguments, ["two", "three"]);
    }

    #[test]
    fn test_nested_subcommand_descent_binds_deepest_hint() {
        let schema = CommandSchema::new().with_command(
            "remote",
            CommandSchema::new().with_command(
                "add",
                CommandSchema::new()
                    .with_argument(ArgumentSchema::new("name"))
                    .with_action(Action::Handler("remote-add".into())),
            ),
        );
        let context = parse(&schema, &["remote", "add", "origin"]);

        assert_eq!(context.subcommands, ["remote", "add"]);
        assert_eq!(
            context.argument("name"),
            Some(&ArgumentValue::Text("origin".into()))
        );
        assert_eq!(context.action, Some(Action::Handler("remote-add".into())));
        assert!(context.hint_schema.find_command("add").is_none());
    }

    #[test]
    fn test_flag_value_scalar_promotes_to_pair_for_variadic_pending() {
        let schema = CommandSchema::new().with_flag(FlagSchema::new("tag").variadic());
        let context = parse(&schema, &["--tag=a", "b"]);

        assert_eq!(
            context.flag("tag"),
            Some(&FlagValue::List(vec!["a".into(), "b".into()]))
        );
    }
}
