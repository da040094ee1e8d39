//! Best-effort repair of schema fragments before merging.
//!
//! Mods are independently authored and unreviewed, so a malformed fragment
//! must never take the whole CLI down. Every shape defect is auto-repaired
//! with the mildest fix that restores consistency, and each repair is
//! reported through the [`Diagnostics`] sink. The pass is idempotent.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use crate::diagnostics::{Diagnostics, fragment_label};
use crate::types::{Action, ArgumentSchema, ArgumentValue, CommandSchema, FlagSchema, FlagValue};

/// Repairs one schema fragment, returning a fully-owned consistent copy.
///
/// `path` is the subcommand path the fragment sits at, used only to label
/// diagnostics. The pass does not recurse into `commands`; the merger
/// normalizes each subtree as it folds it in.
pub fn normalize_schema(
    mut schema: CommandSchema,
    path: &[String],
    diags: &mut Diagnostics,
) -> CommandSchema {
    let prefix = fragment_label(schema.source.as_ref().map(|s| s.name.as_str()), path);

    resolve_action_path(&mut schema);
    schema.flags = normalize_flags(std::mem::take(&mut schema.flags), &prefix, diags);
    schema.arguments = normalize_arguments(std::mem::take(&mut schema.arguments), &prefix, diags);

    schema
}

/// Resolves a relative script action against the contributing mod's origin
/// directory. Mod origins are absolute entry paths, so a resolved action
/// stays put on a second pass.
fn resolve_action_path(schema: &mut CommandSchema) {
    let Some(Action::Script(script)) = &schema.action else {
        return;
    };
    let Some(from) = schema.source.as_ref().and_then(|s| s.from.as_deref()) else {
        return;
    };
    let script_path = Path::new(script);
    if script_path.is_relative() {
        if let Some(dir) = from.parent() {
            let resolved = normalize_path(&dir.join(script_path));
            schema.action = Some(Action::Script(resolved.to_string_lossy().into_owned()));
        }
    }
}

/// Lexically collapses `.` and `..` components of a joined path, without
/// touching the filesystem.
fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

fn normalize_flags(
    declared: Vec<FlagSchema>,
    prefix: &str,
    diags: &mut Diagnostics,
) -> Vec<FlagSchema> {
    let mut kept: Vec<FlagSchema> = Vec::new();

    for mut flag in declared {
        if flag.name.starts_with("no-") {
            diags.report(format!(
                "{prefix} dropped invalid flag '{}' in schema: starting with 'no-' is not \
                 allowed, it conflicts with the negative flag prefix.",
                flag.name
            ));
            continue;
        }
        if flag.name.is_empty() || flag.name.contains(char::is_whitespace) {
            diags.report(format!(
                "{prefix} dropped invalid flag '{}' in schema: the name must be a non-empty \
                 string without whitespace.",
                flag.name
            ));
            continue;
        }

        if flag.variadic
            && matches!(
                flag.default,
                Some(FlagValue::Text(_)) | Some(FlagValue::Bool(_))
            )
        {
            diags.report(format!(
                "{prefix} auto fix invalid flag '{}' in schema (set variadic to false): the \
                 default value of a variadic flag should be a string list.",
                flag.name
            ));
            flag.variadic = false;
        } else if !flag.variadic && matches!(flag.default, Some(FlagValue::List(_))) {
            diags.report(format!(
                "{prefix} auto fix invalid flag '{}' in schema (set variadic to true): the \
                 default value of a non-variadic flag should not be a list.",
                flag.name
            ));
            flag.variadic = true;
        }

        fix_flag_choices(&mut flag, prefix, diags);

        // Map semantics for duplicate declarations: the later one wins.
        if let Some(existing) = kept.iter().position(|f| f.name == flag.name) {
            diags.report(format!(
                "{prefix} flag '{}' is declared more than once, prefer the later declaration.",
                flag.name
            ));
            kept[existing] = flag;
        } else {
            kept.push(flag);
        }
    }

    report_shorten_collisions(&kept, prefix, diags);
    kept
}

fn fix_flag_choices(flag: &mut FlagSchema, prefix: &str, diags: &mut Diagnostics) {
    let Some(choices) = &flag.choices else {
        return;
    };
    if choices.is_empty() {
        diags.report(format!(
            "{prefix} auto fix invalid flag '{}' in schema (drop choices): empty choices are \
             meaningless.",
            flag.name
        ));
        flag.choices = None;
        return;
    }
    let Some(default) = &flag.default else {
        return;
    };
    let default_is_invalid = match default {
        FlagValue::Bool(_) => true,
        FlagValue::Text(value) => !choices.contains(value),
        FlagValue::List(values) => values.iter().any(|value| !choices.contains(value)),
    };
    if default_is_invalid {
        diags.report(format!(
            "{prefix} auto fix invalid flag '{}' in schema (drop default): the default value \
             does not match choices '{}'.",
            flag.name,
            choices.join("|")
        ));
        flag.default = None;
    }
}

/// Flags sharing one alias are only diagnosed; lookup is rebuilt downstream
/// and already resolves to the later declaration.
fn report_shorten_collisions(flags: &[FlagSchema], prefix: &str, diags: &mut Diagnostics) {
    let mut owners: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for flag in flags {
        if let Some(shorten) = &flag.shorten {
            owners.entry(shorten).or_default().push(&flag.name);
        }
    }
    for (shorten, names) in owners {
        if names.len() > 1 {
            diags.report(format!(
                "{prefix} shorten flag '{shorten}' is duplicated in flags '{}', prefer the later.",
                names.join("|")
            ));
        }
    }
}

fn normalize_arguments(
    declared: Vec<ArgumentSchema>,
    prefix: &str,
    diags: &mut Diagnostics,
) -> Vec<ArgumentSchema> {
    let total = declared.len();
    let mut met_optional = false;
    let mut kept: Vec<ArgumentSchema> = Vec::new();

    for (index, mut argument) in declared.into_iter().enumerate() {
        if argument.name.is_empty() || argument.name.contains(char::is_whitespace) {
            diags.report(format!(
                "{prefix} dropped invalid argument '{}' in schema: the name must be a non-empty \
                 string without whitespace.",
                argument.name
            ));
            continue;
        }
        if kept.iter().any(|a| a.name == argument.name) {
            diags.report(format!(
                "{prefix} dropped invalid argument '{}' in schema: duplicated name.",
                argument.name
            ));
            continue;
        }

        if argument.optional {
            met_optional = true;
        } else if met_optional {
            diags.report(format!(
                "{prefix} auto fix invalid argument '{}' in schema (set optional to true): a \
                 required argument cannot follow an optional one.",
                argument.name
            ));
            argument.optional = true;
        }

        let is_last = index == total - 1;
        if !is_last && argument.variadic {
            diags.report(format!(
                "{prefix} auto fix invalid argument '{}' in schema (set variadic to false): only \
                 the last argument can be variadic.",
                argument.name
            ));
            argument.variadic = false;
        }
        if argument.variadic && matches!(argument.default, Some(ArgumentValue::Text(_))) {
            diags.report(format!(
                "{prefix} auto fix invalid argument '{}' in schema (set variadic to false): the \
                 default value of a variadic argument should be a string list.",
                argument.name
            ));
            argument.variadic = false;
        }
        if !argument.variadic && matches!(argument.default, Some(ArgumentValue::List(_))) {
            if is_last {
                diags.report(format!(
                    "{prefix} auto fix invalid argument '{}' in schema (set variadic to true): \
                     the default value of a non-variadic argument should not be a list.",
                    argument.name
                ));
                argument.variadic = true;
            } else {
                diags.report(format!(
                    "{prefix} auto fix invalid argument '{}' in schema (drop default): a list \
                     default needs a variadic argument, but only the last argument can be \
                     variadic.",
                    argument.name
                ));
                argument.default = None;
            }
        }

        fix_argument_choices(&mut argument, prefix, diags);
        kept.push(argument);
    }

    kept
}

fn fix_argument_choices(argument: &mut ArgumentSchema, prefix: &str, diags: &mut Diagnostics) {
    let Some(choices) = &argument.choices else {
        return;
    };
    if choices.is_empty() {
        diags.report(format!(
            "{prefix} auto fix invalid argument '{}' in schema (drop choices): empty choices are \
             meaningless.",
            argument.name
        ));
        argument.choices = None;
        return;
    }
    let Some(default) = &argument.default else {
        return;
    };
    let default_is_invalid = match default {
        ArgumentValue::Text(value) => !choices.contains(value),
        ArgumentValue::List(values) => values.iter().any(|value| !choices.contains(value)),
    };
    if default_is_invalid {
        diags.report(format!(
            "{prefix} auto fix invalid argument '{}' in schema (drop default): the default value \
             does not match choices '{}'.",
            argument.name,
            choices.join("|")
        ));
        argument.default = None;
    }
}
