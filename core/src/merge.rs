//! Recursive merging of schema fragments into one accumulated tree.
//!
//! Mods are folded in installation order, each fragment deep-merged into the
//! accumulated schema. Direct conflicts resolve in favor of the later mod;
//! disjoint subtrees accumulate. Every fragment is normalized exactly once,
//! at the moment it enters the fold.
//!
//! # Example
//!
//! ```
//! use cmdweave_core::{CommandSchema, Diagnostics, Mod, merge_mods};
//!
//! let base = Mod::new("base", CommandSchema::new().with_command("build", CommandSchema::new()));
//! let extra = Mod::new("extra", CommandSchema::new().with_command("deploy", CommandSchema::new()));
//!
//! let mut diags = Diagnostics::new();
//! let merged = merge_mods(&[base, extra], &mut diags);
//! assert!(merged.find_command("build").is_some());
//! assert!(merged.find_command("deploy").is_some());
//! ```

use std::collections::BTreeMap;

use crate::diagnostics::Diagnostics;
use crate::normalize::normalize_schema;
use crate::types::{CommandSchema, Mod, ModSource};

/// Folds all mods into one accumulated schema, in installation order.
///
/// Each fragment's root is stamped with the mod's provenance before folding,
/// so every merged subtree can name a contributing mod.
pub fn merge_mods(mods: &[Mod], diags: &mut Diagnostics) -> CommandSchema {
    mods.iter().fold(CommandSchema::new(), |accumulated, m| {
        let mut fragment = m.schema.clone();
        fragment.source = Some(ModSource {
            name: m.name.clone(),
            from: m.from.clone(),
        });
        merge_schemas(accumulated, fragment, &[], diags)
    })
}

/// Deep-merges `incoming` into `current`.
///
/// `incoming` is normalized first; `current` is assumed already normalized
/// from a prior fold. The node-level conflict policy hinges on `action`:
///
/// - neither side has one: shallow field-by-field merge, incoming winning
///   where it carries a value;
/// - exactly one side has one: that side wins wholesale;
/// - both have one: incoming wins wholesale and the conflict is diagnosed.
///
/// The subcommand maps are always unioned, with shared keys merged
/// recursively under the extended path.
pub fn merge_schemas(
    current: CommandSchema,
    incoming: CommandSchema,
    path: &[String],
    diags: &mut Diagnostics,
) -> CommandSchema {
    let mut current = current;
    let mut incoming = normalize_schema(incoming, path, diags);

    if current.action.is_some() && incoming.action.is_some() {
        diags.report(format!(
            "the command '{}' is defined with an action by both '{}' and '{}', prefer the later.",
            path.join(" "),
            mod_name(&current),
            mod_name(&incoming),
        ));
    }

    let current_source = current.source.clone();
    let incoming_source = incoming.source.clone();
    let current_commands = std::mem::take(&mut current.commands);
    let incoming_commands = std::mem::take(&mut incoming.commands);

    let mut merged = if incoming.action.is_some() {
        incoming
    } else if current.action.is_some() {
        current
    } else {
        shallow_merge(current, incoming)
    };
    merged.commands = merge_command_maps(
        current_commands,
        current_source,
        incoming_commands,
        incoming_source,
        path,
        diags,
    );
    merged
}

fn mod_name(schema: &CommandSchema) -> &str {
    schema
        .source
        .as_ref()
        .map(|s| s.name.as_str())
        .unwrap_or("unknown mod")
}

/// Field-by-field merge for nodes where neither side carries an action.
/// Empty flag/argument lists count as absent so a fragment that only adds
/// subcommands does not wipe out sibling declarations.
fn shallow_merge(current: CommandSchema, incoming: CommandSchema) -> CommandSchema {
    CommandSchema {
        description: incoming.description.or(current.description),
        commands: BTreeMap::new(),
        flags: if incoming.flags.is_empty() {
            current.flags
        } else {
            incoming.flags
        },
        arguments: if incoming.arguments.is_empty() {
            current.arguments
        } else {
            incoming.arguments
        },
        action: None,
        allow_unknown_flags: incoming.allow_unknown_flags.or(current.allow_unknown_flags),
        allow_unknown_arguments: incoming
            .allow_unknown_arguments
            .or(current.allow_unknown_arguments),
        hidden: incoming.hidden.or(current.hidden),
        source: incoming.source.or(current.source),
    }
}

fn merge_command_maps(
    current_commands: BTreeMap<String, CommandSchema>,
    current_source: Option<ModSource>,
    incoming_commands: BTreeMap<String, CommandSchema>,
    incoming_source: Option<ModSource>,
    path: &[String],
    diags: &mut Diagnostics,
) -> BTreeMap<String, CommandSchema> {
    let mut commands: BTreeMap<String, CommandSchema> = BTreeMap::new();

    for (name, mut child) in current_commands {
        if child.source.is_none() {
            child.source = current_source.clone();
        }
        commands.insert(name, child);
    }

    // Incoming subtrees always go through a recursive merge, against the
    // current-side entry when the key is shared or an empty schema otherwise,
    // so a single-side subtree still gets normalized exactly once.
    for (name, mut child) in incoming_commands {
        if child.source.is_none() {
            child.source = incoming_source.clone();
        }
        let existing = commands.remove(&name).unwrap_or_default();
        let mut child_path = path.to_vec();
        child_path.push(name.clone());
        let merged = merge_schemas(existing, child, &child_path, diags);
        commands.insert(name, merged);
    }

    commands
}
