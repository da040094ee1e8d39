//! Schema model, normalization and merging for mod-contributed CLI commands.
//!
//! A `cmdweave` CLI is assembled from mods: independently authored units that
//! each contribute a fragment of the command tree. This crate owns the first
//! two stages of the pipeline:
//!
//! - [`CommandSchema`] / [`FlagSchema`] / [`ArgumentSchema`] — the recursive
//!   data model mods declare their commands in.
//! - [`normalize_schema`] — best-effort repair of one fragment, reporting
//!   every fix through a [`Diagnostics`] sink instead of failing.
//! - [`merge_schemas`] / [`merge_mods`] — the deep merge folding all
//!   fragments into one accumulated schema, later mods winning direct
//!   conflicts.
//!
//! Tokenizing `argv` against the merged schema and validating the result
//! live in the companion `cmdweave-parser` crate.
//!
//! # Example
//!
//! ```
//! use cmdweave_core::*;
//!
//! let buildmod = Mod::new(
//!     "buildmod",
//!     CommandSchema::new().with_command(
//!         "build",
//!         CommandSchema::new()
//!             .with_flag(FlagSchema::new("verbose").with_shorten("v"))
//!             .with_action(Action::Handler("build".into())),
//!     ),
//! );
//!
//! let mut diags = Diagnostics::new();
//! let schema = merge_mods(&[buildmod], &mut diags);
//! assert!(schema.find_command("build").is_some());
//! assert!(diags.is_empty());
//! ```

mod diagnostics;
mod merge;
mod normalize;
mod types;

pub use diagnostics::Diagnostics;
pub use merge::{merge_mods, merge_schemas};
pub use normalize::normalize_schema;
pub use types::{
    Action, ArgumentSchema, ArgumentValue, CommandSchema, FlagSchema, FlagValue, Mod, ModSource,
};
