//! Tokenizing argument parser and input validation for merged command
//! schemas.
//!
//! This crate owns the back half of the `cmdweave` pipeline. Given the
//! accumulated schema produced by `cmdweave-core`, [`parse`] runs the raw
//! `argv` through a three-stage tokenizer (subcommand descent, flag
//! collection, positional consumption) and produces a [`ParseContext`].
//! Tokenizing is best-effort and never fails; [`validate_input`] then judges
//! the context against the schema's constraints and reports every violation
//! in one aggregate [`InvalidInput`].
//!
//! # Example
//!
//! ```
//! use cmdweave_core::{ArgumentSchema, CommandSchema, FlagSchema};
//! use cmdweave_parser::{parse, validate_input};
//!
//! let schema = CommandSchema::new().with_command(
//!     "build",
//!     CommandSchema::new()
//!         .with_flag(FlagSchema::new("verbose").with_shorten("v"))
//!         .with_argument(ArgumentSchema::new("files").variadic()),
//! );
//!
//! let context = parse(&schema, &["build", "src/main.rs", "-v"]);
//! assert_eq!(context.subcommands, ["build"]);
//! assert!(validate_input(&context).is_ok());
//! ```

mod context;
mod parse;
mod validate;

pub use context::ParseContext;
pub use parse::parse;
pub use validate::{InputViolation, InvalidInput, check_input, validate_input};
