//! Post-parse validation of user input against the hint schema.
//!
//! Tokenizing never rejects anything, so this pass is where invocation
//! mistakes surface: unknown flags and arguments, missing required values,
//! and choice mismatches. Violations are accumulated, not short-circuited,
//! and reported as one aggregate failure.

use cmdweave_core::{ArgumentValue, FlagValue};
use thiserror::Error;

use crate::context::ParseContext;

/// One user-input violation found during validation.
///
/// The `Display` impl provides the user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputViolation {
    /// Flag not declared in the hint schema.
    #[error("unknown flag '{0}'.")]
    UnknownFlag(String),
    /// Shorten flag with no declared alias in the hint schema.
    #[error("unknown shorten flag '{0}'.")]
    UnknownShortenFlag(String),
    /// Positional token with no remaining argument slot.
    #[error("unknown argument '{0}'.")]
    UnknownArgument(String),
    /// Required flag absent from the parsed flags.
    #[error("flag '{0}' is required.")]
    RequiredFlagMissing(String),
    /// Flag declared `value_required` but parsed as a bare boolean.
    #[error("flag '{0}' should have value.")]
    FlagValueMissing(String),
    /// Flag value outside the declared choices.
    #[error("'{value}' is not allowed for flag '{flag}', choices: {choices}")]
    FlagChoiceMismatch {
        flag: String,
        value: String,
        choices: String,
    },
    /// Non-optional argument absent from the parsed arguments.
    #[error("argument '{0}' is required.")]
    RequiredArgumentMissing(String),
    /// Argument value outside the declared choices.
    #[error("'{value}' is not allowed for argument '{argument}', choices: {choices}")]
    ArgumentChoiceMismatch {
        argument: String,
        value: String,
        choices: String,
    },
}

/// Aggregate validation failure, carrying every violation found.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validate input failed with errors:\n- {}", format_violations(.violations))]
pub struct InvalidInput {
    /// The individual violations, in check order.
    pub violations: Vec<InputViolation>,
}

fn format_violations(violations: &[InputViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("\n- ")
}

/// Validates a parsed context, returning one aggregate error when any
/// violation was found.
///
/// Skipped entirely when the context carries `allow_invalid_inputs`, for
/// collaborators that parse malformed input on purpose.
pub fn validate_input(context: &ParseContext) -> Result<(), InvalidInput> {
    if context.allow_invalid_inputs {
        return Ok(());
    }
    let violations = check_input(context);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(InvalidInput { violations })
    }
}

/// Runs every check against the context's hint schema and accumulates the
/// violations in check order.
pub fn check_input(context: &ParseContext) -> Vec<InputViolation> {
    let mut violations = Vec::new();
    let schema = &context.hint_schema;

    if !schema.allows_unknown_flags() {
        for key in context.unknown_flags.keys() {
            violations.push(InputViolation::UnknownFlag(key.clone()));
        }
        for key in context.unknown_shorten_flags.keys() {
            violations.push(InputViolation::UnknownShortenFlag(key.clone()));
        }
    }

    if !schema.allows_unknown_arguments() {
        for argument in &context.unknown_arguments {
            violations.push(InputViolation::UnknownArgument(argument.clone()));
        }
    }

    for flag in &schema.flags {
        let value = context.flags.get(&flag.name);
        if flag.required && value.is_none() {
            violations.push(InputViolation::RequiredFlagMissing(flag.name.clone()));
            continue;
        }
        if flag.value_required && matches!(value, Some(FlagValue::Bool(_))) {
            violations.push(InputViolation::FlagValueMissing(flag.name.clone()));
            continue;
        }
        if let (Some(choices), Some(value)) = (&flag.choices, value) {
            for (display, is_string) in flag_scalars(value) {
                if !is_string || !choices.contains(&display) {
                    violations.push(InputViolation::FlagChoiceMismatch {
                        flag: flag.name.clone(),
                        value: display,
                        choices: choices.join("|"),
                    });
                }
            }
        }
    }

    for argument in &schema.arguments {
        let value = context.arguments.get(&argument.name);
        if !argument.optional && value.is_none() {
            violations.push(InputViolation::RequiredArgumentMissing(
                argument.name.clone(),
            ));
            continue;
        }
        if let (Some(choices), Some(value)) = (&argument.choices, value) {
            let scalars = match value {
                ArgumentValue::Text(single) => vec![single.clone()],
                ArgumentValue::List(values) => values.clone(),
            };
            for scalar in scalars {
                if !choices.contains(&scalar) {
                    violations.push(InputViolation::ArgumentChoiceMismatch {
                        argument: argument.name.clone(),
                        value: scalar,
                        choices: choices.join("|"),
                    });
                }
            }
        }
    }

    violations
}

/// Scalar views of a flag value for choice checking, as
/// `(display, is_string)` pairs. Booleans are never valid choices.
fn flag_scalars(value: &FlagValue) -> Vec<(String, bool)> {
    match value {
        FlagValue::Bool(b) => vec![(b.to_string(), false)],
        FlagValue::Text(single) => vec![(single.clone(), true)],
        FlagValue::List(values) => values.iter().map(|v| (v.clone(), true)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;
    use cmdweave_core::{ArgumentSchema, CommandSchema, FlagSchema};

    #[test]
    fn test_unknown_flag_is_rejected_by_default() {
        let schema = CommandSchema::new();
        let context = parse(&schema, &["--bogus"]);

        let error = validate_input(&context).unwrap_err();
        assert_eq!(
            error.violations,
            vec![InputViolation::UnknownFlag("bogus".into())]
        );
        assert!(error.to_string().contains("bogus"));
    }

    #[test]
    fn test_unknown_flag_is_accepted_when_allowed() {
        let mut schema = CommandSchema::new();
        schema.allow_unknown_flags = Some(true);
        let context = parse(&schema, &["--bogus"]);

        assert!(validate_input(&context).is_ok());
        assert_eq!(
            context.unknown_flags.get("bogus"),
            Some(&FlagValue::Bool(true))
        );
    }

    #[test]
    fn test_unknown_shorten_flag_violation() {
        let context = parse(&CommandSchema::new(), &["-z"]);

        let error = validate_input(&context).unwrap_err();
        assert_eq!(
            error.violations,
            vec![InputViolation::UnknownShortenFlag("z".into())]
        );
    }

    #[test]
    fn test_unknown_argument_violation_and_bypass() {
        let schema = CommandSchema::new();
        let context = parse(&schema, &["stray"]);
        let error = validate_input(&context).unwrap_err();
        assert_eq!(
            error.violations,
            vec![InputViolation::UnknownArgument("stray".into())]
        );

        let mut lenient = CommandSchema::new();
        lenient.allow_unknown_arguments = Some(true);
        let context = parse(&lenient, &["stray"]);
        assert!(validate_input(&context).is_ok());
    }

    #[test]
    fn test_required_argument_message() {
        let schema = CommandSchema::new().with_argument(ArgumentSchema::new("name"));
        let context = parse(&schema, &[] as &[&str]);

        let error = validate_input(&context).unwrap_err();
        assert_eq!(error.violations.len(), 1);
        assert_eq!(
            error.violations[0].to_string(),
            "argument 'name' is required."
        );
    }

    #[test]
    fn test_required_flag_violation() {
        let schema = CommandSchema::new().with_flag(FlagSchema::new("token").required());
        let context = parse(&schema, &[] as &[&str]);

        let error = validate_input(&context).unwrap_err();
        assert_eq!(
            error.violations,
            vec![InputViolation::RequiredFlagMissing("token".into())]
        );
    }

    #[test]
    fn test_value_required_flag_parsed_bare() {
        let schema = CommandSchema::new().with_flag(FlagSchema::new("out").value_required());
        let context = parse(&schema, &["--out"]);

        let error = validate_input(&context).unwrap_err();
        assert_eq!(
            error.violations[0].to_string(),
            "flag 'out' should have value."
        );
    }

    #[test]
    fn test_value_required_flag_absent_is_fine_unless_required() {
        let schema = CommandSchema::new().with_flag(FlagSchema::new("out").value_required());
        let context = parse(&schema, &[] as &[&str]);

        assert!(validate_input(&context).is_ok());
    }

    #[test]
    fn test_flag_choice_mismatch_reports_each_offending_value() {
        let schema = CommandSchema::new()
            .with_flag(FlagSchema::new("format").variadic().with_choices(&["json", "yaml"]));
        let context = parse(&schema, &["--format=json", "--format=toml", "--format=xml"]);

        let error = validate_input(&context).unwrap_err();
        assert_eq!(
            error.violations,
            vec![
                InputViolation::FlagChoiceMismatch {
                    flag: "format".into(),
                    value: "toml".into(),
                    choices: "json|yaml".into(),
                },
                InputViolation::FlagChoiceMismatch {
                    flag: "format".into(),
                    value: "xml".into(),
                    choices: "json|yaml".into(),
                },
            ]
        );
    }

    #[test]
    fn test_boolean_value_never_satisfies_choices() {
        let schema =
            CommandSchema::new().with_flag(FlagSchema::new("format").with_choices(&["json"]));
        let context = parse(&schema, &["--format"]);

        let error = validate_input(&context).unwrap_err();
        assert_eq!(
            error.violations[0].to_string(),
            "'true' is not allowed for flag 'format', choices: json"
        );
    }

    #[test]
    fn test_argument_choice_mismatch() {
        let schema = CommandSchema::new()
            .with_argument(ArgumentSchema::new("env").with_choices(&["dev", "prod"]));
        let context = parse(&schema, &["staging"]);

        let error = validate_input(&context).unwrap_err();
        assert_eq!(
            error.violations,
            vec![InputViolation::ArgumentChoiceMismatch {
                argument: "env".into(),
                value: "staging".into(),
                choices: "dev|prod".into(),
            }]
        );
    }

    #[test]
    fn test_allow_invalid_inputs_skips_everything() {
        let schema = CommandSchema::new().with_argument(ArgumentSchema::new("name"));
        let context = parse(&schema, &["--bogus"]).allow_invalid_inputs();

        assert!(validate_input(&context).is_ok());
    }

    #[test]
    fn test_aggregate_message_joins_all_violations() {
        let schema = CommandSchema::new().with_argument(ArgumentSchema::new("name"));
        let context = parse(&schema, &["--bogus"]);

        let error = validate_input(&context).unwrap_err();
        assert_eq!(
            error.to_string(),
            "validate input failed with errors:\n- unknown flag 'bogus'.\n- argument 'name' is required."
        );
    }
}
