//! Advisory diagnostics emitted while repairing and merging schemas.

/// Sink collecting advisory messages from normalization and merging.
///
/// Schema-shape defects are never fatal: every repair is recorded here and
/// mirrored to [`tracing`] at debug level, and callers decide whether to
/// surface the entries. Nothing in the sink alters control flow.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one advisory message.
    pub fn report(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(target: "cmdweave::schema", "{message}");
        self.entries.push(message);
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Consumes the sink, yielding the recorded messages in emission order.
    pub fn into_entries(self) -> Vec<String> {
        self.entries
    }
}

/// Formats the diagnostic label for a fragment: the contributing mod's name
/// plus the subcommand path the fragment sits at, e.g. `[buildmod build]`.
pub(crate) fn fragment_label(mod_name: Option<&str>, path: &[String]) -> String {
    let name = mod_name.unwrap_or("unknown mod");
    if path.is_empty() {
        format!("[{name}]")
    } else {
        format!("[{name} {}]", path.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_preserves_order() {
        let mut diags = Diagnostics::new();
        diags.report("first");
        diags.report("second");

        assert_eq!(diags.len(), 2);
        assert_eq!(diags.entries(), ["first", "second"]);
    }

    #[test]
    fn test_fragment_label() {
        assert_eq!(fragment_label(Some("buildmod"), &[]), "[buildmod]");
        assert_eq!(
            fragment_label(Some("buildmod"), &["build".into(), "image".into()]),
            "[buildmod build image]"
        );
        assert_eq!(fragment_label(None, &[]), "[unknown mod]");
    }
}
