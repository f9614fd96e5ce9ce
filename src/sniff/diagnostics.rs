//! Per-line diagnostic store filled during one file's analysis pass and
//! consumed by the reconciliation harness afterwards.

use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Severity {
	Error,
	Warning,
}

/// Diagnostics recorded against one source line, in insertion order.
#[derive(Clone, Debug, Default)]
pub(crate) struct LineDiagnostics {
	pub(crate) errors: Vec<(String, &'static str)>,
	pub(crate) warnings: Vec<(String, &'static str)>,
}

#[derive(Debug, Default)]
pub(crate) struct DiagnosticStore {
	lines: BTreeMap<usize, LineDiagnostics>,
}

impl DiagnosticStore {
	pub(crate) fn record(
		&mut self,
		line: usize,
		severity: Severity,
		message: String,
		rule: &'static str,
	) {
		let entry = self.lines.entry(line).or_default();

		match severity {
			Severity::Error => entry.errors.push((message, rule)),
			Severity::Warning => entry.warnings.push((message, rule)),
		}
	}

	pub(crate) fn line(&self, line: usize) -> Option<&LineDiagnostics> {
		self.lines.get(&line)
	}

	pub(crate) fn error_count(&self, line: usize) -> usize {
		self.lines.get(&line).map_or(0, |entry| entry.errors.len())
	}

	pub(crate) fn warning_count(&self, line: usize) -> usize {
		self.lines.get(&line).map_or(0, |entry| entry.warnings.len())
	}

	/// Lines carrying at least one diagnostic, in ascending order.
	pub(crate) fn lines(&self) -> impl Iterator<Item = usize> + '_ {
		self.lines.keys().copied()
	}

	pub(crate) fn is_empty(&self) -> bool {
		self.lines.is_empty()
	}
}
