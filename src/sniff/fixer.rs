//! Text-edit engine for fixable violations.
//!
//! Sniffs never splice text themselves: each fix is a changeset of
//! token-index edits recorded against the immutable token sequence, and the
//! whole edit list is materialized into output text in a single pass.

use std::collections::HashMap;

use super::tokens::TokenSequence;
use crate::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum EditOp {
	Replace(String),
	InsertBefore(String),
	InsertAfter(String),
	Delete,
}

impl EditOp {
	fn kind_id(&self) -> u8 {
		match self {
			Self::Replace(_) | Self::Delete => 0,
			Self::InsertBefore(_) => 1,
			Self::InsertAfter(_) => 2,
		}
	}
}

#[derive(Clone, Debug)]
pub(crate) struct Edit {
	pub(crate) target: usize,
	pub(crate) op: EditOp,
}

/// Atomic group of edits proposed by one fix attempt, tagged with the rule
/// that owns the violation being fixed.
#[derive(Clone, Debug)]
pub(crate) struct Changeset {
	pub(crate) rule: &'static str,
	pub(crate) edits: Vec<Edit>,
}

#[derive(Debug, Default)]
pub(crate) struct FixEngine {
	accepted: Vec<Changeset>,
	open: Option<Changeset>,
}

impl FixEngine {
	/// Opens a changeset for one violation. Nested changesets are a contract
	/// violation, not a style issue, and abort the pass.
	pub(crate) fn begin_changeset(&mut self, rule: &'static str) -> Result<()> {
		if self.open.is_some() {
			return Err(eyre::eyre!("A changeset is already open; nesting is not supported."));
		}

		self.open = Some(Changeset { rule, edits: Vec::new() });

		Ok(())
	}

	pub(crate) fn record(&mut self, edit: Edit) -> Result<()> {
		let Some(open) = self.open.as_mut() else {
			return Err(eyre::eyre!("No open changeset to record an edit into."));
		};

		let conflict = open
			.edits
			.iter()
			.any(|prior| prior.target == edit.target && prior.op.kind_id() == edit.op.kind_id());

		if conflict {
			return Err(eyre::eyre!(
				"Conflicting edits on token {} within one changeset.",
				edit.target
			));
		}

		open.edits.push(edit);

		Ok(())
	}

	/// Closes the open changeset. A changeset without edits is a no-op and is
	/// discarded rather than accepted.
	pub(crate) fn end_changeset(&mut self) -> Result<()> {
		let changeset = self
			.open
			.take()
			.ok_or_else(|| eyre::eyre!("No open changeset to close."))?;

		if !changeset.edits.is_empty() {
			self.accepted.push(changeset);
		}

		Ok(())
	}

	pub(crate) fn changesets(&self) -> &[Changeset] {
		&self.accepted
	}

	pub(crate) fn has_fixes(&self) -> bool {
		!self.accepted.is_empty()
	}

	/// Replays all accepted changesets against the token sequence and builds
	/// the fixed text in one pass.
	///
	/// Changesets apply in rule-execution order. When changesets from
	/// different rules touch the same token index, the first writer wins and
	/// later edits for that index are silently dropped — a deliberate
	/// limitation that keeps a single fix pass loop-free.
	pub(crate) fn apply(&self, tokens: &TokenSequence) -> Result<String> {
		#[derive(Default)]
		struct Slot {
			before: Option<String>,
			replacement: Option<Option<String>>,
			after: Option<String>,
		}

		let mut claims: HashMap<usize, usize> = HashMap::new();
		let mut slots: HashMap<usize, Slot> = HashMap::new();

		for (ordinal, changeset) in self.accepted.iter().enumerate() {
			for edit in &changeset.edits {
				if edit.target >= tokens.len() {
					return Err(eyre::eyre!(
						"Invalid edit target {} for a sequence of {} tokens.",
						edit.target,
						tokens.len()
					));
				}

				let claim = *claims.entry(edit.target).or_insert(ordinal);

				if claim != ordinal {
					continue;
				}

				let slot = slots.entry(edit.target).or_default();

				match &edit.op {
					EditOp::Replace(text) => slot.replacement = Some(Some(text.clone())),
					EditOp::Delete => slot.replacement = Some(None),
					EditOp::InsertBefore(text) => slot.before = Some(text.clone()),
					EditOp::InsertAfter(text) => slot.after = Some(text.clone()),
				}
			}
		}

		let mut out = String::new();

		for token in tokens.iter() {
			match slots.get(&token.index) {
				Some(slot) => {
					if let Some(before) = &slot.before {
						out.push_str(before);
					}

					match &slot.replacement {
						Some(Some(text)) => out.push_str(text),
						Some(None) => {},
						None => out.push_str(&token.text),
					}

					if let Some(after) = &slot.after {
						out.push_str(after);
					}
				},
				None => out.push_str(&token.text),
			}
		}

		Ok(out)
	}
}

/// Line-based diff between a fix candidate and a reference file. An empty
/// result means an exact byte match.
pub(crate) fn generate_diff(candidate: &str, reference: &str) -> String {
	if candidate == reference {
		return String::new();
	}

	let candidate_lines = candidate.lines().collect::<Vec<_>>();
	let reference_lines = reference.lines().collect::<Vec<_>>();
	let rows = candidate_lines.len();
	let cols = reference_lines.len();
	let mut lcs = vec![vec![0_usize; cols + 1]; rows + 1];

	for row in (0..rows).rev() {
		for col in (0..cols).rev() {
			lcs[row][col] = if candidate_lines[row] == reference_lines[col] {
				lcs[row + 1][col + 1] + 1
			} else {
				lcs[row + 1][col].max(lcs[row][col + 1])
			};
		}
	}

	let mut out = String::new();
	let (mut row, mut col) = (0, 0);

	while row < rows && col < cols {
		if candidate_lines[row] == reference_lines[col] {
			row += 1;
			col += 1;
		} else if lcs[row + 1][col] >= lcs[row][col + 1] {
			out.push_str(&format!("+{}\n", candidate_lines[row]));
			row += 1;
		} else {
			out.push_str(&format!("-{}\n", reference_lines[col]));
			col += 1;
		}
	}
	while row < rows {
		out.push_str(&format!("+{}\n", candidate_lines[row]));
		row += 1;
	}
	while col < cols {
		out.push_str(&format!("-{}\n", reference_lines[col]));
		col += 1;
	}

	if out.is_empty() {
		out.push_str("(contents differ only in line terminators)\n");
	}

	out
}
