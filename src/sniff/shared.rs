use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{
	diagnostics::Severity,
	fixer::FixEngine,
	tokens::{TokenKind, TokenSequence},
};
use crate::prelude::*;

pub(crate) const SNIFF_RULE_IDS: [&str; 12] = [
	"PHP-STYLE-SPACE-001",
	"PHP-STYLE-DOC-001",
	"PHP-STYLE-DOC-002",
	"PHP-STYLE-DOC-003",
	"PHP-STYLE-DOC-004",
	"PHP-STYLE-DOC-005",
	"PHP-STYLE-CLASS-001",
	"PHP-STYLE-CLASS-002",
	"PHP-STYLE-CLASS-003",
	"PHP-STYLE-CLASS-004",
	"PHP-STYLE-CLASS-005",
	"PHP-STYLE-CLASS-006",
];

#[derive(Debug, Clone)]
pub(crate) struct Violation {
	pub(crate) file: PathBuf,
	pub(crate) line: usize,
	/// Token index the violation was reported against.
	pub(crate) position: usize,
	pub(crate) rule: &'static str,
	pub(crate) severity: Severity,
	pub(crate) message: String,
	pub(crate) fixable: bool,
}
impl Violation {
	pub(crate) fn format(&self) -> String {
		format!(
			"{}:{}:1: [{}] {}{}",
			self.file.display(),
			self.line,
			self.rule,
			self.message,
			if self.fixable { " (fixable)" } else { "" }
		)
	}
}

#[derive(Debug, Clone)]
pub(crate) struct RunSummary {
	pub(crate) file_count: usize,
	pub(crate) violation_count: usize,
	pub(crate) unfixable_count: usize,
	pub(crate) applied_fix_count: usize,
	pub(crate) output_lines: Vec<String>,
}

/// Number of violations a fix attempt is allowed to address.
pub(crate) fn fixable_count(violations: &[Violation]) -> usize {
	violations.iter().filter(|violation| violation.fixable).count()
}

/// Per-invocation context handed to every sniff: the read-only token view
/// plus the violation and fix sinks owned by the current file's pass. There
/// is no ambient state; everything a sniff may touch travels through here.
pub(crate) struct CheckContext<'a> {
	pub(crate) file: &'a Path,
	pub(crate) tokens: &'a TokenSequence,
	pub(crate) fixer: &'a mut FixEngine,
	pub(crate) violations: &'a mut Vec<Violation>,
	pub(crate) fixing_enabled: bool,
}

impl CheckContext<'_> {
	/// Records a violation against a token position and returns whether a fix
	/// attempt is permitted for it (fixing may be disabled globally).
	pub(crate) fn report(
		&mut self,
		position: usize,
		rule: &'static str,
		severity: Severity,
		message: String,
		fixable: bool,
	) -> bool {
		let line = self.tokens.line_of(position).unwrap_or(0);

		self.violations.push(Violation {
			file: self.file.to_path_buf(),
			line,
			position,
			rule,
			severity,
			message,
			fixable,
		});

		fixable && self.fixing_enabled
	}
}

/// Capability interface of one style sniff. The registry is a fixed,
/// compile-time set; sniffs are invoked once per trigger token and must be
/// deterministic for a given token sequence.
pub(crate) trait Sniff {
	fn triggers(&self) -> &'static [TokenKind];
	fn check(&self, ctx: &mut CheckContext<'_>, index: usize) -> Result<()>;
}

/// A class-member variable declaration located around a trigger token.
#[derive(Debug)]
pub(crate) struct MemberDecl {
	pub(crate) var_index: usize,
	/// First token of the declaration statement (leading modifier or the
	/// variable itself).
	pub(crate) decl_start: usize,
	/// Doc-comment span directly above the declaration, if any.
	pub(crate) doc: Option<(usize, usize)>,
}

/// Classifies a `Variable` token as a class-member declaration, or `None` for
/// method locals, parameters and declaration-list continuations.
pub(crate) fn member_declaration(tokens: &TokenSequence, index: usize) -> Option<MemberDecl> {
	let token = tokens.get(index)?;

	if token.kind != TokenKind::Variable || token.paren_depth > 0 {
		return None;
	}

	let owner = token.conditions.last().copied()?;

	if !tokens.get(owner)?.kind.is_class_like() {
		return None;
	}

	let mut decl_start = index;

	while let Some(prev) = tokens.prev_significant(decl_start) {
		let kind = tokens.get(prev)?.kind;

		if kind.is_member_modifier() {
			decl_start = prev;
		} else {
			// `public $a, $b;` — only the first variable carries the checks.
			if kind == TokenKind::Comma {
				return None;
			}

			break;
		}
	}

	let doc = tokens
		.prev_non_whitespace(decl_start)
		.and_then(|prev| tokens.get(prev))
		.filter(|prev| prev.kind == TokenKind::DocCommentClose)
		.and_then(|prev| prev.scope)
		.map(|refs| (refs.opener, refs.closer));

	Some(MemberDecl { var_index: index, decl_start, doc })
}

/// Resolves requested paths into the sorted list of `.php` files to analyze.
/// Directories are walked recursively; an empty request walks the current
/// directory.
pub(crate) fn resolve_files(requested: &[PathBuf]) -> Result<Vec<PathBuf>> {
	let mut files = Vec::new();

	if requested.is_empty() {
		collect_php_files(Path::new("."), &mut files)?;
	} else {
		for path in requested {
			if path.is_dir() {
				collect_php_files(path, &mut files)?;
			} else if path.extension().is_some_and(|ext| ext == "php") {
				files.push(path.clone());
			}
		}
	}

	files.sort();
	files.dedup();

	Ok(files)
}

fn collect_php_files(root: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
	for entry in WalkDir::new(root).sort_by_file_name() {
		let entry = entry.map_err(|err| eyre::eyre!("Failed to walk {}: {err}.", root.display()))?;

		if entry.file_type().is_file()
			&& entry.path().extension().is_some_and(|ext| ext == "php")
		{
			out.push(entry.path().to_path_buf());
		}
	}

	Ok(())
}
