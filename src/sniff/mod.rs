mod class_decl;
mod diagnostics;
mod fixer;
#[cfg(test)] mod harness;
mod lexer;
mod shared;
mod spacing;
mod tokens;
mod var_doc;

pub(crate) use shared::RunSummary;

use std::{
	fs,
	path::{Path, PathBuf},
};

use rayon::prelude::*;

use crate::prelude::*;
use diagnostics::DiagnosticStore;
use fixer::FixEngine;
use shared::{CheckContext, Sniff, Violation};
use tokens::TokenSequence;

const FILE_BATCH_SIZE: usize = 64;

/// The full, fixed set of sniffs, in the order they run over each file.
fn registry() -> Vec<Box<dyn Sniff>> {
	vec![
		Box::new(spacing::MemberSpacingSniff),
		Box::new(var_doc::VarDocCommentSniff),
		Box::new(class_decl::ClassDeclarationSniff),
	]
}

/// Everything one analysis pass produced for one file.
pub(crate) struct FileAnalysis {
	pub(crate) tokens: TokenSequence,
	pub(crate) violations: Vec<Violation>,
	pub(crate) diagnostics: DiagnosticStore,
	pub(crate) fixer: FixEngine,
}

/// Runs every sniff over the tokenized text. Analysis itself never mutates
/// anything; fixes accumulate in the returned engine and are materialized
/// separately by the caller.
pub(crate) fn analyze_text(path: &Path, text: &str, fixing_enabled: bool) -> Result<FileAnalysis> {
	let tokens = lexer::tokenize(text);
	let mut fixer = FixEngine::default();
	let mut violations = Vec::new();

	for sniff in registry() {
		let triggers = sniff.triggers();

		for index in 0..tokens.len() {
			let Some(token) = tokens.get(index) else {
				continue;
			};

			if !triggers.contains(&token.kind) {
				continue;
			}

			let mut ctx = CheckContext {
				file: path,
				tokens: &tokens,
				fixer: &mut fixer,
				violations: &mut violations,
				fixing_enabled,
			};

			sniff.check(&mut ctx, index)?;
		}
	}

	let mut diagnostics = DiagnosticStore::default();

	for violation in &violations {
		diagnostics.record(
			violation.line,
			violation.severity,
			violation.message.clone(),
			violation.rule,
		);
	}

	Ok(FileAnalysis { tokens, violations, diagnostics, fixer })
}

pub(crate) fn run_check(requested_files: &[PathBuf]) -> Result<RunSummary> {
	let files = shared::resolve_files(requested_files)?;
	let mut violations: Vec<Violation> = Vec::new();

	for batch in files.chunks(FILE_BATCH_SIZE) {
		let batch_results = batch
			.par_iter()
			.map(|file| -> Result<Vec<Violation>> {
				let text = fs::read_to_string(file)
					.map_err(|err| eyre::eyre!("Failed to read {}: {err}.", file.display()))?;
				let analysis = analyze_text(file, &text, false)?;

				Ok(analysis.violations)
			})
			.collect::<Vec<_>>();

		for result in batch_results {
			violations.extend(result?);
		}
	}

	violations.sort_by(|a, b| {
		a.file
			.cmp(&b.file)
			.then(a.line.cmp(&b.line))
			.then(a.rule.cmp(b.rule))
			// Same rule can fire more than once on a line; token order keeps
			// the report stable.
			.then(a.position.cmp(&b.position))
	});

	let unfixable_count = violations.iter().filter(|v| !v.fixable).count();
	let output_lines = violations.into_iter().map(|v| v.format()).collect::<Vec<_>>();
	let violation_count = output_lines.len();

	Ok(RunSummary {
		file_count: files.len(),
		violation_count,
		unfixable_count,
		applied_fix_count: 0,
		output_lines,
	})
}

#[derive(Debug)]
struct FileFixOutcome {
	path: PathBuf,
	rewritten_text: Option<String>,
	applied_count: usize,
}

/// Applies every accepted fix in a single pass per file. Fixes are written so
/// that one pass converges; whatever remains fixable afterwards is surfaced by
/// the trailing check instead of retried.
pub(crate) fn run_fix(requested_files: &[PathBuf]) -> Result<RunSummary> {
	let files = shared::resolve_files(requested_files)?;
	let mut total_applied = 0_usize;

	for batch in files.chunks(FILE_BATCH_SIZE) {
		let outcomes = batch
			.par_iter()
			.map(|file| -> Result<FileFixOutcome> {
				let text = fs::read_to_string(file)
					.map_err(|err| eyre::eyre!("Failed to read {}: {err}.", file.display()))?;
				let analysis = analyze_text(file, &text, true)?;

				if !analysis.fixer.has_fixes() {
					return Ok(FileFixOutcome {
						path: file.clone(),
						rewritten_text: None,
						applied_count: 0,
					});
				}

				let rewritten = analysis.fixer.apply(&analysis.tokens)?;

				if rewritten == text {
					return Ok(FileFixOutcome {
						path: file.clone(),
						rewritten_text: None,
						applied_count: 0,
					});
				}

				Ok(FileFixOutcome {
					path: file.clone(),
					rewritten_text: Some(rewritten),
					applied_count: analysis.fixer.changesets().len(),
				})
			})
			.collect::<Vec<_>>();

		for outcome in outcomes {
			let outcome = outcome?;

			total_applied += outcome.applied_count;

			if let Some(text) = outcome.rewritten_text {
				fs::write(&outcome.path, text)?;
			}
		}
	}

	let checked = run_check(requested_files)?;

	Ok(RunSummary {
		file_count: checked.file_count,
		violation_count: checked.violation_count,
		unfixable_count: checked.unfixable_count,
		applied_fix_count: total_applied,
		output_lines: checked.output_lines,
	})
}

pub(crate) fn print_coverage() {
	for rule in shared::SNIFF_RULE_IDS {
		println!("{rule}\timplemented");
	}
}
