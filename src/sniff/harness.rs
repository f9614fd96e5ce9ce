//! Fixture reconciliation for sniff suites.
//!
//! A case owns a family of fixture files sharing a base name plus per-line
//! expected diagnostic counts. Running the case analyzes every fixture,
//! reconciles found against expected diagnostics line by line, verifies that
//! one fix pass leaves nothing fixable behind and, when a `<fixture>.fixed`
//! reference exists, that the fixed output matches it byte for byte.

use std::{
	collections::{BTreeMap, BTreeSet},
	fs,
	path::Path,
};

use super::{FileAnalysis, fixer, shared};
use crate::prelude::*;

/// Expected per-line diagnostic counts for one fixture family.
#[derive(Debug, Default)]
pub(crate) struct CaseSpec {
	/// Fixture file names start with this base name.
	pub(crate) base: String,
	/// Fixture name -> line -> expected error count. Absent lines expect 0.
	pub(crate) errors: BTreeMap<String, BTreeMap<usize, usize>>,
	/// Fixture name -> line -> expected warning count. Absent lines expect 0.
	pub(crate) warnings: BTreeMap<String, BTreeMap<usize, usize>>,
	/// Environment-dependent cases bypass the run entirely.
	pub(crate) skip: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CaseState {
	Init,
	Loaded,
	Analyzed,
	Reconciled,
	Pass,
	Fail,
	Skipped,
}

#[derive(Debug)]
pub(crate) struct CaseOutcome {
	pub(crate) state: CaseState,
	pub(crate) messages: Vec<String>,
}

/// Mutable run record threading the case through its states.
struct CaseRun {
	state: CaseState,
	messages: Vec<String>,
}

impl CaseRun {
	fn advance(&mut self, state: CaseState) {
		self.state = state;
	}

	fn finish(mut self) -> CaseOutcome {
		self.advance(if self.messages.is_empty() { CaseState::Pass } else { CaseState::Fail });

		CaseOutcome { state: self.state, messages: self.messages }
	}
}

pub(crate) fn run_case(dir: &Path, spec: &CaseSpec) -> Result<CaseOutcome> {
	if spec.skip {
		return Ok(CaseOutcome { state: CaseState::Skipped, messages: Vec::new() });
	}

	validate_expectations(spec)?;

	let mut run = CaseRun { state: CaseState::Init, messages: Vec::new() };
	let fixtures = discover_fixtures(dir, &spec.base)?;

	run.advance(CaseState::Loaded);

	let mut analyses = Vec::new();

	for name in &fixtures {
		let path = dir.join(name);
		let text = fs::read_to_string(&path)
			.map_err(|err| eyre::eyre!("Failed to read {}: {err}.", path.display()))?;

		match super::analyze_text(&path, &text, true) {
			Ok(analysis) => analyses.push((name.as_str(), text, analysis)),
			Err(err) => run
				.messages
				.push(format!("An unexpected error occurred while analyzing {name}: {err}.")),
		}
	}

	run.advance(CaseState::Analyzed);

	for (name, _, analysis) in &analyses {
		reconcile(name, analysis, spec, &mut run.messages);
	}

	run.advance(CaseState::Reconciled);

	for (name, text, analysis) in &analyses {
		verify_fixes(dir, name, text, analysis, &mut run.messages)?;
	}

	Ok(run.finish())
}

/// Expectations address 1-based source lines; line 0 is always a spec bug.
fn validate_expectations(spec: &CaseSpec) -> Result<()> {
	let zero_keyed = spec
		.errors
		.values()
		.chain(spec.warnings.values())
		.any(|lines| lines.contains_key(&0));

	if zero_keyed {
		return Err(eyre::eyre!(
			"Expected diagnostics for {} use line 0; lines are 1-based.",
			spec.base
		));
	}

	Ok(())
}

/// Fixture files share the case's base name, in lexicographic order.
/// `.fixed` references are golden outputs, not inputs.
fn discover_fixtures(dir: &Path, base: &str) -> Result<Vec<String>> {
	let mut fixtures = Vec::new();

	for entry in fs::read_dir(dir)
		.map_err(|err| eyre::eyre!("Failed to read fixture dir {}: {err}.", dir.display()))?
	{
		let entry = entry
			.map_err(|err| eyre::eyre!("Failed to read fixture dir {}: {err}.", dir.display()))?;

		if !entry.file_type().is_ok_and(|file_type| file_type.is_file()) {
			continue;
		}

		let name = entry.file_name().to_string_lossy().into_owned();

		if name.starts_with(base) && !name.ends_with(".fixed") {
			fixtures.push(name);
		}
	}

	if fixtures.is_empty() {
		return Err(eyre::eyre!("No fixture files named {base}* in {}.", dir.display()));
	}

	fixtures.sort();

	Ok(fixtures)
}

/// Merges found and expected diagnostics over every line present in either
/// set; a line expected but not found, or found but not expected, surfaces as
/// a mismatch rather than being silently ignored.
fn reconcile(name: &str, analysis: &FileAnalysis, spec: &CaseSpec, messages: &mut Vec<String>) {
	let expected_errors = spec.errors.get(name);
	let expected_warnings = spec.warnings.get(name);
	let mut lines = BTreeSet::new();

	lines.extend(analysis.diagnostics.lines());
	lines.extend(expected_errors.into_iter().flat_map(|map| map.keys().copied()));
	lines.extend(expected_warnings.into_iter().flat_map(|map| map.keys().copied()));

	for line in lines {
		let expected_e = expected_errors.and_then(|map| map.get(&line)).copied().unwrap_or(0);
		let expected_w = expected_warnings.and_then(|map| map.get(&line)).copied().unwrap_or(0);
		let found_e = analysis.diagnostics.error_count(line);
		let found_w = analysis.diagnostics.warning_count(line);
		let error_mismatch = found_e != expected_e;
		let warning_mismatch = found_w != expected_w;

		if !error_mismatch && !warning_mismatch {
			continue;
		}

		let mut message = format!(
			"[LINE {line}] Expected {expected_e} error(s) and {expected_w} warning(s) in {name} but found {found_e} error(s) and {found_w} warning(s).",
		);
		let mut found = Vec::new();

		if let Some(entry) = analysis.diagnostics.line(line) {
			// Message text is only quoted for the mismatched categories, in
			// the order the diagnostics were recorded.
			if error_mismatch {
				found.extend(entry.errors.iter());
			}

			if warning_mismatch {
				found.extend(entry.warnings.iter());
			}
		}

		if !found.is_empty() {
			message.push_str(" The error(s) and warning(s) found were:");

			for (text, rule) in found {
				message.push_str(&format!(" -> {text} ({rule})"));
			}
		}

		messages.push(message);
	}
}

/// One fix pass must be a fixed point; leftover fixable violations and golden
/// mismatches are both case failures, never retried.
fn verify_fixes(
	dir: &Path,
	name: &str,
	text: &str,
	analysis: &FileAnalysis,
	messages: &mut Vec<String>,
) -> Result<()> {
	let fixed = if analysis.fixer.has_fixes() {
		analysis.fixer.apply(&analysis.tokens)?
	} else {
		text.to_owned()
	};

	if shared::fixable_count(&analysis.violations) > 0 {
		let reanalysis = super::analyze_text(Path::new(name), &fixed, true)?;
		let remaining = shared::fixable_count(&reanalysis.violations);

		if remaining > 0 {
			messages.push(format!("Failed to fix {remaining} fixable violations in {name}."));
		}
	}

	let reference = dir.join(format!("{name}.fixed"));

	if reference.exists() {
		let reference_text = fs::read_to_string(&reference)
			.map_err(|err| eyre::eyre!("Failed to read {}: {err}.", reference.display()))?;
		let diff = fixer::generate_diff(&fixed, &reference_text);

		if !diff.is_empty() {
			messages.push(format!(
				"Fixed version of {name} does not match the expected fixed version. The diff is:\n{diff}",
			));
		}
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	const MESSY: &str =
		"<?php\nclass A\n{\n    public $x = 1;\n\n\n\n    public $y = 2;\n}\n";
	const MESSY_FIXED: &str = "<?php\nclass A\n{\n    public $x = 1;\n\n    public $y = 2;\n}\n";

	fn case(base: &str) -> CaseSpec {
		CaseSpec { base: base.to_owned(), ..CaseSpec::default() }
	}

	fn expectations(pairs: &[(usize, usize)]) -> BTreeMap<usize, usize> {
		pairs.iter().copied().collect()
	}

	#[test]
	fn clean_fixture_with_no_expectations_passes() {
		let dir = tempfile::tempdir().expect("temp dir");

		fs::write(dir.path().join("clean_case.php"), "<?php\nclass A\n{\n}\n").expect("write");

		let outcome = run_case(dir.path(), &case("clean_case")).expect("run");

		assert_eq!(outcome.state, CaseState::Pass);
		assert!(outcome.messages.is_empty());
	}

	#[test]
	fn matching_expectations_pass() {
		let dir = tempfile::tempdir().expect("temp dir");

		fs::write(dir.path().join("messy_case.php"), MESSY).expect("write");

		let mut spec = case("messy_case");

		// Line 4: missing doc comment for $x. Line 8: spacing plus missing
		// doc comment for $y.
		spec.errors
			.insert("messy_case.php".to_owned(), expectations(&[(4, 1), (8, 2)]));

		let outcome = run_case(dir.path(), &spec).expect("run");

		assert_eq!(outcome.messages, Vec::<String>::new());
		assert_eq!(outcome.state, CaseState::Pass);
	}

	#[test]
	fn expected_but_not_found_is_a_mismatch() {
		let dir = tempfile::tempdir().expect("temp dir");

		fs::write(dir.path().join("clean_case.php"), "<?php\nclass A\n{\n}\n").expect("write");

		let mut spec = case("clean_case");

		spec.errors.insert("clean_case.php".to_owned(), expectations(&[(5, 1)]));

		let outcome = run_case(dir.path(), &spec).expect("run");

		assert_eq!(outcome.state, CaseState::Fail);
		assert_eq!(
			outcome.messages,
			vec![
				"[LINE 5] Expected 1 error(s) and 0 warning(s) in clean_case.php but found 0 error(s) and 0 warning(s).".to_owned()
			]
		);
	}

	#[test]
	fn found_but_not_expected_quotes_the_findings() {
		let dir = tempfile::tempdir().expect("temp dir");

		fs::write(dir.path().join("messy_case.php"), MESSY).expect("write");

		let outcome = run_case(dir.path(), &case("messy_case")).expect("run");

		assert_eq!(outcome.state, CaseState::Fail);
		assert!(outcome.messages.iter().any(|message| message
			== "[LINE 4] Expected 0 error(s) and 0 warning(s) in messy_case.php but found 1 error(s) and 0 warning(s). The error(s) and warning(s) found were: -> Missing member variable doc comment (PHP-STYLE-DOC-001)"));
	}

	#[test]
	fn warning_counts_reconcile_independently_of_errors() {
		let dir = tempfile::tempdir().expect("temp dir");
		let source = "<?php\nclass A\n{\n    /**\n     * @var string Name of the user.\n     * @see\n     */\n    public $name;\n}\n";

		fs::write(dir.path().join("warn_case.php"), source).expect("write");

		let mut spec = case("warn_case");

		spec.warnings.insert("warn_case.php".to_owned(), expectations(&[(6, 1)]));

		let outcome = run_case(dir.path(), &spec).expect("run");

		assert_eq!(outcome.messages, Vec::<String>::new());
		assert_eq!(outcome.state, CaseState::Pass);
	}

	#[test]
	fn golden_file_mismatch_includes_the_diff() {
		let dir = tempfile::tempdir().expect("temp dir");

		fs::write(dir.path().join("messy_case.php"), MESSY).expect("write");
		fs::write(dir.path().join("messy_case.php.fixed"), "<?php\nclass Other\n{\n}\n")
			.expect("write golden");

		let mut spec = case("messy_case");

		spec.errors
			.insert("messy_case.php".to_owned(), expectations(&[(4, 1), (8, 2)]));

		let outcome = run_case(dir.path(), &spec).expect("run");

		assert_eq!(outcome.state, CaseState::Fail);
		assert_eq!(outcome.messages.len(), 1);
		assert!(outcome.messages[0].starts_with(
			"Fixed version of messy_case.php does not match the expected fixed version. The diff is:\n"
		));
	}

	#[test]
	fn golden_file_match_passes_and_round_trips() {
		let dir = tempfile::tempdir().expect("temp dir");

		fs::write(dir.path().join("messy_case.php"), MESSY).expect("write");
		fs::write(dir.path().join("messy_case.php.fixed"), MESSY_FIXED).expect("write golden");

		let mut spec = case("messy_case");

		spec.errors
			.insert("messy_case.php".to_owned(), expectations(&[(4, 1), (8, 2)]));

		let outcome = run_case(dir.path(), &spec).expect("run");

		assert_eq!(outcome.messages, Vec::<String>::new());
		assert_eq!(outcome.state, CaseState::Pass);

		// The golden file itself is a fixed point of the analysis.
		let reanalysis =
			crate::sniff::analyze_text(Path::new("messy_case.php.fixed"), MESSY_FIXED, true)
				.expect("reanalysis");

		assert_eq!(shared::fixable_count(&reanalysis.violations), 0);
		assert!(fixer::generate_diff(MESSY_FIXED, MESSY_FIXED).is_empty());
	}

	#[test]
	fn skipped_cases_never_touch_the_filesystem() {
		let mut spec = case("anything");

		spec.skip = true;

		let outcome = run_case(Path::new("/nonexistent"), &spec).expect("run");

		assert_eq!(outcome.state, CaseState::Skipped);
		assert!(outcome.messages.is_empty());
	}

	#[test]
	fn zero_line_expectations_are_rejected() {
		let dir = tempfile::tempdir().expect("temp dir");
		let mut spec = case("zero_case");

		spec.errors.insert("zero_case.php".to_owned(), expectations(&[(0, 1)]));

		assert!(run_case(dir.path(), &spec).is_err());
	}

	#[test]
	fn missing_fixtures_are_an_error() {
		let dir = tempfile::tempdir().expect("temp dir");

		assert!(run_case(dir.path(), &case("absent_case")).is_err());
	}

	#[test]
	fn lexicographic_fixture_order_is_stable() {
		let dir = tempfile::tempdir().expect("temp dir");

		fs::write(dir.path().join("order_case_b.php"), "<?php\nclass B\n{\n}\n").expect("write");
		fs::write(dir.path().join("order_case_a.php"), "<?php\nclass A\n{\n}\n").expect("write");

		let fixtures = discover_fixtures(dir.path(), "order_case").expect("discover");

		assert_eq!(fixtures, vec!["order_case_a.php", "order_case_b.php"]);
	}
}
