//! Placement rules for `class` and `interface` declarations.

use super::{
	diagnostics::Severity,
	fixer::{Edit, EditOp},
	shared::{CheckContext, Sniff},
	tokens::{TokenKind, TokenSequence},
};
use crate::prelude::*;

/// One declaration per file, no stray whitespace around the keyword, a tight
/// opening brace and a closing brace on its own line followed by exactly one
/// blank line.
pub(crate) struct ClassDeclarationSniff;

impl Sniff for ClassDeclarationSniff {
fn triggers(&self) -> &'static [TokenKind] {
		&[TokenKind::Class, TokenKind::Interface]
	}

	fn check(&self, ctx: &mut CheckContext<'_>, index: usize) -> Result<()> {
		// `Foo::class` resolves a class name, it declares nothing.
		if is_class_name_resolution(ctx.tokens, index) {
			return Ok(());
		}

		check_uniqueness(ctx, index);
		check_keyword_spacing(ctx, index)?;

		let Some(scope) = ctx.tokens.get(index).and_then(|token| token.scope) else {
			// Forward declarations and lex errors leave the keyword scopeless;
			// nothing brace-related to check then.
			return Ok(());
		};

		check_opening_brace(ctx, scope.opener);
		check_closing_brace(ctx, scope.closer)?;
		check_after_closing_brace(ctx, scope.closer)?;

		Ok(())
	}
}

fn is_class_name_resolution(tokens: &TokenSequence, index: usize) -> bool {
	tokens
		.prev_non_whitespace(index)
		.and_then(|prev| tokens.get(prev))
		.is_some_and(|token| token.kind == TokenKind::Other && token.text == ":")
}

/// PHP-STYLE-CLASS-001. The first declaration in the file is the legitimate
/// one; every later keyword gets the report.
fn check_uniqueness(ctx: &mut CheckContext<'_>, index: usize) {
	let earlier = (0..index).any(|candidate| {
		ctx.tokens.get(candidate).is_some_and(|token| token.kind.is_class_like())
			&& !is_class_name_resolution(ctx.tokens, candidate)
	});

	if earlier {
		ctx.report(
			index,
			"PHP-STYLE-CLASS-001",
			Severity::Error,
			"Only one interface or class is allowed in a file".to_owned(),
			false,
		);
	}
}

/// PHP-STYLE-CLASS-002. A keyword opening its own line must sit in column 1;
/// after a same-line `abstract`/`final` modifier exactly one space separates
/// the two. Only the indentation case is mechanical enough to auto-fix.
fn check_keyword_spacing(ctx: &mut CheckContext<'_>, index: usize) -> Result<()> {
	let tokens = ctx.tokens;
	let Some(keyword) = tokens.get(index) else {
		return Ok(());
	};
	let modifier = tokens
		.prev_significant(index)
		.and_then(|prev| tokens.get(prev))
		.filter(|token| {
			matches!(token.kind, TokenKind::Abstract | TokenKind::Final)
				&& token.line == keyword.line
		});

	if let Some(modifier) = modifier {
		let spaces = keyword.column.saturating_sub(modifier.column + modifier.text.len());

		if spaces != 1 {
			ctx.report(
				index,
				"PHP-STYLE-CLASS-002",
				Severity::Error,
				format!(
					"Expected 1 space before \"{}\" keyword; {spaces} found",
					keyword.text
				),
				false,
			);
		}

		return Ok(());
	}

	if keyword.column == 1 {
		return Ok(());
	}

	let indent = index.checked_sub(1).and_then(|prev| tokens.get(prev)).filter(|token| {
		token.kind == TokenKind::Whitespace
			&& token.line == keyword.line
			// Only pure indentation; a keyword after other code on the line is
			// not an indentation problem.
			&& tokens.first_on_line(index) == token.index
	});
	let Some(indent) = indent else {
		return Ok(());
	};
	let spaces = indent.text.len();
	let fix = ctx.report(
		index,
		"PHP-STYLE-CLASS-002",
		Severity::Error,
		format!("Expected 0 spaces before \"{}\" keyword; {spaces} found", keyword.text),
		true,
	);

	if fix {
		ctx.fixer.begin_changeset("PHP-STYLE-CLASS-002")?;
		ctx.fixer.record(Edit { target: indent.index, op: EditOp::Delete })?;
		ctx.fixer.end_changeset()?;
	}

	Ok(())
}

/// PHP-STYLE-CLASS-003, report only. Blank padding after `{` hides where the
/// body actually starts.
fn check_opening_brace(ctx: &mut CheckContext<'_>, opener: usize) {
	let Some(next) = ctx.tokens.next_significant(opener) else {
		return;
	};
	let blanks = ctx.tokens.blank_lines_between(opener, next);

	if blanks > 0 {
		ctx.report(
			opener,
			"PHP-STYLE-CLASS-003",
			Severity::Error,
			format!("Expected 0 blank lines after opening brace; {blanks} found"),
			false,
		);
	}
}

/// PHP-STYLE-CLASS-004 and -006. The closing brace stands alone in column 1.
fn check_closing_brace(ctx: &mut CheckContext<'_>, closer: usize) -> Result<()> {
	let tokens = ctx.tokens;
	let line_first = tokens.first_on_line(closer);
	let has_code_before = (line_first..closer)
		.any(|index| tokens.get(index).is_some_and(|token| token.kind != TokenKind::Whitespace));

	if has_code_before {
		let fix = ctx.report(
			closer,
			"PHP-STYLE-CLASS-004",
			Severity::Error,
			"Closing brace of a class must be on a line by itself".to_owned(),
			true,
		);

		if fix {
			ctx.fixer.begin_changeset("PHP-STYLE-CLASS-004")?;

			// Drop the run of whitespace hugging the brace so the break does
			// not leave trailing indentation behind.
			if let Some(prev) = closer.checked_sub(1)
				&& tokens.get(prev).is_some_and(|token| {
					token.kind == TokenKind::Whitespace && !token.text.ends_with('\n')
				}) {
				ctx.fixer.record(Edit { target: prev, op: EditOp::Delete })?;
			}

			ctx.fixer.record(Edit { target: closer, op: EditOp::InsertBefore("\n".to_owned()) })?;
			ctx.fixer.end_changeset()?;
		}

		return Ok(());
	}

	let indent = closer.checked_sub(1).and_then(|prev| tokens.get(prev)).filter(|token| {
		token.kind == TokenKind::Whitespace
			&& !token.text.ends_with('\n')
			&& tokens.same_line(token.index, closer)
	});

	if let Some(indent) = indent {
		let spaces = indent.text.len();
		let fix = ctx.report(
			closer,
			"PHP-STYLE-CLASS-006",
			Severity::Error,
			format!("Expected 0 spaces before closing brace; {spaces} found"),
			true,
		);

		if fix {
			ctx.fixer.begin_changeset("PHP-STYLE-CLASS-006")?;
			ctx.fixer.record(Edit { target: indent.index, op: EditOp::Delete })?;
			ctx.fixer.end_changeset()?;
		}
	}

	Ok(())
}

/// PHP-STYLE-CLASS-005. Exactly one blank line after the closing brace, or a
/// clean end of file.
fn check_after_closing_brace(ctx: &mut CheckContext<'_>, closer: usize) -> Result<()> {
	let tokens = ctx.tokens;

	let Some(next) = tokens.next_significant(closer) else {
		// Last declaration in the file: only runaway trailing blank lines are
		// worth a report.
		let blanks = tokens.blank_line_tokens_in(closer + 1..tokens.len());

		if blanks.len() > 1 {
			let fix = ctx.report(
				closer,
				"PHP-STYLE-CLASS-005",
				Severity::Error,
				format!(
					"Closing brace of a class must be followed by a single blank line; found {}",
					blanks.len()
				),
				true,
			);

			if fix {
				delete_excess_blanks(ctx, &blanks)?;
			}
		}

		return Ok(());
	};

	if tokens.same_line(closer, next) {
		let fix = ctx.report(
			closer,
			"PHP-STYLE-CLASS-005",
			Severity::Error,
			"Closing brace of a class must be followed by a single blank line; found 0"
				.to_owned(),
			true,
		);

		if fix {
			ctx.fixer.begin_changeset("PHP-STYLE-CLASS-005")?;

			let trailing_ws = tokens
				.get(closer + 1)
				.filter(|token| token.kind == TokenKind::Whitespace)
				.map(|token| token.index);

			match trailing_ws {
				Some(target) =>
					ctx.fixer.record(Edit { target, op: EditOp::Replace("\n\n".to_owned()) })?,
				None => ctx
					.fixer
					.record(Edit { target: closer, op: EditOp::InsertAfter("\n\n".to_owned()) })?,
			}

			ctx.fixer.end_changeset()?;
		}

		return Ok(());
	}

	let blanks = tokens.blank_line_tokens_in(closer + 1..next);

	match blanks.len() {
		1 => {},
		0 => {
			let fix = ctx.report(
				closer,
				"PHP-STYLE-CLASS-005",
				Severity::Error,
				"Closing brace of a class must be followed by a single blank line; found 0"
					.to_owned(),
				true,
			);

			if fix {
				ctx.fixer.begin_changeset("PHP-STYLE-CLASS-005")?;
				ctx.fixer
					.record(Edit { target: closer, op: EditOp::InsertAfter("\n".to_owned()) })?;
				ctx.fixer.end_changeset()?;
			}
		},
		found => {
			let fix = ctx.report(
				closer,
				"PHP-STYLE-CLASS-005",
				Severity::Error,
				format!(
					"Closing brace of a class must be followed by a single blank line; found {found}",
				),
				true,
			);

			if fix {
				delete_excess_blanks(ctx, &blanks)?;
			}
		},
	}

	Ok(())
}

/// Deletes every blank-line token but the first.
fn delete_excess_blanks(ctx: &mut CheckContext<'_>, blanks: &[usize]) -> Result<()> {
	ctx.fixer.begin_changeset("PHP-STYLE-CLASS-005")?;

	for blank in &blanks[1..] {
		ctx.fixer.record(Edit { target: *blank, op: EditOp::Delete })?;
	}

	ctx.fixer.end_changeset()?;

	Ok(())
}
