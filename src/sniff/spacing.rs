//! Blank-line discipline around class-member variable declarations.

use super::{
	diagnostics::Severity,
	fixer::{Edit, EditOp},
	shared::{self, CheckContext, Sniff},
	tokens::{TokenKind, TokenSequence},
};
use crate::prelude::*;

const RULE: &str = "PHP-STYLE-SPACE-001";

/// Exactly one blank line must precede a member declaration. The first
/// statement after the opening brace may also sit directly on the brace, and
/// zero blank lines separate a doc comment from the declaration it documents.
/// Each expectation is independently fixable: a changeset either deletes
/// excess blank-line tokens or inserts a single newline, never both.
pub(crate) struct MemberSpacingSniff;

impl Sniff for MemberSpacingSniff {
fn triggers(&self) -> &'static [TokenKind] {
		&[TokenKind::Variable]
	}

	fn check(&self, ctx: &mut CheckContext<'_>, index: usize) -> Result<()> {
		let Some(decl) = shared::member_declaration(ctx.tokens, index) else {
			return Ok(());
		};

		if let Some((doc_opener, doc_closer)) = decl.doc {
			check_doc_gap(ctx, doc_closer, decl.decl_start)?;
			check_leading_blanks(ctx, doc_opener, decl.decl_start)?;
		} else {
			check_leading_blanks(ctx, decl.decl_start, decl.decl_start)?;
		}

		Ok(())
	}
}

/// Zero blank lines belong between a member's doc comment and the
/// declaration it documents.
fn check_doc_gap(ctx: &mut CheckContext<'_>, doc_closer: usize, decl_start: usize) -> Result<()> {
	let blanks = ctx.tokens.blank_line_tokens_in(doc_closer + 1..decl_start);

	if blanks.is_empty() {
		return Ok(());
	}

	let fix = ctx.report(
		decl_start,
		RULE,
		Severity::Error,
		format!(
			"Expected 0 blank lines between member var doc comment and declaration; {} found",
			blanks.len()
		),
		true,
	);

	if fix {
		delete_blank_tokens(ctx, &blanks)?;
	}

	Ok(())
}

/// Enforces the blank-line count in front of the declaration (or in front of
/// its doc comment, which then anchors the whole declaration). A member
/// sitting directly after the opening brace is exempt; once blank lines
/// appear before it the general one-line expectation applies.
fn check_leading_blanks(
	ctx: &mut CheckContext<'_>,
	anchor: usize,
	decl_start: usize,
) -> Result<()> {
	let tokens = ctx.tokens;
	let Some(prev) = tokens.prev_significant(anchor) else {
		return Ok(());
	};
	let blanks = tokens.blank_line_tokens_in(prev + 1..anchor);

	if blanks.len() == 1 {
		return Ok(());
	}

	if blanks.is_empty() && is_member_scope_brace(tokens, prev, decl_start) {
		return Ok(());
	}

	// Inserting a blank line only works when the declaration already starts
	// its own line; otherwise the violation needs a manual line split first.
	let can_autofix = blanks.len() > 1 || !tokens.same_line(prev, anchor);
	let message = format!("Expected 1 blank line before member var; {} found", blanks.len());
	let fix = ctx.report(decl_start, RULE, Severity::Error, message, can_autofix);

	if !fix {
		return Ok(());
	}

	if blanks.len() > 1 {
		// Keep the first blank line, delete the rest.
		delete_blank_tokens(ctx, &blanks[1..])?;
	} else {
		let line_start = ctx.tokens.first_on_line(anchor);

		ctx.fixer.begin_changeset(RULE)?;
		ctx.fixer
			.record(Edit { target: line_start, op: EditOp::InsertBefore("\n".to_owned()) })?;
		ctx.fixer.end_changeset()?;
	}

	Ok(())
}

fn delete_blank_tokens(ctx: &mut CheckContext<'_>, blanks: &[usize]) -> Result<()> {
	ctx.fixer.begin_changeset(RULE)?;

	for blank in blanks {
		ctx.fixer.record(Edit { target: *blank, op: EditOp::Delete })?;
	}

	ctx.fixer.end_changeset()?;

	Ok(())
}

/// True when `prev` is the opening brace of the class that owns the member at
/// `member_index`, making the member the first statement in the class body.
fn is_member_scope_brace(tokens: &TokenSequence, prev: usize, member_index: usize) -> bool {
	let Some(prev_token) = tokens.get(prev) else {
		return false;
	};
	let Some(member_token) = tokens.get(member_index) else {
		return false;
	};

	prev_token.kind == TokenKind::OpenBrace
		&& prev_token
			.scope
			.and_then(|refs| refs.owner)
			.is_some_and(|owner| member_token.conditions.last() == Some(&owner))
}
