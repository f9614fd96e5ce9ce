//! Doc-comment requirements for class-member variables.

use super::{
	diagnostics::Severity,
	shared::{self, CheckContext, Sniff},
	tokens::{TokenKind, TokenSequence},
};
use crate::prelude::*;
use once_cell::sync::Lazy;
use regex::Regex;

static ARRAY_RE: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"(?i)^array\(\s*([^\s=>]*?)(\s*=>\s*(.*?))?\s*\)").unwrap());

/// Type names whose lowercase spelling is the canonical one.
const KNOWN_TYPES: &[&str] = &[
	"array", "boolean", "callable", "float", "integer", "mixed", "object", "string", "resource",
	"null", "void", "self", "static", "iterable",
];

/// Every member variable wants a `/** ... */` doc comment carrying exactly one
/// leading `@var` tag with a canonically spelled type. None of the findings
/// here are auto-fixable; rewriting prose is the author's job.
pub(crate) struct VarDocCommentSniff;

impl Sniff for VarDocCommentSniff {
fn triggers(&self) -> &'static [TokenKind] {
		&[TokenKind::Variable]
	}

	fn check(&self, ctx: &mut CheckContext<'_>, index: usize) -> Result<()> {
		let Some(decl) = shared::member_declaration(ctx.tokens, index) else {
			return Ok(());
		};
		let Some((doc_opener, doc_closer)) = decl.doc else {
			ctx.report(
				index,
				"PHP-STYLE-DOC-001",
				Severity::Error,
				"Missing member variable doc comment".to_owned(),
				false,
			);

			return Ok(());
		};

		let tags = collect_tags(ctx.tokens, doc_opener, doc_closer);

		check_var_tag(ctx, doc_opener, &tags);
		check_see_tags(ctx, &tags);
		check_description(ctx, index, doc_opener, &tags);

		Ok(())
	}
}

struct DocTag {
	index: usize,
	name: String,
	content: Option<String>,
}

fn collect_tags(tokens: &TokenSequence, opener: usize, closer: usize) -> Vec<DocTag> {
	let mut tags = Vec::new();

	for index in opener..=closer {
		let Some(token) = tokens.get(index) else {
			continue;
		};

		if token.kind != TokenKind::DocCommentTag {
			continue;
		}

		tags.push(DocTag {
			index,
			name: token.text.clone(),
			content: tag_content(tokens, index, closer),
		});
	}

	tags
}

/// The tag's content is the text token following it on the same line, if any.
fn tag_content(tokens: &TokenSequence, tag: usize, closer: usize) -> Option<String> {
	for index in tag + 1..=closer {
		let token = tokens.get(index)?;

		if !tokens.same_line(tag, index) {
			break;
		}

		if token.kind == TokenKind::DocCommentText {
			let trimmed = token.text.trim();

			return (!trimmed.is_empty()).then(|| trimmed.to_owned());
		}
	}

	None
}

fn check_var_tag(ctx: &mut CheckContext<'_>, opener: usize, tags: &[DocTag]) {
	let var_tags = tags.iter().filter(|tag| tag.name == "@var").collect::<Vec<_>>();
	let Some(first_var) = var_tags.first() else {
		ctx.report(
			opener,
			"PHP-STYLE-DOC-002",
			Severity::Error,
			"Missing @var tag in member variable comment".to_owned(),
			false,
		);

		return;
	};

	if tags.first().is_some_and(|tag| tag.name != "@var") {
		ctx.report(
			first_var.index,
			"PHP-STYLE-DOC-002",
			Severity::Error,
			"The @var tag must be the first tag in a member variable comment".to_owned(),
			false,
		);
	}

	if var_tags.len() > 1 {
		ctx.report(
			var_tags[1].index,
			"PHP-STYLE-DOC-002",
			Severity::Error,
			"Only one @var tag is allowed in a member variable comment".to_owned(),
			false,
		);
	}

	let Some(content) = first_var.content.as_deref() else {
		ctx.report(
			first_var.index,
			"PHP-STYLE-DOC-002",
			Severity::Error,
			"Content missing for @var tag in member variable comment".to_owned(),
			false,
		);

		return;
	};
	let found = content.split_whitespace().next().unwrap_or(content);
	let canonical = suggest_type(found);

	if found != canonical {
		ctx.report(
			first_var.index,
			"PHP-STYLE-DOC-003",
			Severity::Error,
			format!(
				"Expected \"{canonical}\" but found \"{found}\" for @var tag in member variable comment",
			),
			false,
		);
	}
}

fn check_see_tags(ctx: &mut CheckContext<'_>, tags: &[DocTag]) {
	for tag in tags.iter().filter(|tag| tag.name == "@see") {
		if tag.content.is_none() {
			ctx.report(
				tag.index,
				"PHP-STYLE-DOC-004",
				Severity::Warning,
				"@see tag should have a description".to_owned(),
				false,
			);
		}
	}
}

/// The member description is the prose after the type on the `@var` line.
/// The checks form a guard chain: at most one finding per declaration, the
/// most specific one.
fn check_description(ctx: &mut CheckContext<'_>, var_index: usize, opener: usize, tags: &[DocTag]) {
	let Some(var_tag) = tags.iter().find(|tag| tag.name == "@var") else {
		return;
	};
	let Some(content) = var_tag.content.as_deref() else {
		return;
	};
	let mut words = content.split_whitespace();
	let _type = words.next();
	let description = words.collect::<Vec<_>>().join(" ");

	if description.is_empty() {
		return;
	}

	let var_name = ctx
		.tokens
		.get(var_index)
		.map(|token| token.text.trim_start_matches('$').to_owned())
		.unwrap_or_default();
	let first_word = description.split_whitespace().next().unwrap_or_default();

	if !var_name.is_empty() && first_word.trim_start_matches('\'') == var_name {
		ctx.report(
			opener,
			"PHP-STYLE-DOC-005",
			Severity::Error,
			"Member variable description must not start with the variable name".to_owned(),
			false,
		);

		return;
	}

	if description.chars().next().is_some_and(|c| c.is_lowercase()) {
		ctx.report(
			opener,
			"PHP-STYLE-DOC-005",
			Severity::Error,
			"Member variable description must start with a capital letter".to_owned(),
			false,
		);

		return;
	}

	if !description.ends_with(['.', '!', '?']) {
		ctx.report(
			opener,
			"PHP-STYLE-DOC-005",
			Severity::Error,
			"Member variable description must end with a full stop, exclamation mark, or question mark"
				.to_owned(),
			false,
		);
	}
}

/// Maps a written type to its canonical spelling. Union members are
/// canonicalized independently; `array(k => v)` shapes keep their structure.
pub(crate) fn suggest_type(found: &str) -> String {
	if found.is_empty() {
		return String::new();
	}

	if found.contains('|') {
		return found.split('|').map(suggest_type).collect::<Vec<_>>().join("|");
	}

	let lower = found.to_lowercase();

	match lower.as_str() {
		"bool" => "boolean".to_owned(),
		"int" => "integer".to_owned(),
		"double" | "real" => "float".to_owned(),
		_ =>
			if KNOWN_TYPES.contains(&lower.as_str()) {
				lower
			} else if let Some(captures) = ARRAY_RE.captures(found) {
				let key = captures.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
				let value = captures.get(3).map(|m| m.as_str().trim());

				match value {
					Some(value) if !key.is_empty() =>
						format!("array({} => {})", suggest_type(key), suggest_type(value)),
					_ if !key.is_empty() => format!("array({})", suggest_type(key)),
					_ => "array".to_owned(),
				}
			} else {
				found.to_owned()
			},
	}
}
