//! Read-only token view over one source file.
//!
//! Tokens are produced once by the lexer and never mutated afterwards; the
//! token index is the sole addressing mechanism used by sniffs and by the fix
//! engine.

use std::ops::Range;

/// Closed set of lexical categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum TokenKind {
	OpenTag,
	Whitespace,
	LineComment,
	BlockComment,
	DocCommentOpen,
	DocCommentStar,
	DocCommentWhitespace,
	DocCommentTag,
	DocCommentText,
	DocCommentClose,
	Class,
	Interface,
	Abstract,
	Final,
	Public,
	Private,
	Protected,
	Static,
	Var,
	Const,
	Function,
	Extends,
	Implements,
	Variable,
	Identifier,
	StringLiteral,
	Number,
	OpenBrace,
	CloseBrace,
	OpenParen,
	CloseParen,
	Semicolon,
	Equals,
	Comma,
	Other,
}

impl TokenKind {
	/// Whitespace and every comment flavor count as insignificant and are
	/// skipped when sniffs look for neighboring code tokens.
	pub(crate) fn is_empty(self) -> bool {
		matches!(
			self,
			Self::Whitespace
				| Self::LineComment
				| Self::BlockComment
				| Self::DocCommentOpen
				| Self::DocCommentStar
				| Self::DocCommentWhitespace
				| Self::DocCommentTag
				| Self::DocCommentText
				| Self::DocCommentClose
		)
	}

	pub(crate) fn is_member_modifier(self) -> bool {
		matches!(
			self,
			Self::Public | Self::Private | Self::Protected | Self::Static | Self::Var
		)
	}

	pub(crate) fn is_class_like(self) -> bool {
		matches!(self, Self::Class | Self::Interface)
	}
}

/// Links a token to the scope or comment span it participates in.
///
/// For braces the opener/closer are the brace pair and `owner` is the
/// `class`/`interface`/`function` keyword owning the block; for doc comments
/// the opener/closer delimit the `/** ... */` span and there is no owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ScopeRefs {
	pub(crate) opener: usize,
	pub(crate) closer: usize,
	pub(crate) owner: Option<usize>,
}

#[derive(Clone, Debug)]
pub(crate) struct Token {
	pub(crate) index: usize,
	pub(crate) kind: TokenKind,
	pub(crate) text: String,
	/// 1-based line of the token start.
	pub(crate) line: usize,
	/// 1-based column of the token start.
	pub(crate) column: usize,
	pub(crate) scope: Option<ScopeRefs>,
	/// Owner-keyword indices of every enclosing owned scope, outermost first.
	pub(crate) conditions: Vec<usize>,
	/// Parenthesis nesting depth at the token position.
	pub(crate) paren_depth: usize,
}

/// Ordered, immutable token sequence shared read-only by all sniffs while one
/// file is analyzed. Indices are contiguous, strictly increasing and 0-based.
#[derive(Debug, Default)]
pub(crate) struct TokenSequence {
	tokens: Vec<Token>,
}

impl TokenSequence {
	pub(crate) fn new(tokens: Vec<Token>) -> Self {
		debug_assert!(tokens.iter().enumerate().all(|(idx, token)| token.index == idx));

		Self { tokens }
	}

	pub(crate) fn len(&self) -> usize {
		self.tokens.len()
	}

	pub(crate) fn get(&self, index: usize) -> Option<&Token> {
		self.tokens.get(index)
	}

	pub(crate) fn iter(&self) -> impl Iterator<Item = &Token> {
		self.tokens.iter()
	}

	/// Finds the first token whose kind is in `kinds` (or not in `kinds` when
	/// `negate` is set), scanning forward from `from` up to `to` inclusive, or
	/// backward when `to` lies before `from`. `to = None` scans to the end.
	/// Bounds past either end of the sequence yield `None`, never an error.
	pub(crate) fn find_first_matching(
		&self,
		kinds: &[TokenKind],
		from: usize,
		to: Option<usize>,
		negate: bool,
	) -> Option<usize> {
		if self.tokens.is_empty() || from >= self.tokens.len() {
			return None;
		}

		let backward = to.is_some_and(|to| to < from);

		if backward {
			let to = to.unwrap_or(0);

			for index in (to..=from).rev() {
				if kinds.contains(&self.tokens[index].kind) != negate {
					return Some(index);
				}
			}
		} else {
			let to = to.unwrap_or(self.tokens.len() - 1).min(self.tokens.len() - 1);

			for index in from..=to {
				if kinds.contains(&self.tokens[index].kind) != negate {
					return Some(index);
				}
			}
		}

		None
	}

	/// Nearest significant (non-empty) token strictly before `index`.
	pub(crate) fn prev_significant(&self, index: usize) -> Option<usize> {
		self.tokens[..index.min(self.tokens.len())]
			.iter()
			.rposition(|token| !token.kind.is_empty())
	}

	/// Nearest significant (non-empty) token strictly after `index`.
	pub(crate) fn next_significant(&self, index: usize) -> Option<usize> {
		self.tokens
			.get(index + 1..)?
			.iter()
			.position(|token| !token.kind.is_empty())
			.map(|offset| index + 1 + offset)
	}

	/// Nearest token strictly before `index` that is not plain whitespace.
	/// Unlike [`Self::prev_significant`] this stops at comment tokens, which
	/// is how sniffs discover an attached doc comment.
	pub(crate) fn prev_non_whitespace(&self, index: usize) -> Option<usize> {
		self.tokens[..index.min(self.tokens.len())]
			.iter()
			.rposition(|token| token.kind != TokenKind::Whitespace)
	}

	pub(crate) fn line_of(&self, index: usize) -> Option<usize> {
		self.tokens.get(index).map(|token| token.line)
	}

	pub(crate) fn same_line(&self, left: usize, right: usize) -> bool {
		match (self.line_of(left), self.line_of(right)) {
			(Some(a), Some(b)) => a == b,
			_ => false,
		}
	}

	/// Index of the first token on the line `index` starts on.
	pub(crate) fn first_on_line(&self, index: usize) -> usize {
		let Some(line) = self.line_of(index) else {
			return index;
		};
		let mut first = index;

		while first > 0 && self.tokens[first - 1].line == line {
			first -= 1;
		}

		first
	}

	/// Indices of whitespace tokens in `range` that make up a blank line.
	///
	/// The lexer terminates whitespace tokens at newlines, so a blank line is
	/// exactly one whitespace token starting at column 1 and ending in `\n`.
	pub(crate) fn blank_line_tokens_in(&self, range: Range<usize>) -> Vec<usize> {
		let range = range.start.min(self.tokens.len())..range.end.min(self.tokens.len());

		self.tokens[range]
			.iter()
			.filter(|token| {
				token.kind == TokenKind::Whitespace
					&& token.column == 1
					&& token.text.ends_with('\n')
			})
			.map(|token| token.index)
			.collect()
	}

	/// Blank lines strictly between tokens `a` and `b`.
	pub(crate) fn blank_lines_between(&self, a: usize, b: usize) -> usize {
		self.blank_line_tokens_in(a + 1..b).len()
	}
}
