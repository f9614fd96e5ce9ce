//! Lexer and scope annotator for PHP-style class source files.
//!
//! This is the reference implementation of the collaborator that feeds the
//! sniff engine: it produces the finalized [`TokenSequence`] with brace
//! scopes, owner keywords, doc-comment spans and condition stacks already
//! resolved. The engine itself never looks at raw text.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::tokens::{ScopeRefs, Token, TokenKind, TokenSequence};

static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
	HashMap::from([
		("class", TokenKind::Class),
		("interface", TokenKind::Interface),
		("abstract", TokenKind::Abstract),
		("final", TokenKind::Final),
		("public", TokenKind::Public),
		("private", TokenKind::Private),
		("protected", TokenKind::Protected),
		("static", TokenKind::Static),
		("var", TokenKind::Var),
		("const", TokenKind::Const),
		("function", TokenKind::Function),
		("extends", TokenKind::Extends),
		("implements", TokenKind::Implements),
	])
});

pub(crate) fn tokenize(text: &str) -> TokenSequence {
	let mut lexer = Lexer::new(text);

	lexer.run();

	let mut tokens = lexer.tokens;

	annotate(&mut tokens);

	TokenSequence::new(tokens)
}

struct Lexer {
	chars: Vec<char>,
	pos: usize,
	line: usize,
	column: usize,
	tokens: Vec<Token>,
}

impl Lexer {
	fn new(text: &str) -> Self {
		Self { chars: text.chars().collect(), pos: 0, line: 1, column: 1, tokens: Vec::new() }
	}

	fn peek(&self) -> Option<char> {
		self.chars.get(self.pos).copied()
	}

	fn peek_at(&self, offset: usize) -> Option<char> {
		self.chars.get(self.pos + offset).copied()
	}

	fn bump(&mut self) -> Option<char> {
		let ch = self.chars.get(self.pos).copied()?;

		self.pos += 1;

		if ch == '\n' {
			self.line += 1;
			self.column = 1;
		} else {
			self.column += 1;
		}

		Some(ch)
	}

	fn emit(&mut self, kind: TokenKind, line: usize, column: usize, text: String) {
		let index = self.tokens.len();

		self.tokens.push(Token {
			index,
			kind,
			text,
			line,
			column,
			scope: None,
			conditions: Vec::new(),
			paren_depth: 0,
		});
	}

	fn run(&mut self) {
		if self.chars.starts_with(&['<', '?', 'p', 'h', 'p']) {
			let (line, column) = (self.line, self.column);
			let mut text = String::new();

			for _ in 0..5 {
				if let Some(ch) = self.bump() {
					text.push(ch);
				}
			}

			self.emit(TokenKind::OpenTag, line, column, text);
		}

		while let Some(ch) = self.peek() {
			match ch {
				' ' | '\t' | '\r' | '\n' => self.lex_whitespace(),
				'/' if self.peek_at(1) == Some('*') && self.peek_at(2) == Some('*') => {
					self.lex_doc_comment();
				},
				'/' if self.peek_at(1) == Some('*') => self.lex_block_comment(),
				'/' if self.peek_at(1) == Some('/') => self.lex_line_comment(),
				'#' => self.lex_line_comment(),
				'"' | '\'' => self.lex_string(ch),
				'$' if self.peek_at(1).is_some_and(|c| c.is_alphabetic() || c == '_') => {
					self.lex_variable();
				},
				c if c.is_alphabetic() || c == '_' => self.lex_word(),
				c if c.is_ascii_digit() => self.lex_number(),
				'{' => self.lex_single(TokenKind::OpenBrace),
				'}' => self.lex_single(TokenKind::CloseBrace),
				'(' => self.lex_single(TokenKind::OpenParen),
				')' => self.lex_single(TokenKind::CloseParen),
				';' => self.lex_single(TokenKind::Semicolon),
				'=' => self.lex_single(TokenKind::Equals),
				',' => self.lex_single(TokenKind::Comma),
				_ => self.lex_single(TokenKind::Other),
			}
		}
	}

	/// A whitespace run never crosses a newline: the `\n` terminates the
	/// token. Blank-line accounting in the token view relies on this.
	fn lex_whitespace(&mut self) {
		let (line, column) = (self.line, self.column);
		let mut text = String::new();

		while let Some(ch) = self.peek() {
			match ch {
				' ' | '\t' | '\r' => {
					text.push(ch);
					self.bump();
				},
				'\n' => {
					text.push(ch);
					self.bump();

					break;
				},
				_ => break,
			}
		}

		self.emit(TokenKind::Whitespace, line, column, text);
	}

	fn lex_line_comment(&mut self) {
		let (line, column) = (self.line, self.column);
		let mut text = String::new();

		while let Some(ch) = self.peek() {
			if ch == '\n' {
				break;
			}

			text.push(ch);
			self.bump();
		}

		self.emit(TokenKind::LineComment, line, column, text);
	}

	fn lex_block_comment(&mut self) {
		// One BlockComment token per source line, newline included.
		let mut segment_start = (self.line, self.column);
		let mut text = String::new();

		text.push(self.bump().unwrap_or_default());
		text.push(self.bump().unwrap_or_default());

		while let Some(ch) = self.peek() {
			if ch == '*' && self.peek_at(1) == Some('/') {
				text.push(self.bump().unwrap_or_default());
				text.push(self.bump().unwrap_or_default());

				break;
			}

			text.push(ch);
			self.bump();

			if ch == '\n' {
				let (line, column) = segment_start;

				self.emit(TokenKind::BlockComment, line, column, std::mem::take(&mut text));

				segment_start = (self.line, self.column);
			}
		}

		if !text.is_empty() {
			let (line, column) = segment_start;

			self.emit(TokenKind::BlockComment, line, column, text);
		}
	}

	fn lex_doc_comment(&mut self) {
		let (line, column) = (self.line, self.column);
		let mut open = String::new();

		for _ in 0..3 {
			open.push(self.bump().unwrap_or_default());
		}

		self.emit(TokenKind::DocCommentOpen, line, column, open);

		loop {
			let Some(ch) = self.peek() else {
				break;
			};

			if ch == '*' && self.peek_at(1) == Some('/') {
				let (line, column) = (self.line, self.column);
				let mut close = String::new();

				close.push(self.bump().unwrap_or_default());
				close.push(self.bump().unwrap_or_default());
				self.emit(TokenKind::DocCommentClose, line, column, close);

				break;
			}

			match ch {
				' ' | '\t' | '\r' | '\n' => self.lex_doc_whitespace(),
				'*' => {
					let (line, column) = (self.line, self.column);

					self.bump();
					self.emit(TokenKind::DocCommentStar, line, column, "*".to_owned());
				},
				'@' => self.lex_doc_tag(),
				_ => self.lex_doc_text(),
			}
		}
	}

	fn lex_doc_whitespace(&mut self) {
		let (line, column) = (self.line, self.column);
		let mut text = String::new();

		while let Some(ch) = self.peek() {
			match ch {
				' ' | '\t' | '\r' => {
					text.push(ch);
					self.bump();
				},
				'\n' => {
					text.push(ch);
					self.bump();

					break;
				},
				_ => break,
			}
		}

		self.emit(TokenKind::DocCommentWhitespace, line, column, text);
	}

	fn lex_doc_tag(&mut self) {
		let (line, column) = (self.line, self.column);
		let mut text = String::new();

		text.push(self.bump().unwrap_or_default());

		while let Some(ch) = self.peek() {
			if ch.is_alphanumeric() || ch == '-' {
				text.push(ch);
				self.bump();
			} else {
				break;
			}
		}

		self.emit(TokenKind::DocCommentTag, line, column, text);
	}

	fn lex_doc_text(&mut self) {
		let (line, column) = (self.line, self.column);
		let mut text = String::new();

		while let Some(ch) = self.peek() {
			if ch == '\n' || (ch == '*' && self.peek_at(1) == Some('/')) {
				break;
			}

			text.push(ch);
			self.bump();
		}

		self.emit(TokenKind::DocCommentText, line, column, text);
	}

	fn lex_string(&mut self, quote: char) {
		let (line, column) = (self.line, self.column);
		let mut text = String::new();
		let mut escaped = false;

		text.push(self.bump().unwrap_or_default());

		while let Some(ch) = self.peek() {
			text.push(ch);
			self.bump();

			if escaped {
				escaped = false;
			} else if ch == '\\' {
				escaped = true;
			} else if ch == quote {
				break;
			}
		}

		self.emit(TokenKind::StringLiteral, line, column, text);
	}

	fn lex_variable(&mut self) {
		let (line, column) = (self.line, self.column);
		let mut text = String::new();

		text.push(self.bump().unwrap_or_default());

		while let Some(ch) = self.peek() {
			if ch.is_alphanumeric() || ch == '_' {
				text.push(ch);
				self.bump();
			} else {
				break;
			}
		}

		self.emit(TokenKind::Variable, line, column, text);
	}

	fn lex_word(&mut self) {
		let (line, column) = (self.line, self.column);
		let mut text = String::new();

		while let Some(ch) = self.peek() {
			if ch.is_alphanumeric() || ch == '_' {
				text.push(ch);
				self.bump();
			} else {
				break;
			}
		}

		let kind =
			KEYWORDS.get(text.to_lowercase().as_str()).copied().unwrap_or(TokenKind::Identifier);

		self.emit(kind, line, column, text);
	}

	fn lex_number(&mut self) {
		let (line, column) = (self.line, self.column);
		let mut text = String::new();

		while let Some(ch) = self.peek() {
			if ch.is_ascii_digit() || ch == '.' || ch == '_' {
				text.push(ch);
				self.bump();
			} else {
				break;
			}
		}

		self.emit(TokenKind::Number, line, column, text);
	}

	fn lex_single(&mut self, kind: TokenKind) {
		let (line, column) = (self.line, self.column);
		let ch = self.bump().unwrap_or_default();

		self.emit(kind, line, column, ch.to_string());
	}
}

/// Resolves brace scopes, owner keywords, doc-comment spans, condition stacks
/// and parenthesis depth in one pass over the raw token stream.
fn annotate(tokens: &mut [Token]) {
	let mut brace_stack: Vec<(usize, Option<usize>)> = Vec::new();
	let mut conditions: Vec<usize> = Vec::new();
	let mut pending_owner: Option<usize> = None;
	let mut pending_doc_open: Option<usize> = None;
	let mut paren_depth = 0_usize;

	for index in 0..tokens.len() {
		match tokens[index].kind {
			TokenKind::Class | TokenKind::Interface | TokenKind::Function => {
				pending_owner = Some(index);
			},
			// An abstract method declaration ends without a body.
			TokenKind::Semicolon => pending_owner = None,
			TokenKind::OpenBrace => {
				let owner = pending_owner.take();

				brace_stack.push((index, owner));
				tokens[index].conditions = conditions.clone();
				tokens[index].paren_depth = paren_depth;

				if let Some(owner) = owner {
					conditions.push(owner);
				}

				continue;
			},
			TokenKind::CloseBrace => {
				if let Some((opener, owner)) = brace_stack.pop() {
					if owner.is_some() {
						conditions.pop();
					}

					let refs = ScopeRefs { opener, closer: index, owner };

					tokens[opener].scope = Some(refs);
					tokens[index].scope = Some(refs);

					if let Some(owner) = owner {
						tokens[owner].scope = Some(refs);
					}
				}
			},
			TokenKind::OpenParen => paren_depth += 1,
			TokenKind::CloseParen => {
				tokens[index].conditions = conditions.clone();
				tokens[index].paren_depth = paren_depth;
				paren_depth = paren_depth.saturating_sub(1);

				continue;
			},
			TokenKind::DocCommentOpen => pending_doc_open = Some(index),
			TokenKind::DocCommentClose => {
				if let Some(opener) = pending_doc_open.take() {
					let refs = ScopeRefs { opener, closer: index, owner: None };

					tokens[opener].scope = Some(refs);
					tokens[index].scope = Some(refs);
				}
			},
			_ => {},
		}

		tokens[index].conditions = conditions.clone();
		tokens[index].paren_depth = paren_depth;
	}
}
