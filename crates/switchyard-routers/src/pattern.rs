//! Route pattern compilation.
//!
//! A pattern such as `GET|POST:users/{User user}(/{action})*` is compiled in
//! three steps:
//!
//! 1. The optional `METHOD|METHOD:` prefix is split off.
//! 2. The remaining path is tokenized into literals, separators, optional
//!    groups, wildcards and `{type name}` placeholders.
//! 3. The tokens produce an anchored regular expression, a per-segment type
//!    table and the clean pattern used for reverse routing.
//!
//! Malformed input never fails compilation: an unbalanced parenthesis or an
//! unterminated placeholder is matched as literal text, and a
//! [`PatternLint`] records what happened so it can be reported.

use crate::converters::ArgumentType;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use switchyard_conf::RouterSettings;
use switchyard_exception::{Error, Result};
use tracing::warn;

/// Matches the `{type ` prefix of typed placeholders in the clean pattern.
static TYPED_PLACEHOLDER_PREFIX: Lazy<Option<Regex>> =
	Lazy::new(|| Regex::new(r"(?i)\{[a-z][\\a-z0-9_]*\s+").ok());

/// Compiled regex size limit, mirroring the limits used by the matcher.
const REGEX_SIZE_LIMIT: usize = 1 << 20;

const ANY_CAPTURE: &str = "([^/]*)";
// Numeric segments only match number-like text; conversion still validates it.
const NUMERIC_CAPTURE: &str = r"([-+0-9.eE\s]*)";

/// Type information for one `/`-separated segment of a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentType {
	/// The segment is matched literally and carries no argument.
	Literal,
	/// The whole segment is a single placeholder.
	Variable {
		/// Cleaned type name. Empty when the placeholder is untyped.
		type_name: String,
		/// Argument name.
		name: String,
	},
}

impl SegmentType {
	pub fn is_variable(&self) -> bool {
		matches!(self, SegmentType::Variable { .. })
	}

	pub fn name(&self) -> Option<&str> {
		match self {
			SegmentType::Variable { name, .. } => Some(name),
			SegmentType::Literal => None,
		}
	}

	pub fn type_name(&self) -> Option<&str> {
		match self {
			SegmentType::Variable { type_name, .. } => Some(type_name),
			SegmentType::Literal => None,
		}
	}
}

/// Something in a pattern that was accepted leniently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternLint {
	/// A `(` without a matching `)`, at this byte offset.
	UnclosedGroup(usize),
	/// A `)` without a matching `(`, at this byte offset.
	UnopenedGroup(usize),
	/// Brace text that is not a valid `{name}` or `{type name}` placeholder.
	MalformedPlaceholder(String),
	/// A placeholder that shares its segment with other text and therefore
	/// produces no named argument.
	UnboundPlaceholder { segment: usize, name: String },
}

impl fmt::Display for PatternLint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PatternLint::UnclosedGroup(offset) => {
				write!(f, "unclosed '(' at offset {} is matched literally", offset)
			}
			PatternLint::UnopenedGroup(offset) => {
				write!(f, "unopened ')' at offset {} is matched literally", offset)
			}
			PatternLint::MalformedPlaceholder(text) => {
				write!(f, "'{}' is not a placeholder and is matched literally", text)
			}
			PatternLint::UnboundPlaceholder { segment, name } => write!(
				f,
				"placeholder '{}' in segment {} is not the whole segment and binds no argument",
				name, segment
			),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
	Text(String),
	Slash,
	GroupOpen(usize),
	GroupClose(usize),
	Wildcard,
	EscapedWildcard,
	Placeholder { type_name: String, name: String },
}

/// A pattern compiled into its matcher and segment table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledPattern {
	source: String,
	path: String,
	methods: BTreeSet<String>,
	#[serde(with = "regex_serde")]
	regex: Regex,
	segments: Vec<SegmentType>,
	clean_pattern: String,
	#[serde(default)]
	lints: Vec<PatternLint>,
}

impl CompiledPattern {
	/// The pattern exactly as declared, method prefix included.
	pub fn source(&self) -> &str {
		&self.source
	}

	/// The path part of the pattern, without the method prefix.
	pub fn path(&self) -> &str {
		&self.path
	}

	pub fn methods(&self) -> &BTreeSet<String> {
		&self.methods
	}

	/// Method comparison is case-sensitive.
	pub fn accepts_method(&self, method: &str) -> bool {
		self.methods.contains(method)
	}

	pub fn regex(&self) -> &Regex {
		&self.regex
	}

	pub fn is_match(&self, path: &str) -> bool {
		self.regex.is_match(path)
	}

	pub fn segments(&self) -> &[SegmentType] {
		&self.segments
	}

	/// Iterate over `(index, type_name, name)` of every variable segment.
	pub fn variables(&self) -> impl Iterator<Item = (usize, &str, &str)> {
		self.segments
			.iter()
			.enumerate()
			.filter_map(|(index, segment)| match segment {
				SegmentType::Variable { type_name, name } => {
					Some((index, type_name.as_str(), name.as_str()))
				}
				SegmentType::Literal => None,
			})
	}

	/// The path with groups removed and placeholders reduced to `{name}`.
	pub fn clean_pattern(&self) -> &str {
		&self.clean_pattern
	}

	pub fn lints(&self) -> &[PatternLint] {
		&self.lints
	}
}

/// Compiles pattern strings into [`CompiledPattern`]s.
///
/// # Examples
///
/// ```
/// use switchyard_routers::pattern::{PatternCompiler, SegmentType};
///
/// let compiled = PatternCompiler::new().compile("GET:users/{User user}").unwrap();
/// assert!(compiled.accepts_method("GET"));
/// assert!(!compiled.accepts_method("POST"));
/// assert!(compiled.is_match("users/42"));
/// assert_eq!(compiled.clean_pattern(), "users/{user}");
/// assert_eq!(
///     compiled.segments()[1],
///     SegmentType::Variable { type_name: "User".into(), name: "user".into() }
/// );
/// ```
#[derive(Debug, Clone)]
pub struct PatternCompiler {
	default_methods: Vec<String>,
	max_pattern_length: usize,
	lint: bool,
}

impl Default for PatternCompiler {
	fn default() -> Self {
		Self::from_settings(&RouterSettings::default())
	}
}

impl PatternCompiler {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_settings(settings: &RouterSettings) -> Self {
		Self {
			default_methods: settings.default_methods.clone(),
			max_pattern_length: settings.max_pattern_length,
			lint: settings.lint_patterns,
		}
	}

	/// Compile `pattern`.
	///
	/// Only limit violations are errors; malformed syntax degrades to
	/// literal matching and is reported through [`CompiledPattern::lints`].
	pub fn compile(&self, pattern: &str) -> Result<CompiledPattern> {
		if pattern.len() > self.max_pattern_length {
			return Err(Error::Pattern(format!(
				"pattern is {} bytes, limit is {}",
				pattern.len(),
				self.max_pattern_length
			)));
		}

		let (methods, path) = self.split_methods(pattern);
		let mut lints = Vec::new();
		let tokens = balance_groups(tokenize(path, &mut lints), &mut lints);
		let segments = segment_types(&tokens, &mut lints);
		let regex = build_regex(&tokens)?;
		let clean_pattern = clean_pattern(path);

		if self.lint {
			for lint in &lints {
				warn!(pattern = %pattern, lint = %lint, "Lenient route pattern");
			}
		}

		Ok(CompiledPattern {
			source: pattern.to_string(),
			path: path.to_string(),
			methods,
			regex,
			segments,
			clean_pattern,
			lints,
		})
	}

	fn split_methods<'p>(&self, pattern: &'p str) -> (BTreeSet<String>, &'p str) {
		if let Some((head, rest)) = pattern.split_once(':') {
			let is_method_list = !head.is_empty()
				&& head.chars().all(|c| c.is_ascii_alphabetic() || c == '|');
			if is_method_list {
				let methods: BTreeSet<String> = head
					.split('|')
					.filter(|m| !m.is_empty())
					.map(str::to_string)
					.collect();
				if !methods.is_empty() {
					return (methods, rest);
				}
			}
		}
		(self.default_methods.iter().cloned().collect(), pattern)
	}
}

fn tokenize(path: &str, lints: &mut Vec<PatternLint>) -> Vec<Token> {
	let mut tokens = Vec::new();
	let mut text = String::new();
	let mut offset = 0;

	let flush = |text: &mut String, tokens: &mut Vec<Token>| {
		if !text.is_empty() {
			tokens.push(Token::Text(std::mem::take(text)));
		}
	};

	while offset < path.len() {
		let rest = &path[offset..];
		let Some(c) = rest.chars().next() else {
			break;
		};
		match c {
			'\\' if rest[1..].starts_with('*') => {
				flush(&mut text, &mut tokens);
				tokens.push(Token::EscapedWildcard);
				offset += 2;
				continue;
			}
			'*' => {
				flush(&mut text, &mut tokens);
				tokens.push(Token::Wildcard);
			}
			'/' => {
				flush(&mut text, &mut tokens);
				tokens.push(Token::Slash);
			}
			'(' => {
				flush(&mut text, &mut tokens);
				tokens.push(Token::GroupOpen(offset));
			}
			')' => {
				flush(&mut text, &mut tokens);
				tokens.push(Token::GroupClose(offset));
			}
			'{' => {
				if let Some((placeholder, consumed)) = parse_placeholder(rest) {
					flush(&mut text, &mut tokens);
					tokens.push(placeholder);
					offset += consumed;
					continue;
				}
				let end = rest.find('}').map(|i| i + 1).unwrap_or(rest.len());
				lints.push(PatternLint::MalformedPlaceholder(rest[..end].to_string()));
				text.push('{');
			}
			_ => text.push(c),
		}
		offset += c.len_utf8();
	}
	flush(&mut text, &mut tokens);
	tokens
}

/// Parse `{name}` or `{type name}` at the start of `input`.
fn parse_placeholder(input: &str) -> Option<(Token, usize)> {
	let end = input.find('}')?;
	let body = &input[1..end];
	let valid = |part: &str| {
		!part.is_empty()
			&& !part
				.chars()
				.any(|c| c.is_whitespace() || matches!(c, '{' | '}' | '(' | ')' | '*' | '/'))
	};
	let (type_name, name) = match body.split_once(' ') {
		Some((type_name, name)) if valid(type_name) && valid(name) => {
			(clean_type(type_name), name.to_string())
		}
		None if valid(body) => (String::new(), body.to_string()),
		_ => return None,
	};
	Some((Token::Placeholder { type_name, name }, end + 1))
}

/// Replace characters that cannot appear in a type name with `_`.
fn clean_type(type_name: &str) -> String {
	type_name
		.chars()
		.map(|c| {
			if c.is_ascii_alphanumeric() || c == '_' || c == '\\' {
				c
			} else {
				'_'
			}
		})
		.collect()
}

/// Turn unmatched group delimiters into literal text.
fn balance_groups(tokens: Vec<Token>, lints: &mut Vec<PatternLint>) -> Vec<Token> {
	let mut open = Vec::new();
	let mut unmatched = BTreeSet::new();
	for (index, token) in tokens.iter().enumerate() {
		match token {
			Token::GroupOpen(_) => open.push(index),
			Token::GroupClose(offset) => {
				if open.pop().is_none() {
					unmatched.insert(index);
					lints.push(PatternLint::UnopenedGroup(*offset));
				}
			}
			_ => {}
		}
	}
	for index in &open {
		if let Token::GroupOpen(offset) = tokens[*index] {
			lints.push(PatternLint::UnclosedGroup(offset));
		}
		unmatched.insert(*index);
	}

	let mut balanced: Vec<Token> = Vec::with_capacity(tokens.len());
	for (index, token) in tokens.into_iter().enumerate() {
		let token = match token {
			Token::GroupOpen(_) if unmatched.contains(&index) => Token::Text("(".to_string()),
			Token::GroupClose(_) if unmatched.contains(&index) => Token::Text(")".to_string()),
			other => other,
		};
		match (balanced.last_mut(), token) {
			(Some(Token::Text(previous)), Token::Text(text)) => previous.push_str(&text),
			(_, token) => balanced.push(token),
		}
	}
	balanced
}

fn segment_types(tokens: &[Token], lints: &mut Vec<PatternLint>) -> Vec<SegmentType> {
	tokens
		.split(|token| *token == Token::Slash)
		.enumerate()
		.map(|(index, segment)| {
			let significant: Vec<&Token> = segment
				.iter()
				.filter(|token| {
					!matches!(
						token,
						Token::GroupOpen(_)
							| Token::GroupClose(_) | Token::Wildcard
							| Token::EscapedWildcard
					)
				})
				.collect();
			match significant.as_slice() {
				[Token::Placeholder { type_name, name }] => SegmentType::Variable {
					type_name: type_name.clone(),
					name: name.clone(),
				},
				others => {
					for token in others {
						if let Token::Placeholder { name, .. } = token {
							lints.push(PatternLint::UnboundPlaceholder {
								segment: index,
								name: name.clone(),
							});
						}
					}
					SegmentType::Literal
				}
			}
		})
		.collect()
}

fn build_regex(tokens: &[Token]) -> Result<Regex> {
	let mut source = String::from("^");
	for token in tokens {
		match token {
			Token::Text(text) => source.push_str(&regex::escape(text)),
			Token::Slash => source.push('/'),
			Token::GroupOpen(_) => source.push_str("(?:"),
			Token::GroupClose(_) => source.push_str(")?"),
			Token::Wildcard => source.push_str(".*"),
			Token::EscapedWildcard => source.push_str(r"\*"),
			Token::Placeholder { type_name, .. } => match ArgumentType::parse(type_name) {
				ArgumentType::Int | ArgumentType::Float => source.push_str(NUMERIC_CAPTURE),
				_ => source.push_str(ANY_CAPTURE),
			},
		}
	}
	source.push('$');

	RegexBuilder::new(&source)
		.size_limit(REGEX_SIZE_LIMIT)
		.build()
		.map_err(|e| Error::Pattern(format!("{}: {}", source, e)))
}

/// Remove group parentheses and reduce `{type name}` to `{name}`.
fn clean_pattern(path: &str) -> String {
	let without_groups: String = path.chars().filter(|c| !matches!(c, '(' | ')')).collect();
	match TYPED_PLACEHOLDER_PREFIX.as_ref() {
		Some(prefix) => prefix.replace_all(&without_groups, "{").into_owned(),
		None => without_groups,
	}
}

mod regex_serde {
	use regex::Regex;
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(regex: &Regex, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(regex.as_str())
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Regex, D::Error> {
		let source = String::deserialize(deserializer)?;
		Regex::new(&source).map_err(serde::de::Error::custom)
	}
}
