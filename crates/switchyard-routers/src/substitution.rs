//! `{token}` substitution in option values and reverse-route templates.

use std::collections::BTreeMap;

/// Replace every `{key}` whose key is in `values`. Unknown tokens stay.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use switchyard_routers::substitution::map_tokens;
///
/// let values = BTreeMap::from([("id".to_string(), "7".to_string())]);
/// assert_eq!(map_tokens("users/{id}/{action}", &values), "users/7/{action}");
/// ```
pub fn map_tokens(text: &str, values: &BTreeMap<String, String>) -> String {
	if values.is_empty() || !text.contains('{') {
		return text.to_string();
	}
	let mut result = String::with_capacity(text.len());
	let mut rest = text;
	while let Some(start) = rest.find('{') {
		result.push_str(&rest[..start]);
		let after = &rest[start + 1..];
		let replacement = after
			.find('}')
			.and_then(|end| values.get(&after[..end]).map(|value| (value, end)));
		match replacement {
			Some((value, end)) => {
				result.push_str(value);
				rest = &after[end + 1..];
			}
			None => {
				result.push('{');
				rest = after;
			}
		}
	}
	result.push_str(rest);
	result
}

/// Remove every remaining `{token}`.
///
/// # Examples
///
/// ```
/// use switchyard_routers::substitution::clean_tokens;
///
/// assert_eq!(clean_tokens("users/7/{action}"), "users/7/");
/// assert_eq!(clean_tokens("a{b"), "a{b");
/// ```
pub fn clean_tokens(text: &str) -> String {
	let mut result = String::with_capacity(text.len());
	let mut rest = text;
	while let Some(start) = rest.find('{') {
		let after = &rest[start + 1..];
		match after.find(['{', '}']) {
			Some(end) if after.as_bytes()[end] == b'}' => {
				result.push_str(&rest[..start]);
				rest = &after[end + 1..];
			}
			_ => {
				result.push_str(&rest[..=start]);
				rest = after;
			}
		}
	}
	result.push_str(rest);
	result
}

/// The name inside `text` when it is exactly one `{name}` token.
pub fn token_name(text: &str) -> Option<&str> {
	let name = text.strip_prefix('{')?.strip_suffix('}')?;
	(!name.is_empty() && !name.contains(['{', '}'])).then_some(name)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn values() -> BTreeMap<String, String> {
		BTreeMap::from([
			("a".to_string(), "1".to_string()),
			("request.q".to_string(), "rust".to_string()),
		])
	}

	#[rstest]
	#[case("{a}", "1")]
	#[case("x{a}y{a}", "x1y1")]
	#[case("{b}", "{b}")]
	#[case("{{a}", "{1")]
	#[case("{a", "{a")]
	#[case("search?q={request.q}", "search?q=rust")]
	#[case("plain", "plain")]
	fn test_map_tokens(#[case] text: &str, #[case] expected: &str) {
		assert_eq!(map_tokens(text, &values()), expected);
	}

	#[rstest]
	#[case("a/{b}/c", "a//c")]
	#[case("{x}{y}", "")]
	#[case("{{x}", "{")]
	#[case("}{", "}{")]
	fn test_clean_tokens(#[case] text: &str, #[case] expected: &str) {
		assert_eq!(clean_tokens(text), expected);
	}

	#[rstest]
	#[case("{user}", Some("user"))]
	#[case("{user", None)]
	#[case("x{user}", None)]
	#[case("{}", None)]
	#[case("{a}{b}", None)]
	fn test_token_name(#[case] text: &str, #[case] expected: Option<&str>) {
		assert_eq!(token_name(text), expected);
	}
}
