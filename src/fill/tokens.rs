//! Delimited placeholder tokens inside text: `{{field}}` and `{field}`.
//!
//! Field names are ASCII letters, digits, `_` and `-`, optionally padded with
//! spaces inside the braces. Anything else in braces is literal text.

/// A token found in text. `start..end` covers the braces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub start: usize,
    pub end: usize,
    pub name: String,
}

fn valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Find all tokens in order. Double braces are tried before single ones.
pub fn find_tokens(text: &str) -> Vec<Token> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'{' {
            i += 1;
            continue;
        }

        let double = bytes.get(i + 1) == Some(&b'{');
        let (open, close) = if double { (2, "}}") } else { (1, "}") };
        let inner_start = i + open;

        if let Some(rel) = text[inner_start..].find(close) {
            let inner = &text[inner_start..inner_start + rel];
            let name = inner.trim();
            if valid_name(name) {
                let end = inner_start + rel + close.len();
                tokens.push(Token {
                    start: i,
                    end,
                    name: name.to_string(),
                });
                i = end;
                continue;
            }
        }
        i += 1;
    }

    tokens
}

pub fn has_tokens(text: &str) -> bool {
    !find_tokens(text).is_empty()
}

/// Replace every token with `resolve(name)`. Replacement values are not
/// rescanned, so a value containing braces stays as-is.
pub fn substitute(text: &str, mut resolve: impl FnMut(&str) -> String) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for token in find_tokens(text) {
        out.push_str(&text[last..token.start]);
        out.push_str(&resolve(&token.name));
        last = token.end;
    }
    out.push_str(&text[last..]);
    out
}
