use std::cmp::Ordering;

pub fn md5_hex(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}

/// Renders tokens the way PostgreSQL prints a sorted `text[]`:
/// `{a,"b c",NULL}`. Tokens are sorted bytewise with NULLs last, so the
/// rendering only depends on the multiset of tokens.
pub fn render_array_text(mut tokens: Vec<Option<String>>) -> String {
    tokens.sort_by(|a, b| match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    let mut out = String::from("{");
    for (index, token) in tokens.iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        match token {
            None => out.push_str("NULL"),
            Some(token) => push_element(&mut out, token),
        }
    }
    out.push('}');
    out
}

fn push_element(out: &mut String, token: &str) {
    let needs_quotes = token.is_empty()
        || token.eq_ignore_ascii_case("NULL")
        || token.chars().any(|c| {
            matches!(c, '"' | '\\' | '{' | '}' | ',' | ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c')
        });

    if !needs_quotes {
        out.push_str(token);
        return;
    }

    out.push('"');
    for c in token.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
}
