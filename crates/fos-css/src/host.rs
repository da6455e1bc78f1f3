//! `:host` rewriting
//!
//! Components rendered into their own element (no shadow root) have their
//! `:host` selectors rewritten against the literal tag name:
//!
//! - `:host` becomes `tag`
//! - `:host(.active)` becomes `tag.active`
//! - `:host-context(.dark)` becomes `.dark tag`
//!
//! Comments and quoted strings are copied through untouched.

/// Rewrite `:host` selectors in `css` to target `tag`
pub fn rewrite_host_selectors(css: &str, tag: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;

    while let Some(c) = rest.chars().next() {
        if rest.starts_with("/*") {
            let end = rest[2..].find("*/").map(|i| i + 4).unwrap_or(rest.len());
            out.push_str(&rest[..end]);
            rest = &rest[end..];
        } else if c == '"' || c == '\'' {
            let end = string_end(rest, c);
            out.push_str(&rest[..end]);
            rest = &rest[end..];
        } else if let Some(after) = rest.strip_prefix(":host-context(") {
            match balanced(after) {
                Some((inner, tail)) => {
                    out.push_str(inner.trim());
                    out.push(' ');
                    out.push_str(tag);
                    rest = tail;
                }
                None => {
                    out.push_str(rest);
                    rest = "";
                }
            }
        } else if let Some(after) = rest.strip_prefix(":host(") {
            match balanced(after) {
                Some((inner, tail)) => {
                    out.push_str(tag);
                    out.push_str(inner.trim());
                    rest = tail;
                }
                None => {
                    out.push_str(rest);
                    rest = "";
                }
            }
        } else if let Some(after) = rest.strip_prefix(":host").filter(|a| !continues_ident(a)) {
            out.push_str(tag);
            rest = after;
        } else {
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }
    out
}

fn continues_ident(s: &str) -> bool {
    s.chars()
        .next()
        .map(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        .unwrap_or(false)
}

/// Byte length of the string literal at the start of `s`, quotes included
fn string_end(s: &str, quote: char) -> usize {
    let mut escaped = false;
    for (i, c) in s.char_indices().skip(1) {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return i + 1;
        }
    }
    s.len()
}

/// Split `s` (just past an opening paren) into the balanced inner text and
/// whatever follows the closing paren
fn balanced(s: &str) -> Option<(&str, &str)> {
    let mut depth = 1usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some((&s[..i], &s[i + 1..]));
                }
            }
            _ => {}
        }
    }
    None
}
