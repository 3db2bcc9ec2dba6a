//! Quote-aware text scanning primitives.
//!
//! Every rewrite pass must leave quoted literal content untouched, so the
//! passes share these helpers instead of each walking the text on its own.
//! A quote closes on its matching character; a doubled quote inside a
//! literal (`''` / `""`) reads as close-then-reopen, which is equivalent
//! for scanning purposes.

/// Returns true for characters that may start an identifier.
pub(crate) fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

/// Returns true for characters that may continue an identifier.
pub(crate) fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Given `text[open..]` starting at `(`, returns the byte index of the
/// matching `)`, skipping parens inside quoted literals.
pub(crate) fn find_matching_paren(text: &str, open: usize) -> Option<usize> {
    debug_assert_eq!(text[open..].chars().next(), Some('('));
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (offset, c) in text[open..].char_indices() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' => quote = Some(c),
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(open + offset);
                    }
                }
                _ => {}
            },
        }
    }
    None
}

/// Splits `args` on top-level commas, respecting nested parens and both
/// quote kinds.
///
/// A naive comma split corrupts `CONCAT(a, f(b, c))` and comma-containing
/// literals; this walker only splits at depth zero outside quotes. Each
/// returned argument is trimmed.
pub(crate) fn split_top_level_args(args: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for c in args.chars() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
                current.push(c);
            }
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    current.push(c);
                }
                '(' => {
                    depth += 1;
                    current.push(c);
                }
                ')' => {
                    depth = depth.saturating_sub(1);
                    current.push(c);
                }
                ',' if depth == 0 => {
                    parts.push(current.trim().to_string());
                    current.clear();
                }
                _ => current.push(c),
            },
        }
    }
    if !current.trim().is_empty() || !parts.is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

/// Finds the first occurrence of `keyword` (a single word) as a
/// standalone token at paren depth zero outside quotes,
/// case-insensitively. Returns the byte index into `text`.
pub(crate) fn find_keyword(text: &str, keyword: &str) -> Option<usize> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let kw: Vec<char> = keyword.chars().collect();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut i = 0;
    while i < chars.len() {
        let (pos, c) = chars[i];
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' => quote = Some(c),
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                _ if depth == 0 && is_ident_start(c) => {
                    let start = i;
                    while i < chars.len() && is_ident_char(chars[i].1) {
                        i += 1;
                    }
                    let word = &chars[start..i];
                    if word.len() == kw.len()
                        && word
                            .iter()
                            .zip(&kw)
                            .all(|(&(_, w), k)| w.eq_ignore_ascii_case(k))
                    {
                        return Some(pos);
                    }
                    continue;
                }
                _ => {}
            },
        }
        i += 1;
    }
    None
}

/// Applies `f` to each maximal run of text outside quoted literals,
/// copying the literals through verbatim.
pub(crate) fn map_unquoted<F: FnMut(&str) -> String>(input: &str, mut f: F) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    loop {
        let Some(idx) = rest.find(['\'', '"']) else {
            out.push_str(&f(rest));
            return out;
        };
        out.push_str(&f(&rest[..idx]));
        let quote = &rest[idx..=idx];
        match rest[idx + 1..].find(quote) {
            // Unterminated literal: copy the remainder untouched.
            None => {
                out.push_str(&rest[idx..]);
                return out;
            }
            Some(end_rel) => {
                let end = idx + 1 + end_rel;
                out.push_str(&rest[idx..=end]);
                rest = &rest[end + 1..];
            }
        }
    }
}

/// Replaces bare `TRUE`/`FALSE` tokens with `1`/`0`, leaving quoted
/// content untouched via character-by-character quote tracking.
pub(crate) fn fold_booleans(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' | '"' => {
                out.push(c);
                i += 1;
                while i < chars.len() {
                    out.push(chars[i]);
                    if chars[i] == c {
                        i += 1;
                        break;
                    }
                    i += 1;
                }
            }
            _ if is_ident_start(c) => {
                let start = i;
                while i < chars.len() && is_ident_char(chars[i]) {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                if word.eq_ignore_ascii_case("TRUE") {
                    out.push('1');
                } else if word.eq_ignore_ascii_case("FALSE") {
                    out.push('0');
                } else {
                    out.push_str(&word);
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_respects_nested_parens_and_quotes() {
        let parts = split_top_level_args("a, f(b, 'x,y'), c");
        assert_eq!(parts, vec!["a", "f(b, 'x,y')", "c"]);
    }

    #[test]
    fn split_single_argument() {
        assert_eq!(split_top_level_args("a || b"), vec!["a || b"]);
    }

    #[test]
    fn split_empty_is_empty() {
        assert!(split_top_level_args("  ").is_empty());
    }

    #[test]
    fn matching_paren_skips_quoted_parens() {
        let text = "f('(' , g(x)) + 1";
        assert_eq!(find_matching_paren(text, 1), Some(12));
    }

    #[test]
    fn find_keyword_ignores_quoted_and_nested() {
        let text = "a = 'not ON here' AND (x ON y) ON b.id = c.id";
        let idx = find_keyword(text, "ON").unwrap();
        assert_eq!(&text[idx..idx + 2], "ON");
        assert!(text[..idx].contains("(x ON y)"));
    }

    #[test]
    fn fold_booleans_preserves_quoted_content() {
        assert_eq!(
            fold_booleans("SELECT TRUE, 'TRUE is true', false"),
            "SELECT 1, 'TRUE is true', 0"
        );
    }

    #[test]
    fn fold_booleans_skips_identifier_substrings() {
        assert_eq!(fold_booleans("is_true AND truelove"), "is_true AND truelove");
    }
}
