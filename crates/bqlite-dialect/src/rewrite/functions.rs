//! Function-call rewriting.
//!
//! A single bottom-up scan replaces every recognized BigQuery function
//! call with its SQLite equivalent. The scanner walks the text outside
//! quoted literals looking for `name(`, locates the balanced closing
//! paren, rewrites the inner text first, then dispatches on the
//! uppercased name. Unrecognized names pass through opaquely, so a
//! normalization miss surfaces later as a SQLite diagnostic rather than
//! an error here.
//!
//! Dispatching on the exact name also gives the prefix guard for free:
//! `IF(` rewrites while `IFNULL(` and `IIF(` do not.

use std::sync::LazyLock;

use regex::Regex;

use super::scan::{find_matching_paren, is_ident_char, is_ident_start, split_top_level_args};

static EXTRACT_ARGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)^(\w+)\s+FROM\s+(.+)$").unwrap());

static INTERVAL_ARG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^INTERVAL\s+(\d+)\s+(\w+)$").unwrap());

static CAST_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bAS\s+(\w+)\s*$").unwrap());

/// Rewrites every recognized function call in `input`, bottom-up.
pub(crate) fn rewrite_calls(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut i = 0;
    while i < chars.len() {
        let (_, c) = chars[i];
        match c {
            '\'' | '"' => {
                out.push(c);
                i += 1;
                while i < chars.len() {
                    out.push(chars[i].1);
                    if chars[i].1 == c {
                        i += 1;
                        break;
                    }
                    i += 1;
                }
            }
            _ if is_ident_start(c) => {
                let word_start = i;
                while i < chars.len() && is_ident_char(chars[i].1) {
                    i += 1;
                }
                let name: String = chars[word_start..i].iter().map(|&(_, w)| w).collect();
                // Allow whitespace between the name and its paren.
                let mut k = i;
                while k < chars.len() && chars[k].1.is_whitespace() {
                    k += 1;
                }
                if k < chars.len() && chars[k].1 == '(' {
                    let open = chars[k].0;
                    if let Some(close) = find_matching_paren(input, open) {
                        let inner = rewrite_calls(&input[open + 1..close]);
                        match dispatch(&name.to_uppercase(), &inner) {
                            Some(rendered) => out.push_str(&rendered),
                            None => {
                                // Keep the original spacing between the
                                // word and its paren; this path also
                                // covers keywords like `WHEN (x)`.
                                out.push_str(&name);
                                out.push_str(&input[chars[i].0..open]);
                                out.push('(');
                                out.push_str(&inner);
                                out.push(')');
                            }
                        }
                        // Resume after the closing paren.
                        i = chars.len();
                        let mut j = k;
                        while j < chars.len() {
                            if chars[j].0 > close {
                                i = j;
                                break;
                            }
                            j += 1;
                        }
                        continue;
                    }
                }
                out.push_str(&name);
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

/// Renders one recognized call, or `None` to pass it through unchanged.
fn dispatch(name: &str, inner: &str) -> Option<String> {
    let args = || split_top_level_args(inner);
    match name {
        "CONCAT" => {
            let args = args();
            if args.is_empty() {
                return None;
            }
            Some(format!("({})", args.join(" || ")))
        }
        // LIKE treats `%` and `_` in the operand as wildcards, so
        // prefixes containing them match more than a literal
        // comparison would.
        "STARTS_WITH" => {
            let args = args();
            (args.len() == 2).then(|| format!("({} LIKE {} || '%')", args[0], args[1]))
        }
        "ENDS_WITH" => {
            let args = args();
            (args.len() == 2).then(|| format!("({} LIKE '%' || {})", args[0], args[1]))
        }
        "CONTAINS_SUBSTR" => {
            let args = args();
            (args.len() == 2)
                .then(|| format!("(instr(LOWER({}), LOWER({})) > 0)", args[0], args[1]))
        }
        "STRING_AGG" | "ARRAY_AGG" => {
            // Lossy for ARRAY_AGG: a delimited string, not a structured
            // array. SQLite has no array values to collect into.
            Some(format!("group_concat({inner})"))
        }
        "FORMAT_DATE" | "FORMAT_TIMESTAMP" => {
            // Same argument order: (format, expr).
            Some(format!("strftime({inner})"))
        }
        "CAST" | "SAFE_CAST" => {
            // SAFE_CAST weakens to a plain CAST: SQLite has no
            // non-throwing cast, though its CAST rarely errors anyway.
            let mapped = CAST_TYPE.replace(inner, |caps: &regex::Captures<'_>| {
                format!("AS {}", cast_type(&caps[1]))
            });
            Some(format!("CAST({mapped})"))
        }
        "SAFE_DIVIDE" => {
            let args = args();
            (args.len() == 2).then(|| {
                format!(
                    "(CASE WHEN ({b}) = 0 THEN NULL ELSE ({a}) / ({b}) END)",
                    a = args[0],
                    b = args[1]
                )
            })
        }
        "DIV" => {
            let args = args();
            (args.len() == 2).then(|| format!("(({}) / ({}))", args[0], args[1]))
        }
        "MOD" => {
            let args = args();
            (args.len() == 2).then(|| format!("(({}) % ({}))", args[0], args[1]))
        }
        "IF" => {
            let args = args();
            (args.len() == 3)
                .then(|| format!("CASE WHEN {} THEN {} ELSE {} END", args[0], args[1], args[2]))
        }
        "COUNTIF" => Some(format!("SUM(CASE WHEN {inner} THEN 1 ELSE 0 END)")),
        "APPROX_COUNT_DISTINCT" => {
            // Exact distinct count; precision trades the other way here.
            Some(format!("COUNT(DISTINCT {inner})"))
        }
        "CURRENT_TIMESTAMP" | "CURRENT_DATETIME" if inner.trim().is_empty() => {
            Some("datetime('now')".to_string())
        }
        "CURRENT_DATE" if inner.trim().is_empty() => Some("date('now')".to_string()),
        "CURRENT_TIME" if inner.trim().is_empty() => Some("time('now')".to_string()),
        "DATE" | "DATETIME" | "TIMESTAMP" | "TIME" => literal_payload(inner),
        "EXTRACT" => {
            let caps = EXTRACT_ARGS.captures(inner.trim())?;
            let fmt = extract_format(&caps[1])?;
            Some(format!(
                "CAST(strftime('{fmt}', {}) AS INTEGER)",
                caps[2].trim()
            ))
        }
        "DATE_TRUNC" | "DATETIME_TRUNC" | "TIMESTAMP_TRUNC" => {
            let args = args();
            if args.len() != 2 {
                return None;
            }
            let part = args[1].trim_matches('\'').to_uppercase();
            match part.as_str() {
                "YEAR" => Some(format!("date({}, 'start of year')", args[0])),
                "MONTH" => Some(format!("date({}, 'start of month')", args[0])),
                // Truncating to a day changes nothing at date precision.
                "DAY" => Some(args[0].clone()),
                _ => None,
            }
        }
        "DATE_DIFF" | "DATETIME_DIFF" | "TIMESTAMP_DIFF" => {
            let args = args();
            if args.len() != 3 {
                return None;
            }
            let diff = format!("julianday({}) - julianday({})", args[0], args[1]);
            let part = args[2].trim_matches('\'').to_uppercase();
            match part.as_str() {
                "DAY" => Some(format!("CAST({diff} AS INTEGER)")),
                // Approximate: continuous day numbers divided by a mean
                // period length.
                "MONTH" => Some(format!("CAST(({diff}) / 30 AS INTEGER)")),
                "YEAR" => Some(format!("CAST(({diff}) / 365 AS INTEGER)")),
                _ => None,
            }
        }
        "DATE_ADD" | "DATE_SUB" | "DATETIME_ADD" | "DATETIME_SUB" | "TIMESTAMP_ADD"
        | "TIMESTAMP_SUB" => {
            let args = args();
            if args.len() != 2 {
                return None;
            }
            let caps = INTERVAL_ARG.captures(args[1].trim())?;
            let sign = if name.ends_with("_SUB") { '-' } else { '+' };
            let unit = caps[2].to_lowercase();
            let unit = unit.trim_end_matches('s');
            let func = if name.starts_with("DATE_") { "date" } else { "datetime" };
            Some(format!(
                "{func}({expr}, '{sign}{n} {unit}s')",
                expr = args[0],
                n = &caps[1]
            ))
        }
        _ => None,
    }
}

/// Collapses a single-argument literal constructor to its payload.
///
/// Only fires when the payload looks like a date/time literal (starts
/// with a digit), so the `date('now')`/`datetime('now')` calls this
/// pipeline itself emits survive a second normalization pass.
fn literal_payload(inner: &str) -> Option<String> {
    let trimmed = inner.trim();
    let payload = trimmed.strip_prefix('\'')?.strip_suffix('\'')?;
    if payload.contains('\'') || !payload.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    Some(trimmed.to_string())
}

/// Maps an EXTRACT date part to its strftime format code.
fn extract_format(part: &str) -> Option<&'static str> {
    match part.to_uppercase().as_str() {
        "YEAR" => Some("%Y"),
        "MONTH" => Some("%m"),
        "DAY" => Some("%d"),
        "HOUR" => Some("%H"),
        "MINUTE" => Some("%M"),
        "SECOND" => Some("%S"),
        "DAYOFWEEK" => Some("%w"),
        "DAYOFYEAR" => Some("%j"),
        _ => None,
    }
}

/// Maps a BigQuery type name inside CAST to a SQLite type name.
fn cast_type(declared: &str) -> &'static str {
    match declared.to_uppercase().as_str() {
        "INT64" | "INTEGER" | "INT" => "INTEGER",
        "FLOAT64" | "FLOAT" | "NUMERIC" | "BIGNUMERIC" | "REAL" => "REAL",
        "BOOL" | "BOOLEAN" => "INTEGER",
        "STRING" | "TEXT" => "TEXT",
        "BYTES" | "BLOB" => "BLOB",
        _ => "TEXT",
    }
}
