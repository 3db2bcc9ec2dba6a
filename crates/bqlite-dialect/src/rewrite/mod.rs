//! The dialect normalization pipeline.
//!
//! [`normalize_program`] turns one submitted BigQuery statement into an
//! ordered sequence of SQLite statements. The sequence has length one for
//! everything except MERGE, which transpiles into an UPDATE followed by
//! an INSERT.
//!
//! Every pass is stateless, textually idempotent, and preserves quoted
//! literal content. The failure policy is pass-through: a clause no
//! rewrite recognizes reaches SQLite unchanged, and SQLite's own
//! diagnostic is the one surfaced to the caller, since it is the most
//! specific one available.

mod functions;
mod merge;
mod scan;

use std::sync::LazyLock;

use regex::Regex;

use crate::ident::TableRef;

use functions::rewrite_calls;
use scan::{fold_booleans, map_unquoted};

/// `DATE '2024-01-01'` and friends collapse to the bare literal.
static LITERAL_CONSTRUCTOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:DATE|DATETIME|TIMESTAMP|TIME)\s+'(\d[^']*)'").unwrap());

/// `JSON '{"a": 1}'` unwraps to the bare string: no native JSON type.
static JSON_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bJSON\s+'([^']*)'").unwrap());

/// Backtick-delimited reference anywhere in the statement.
static BACKTICK_REF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]+)`").unwrap());

/// Bare dotted reference in a table position (after FROM, JOIN, INTO, or
/// UPDATE). Two or three dotted parts, optionally with the legacy
/// `project:dataset` colon; identifiers may contain hyphens.
static BARE_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(FROM|JOIN|INTO|UPDATE)\s+([A-Za-z_][A-Za-z0-9_-]*(?::[A-Za-z_][A-Za-z0-9_-]*)?(?:\.[A-Za-z_][A-Za-z0-9_-]*){1,2})",
    )
    .unwrap()
});

/// Normalizes one submitted statement into an ordered SQLite program.
///
/// INFORMATION_SCHEMA statements return unchanged (the metadata resolver
/// answers them from the catalog instead). A statement beginning with
/// MERGE routes whole to the transpiler; a MERGE the transpiler cannot
/// shape also returns unchanged so SQLite produces the diagnostic.
#[must_use]
pub fn normalize_program(sql: &str, default_project: &str) -> Vec<String> {
    let trimmed = sql.trim();
    if trimmed.to_uppercase().contains("INFORMATION_SCHEMA") {
        return vec![sql.to_string()];
    }
    if first_word_is(trimmed, "MERGE") {
        return merge::transpile(trimmed, default_project)
            .unwrap_or_else(|| vec![sql.to_string()]);
    }
    vec![normalize_statement(trimmed, default_project)]
}

/// Runs the ordered scalar passes over a single non-MERGE statement.
pub(crate) fn normalize_statement(sql: &str, default_project: &str) -> String {
    // 1. Literal constructors and typed JSON literals. These patterns
    //    span the quote boundary by design (the literal is the payload).
    let out = LITERAL_CONSTRUCTOR.replace_all(sql, "'$1'");
    let out = JSON_LITERAL.replace_all(&out, "'$1'");

    // 2. Function calls, bottom-up with per-function dispatch.
    let out = rewrite_calls(&out);

    // 3. Bare TRUE/FALSE fold to 1/0; quoted occurrences untouched.
    let out = fold_booleans(&out);

    // 4. Table references resolve to flattened physical names.
    let out = map_unquoted(&out, |segment| {
        BACKTICK_REF
            .replace_all(segment, |caps: &regex::Captures<'_>| {
                resolve_ref(&caps[1], default_project)
            })
            .into_owned()
    });
    map_unquoted(&out, |segment| {
        BARE_REF
            .replace_all(segment, |caps: &regex::Captures<'_>| {
                format!("{} {}", &caps[1], resolve_ref(&caps[2], default_project))
            })
            .into_owned()
    })
}

/// Resolves one delimited or dotted reference to a quoted physical name.
/// A single-part name just gains quoting.
fn resolve_ref(text: &str, default_project: &str) -> String {
    match TableRef::parse(text, default_project) {
        Some(table_ref) => table_ref.quoted_physical_name(),
        None => format!("\"{text}\""),
    }
}

fn first_word_is(sql: &str, word: &str) -> bool {
    sql.split_whitespace()
        .next()
        .is_some_and(|w| w.eq_ignore_ascii_case(word))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(sql: &str) -> String {
        normalize_statement(sql, "proj")
    }

    #[test]
    fn literal_constructors_collapse() {
        assert_eq!(norm("SELECT DATE '2024-01-01'"), "SELECT '2024-01-01'");
        assert_eq!(
            norm("SELECT TIMESTAMP '2024-01-01 10:00:00'"),
            "SELECT '2024-01-01 10:00:00'"
        );
    }

    #[test]
    fn json_literal_unwraps() {
        assert_eq!(
            norm(r#"SELECT JSON '{"a": 1}'"#),
            r#"SELECT '{"a": 1}'"#
        );
    }

    #[test]
    fn backtick_refs_resolve() {
        assert_eq!(
            norm("SELECT * FROM `my-proj.ds.t`"),
            "SELECT * FROM \"my-proj_ds_t\""
        );
        assert_eq!(
            norm("SELECT * FROM `my-proj:ds.t`"),
            "SELECT * FROM \"my-proj_ds_t\""
        );
    }

    #[test]
    fn bare_two_part_ref_uses_default_project() {
        assert_eq!(
            norm("SELECT COUNT(*) AS c FROM ds.t"),
            "SELECT COUNT(*) AS c FROM \"proj_ds_t\""
        );
    }

    #[test]
    fn bare_three_part_ref_after_join() {
        assert_eq!(
            norm("SELECT * FROM a.b.c JOIN d.e.f ON x = y"),
            "SELECT * FROM \"a_b_c\" JOIN \"d_e_f\" ON x = y"
        );
    }

    #[test]
    fn single_part_from_target_is_untouched() {
        assert_eq!(norm("SELECT * FROM sqlite_master"), "SELECT * FROM sqlite_master");
    }

    #[test]
    fn ref_inside_string_literal_is_untouched() {
        assert_eq!(
            norm("SELECT 'from a.b.c' FROM ds.t"),
            "SELECT 'from a.b.c' FROM \"proj_ds_t\""
        );
    }

    #[test]
    fn information_schema_passes_through() {
        let sql = "SELECT table_name FROM ds.INFORMATION_SCHEMA.TABLES";
        assert_eq!(normalize_program(sql, "proj"), vec![sql.to_string()]);
    }

    #[test]
    fn booleans_fold_outside_quotes_only() {
        assert_eq!(
            norm("SELECT TRUE AS a, 'TRUE' AS b WHERE flag = FALSE"),
            "SELECT 1 AS a, 'TRUE' AS b WHERE flag = 0"
        );
    }

    #[test]
    fn normalize_is_idempotent() {
        let samples = [
            "SELECT IF(a > 1, 'big', 'small') FROM ds.t",
            "SELECT CONCAT(a, f(b, 'x,y'), c) FROM ds.t",
            "SELECT EXTRACT(YEAR FROM '2024-03-15')",
            "SELECT DATE_DIFF('2024-03-15', '2024-03-01', 'DAY')",
            "SELECT SAFE_DIVIDE(a, b), COUNTIF(x > 0) FROM ds.t",
            "SELECT CURRENT_TIMESTAMP(), DATE_ADD(d, INTERVAL 1 DAY) FROM ds.t",
            "SELECT STRING_AGG(name, ','), APPROX_COUNT_DISTINCT(id) FROM `p.ds.t`",
            "SELECT DATE_TRUNC('2024-03-15', 'DAY') AS d, DATE_TRUNC(d, 'MONTH') FROM ds.t",
            "UPDATE ds.t SET done = TRUE WHERE label = 'TRUE'",
        ];
        for sql in samples {
            let once = norm(sql);
            assert_eq!(norm(&once), once, "not idempotent for {sql}");
        }
    }
}
