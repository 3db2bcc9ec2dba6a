//! MERGE transpilation.
//!
//! SQLite has no MERGE statement. A supported MERGE rewrites into an
//! ordered two-statement program: an `UPDATE ... FROM` for the MATCHED
//! branch, then an `INSERT ... SELECT ... WHERE NOT EXISTS` for the NOT
//! MATCHED branch. Running the update first means matched source rows
//! never satisfy the NOT EXISTS probe, which reproduces BigQuery's
//! row-count semantics when the ON condition is a simple key-equality
//! match. That is the only shape this rewrite is equivalent for; atomicity
//! across the pair comes from the executor wrapping both statements in
//! one transaction.
//!
//! `WHEN NOT MATCHED BY SOURCE` and `WHEN MATCHED THEN DELETE` are
//! unsupported; any MERGE this parser cannot shape returns `None` and
//! passes through to SQLite unchanged.

use super::normalize_statement;
use super::scan::{find_keyword, find_matching_paren, is_ident_char, split_top_level_args};
use crate::ident::TableRef;

/// Transpiles one MERGE statement into `[update, insert]` (either branch
/// may be absent). Returns `None` when the statement does not parse.
pub(crate) fn transpile(sql: &str, default_project: &str) -> Option<Vec<String>> {
    let text = sql.trim().trim_end_matches(';').trim_end();

    let rest = strip_word(text, "MERGE")?;
    let rest = strip_word(rest, "INTO").unwrap_or(rest);

    let (target_token, rest) = take_token(rest)?;
    let target = TableRef::parse(target_token.trim_matches('`'), default_project)?;
    let (target_alias, rest) = take_alias(rest, "USING");

    let rest = strip_word(rest, "USING")?;
    let rest = rest.trim_start();
    let (source_sql, rest) = if rest.starts_with('(') {
        let close = find_matching_paren(rest, 0)?;
        let inner = normalize_statement(&rest[1..close], default_project);
        (format!("({inner})"), &rest[close + 1..])
    } else {
        let (token, rest) = take_token(rest)?;
        let token = token.trim_matches('`');
        let rendered = match TableRef::parse(token, default_project) {
            Some(source_ref) => source_ref.quoted_physical_name(),
            None => format!("\"{token}\""),
        };
        (rendered, rest)
    };
    let (source_alias, rest) = take_alias(rest, "ON");

    let rest = strip_word(rest, "ON")?;
    let when_idx = find_keyword(rest, "WHEN").unwrap_or(rest.len());
    let cond = rest[..when_idx].trim();
    if cond.is_empty() {
        return None;
    }

    let mut update_set: Option<String> = None;
    let mut insert_parts: Option<(String, String)> = None;
    let mut clauses = rest[when_idx..].trim();
    while !clauses.is_empty() {
        let end = find_keyword(&clauses[1..], "WHEN").map_or(clauses.len(), |i| i + 1);
        parse_when_clause(
            &clauses[..end],
            target_alias.as_deref(),
            &mut update_set,
            &mut insert_parts,
        )?;
        clauses = clauses[end..].trim();
    }

    let phys = target.quoted_physical_name();
    let target_as = alias_sql(target_alias.as_deref());
    let source_as = alias_sql(source_alias.as_deref());

    let mut program = Vec::new();
    if let Some(set) = update_set {
        program.push(format!(
            "UPDATE {phys}{target_as} SET {set} FROM {source_sql}{source_as} WHERE {cond}"
        ));
    }
    if let Some((columns, values)) = insert_parts {
        program.push(format!(
            "INSERT INTO {phys} ({columns}) SELECT {values} FROM {source_sql}{source_as} \
             WHERE NOT EXISTS (SELECT 1 FROM {phys}{target_as} WHERE {cond})"
        ));
    }
    if program.is_empty() {
        return None;
    }
    Some(
        program
            .iter()
            .map(|stmt| normalize_statement(stmt, default_project))
            .collect(),
    )
}

/// Parses one `WHEN ...` clause into the update or insert slot.
fn parse_when_clause(
    clause: &str,
    target_alias: Option<&str>,
    update_set: &mut Option<String>,
    insert_parts: &mut Option<(String, String)>,
) -> Option<()> {
    let rest = strip_word(clause, "WHEN")?;
    if let Some(rest) = strip_word(rest, "MATCHED") {
        let rest = strip_word(rest, "THEN")?;
        let rest = strip_word(rest, "UPDATE")?;
        let set_text = strip_word(rest, "SET")?;
        *update_set = Some(rewrite_set(set_text.trim(), target_alias));
        return Some(());
    }
    let rest = strip_word(rest, "NOT")?;
    let rest = strip_word(rest, "MATCHED")?;
    // WHEN NOT MATCHED BY SOURCE is unsupported.
    if strip_word(rest, "BY").is_some() {
        return None;
    }
    let rest = strip_word(rest, "THEN")?;
    let rest = strip_word(rest, "INSERT")?;
    let rest = rest.trim_start();
    if !rest.starts_with('(') {
        return None;
    }
    let close = find_matching_paren(rest, 0)?;
    let columns = rewrite_insert_columns(&rest[1..close], target_alias);
    let rest = strip_word(&rest[close + 1..], "VALUES")?;
    let rest = rest.trim_start();
    if !rest.starts_with('(') {
        return None;
    }
    let close = find_matching_paren(rest, 0)?;
    let values = rest[1..close].trim().to_string();
    *insert_parts = Some((columns, values));
    Some(())
}

/// Rewrites `SET` assignments: the left side drops any target-alias
/// qualification (SQLite requires unqualified columns there) and gains
/// quoting; the right side passes through.
fn rewrite_set(set_text: &str, target_alias: Option<&str>) -> String {
    split_top_level_args(set_text)
        .iter()
        .map(|assignment| match assignment.split_once('=') {
            Some((lhs, rhs)) => {
                let column = strip_alias(lhs.trim(), target_alias);
                format!("\"{column}\" = {}", rhs.trim())
            }
            None => assignment.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn rewrite_insert_columns(columns: &str, target_alias: Option<&str>) -> String {
    split_top_level_args(columns)
        .iter()
        .map(|column| format!("\"{}\"", strip_alias(column, target_alias)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn strip_alias<'a>(column: &'a str, alias: Option<&str>) -> &'a str {
    if let Some(alias) = alias {
        if column.len() > alias.len() + 1
            && column[..alias.len()].eq_ignore_ascii_case(alias)
            && column[alias.len()..].starts_with('.')
        {
            return &column[alias.len() + 1..];
        }
    }
    column
}

fn alias_sql(alias: Option<&str>) -> String {
    alias.map_or_else(String::new, |a| format!(" AS {a}"))
}

/// Strips a leading keyword (case-insensitive), returning the remainder.
fn strip_word<'a>(text: &'a str, word: &str) -> Option<&'a str> {
    let text = text.trim_start();
    let end = text
        .char_indices()
        .find(|&(_, c)| !is_ident_char(c))
        .map_or(text.len(), |(i, _)| i);
    text[..end].eq_ignore_ascii_case(word).then(|| &text[end..])
}

/// Takes the next whitespace-delimited token, honoring backtick quoting.
fn take_token(text: &str) -> Option<(&str, &str)> {
    let text = text.trim_start();
    if text.is_empty() {
        return None;
    }
    if let Some(stripped) = text.strip_prefix('`') {
        let close = stripped.find('`')? + 1;
        return Some((&text[..=close], &text[close + 1..]));
    }
    let end = text.find(char::is_whitespace).unwrap_or(text.len());
    Some((&text[..end], &text[end..]))
}

/// Takes an optional `[AS] alias`, stopping before the `stop` keyword.
fn take_alias<'a>(text: &'a str, stop: &str) -> (Option<String>, &'a str) {
    let after_as = strip_word(text, "AS");
    let base = after_as.unwrap_or(text);
    let trimmed = base.trim_start();
    let end = trimmed
        .char_indices()
        .find(|&(_, c)| !is_ident_char(c))
        .map_or(trimmed.len(), |(i, _)| i);
    if end > 0 && !trimmed[..end].eq_ignore_ascii_case(stop) {
        return (Some(trimmed[..end].to_string()), &trimmed[end..]);
    }
    (None, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MERGE: &str = "MERGE ds.target t USING ds.source s ON t.id = s.id \
                         WHEN MATCHED THEN UPDATE SET t.name = s.name \
                         WHEN NOT MATCHED THEN INSERT (id, name) VALUES (s.id, s.name)";

    #[test]
    fn merge_emits_update_then_insert() {
        let program = transpile(MERGE, "proj").unwrap();
        assert_eq!(program.len(), 2);
        assert_eq!(
            program[0],
            "UPDATE \"proj_ds_target\" AS t SET \"name\" = s.name \
             FROM \"proj_ds_source\" AS s WHERE t.id = s.id"
        );
        assert_eq!(
            program[1],
            "INSERT INTO \"proj_ds_target\" (\"id\", \"name\") SELECT s.id, s.name \
             FROM \"proj_ds_source\" AS s \
             WHERE NOT EXISTS (SELECT 1 FROM \"proj_ds_target\" AS t WHERE t.id = s.id)"
        );
    }

    #[test]
    fn merge_with_subquery_source() {
        let sql = "MERGE INTO `p.ds.t` AS t USING (SELECT id, v FROM ds.staging) AS s \
                   ON t.id = s.id WHEN MATCHED THEN UPDATE SET v = s.v";
        let program = transpile(sql, "p").unwrap();
        assert_eq!(program.len(), 1);
        assert_eq!(
            program[0],
            "UPDATE \"p_ds_t\" AS t SET \"v\" = s.v \
             FROM (SELECT id, v FROM \"p_ds_staging\") AS s WHERE t.id = s.id"
        );
    }

    #[test]
    fn merge_insert_only() {
        let sql = "MERGE ds.t t USING ds.src s ON t.k = s.k \
                   WHEN NOT MATCHED THEN INSERT (k) VALUES (s.k)";
        let program = transpile(sql, "p").unwrap();
        assert_eq!(program.len(), 1);
        assert!(program[0].starts_with("INSERT INTO \"p_ds_t\""));
    }

    #[test]
    fn merge_by_source_is_unsupported() {
        let sql = "MERGE ds.t t USING ds.s s ON t.id = s.id \
                   WHEN NOT MATCHED BY SOURCE THEN DELETE";
        assert!(transpile(sql, "p").is_none());
    }

    #[test]
    fn malformed_merge_is_none() {
        assert!(transpile("MERGE gibberish", "p").is_none());
    }
}
