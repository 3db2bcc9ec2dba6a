//! Logical-to-physical table naming.
//!
//! BigQuery addresses a table through three identifiers: project, dataset,
//! and table. SQLite has a single flat namespace, so the three parts join
//! into one physical name. The mapping is total and deterministic; the
//! reverse direction is a heuristic (see [`reverse_lookup`]).

use regex::Regex;

/// A three-part BigQuery table reference.
///
/// Identifiers may contain hyphens and underscores. The struct is derived
/// per call and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    /// Project id.
    pub project: String,
    /// Dataset id.
    pub dataset: String,
    /// Table name.
    pub table: String,
}

impl TableRef {
    /// Creates a table reference from its three parts.
    pub fn new(
        project: impl Into<String>,
        dataset: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            dataset: dataset.into(),
            table: table.into(),
        }
    }

    /// Parses `project:dataset.table`, `project.dataset.table`, or
    /// `dataset.table` (resolved against `default_project`).
    ///
    /// Returns `None` for anything that is not a two- or three-part
    /// reference, such as a bare table name.
    pub fn parse(text: &str, default_project: &str) -> Option<Self> {
        let text = text.trim();
        if let Some((project, rest)) = text.split_once(':') {
            let (dataset, table) = rest.split_once('.')?;
            return Some(Self::new(project, dataset, table));
        }
        let parts: Vec<&str> = text.split('.').collect();
        match parts.as_slice() {
            [project, dataset, table] => Some(Self::new(*project, *dataset, *table)),
            [dataset, table] => Some(Self::new(default_project, *dataset, *table)),
            _ => None,
        }
    }

    /// Returns the flattened physical table name,
    /// `{project}_{dataset}_{table}`.
    ///
    /// Two distinct references must not collide under this join; choosing
    /// identifiers that keep the join unambiguous is the caller's
    /// responsibility.
    #[must_use]
    pub fn physical_name(&self) -> String {
        format!("{}_{}_{}", self.project, self.dataset, self.table)
    }

    /// Returns the physical name double-quoted for case sensitivity.
    #[must_use]
    pub fn quoted_physical_name(&self) -> String {
        format!("\"{}\"", self.physical_name())
    }
}

/// Scans known physical names for tables belonging to `dataset`, returning
/// `(project, table)` pairs.
///
/// The scan matches `^(.+?)_{dataset}_(.+)$` with a left-non-greedy
/// project part. When identifiers themselves embed the `_` join delimiter
/// the split is inherently ambiguous; this is a documented limitation of
/// the flattened naming scheme, not something the heuristic resolves.
#[must_use]
pub fn reverse_lookup(dataset: &str, all_names: &[String]) -> Vec<(String, String)> {
    let pattern = format!("^(.+?)_{}_(.+)$", regex::escape(dataset));
    let Ok(re) = Regex::new(&pattern) else {
        return Vec::new();
    };
    all_names
        .iter()
        .filter_map(|name| {
            let caps = re.captures(name)?;
            Some((caps[1].to_string(), caps[2].to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn physical_name_joins_parts() {
        let table_ref = TableRef::new("proj", "ds", "t");
        assert_eq!(table_ref.physical_name(), "proj_ds_t");
        assert_eq!(table_ref.quoted_physical_name(), "\"proj_ds_t\"");
    }

    #[test]
    fn parse_three_part() {
        let table_ref = TableRef::parse("my-proj.ds.events", "other").unwrap();
        assert_eq!(table_ref, TableRef::new("my-proj", "ds", "events"));
    }

    #[test]
    fn parse_colon_form() {
        let table_ref = TableRef::parse("my-proj:ds.events", "other").unwrap();
        assert_eq!(table_ref, TableRef::new("my-proj", "ds", "events"));
    }

    #[test]
    fn parse_two_part_uses_default_project() {
        let table_ref = TableRef::parse("ds.events", "proj").unwrap();
        assert_eq!(table_ref, TableRef::new("proj", "ds", "events"));
    }

    #[test]
    fn parse_rejects_bare_name() {
        assert!(TableRef::parse("events", "proj").is_none());
    }

    #[test]
    fn reverse_lookup_finds_dataset_tables() {
        let names = vec![
            "proj_ds_a".to_string(),
            "proj_ds_b".to_string(),
            "proj_other_c".to_string(),
            "unrelated".to_string(),
        ];
        let found = reverse_lookup("ds", &names);
        assert_eq!(
            found,
            vec![
                ("proj".to_string(), "a".to_string()),
                ("proj".to_string(), "b".to_string()),
            ]
        );
    }

    #[test]
    fn reverse_lookup_is_left_non_greedy() {
        // An underscore inside the project id stays with the project
        // because the left capture is non-greedy.
        let names = vec!["my_proj_ds_t".to_string()];
        let found = reverse_lookup("ds", &names);
        assert_eq!(found, vec![("my_proj".to_string(), "t".to_string())]);
    }
}
