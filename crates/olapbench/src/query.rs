use std::collections::HashSet;

use olapbench_error::{BenchError, Result};

/// An SQL query with a label for the benchmark report.
///
/// The label is part of the published report naming and identifies the
/// query across runs. Don't alter a label once it's been published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LabelledQuery {
    pub label: &'static str,
    pub query: &'static str,
}

impl LabelledQuery {
    pub const fn new(label: &'static str, query: &'static str) -> Self {
        LabelledQuery { label, query }
    }
}

/// An ordered, fixed set of queries.
pub type QueryCatalog = &'static [LabelledQuery];

/// Check that every query in the catalog has a unique non-empty label, and
/// non-empty sql ending in a statement terminator.
pub fn validate_catalog(catalog: &[LabelledQuery]) -> Result<()> {
    let mut seen = HashSet::with_capacity(catalog.len());

    for query in catalog {
        if query.label.trim().is_empty() {
            return Err(BenchError::new("Query label cannot be empty").with_field("query", query.query));
        }

        if !seen.insert(query.label) {
            return Err(BenchError::new("Duplicate query label").with_field("label", query.label));
        }

        let sql = query.query.trim();
        if sql.is_empty() {
            return Err(BenchError::new("Query sql cannot be empty").with_field("label", query.label));
        }

        if !sql.ends_with(';') {
            return Err(
                BenchError::new("Query sql must end with a statement terminator")
                    .with_field("label", query.label),
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid() {
        let catalog = [
            LabelledQuery::new("Q0", "SELECT COUNT(*) FROM hits;"),
            LabelledQuery::new("NQ0", "SELECT 1;"),
        ];
        validate_catalog(&catalog).unwrap();
    }

    #[test]
    fn empty_catalog_is_valid() {
        validate_catalog(&[]).unwrap();
    }

    #[test]
    fn duplicate_label() {
        let catalog = [
            LabelledQuery::new("Q0", "SELECT 1;"),
            LabelledQuery::new("Q0", "SELECT 2;"),
        ];
        let err = validate_catalog(&catalog).unwrap_err();
        assert_eq!("Duplicate query label", err.get_msg());
    }

    #[test]
    fn empty_label() {
        let catalog = [LabelledQuery::new("", "SELECT 1;")];
        validate_catalog(&catalog).unwrap_err();
    }

    #[test]
    fn missing_terminator() {
        let catalog = [LabelledQuery::new("Q0", "SELECT 1")];
        let err = validate_catalog(&catalog).unwrap_err();
        assert_eq!(Some("Q0".to_string()), err.get_field("label"));
    }

    #[test]
    fn empty_sql() {
        let catalog = [LabelledQuery::new("Q0", "  ")];
        validate_catalog(&catalog).unwrap_err();
    }
}
