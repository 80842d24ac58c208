//! Column label to position lookup.

use crate::config::MapperConfig;
use crate::expand::AliasScope;
use sqlgraph_core::ColumnInfo;
use std::collections::HashMap;

/// Label-to-index table for one result set.
///
/// Every column is indexed under its label and, when the driver reports the
/// owning table, under a synthesized `table_column` label (dots in the
/// table name become underscores). Indices are 0-based.
#[derive(Debug, Clone, Default)]
pub struct ColumnIndex {
    labels: HashMap<String, usize>,
}

/// `table_column`, used both when indexing and when looking up.
fn qualified_label(table: &str, column: &str, config: &MapperConfig) -> String {
    format!(
        "{}_{}",
        config.normalize(table).replace('.', "_"),
        config.normalize(column)
    )
}

impl ColumnIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Index `columns` unless this cache was already populated.
    ///
    /// All rows of one result set share a layout, so the first row decides.
    pub fn ensure_built(&mut self, columns: &ColumnInfo, config: &MapperConfig) {
        if !self.labels.is_empty() {
            return;
        }
        for (index, (label, table)) in columns.iter().enumerate() {
            self.labels.entry(config.normalize(label)).or_insert(index);
            if let Some(table) = table.filter(|t| !t.is_empty()) {
                self.labels
                    .entry(qualified_label(table, label, config))
                    .or_insert(index);
            }
        }
        tracing::trace!(
            columns = columns.len(),
            labels = self.labels.len(),
            "built column index"
        );
    }

    /// Position of `column` for the table aliased `alias`.
    ///
    /// Without an alias only the bare label is tried. With one, the lookup
    /// goes: generated macro alias, then `alias_column`, then the bare label.
    pub fn resolve(
        &self,
        alias: Option<&str>,
        column: &str,
        scope: &AliasScope,
        config: &MapperConfig,
    ) -> Option<usize> {
        let bare = config.normalize(column);
        let Some(alias) = alias else {
            return self.labels.get(&bare).copied();
        };
        let scoped = match scope.get(alias, column) {
            Some(generated) => config.normalize(generated),
            None => qualified_label(alias, column, config),
        };
        self.labels
            .get(&scoped)
            .or_else(|| self.labels.get(&bare))
            .copied()
    }
}
