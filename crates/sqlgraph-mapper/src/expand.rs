//! `{Type.* as alias}` expansion.
//!
//! A SQL template may ask for "every mapped column of a registered entity"
//! with `{User.*}` or `{User.* as u}`. Expansion replaces each occurrence
//! with an explicit column list whose generated aliases (`u_0`, `u_1`, ...)
//! stay unambiguous across joined tables, and records which generated alias
//! carries which logical column so rows can be mapped back under `u`.

use regex::Regex;
use sqlgraph_core::{EntityMeta, MappingError, Result};
use std::collections::HashMap;
use std::sync::OnceLock;

const MACRO_PATTERN: &str = r"\{(\w+)\.\*(\s+as\s+(\w+))?\}";
const SCHEMA_PATTERN: &str = r"^(\w+\.)?(\w+)$";

fn compiled(cell: &'static OnceLock<Regex>, pattern: &str) -> Result<&'static Regex> {
    if let Some(regex) = cell.get() {
        return Ok(regex);
    }
    let regex = Regex::new(pattern).map_err(|e| {
        MappingError::configuration("expand", format!("invalid expansion pattern: {e}"))
    })?;
    Ok(cell.get_or_init(|| regex))
}

fn macro_pattern() -> Result<&'static Regex> {
    static CELL: OnceLock<Regex> = OnceLock::new();
    compiled(&CELL, MACRO_PATTERN)
}

fn schema_pattern() -> Result<&'static Regex> {
    static CELL: OnceLock<Regex> = OnceLock::new();
    compiled(&CELL, SCHEMA_PATTERN)
}

/// `app.users` -> `users`. Names that are not `schema.table` or `table`
/// are returned unchanged.
pub fn unqualified_table(table: &str) -> Result<String> {
    Ok(schema_pattern()?.replace(table, "$2").into_owned())
}

/// Generated column aliases, keyed by (table alias, logical column).
#[derive(Debug, Clone, Default)]
pub struct AliasScope {
    columns: HashMap<(String, String), String>,
}

impl AliasScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `column` of the table aliased `alias` is selected as `generated`.
    pub fn insert(&mut self, alias: &str, column: &str, generated: String) {
        self.columns
            .insert((alias.to_lowercase(), column.to_string()), generated);
    }

    /// Generated alias for `column` under `alias`, if one was recorded.
    pub fn get(&self, alias: &str, column: &str) -> Option<&str> {
        self.columns
            .get(&(alias.to_lowercase(), column.to_string()))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Entity registry plus the expansion routine.
#[derive(Debug, Clone, Default)]
pub struct Expander {
    types: HashMap<&'static str, EntityMeta>,
}

impl Expander {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make an entity available to `{Name.*}` macros under its short name.
    pub fn register(&mut self, meta: EntityMeta) {
        self.types.insert(meta.name, meta);
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Expand every macro occurrence in `sql`, recording generated aliases
    /// in `scope`. Text without macros is returned unchanged.
    pub fn expand(&self, sql: &str, scope: &mut AliasScope) -> Result<String> {
        let pattern = macro_pattern()?;
        let mut expanded = String::with_capacity(sql.len());
        let mut last = 0;
        let mut occurrences = 0usize;

        for caps in pattern.captures_iter(sql) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let type_name = &caps[1];
            let explicit_alias = caps.get(3).map(|m| m.as_str());

            expanded.push_str(&sql[last..whole.start()]);
            expanded.push_str(&self.expand_one(type_name, explicit_alias, scope)?);
            last = whole.end();
            occurrences += 1;
        }

        if occurrences == 0 {
            return Ok(sql.to_string());
        }
        expanded.push_str(&sql[last..]);

        tracing::debug!(occurrences, sql = %expanded, "expanded entity macros");
        Ok(expanded)
    }

    fn expand_one(
        &self,
        type_name: &str,
        explicit_alias: Option<&str>,
        scope: &mut AliasScope,
    ) -> Result<String> {
        let meta = self
            .types
            .get(type_name)
            .ok_or_else(|| MappingError::unregistered(type_name))?;

        let table = unqualified_table(meta.table)?;
        let alias = explicit_alias.map_or_else(|| table.replace('.', "_"), str::to_string);
        let prefix = explicit_alias.unwrap_or(table.as_str());

        let columns = meta.columns();
        let mut selected = Vec::with_capacity(columns.len());
        for (ordinal, column) in columns.iter().enumerate() {
            let generated = format!("{}_{}", alias, ordinal);
            selected.push(format!("{}.{} as {}", prefix, column, generated));
            scope.insert(&alias, column, generated);
        }

        tracing::trace!(
            entity = type_name,
            alias = %alias,
            columns = selected.len(),
            "expanded macro occurrence"
        );
        Ok(selected.join(","))
    }
}
