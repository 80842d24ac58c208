//! Placeholder and identifier syntax.

/// Placeholder style of the target database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// Anonymous `?` placeholders
    #[default]
    Generic,
    /// Numbered `?1`, `?2` placeholders (SQLite)
    Sqlite,
    /// Numbered `$1`, `$2` placeholders (PostgreSQL)
    Postgres,
}

impl Dialect {
    /// Generate a placeholder for the given parameter index (1-based).
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Generic => "?".to_string(),
            Dialect::Sqlite => format!("?{index}"),
            Dialect::Postgres => format!("${index}"),
        }
    }

    /// Quote an identifier, doubling embedded quotes.
    pub fn quote_identifier(self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}
