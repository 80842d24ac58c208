//! In-memory connection for unit tests.

use sqlgraph_core::{Connection, Param, Result, Value, VecRowSource};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

/// Replays canned result sets and records every statement it is given.
#[derive(Debug, Default)]
pub(crate) struct MockConnection {
    results: RefCell<VecDeque<VecRowSource>>,
    affected: Cell<u64>,
    key: Cell<Option<i64>>,
    pub(crate) queries: RefCell<Vec<String>>,
    pub(crate) statements: RefCell<Vec<(String, Vec<Value>)>>,
}

impl MockConnection {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_result(self, rows: VecRowSource) -> Self {
        self.results.borrow_mut().push_back(rows);
        self
    }

    pub(crate) fn affecting(self, rows: u64) -> Self {
        self.affected.set(rows);
        self
    }

    pub(crate) fn generating(self, key: i64) -> Self {
        self.key.set(Some(key));
        self
    }
}

impl Connection for MockConnection {
    type Rows<'conn>
        = VecRowSource
    where
        Self: 'conn;

    fn query<'conn>(&'conn self, sql: &str, _params: &[Param]) -> Result<Self::Rows<'conn>> {
        self.queries.borrow_mut().push(sql.to_string());
        let rows = self
            .results
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| VecRowSource::from_labels(&[], Vec::new()));
        Ok(rows.with_sql(sql))
    }

    fn execute(&self, sql: &str, params: &[Param]) -> Result<u64> {
        let values = params
            .iter()
            .map(Param::bind_value)
            .collect::<Result<Vec<_>>>()?;
        self.statements.borrow_mut().push((sql.to_string(), values));
        Ok(self.affected.get())
    }

    fn generated_key(&self) -> Option<i64> {
        self.key.get()
    }
}

/// Account row used across the statement tests.
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub(crate) struct Account {
    pub(crate) id: Option<i64>,
    pub(crate) owner: String,
    pub(crate) balance: i64,
}

impl sqlgraph_core::Entity for Account {
    const ENTITY_NAME: &'static str = "Account";
    const TABLE_NAME: &'static str = "accounts";
    const KEYS: &'static [&'static str] = &["id"];

    fn properties() -> &'static [sqlgraph_core::PropertyRef<Self>] {
        use sqlgraph_core::{FromValue, PropertyRef, SqlType};
        static PROPS: &[PropertyRef<Account>] = &[
            PropertyRef::new("id", SqlType::BigInt, "Option<i64>")
                .getter(|a: &Account| Value::from(a.id))
                .setter(|a: &mut Account, v: &Value| {
                    a.id = Option::<i64>::from_value(v)?;
                    Ok(())
                }),
            PropertyRef::new("owner", SqlType::Text, "String")
                .column("owner_name")
                .getter(|a: &Account| Value::from(a.owner.clone()))
                .setter(|a: &mut Account, v: &Value| {
                    a.owner = String::from_value(v)?;
                    Ok(())
                }),
            PropertyRef::new("balance", SqlType::BigInt, "i64")
                .getter(|a: &Account| Value::from(a.balance))
                .setter(|a: &mut Account, v: &Value| {
                    a.balance = i64::from_value(v)?;
                    Ok(())
                }),
        ];
        PROPS
    }
}

/// Row type that declares no key; its `id` is only a key under
/// `KeyPolicy::ImplicitId`.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct Ledger {
    pub(crate) id: Option<i64>,
    pub(crate) note: String,
}

impl sqlgraph_core::Entity for Ledger {
    const ENTITY_NAME: &'static str = "Ledger";
    const TABLE_NAME: &'static str = "ledger";
    const KEYS: &'static [&'static str] = &[];

    fn properties() -> &'static [sqlgraph_core::PropertyRef<Self>] {
        use sqlgraph_core::{PropertyRef, SqlType};
        static PROPS: &[PropertyRef<Ledger>] = &[
            PropertyRef::new("id", SqlType::BigInt, "Option<i64>")
                .getter(|l: &Ledger| Value::from(l.id)),
            PropertyRef::new("note", SqlType::Text, "String")
                .getter(|l: &Ledger| Value::from(l.note.clone())),
        ];
        PROPS
    }
}
