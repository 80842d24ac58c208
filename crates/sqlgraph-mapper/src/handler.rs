//! Joined result set to entity graph mapping.

use crate::bean::BeanMapper;
use crate::column_index::ColumnIndex;
use crate::config::MapperConfig;
use crate::expand::{AliasScope, Expander, unqualified_table};
use crate::identity_map::{EntityKey, IdentityMap};
use crate::relation::RelationBinder;
use crate::resolver::StaticResolver;
use sqlgraph_core::{
    Cardinality, Entity, EntityMeta, EntityRef, MappingError, Result, Row, RowSource,
};

/// Maps rows of one (possibly joined) result set onto a graph of entities.
///
/// Each row is mapped by the caller's code: [`map_primary`] resolves the
/// top-level entity, and the `join*` methods resolve joined entities and
/// attach them to their owners. Entities are de-duplicated by key through a
/// per-session identity map, so a parent repeated over many joined rows is
/// created once and only gains relations afterwards.
///
/// A handler holds the caches of one query execution (column layout, alias
/// scope, identities) and must not be reused for another query.
///
/// ```ignore
/// let mut handler = JoiningRowHandler::<User>::new()
///     .entity::<User>()
///     .entity::<File>();
/// let sql = handler.expand("select {User.* as u}, {File.* as f} from users u left join files f on f.user_id = u.id")?;
/// handler.handle_rows(conn.query(&sql, &[])?, |h, row| {
///     let user = h.map_primary(row, Some("u"))?;
///     h.join_list::<User, File>(row, Some(&user), "files", Some("f"))?;
///     Ok(())
/// })?;
/// let users = handler.into_result();
/// ```
///
/// [`map_primary`]: JoiningRowHandler::map_primary
pub struct JoiningRowHandler<T: Entity> {
    config: MapperConfig,
    resolver: StaticResolver,
    expander: Expander,
    scope: AliasScope,
    columns: ColumnIndex,
    identities: IdentityMap,
    binder: RelationBinder,
    result: Vec<EntityRef<T>>,
    sql: Option<String>,
}

impl<T: Entity> Default for JoiningRowHandler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> JoiningRowHandler<T> {
    pub fn new() -> Self {
        Self::with_config(MapperConfig::default())
    }

    pub fn with_config(config: MapperConfig) -> Self {
        Self {
            resolver: StaticResolver::new(config.key_policy),
            config,
            expander: Expander::new(),
            scope: AliasScope::new(),
            columns: ColumnIndex::new(),
            identities: IdentityMap::new(),
            binder: RelationBinder::new(),
            result: Vec::new(),
            sql: None,
        }
    }

    /// Register `E` for `{E.*}` expansion.
    pub fn entity<E: Entity>(mut self) -> Self {
        self.expander.register(EntityMeta::of::<E>());
        self
    }

    /// Register several entities for expansion.
    pub fn entities(mut self, metas: impl IntoIterator<Item = EntityMeta>) -> Self {
        for meta in metas {
            self.expander.register(meta);
        }
        self
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Expand `{Type.* as alias}` macros in `sql` and remember the
    /// generated aliases for row mapping.
    pub fn expand(&mut self, sql: &str) -> Result<String> {
        self.expander.expand(sql, &mut self.scope)
    }

    /// Record the statement being mapped, quoted in key errors.
    pub fn set_sql(&mut self, sql: impl Into<String>) {
        self.sql = Some(sql.into());
    }

    fn default_alias<E: Entity>(&self, alias: Option<&str>) -> Result<String> {
        match alias {
            Some(alias) => Ok(alias.to_string()),
            None => unqualified_table(self.resolver.table_name::<E>()),
        }
    }

    fn prepare(&mut self, row: &Row) {
        self.columns.ensure_built(&row.column_info(), &self.config);
    }

    fn bean_mapper(&self) -> BeanMapper<'_> {
        BeanMapper::new(&self.columns, &self.scope, &self.config)
    }

    /// Read the key of `E` under `alias`.
    ///
    /// For a required key (primary entity) an absent column or NULL value
    /// is an error; otherwise it means the row holds no `E` and `None` is
    /// returned.
    fn read_key<E: Entity>(
        &mut self,
        row: &Row,
        alias: &str,
        required: bool,
    ) -> Result<Option<EntityKey>> {
        let keys = self.resolver.keys::<E>()?;
        let mapper = self.bean_mapper();
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            match mapper.value(row, Some(alias), key) {
                Some(value) if !value.is_null() => values.push(value.clone()),
                found => {
                    if !required {
                        return Ok(None);
                    }
                    let what = if found.is_some() { "a NULL value" } else { "no column" };
                    return Err(MappingError::no_column(
                        E::ENTITY_NAME,
                        key.name,
                        key.column_name,
                        format!(
                            "{} was found for key {}.{} using alias '{}', make sure to include all key columns in the query{}",
                            what,
                            E::ENTITY_NAME,
                            key.name,
                            alias,
                            self.sql
                                .as_deref()
                                .map(|sql| format!(": {sql}"))
                                .unwrap_or_default()
                        ),
                    )
                    .into());
                }
            }
        }
        Ok(Some(EntityKey::new(values)))
    }

    /// Look up `E` by `key`, mapping and registering a new instance on a miss.
    ///
    /// Returns the instance and whether it was created by this call.
    fn resolve<E: Entity>(
        &mut self,
        row: &Row,
        alias: &str,
        key: EntityKey,
    ) -> Result<(EntityRef<E>, bool)> {
        if let Some(existing) = self.identities.get::<E>(&key) {
            tracing::trace!(entity = E::ENTITY_NAME, key = ?key.values(), "identity hit");
            return Ok((existing, false));
        }
        let mut instance = E::default();
        self.bean_mapper().map(row, Some(alias), &mut instance)?;
        let instance = self.identities.insert(key, EntityRef::new(instance));
        Ok((instance, true))
    }

    /// Map the primary entity of `row`.
    ///
    /// `alias` defaults to the (schema-less) table name. The first row that
    /// carries a given key creates the instance and appends it to the
    /// result; later rows with the same key return that instance unchanged.
    pub fn map_primary(&mut self, row: &Row, alias: Option<&str>) -> Result<EntityRef<T>> {
        self.prepare(row);
        let alias = self.default_alias::<T>(alias)?;
        let Some(key) = self.read_key::<T>(row, &alias, true)? else {
            // required keys never yield None
            return Err(MappingError::no_column(T::ENTITY_NAME, "", "", "key not found").into());
        };
        let (instance, created) = self.resolve::<T>(row, &alias, key)?;
        if created {
            self.result.push(instance.clone());
        }
        Ok(instance)
    }

    /// Resolve a joined `W` from `row` without attaching it anywhere.
    ///
    /// Returns `None`, with no side effects, when any key column of `W` is
    /// NULL or absent (outer join without a match).
    pub fn join_instance<W: Entity>(
        &mut self,
        row: &Row,
        alias: Option<&str>,
    ) -> Result<Option<EntityRef<W>>> {
        self.prepare(row);
        let alias = self.default_alias::<W>(alias)?;
        match self.read_key::<W>(row, &alias, false)? {
            Some(key) => self.resolve::<W>(row, &alias, key).map(|(w, _)| Some(w)),
            None => Ok(None),
        }
    }

    fn join_with<O: Entity, W: Entity>(
        &mut self,
        row: &Row,
        owner: Option<&EntityRef<O>>,
        property: &str,
        alias: Option<&str>,
        expected: Option<Cardinality>,
    ) -> Result<Option<EntityRef<W>>> {
        let Some(owner) = owner else {
            return Ok(None);
        };
        // unknown relation properties fail even on rows without a match
        self.binder.relation::<O>(property)?;
        let Some(target) = self.join_instance::<W>(row, alias)? else {
            return Ok(None);
        };
        self.binder.attach(owner, property, &target, expected)?;
        Ok(Some(target))
    }

    /// Resolve a joined `W` and attach it to `owner.property`, with the
    /// cardinality the field declares.
    ///
    /// A `None` owner (an earlier join without a match) yields `None`.
    pub fn join<O: Entity, W: Entity>(
        &mut self,
        row: &Row,
        owner: Option<&EntityRef<O>>,
        property: &str,
        alias: Option<&str>,
    ) -> Result<Option<EntityRef<W>>> {
        self.join_with(row, owner, property, alias, None)
    }

    /// Like [`join`](Self::join), requiring `property` to be a list.
    pub fn join_list<O: Entity, W: Entity>(
        &mut self,
        row: &Row,
        owner: Option<&EntityRef<O>>,
        property: &str,
        alias: Option<&str>,
    ) -> Result<Option<EntityRef<W>>> {
        self.join_with(row, owner, property, alias, Some(Cardinality::List))
    }

    /// Like [`join`](Self::join), requiring `property` to be a set.
    pub fn join_set<O: Entity, W: Entity>(
        &mut self,
        row: &Row,
        owner: Option<&EntityRef<O>>,
        property: &str,
        alias: Option<&str>,
    ) -> Result<Option<EntityRef<W>>> {
        self.join_with(row, owner, property, alias, Some(Cardinality::Set))
    }

    /// Like [`join`](Self::join), requiring `property` to be a single reference.
    pub fn join_single<O: Entity, W: Entity>(
        &mut self,
        row: &Row,
        owner: Option<&EntityRef<O>>,
        property: &str,
        alias: Option<&str>,
    ) -> Result<Option<EntityRef<W>>> {
        self.join_with(row, owner, property, alias, Some(Cardinality::Single))
    }

    /// Drive `per_row` over every row of `rows`. Returns the row count.
    #[tracing::instrument(level = "debug", skip(self, rows, per_row), fields(entity = T::ENTITY_NAME))]
    pub fn handle_rows<R, F>(&mut self, mut rows: R, mut per_row: F) -> Result<usize>
    where
        R: RowSource,
        F: FnMut(&mut Self, &Row) -> Result<()>,
    {
        if let Some(sql) = rows.sql() {
            self.sql = Some(sql.to_string());
        }
        let mut count = 0usize;
        while let Some(row) = rows.next_row()? {
            per_row(self, &row)?;
            count += 1;
        }
        tracing::debug!(
            rows = count,
            primary = self.result.len(),
            identities = self.identities.len(),
            "mapped result set"
        );
        Ok(count)
    }

    /// Primary entities in first-seen order.
    pub fn result(&self) -> &[EntityRef<T>] {
        &self.result
    }

    pub fn into_result(self) -> Vec<EntityRef<T>> {
        self.result
    }

    pub fn identity_map(&self) -> &IdentityMap {
        &self.identities
    }

    pub fn alias_scope(&self) -> &AliasScope {
        &self.scope
    }
}

impl<T: Entity> std::fmt::Debug for JoiningRowHandler<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JoiningRowHandler")
            .field("entity", &T::ENTITY_NAME)
            .field("config", &self.config)
            .field("aliases", &self.scope.len())
            .field("identities", &self.identities)
            .field("result", &self.result.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeyPolicy;
    use crate::row_handler::{JoiningSelect, RowHandler};
    use sqlgraph_core::{
        ColumnInfo, Error, FromValue, MappingErrorKind, PropertyRef, RelationRef, RelationSlot,
        SqlType, Value, VecRowSource,
    };
    use std::collections::HashSet;

    #[derive(Debug, Default)]
    struct File {
        id: i64,
        name: String,
    }

    impl Entity for File {
        const ENTITY_NAME: &'static str = "File";
        const TABLE_NAME: &'static str = "files";
        const KEYS: &'static [&'static str] = &["id"];

        fn properties() -> &'static [PropertyRef<Self>] {
            static PROPS: &[PropertyRef<File>] = &[
                PropertyRef::new("id", SqlType::BigInt, "i64").setter(|f: &mut File, v: &Value| {
                    f.id = i64::from_value(v)?;
                    Ok(())
                }),
                PropertyRef::new("name", SqlType::Text, "String").setter(
                    |f: &mut File, v: &Value| {
                        f.name = String::from_value(v)?;
                        Ok(())
                    },
                ),
            ];
            PROPS
        }
    }

    #[derive(Debug, Default)]
    struct User {
        id: i64,
        name: String,
        files: Option<Vec<EntityRef<File>>>,
        starred: HashSet<EntityRef<File>>,
        avatar: Option<EntityRef<File>>,
    }

    impl Entity for User {
        const ENTITY_NAME: &'static str = "User";
        const TABLE_NAME: &'static str = "app.users";
        const KEYS: &'static [&'static str] = &["id"];

        fn properties() -> &'static [PropertyRef<Self>] {
            static PROPS: &[PropertyRef<User>] = &[
                PropertyRef::new("id", SqlType::BigInt, "i64").setter(|u: &mut User, v: &Value| {
                    u.id = i64::from_value(v)?;
                    Ok(())
                }),
                PropertyRef::new("name", SqlType::Text, "String").setter(
                    |u: &mut User, v: &Value| {
                        u.name = String::from_value(v)?;
                        Ok(())
                    },
                ),
            ];
            PROPS
        }

        fn relations() -> &'static [RelationRef<Self>] {
            fn files(u: &mut User) -> &mut dyn RelationSlot {
                &mut u.files
            }
            fn starred(u: &mut User) -> &mut dyn RelationSlot {
                &mut u.starred
            }
            fn avatar(u: &mut User) -> &mut dyn RelationSlot {
                &mut u.avatar
            }
            static RELATIONS: &[RelationRef<User>] = &[
                RelationRef::new::<Option<Vec<EntityRef<File>>>>("files", files),
                RelationRef::new::<HashSet<EntityRef<File>>>("starred", starred),
                RelationRef::new::<Option<EntityRef<File>>>("avatar", avatar),
            ];
            RELATIONS
        }
    }

    #[derive(Debug, Default)]
    struct Keyless {
        id: i64,
    }

    impl Entity for Keyless {
        const ENTITY_NAME: &'static str = "Keyless";
        const TABLE_NAME: &'static str = "keyless";
        const KEYS: &'static [&'static str] = &[];

        fn properties() -> &'static [PropertyRef<Self>] {
            static PROPS: &[PropertyRef<Keyless>] = &[PropertyRef::new(
                "id",
                SqlType::BigInt,
                "i64",
            )
            .setter(|k: &mut Keyless, v: &Value| {
                k.id = i64::from_value(v)?;
                Ok(())
            })];
            PROPS
        }
    }

    const JOINED: &str =
        "select {User.* as u}, {File.* as f} from app.users u left join files f on f.user_id = u.id";

    fn handler() -> JoiningRowHandler<User> {
        JoiningRowHandler::new().entity::<User>().entity::<File>()
    }

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    fn joined_rows(rows: Vec<Vec<Value>>) -> VecRowSource {
        VecRowSource::from_labels(&["u_0", "u_1", "f_0", "f_1"], rows).with_sql(JOINED)
    }

    fn map_user_files(h: &mut JoiningRowHandler<User>, row: &Row) -> Result<()> {
        let user = h.map_primary(row, Some("u"))?;
        h.join_list::<User, File>(row, Some(&user), "files", Some("f"))?;
        Ok(())
    }

    fn file_names(user: &EntityRef<User>) -> Vec<String> {
        user.borrow()
            .files
            .as_ref()
            .map(|files| files.iter().map(|f| f.borrow().name.clone()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn repeated_parent_collects_children_in_order() {
        let mut h = handler();
        let sql = h.expand(JOINED).unwrap();
        assert!(sql.starts_with("select u.id as u_0,u.name as u_1, f.id as f_0,f.name as f_1"));

        let rows = joined_rows(vec![
            vec![Value::BigInt(1), text("a"), Value::BigInt(10), text("x")],
            vec![Value::BigInt(1), text("a"), Value::BigInt(11), text("y")],
        ]);
        assert_eq!(h.handle_rows(rows, map_user_files).unwrap(), 2);

        let users = h.into_result();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].borrow().name, "a");
        assert_eq!(file_names(&users[0]), vec!["x", "y"]);
    }

    #[test]
    fn identity_is_stable_across_rows_and_parents() {
        let mut h = handler();
        h.expand(JOINED).unwrap();
        let rows = joined_rows(vec![
            vec![Value::BigInt(1), text("a"), Value::BigInt(10), text("shared")],
            vec![Value::Int(2), text("b"), Value::Int(10), text("renamed")],
            vec![Value::BigInt(1), text("ignored"), Value::BigInt(10), text("shared")],
        ]);
        h.handle_rows(rows, map_user_files).unwrap();

        assert_eq!(h.identity_map().count::<User>(), 2);
        assert_eq!(h.identity_map().count::<File>(), 1);
        let users = h.result();
        let first = users[0].borrow().files.clone().unwrap();
        let second = users[1].borrow().files.clone().unwrap();
        assert_eq!(first.len(), 1);
        assert!(first[0].ptr_eq(&second[0]));
        // later rows never overwrite mapped values
        assert_eq!(users[0].borrow().name, "a");
        assert_eq!(first[0].borrow().name, "shared");
    }

    #[test]
    fn primary_result_keeps_first_seen_order() {
        let mut h = handler();
        h.expand(JOINED).unwrap();
        let rows = joined_rows(vec![
            vec![Value::BigInt(2), text("b"), Value::Null, Value::Null],
            vec![Value::BigInt(1), text("a"), Value::Null, Value::Null],
            vec![Value::BigInt(2), text("b"), Value::Null, Value::Null],
        ]);
        h.handle_rows(rows, map_user_files).unwrap();
        let ids: Vec<i64> = h.result().iter().map(|u| u.borrow().id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn null_join_key_leaves_owner_untouched() {
        let mut h = handler();
        h.expand(JOINED).unwrap();
        let rows = joined_rows(vec![vec![
            Value::BigInt(1),
            text("a"),
            Value::Null,
            Value::Null,
        ]]);
        h.handle_rows(rows, map_user_files).unwrap();

        let user = &h.result()[0];
        assert!(user.borrow().files.is_none());
        assert_eq!(h.identity_map().count::<File>(), 0);
    }

    #[test]
    fn absent_owner_skips_join() {
        let mut h = handler();
        let row = Row::new(vec!["id".into()], vec![Value::BigInt(3)]);
        let joined = h
            .join::<User, File>(&row, None, "files", Some("f"))
            .unwrap();
        assert!(joined.is_none());
        assert!(h.identity_map().is_empty());
    }

    #[test]
    fn missing_primary_key_column() {
        let mut h = handler();
        let rows = VecRowSource::from_labels(&["name"], vec![vec![text("a")]])
            .with_sql("select name from app.users");
        let err = h
            .handle_rows(rows, |h, row| h.map_primary(row, None).map(drop))
            .unwrap_err();
        assert!(err.is_mapping(MappingErrorKind::NoColumnFound));
        let message = err.to_string();
        assert!(message.contains("User.id"));
        assert!(message.contains("select name from app.users"));
        assert!(h.result().is_empty());
    }

    #[test]
    fn null_primary_key() {
        let mut h = handler();
        let row = Row::new(vec!["id".into(), "name".into()], vec![Value::Null, text("a")]);
        let err = h.map_primary(&row, None).unwrap_err();
        assert!(err.is_mapping(MappingErrorKind::NoColumnFound));
    }

    #[test]
    fn default_alias_is_unqualified_table() {
        let mut h = handler();
        let columns = ColumnInfo::with_tables(
            vec!["name".into(), "id".into(), "id".into()],
            vec![
                Some("users".into()),
                Some("files".into()),
                Some("users".into()),
            ],
        );
        let rows = VecRowSource::new(
            columns,
            vec![vec![text("a"), Value::BigInt(10), Value::BigInt(1)]],
        );
        h.handle_rows(rows, |h, row| {
            let user = h.map_primary(row, None)?;
            h.join::<User, File>(row, Some(&user), "files", None)?;
            Ok(())
        })
        .unwrap();

        let user = h.result()[0].borrow();
        assert_eq!(user.id, 1);
        assert_eq!(user.files.as_ref().unwrap()[0].borrow().id, 10);
    }

    #[test]
    fn set_and_single_relations() {
        let mut h = handler();
        h.expand("select {User.* as u}, {File.* as s}, {File.* as p} from app.users u")
            .unwrap();
        let labels = ["u_0", "u_1", "s_0", "s_1", "p_0", "p_1"];
        let rows = VecRowSource::from_labels(
            &labels,
            vec![
                vec![
                    Value::BigInt(1),
                    text("a"),
                    Value::BigInt(10),
                    text("x"),
                    Value::BigInt(20),
                    text("old"),
                ],
                vec![
                    Value::BigInt(1),
                    text("a"),
                    Value::BigInt(10),
                    text("x"),
                    Value::BigInt(21),
                    text("new"),
                ],
            ],
        );
        h.handle_rows(rows, |h, row| {
            let user = h.map_primary(row, Some("u"))?;
            h.join_set::<User, File>(row, Some(&user), "starred", Some("s"))?;
            h.join_single::<User, File>(row, Some(&user), "avatar", Some("p"))?;
            Ok(())
        })
        .unwrap();

        let user = h.result()[0].borrow();
        assert_eq!(user.starred.len(), 1);
        assert_eq!(user.avatar.as_ref().unwrap().borrow().name, "new");
    }

    #[test]
    fn relation_errors_fail_fast() {
        let mut h = handler();
        let row = Row::new(
            vec!["id".into(), "name".into()],
            vec![Value::BigInt(1), text("a")],
        );
        let user = h.map_primary(&row, None).unwrap();

        let err = h
            .join::<User, File>(&row, Some(&user), "missing", Some("f"))
            .unwrap_err();
        assert!(err.is_mapping(MappingErrorKind::Configuration));

        let err = h
            .join_list::<User, File>(&row, Some(&user), "starred", Some("f"))
            .unwrap_err();
        assert!(err.is_mapping(MappingErrorKind::Configuration));
    }

    #[test]
    fn unregistered_macro_type() {
        let mut h = JoiningRowHandler::<User>::new().entity::<User>();
        let err = h.expand(JOINED).unwrap_err();
        assert!(err.is_mapping(MappingErrorKind::UnregisteredEntity));
    }

    #[test]
    fn conversion_failure_reports_column() {
        let mut h = handler();
        let row = Row::new(
            vec!["id".into(), "name".into()],
            vec![Value::BigInt(1), Value::BigInt(5)],
        );
        let err = h.map_primary(&row, None).unwrap_err();
        match err {
            Error::Mapping(m) => {
                assert_eq!(m.kind, MappingErrorKind::Conversion);
                assert_eq!(m.position, Some(2));
                assert_eq!(m.property.as_deref(), Some("name"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn key_policy_applies_to_keyless_types() {
        let row = Row::new(vec!["id".into()], vec![Value::BigInt(4)]);

        let mut strict = JoiningRowHandler::<Keyless>::new();
        let err = strict.map_primary(&row, None).unwrap_err();
        assert!(err.is_mapping(MappingErrorKind::Configuration));

        let config = MapperConfig::new().key_policy(KeyPolicy::ImplicitId);
        let mut implicit = JoiningRowHandler::<Keyless>::with_config(config);
        let first = implicit.map_primary(&row, None).unwrap();
        let again = implicit.map_primary(&row, None).unwrap();
        assert!(first.ptr_eq(&again));
        assert_eq!(first.borrow().id, 4);
    }

    #[test]
    fn primary_only_row_handler() {
        let mut h = handler();
        let row = Row::new(
            vec!["id".into(), "name".into()],
            vec![Value::BigInt(1), text("a")],
        );
        assert_eq!(RowHandler::expand(&mut h, "select 1").unwrap(), "select 1");
        assert!(h.handle(&row, 1).unwrap());
        assert!(h.handle(&row, 2).unwrap());
        let users = h.finish().unwrap();
        assert_eq!(users.len(), 1);
    }

    #[test]
    fn joining_select_adapter() {
        let mut select = JoiningSelect::new(handler(), map_user_files);
        select.expand(JOINED).unwrap();
        let mut rows = joined_rows(vec![
            vec![Value::BigInt(1), text("a"), Value::BigInt(10), text("x")],
            vec![Value::BigInt(2), text("b"), Value::BigInt(11), text("y")],
        ]);
        let mut number = 0;
        while let Some(row) = sqlgraph_core::RowSource::next_row(&mut rows).unwrap() {
            number += 1;
            assert!(select.handle(&row, number).unwrap());
        }
        assert_eq!(select.handler().alias_scope().len(), 4);
        let users = select.finish().unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(file_names(&users[1]), vec!["y"]);
    }
}
