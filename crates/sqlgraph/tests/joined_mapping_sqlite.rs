use std::collections::HashSet;

use sqlgraph::prelude::*;
use sqlgraph::{Cardinality, RelationSlot};

#[derive(Debug, Default, sqlgraph::Entity)]
#[sqlgraph(table = "users")]
struct User {
    #[sqlgraph(key)]
    id: i64,
    name: String,
    files: Vec<EntityRef<File>>,
    tags: HashSet<EntityRef<Tag>>,
}

#[derive(Debug, Default, sqlgraph::Entity)]
#[sqlgraph(table = "files")]
struct File {
    #[sqlgraph(key)]
    id: i64,
    #[sqlgraph(column = "user_id")]
    owner_id: Option<i64>,
    folder_id: Option<i64>,
    name: String,
    folder: Option<EntityRef<Folder>>,
}

#[derive(Debug, Default, sqlgraph::Entity)]
#[sqlgraph(table = "folders")]
struct Folder {
    #[sqlgraph(key)]
    id: i64,
    path: String,
}

#[derive(Debug, Default, sqlgraph::Entity)]
#[sqlgraph(table = "tags")]
struct Tag {
    #[sqlgraph(key)]
    id: i64,
    label: String,
}

const USERS_WITH_FILES: &str = "select {User.* as u}, {File.* as f} from users u \
     left join files f on f.user_id = u.id order by u.id, f.id";

fn database(fixtures: &str) -> SqliteConnection {
    let conn = SqliteConnection::open_memory().expect("open sqlite memory db");
    conn.execute_raw(
        "create table users (id integer primary key, name text not null);
         create table folders (id integer primary key, path text not null);
         create table files (id integer primary key, user_id integer, folder_id integer, name text not null);
         create table tags (id integer primary key, label text not null);
         create table user_tags (user_id integer not null, tag_id integer not null);",
    )
    .expect("create schema");
    conn.execute_raw(fixtures).expect("load fixtures");
    conn
}

fn users_with_files(conn: &SqliteConnection, sql: &str) -> Vec<EntityRef<User>> {
    Select::new(conn, sql)
        .select_joined::<User, _>([EntityMeta::of::<File>()], |h, row| {
            let user = h.map_primary(row, Some("u"))?;
            h.join_list::<User, File>(row, Some(&user), "files", Some("f"))?;
            Ok(())
        })
        .expect("map users with files")
}

fn file_names(user: &EntityRef<User>) -> Vec<String> {
    user.borrow()
        .files
        .iter()
        .map(|f| f.borrow().name.clone())
        .collect()
}

#[test]
fn two_rows_map_to_one_user_with_two_files() {
    let conn = database(
        "insert into users values (1, 'a');
         insert into files (id, user_id, name) values (10, 1, 'x'), (11, 1, 'y');",
    );
    let users = users_with_files(&conn, USERS_WITH_FILES);

    assert_eq!(users.len(), 1);
    let user = users[0].borrow();
    assert_eq!(user.id, 1);
    assert_eq!(user.name, "a");
    assert_eq!(user.files.len(), 2);
    assert_eq!(user.files[0].borrow().id, 10);
    assert_eq!(user.files[0].borrow().owner_id, Some(1));
    drop(user);
    assert_eq!(file_names(&users[0]), ["x", "y"]);
}

#[test]
fn primary_entities_keep_first_seen_order() {
    let conn = database(
        "insert into users values (1, 'one'), (2, 'two');
         insert into files (id, user_id, name) values (10, 2, 'a'), (11, 1, 'b'), (12, 2, 'c');",
    );
    let users = users_with_files(
        &conn,
        "select {User.* as u}, {File.* as f} from users u join files f on f.user_id = u.id order by f.id",
    );

    let ids: Vec<i64> = users.iter().map(|u| u.borrow().id).collect();
    assert_eq!(ids, [2, 1]);
    assert_eq!(file_names(&users[0]), ["a", "c"]);
    assert_eq!(file_names(&users[1]), ["b"]);
}

#[test]
fn repeated_rows_do_not_duplicate_relations() {
    let conn = database(
        "insert into users values (1, 'a'), (2, 'b');
         insert into files (id, user_id, name) values (10, 1, 'x'), (11, 1, 'y');
         insert into tags values (100, 'red'), (101, 'blue');
         insert into user_tags values (1, 100), (1, 101), (2, 100);",
    );

    // user 1 has two files and two tags, so each file and tag shows up twice
    let mut handler = JoiningRowHandler::<User>::new()
        .entity::<User>()
        .entity::<File>()
        .entity::<Tag>();
    let sql = handler
        .expand(
            "select {User.* as u}, {File.* as f}, {Tag.* as t} from users u \
             left join files f on f.user_id = u.id \
             left join user_tags ut on ut.user_id = u.id \
             left join tags t on t.id = ut.tag_id \
             order by u.id, f.id, t.id",
        )
        .unwrap();
    let rows = handler
        .handle_rows(conn.query(&sql, &[]).unwrap(), |h, row| {
            let user = h.map_primary(row, Some("u"))?;
            h.join_list::<User, File>(row, Some(&user), "files", Some("f"))?;
            h.join_set::<User, Tag>(row, Some(&user), "tags", Some("t"))?;
            Ok(())
        })
        .unwrap();
    assert_eq!(rows, 5);
    assert_eq!(handler.identity_map().count::<Tag>(), 2);

    let users = handler.into_result();
    assert_eq!(users.len(), 2);
    assert_eq!(file_names(&users[0]), ["x", "y"]);
    assert_eq!(users[0].borrow().tags.len(), 2);
    assert!(users[1].borrow().files.is_empty());

    // the tag shared by both users is one instance
    let first = users[0].borrow();
    let second = users[1].borrow();
    let shared = second.tags.iter().next().unwrap();
    assert_eq!(shared.borrow().label, "red");
    assert!(first.tags.iter().any(|t| t.ptr_eq(shared)));
}

#[test]
fn unmatched_outer_join_attaches_nothing() {
    let conn = database("insert into users values (1, 'lonely');");

    let mut handler = JoiningRowHandler::<User>::new()
        .entity::<User>()
        .entity::<File>();
    let sql = handler.expand(USERS_WITH_FILES).unwrap();
    let mut joined = Vec::new();
    handler
        .handle_rows(conn.query(&sql, &[]).unwrap(), |h, row| {
            let user = h.map_primary(row, Some("u"))?;
            joined.push(h.join_list::<User, File>(row, Some(&user), "files", Some("f"))?);
            Ok(())
        })
        .unwrap();

    assert_eq!(joined.len(), 1);
    assert!(joined[0].is_none());
    assert_eq!(handler.identity_map().count::<File>(), 0);
    assert_eq!(handler.identity_map().count::<User>(), 1);
    let users = handler.into_result();
    assert!(users[0].borrow().files.is_empty());
}

#[test]
fn single_relation_holds_the_shared_instance() {
    let conn = database(
        "insert into folders values (1, '/docs');
         insert into files (id, folder_id, name) values (10, 1, 'a'), (11, 1, 'b'), (12, null, 'c');",
    );
    let files = Select::new(
        &conn,
        "select {File.* as f}, {Folder.* as d} from files f \
         left join folders d on d.id = f.folder_id order by f.id",
    )
    .select_joined::<File, _>([EntityMeta::of::<Folder>()], |h, row| {
        let file = h.map_primary(row, Some("f"))?;
        h.join_single::<File, Folder>(row, Some(&file), "folder", Some("d"))?;
        Ok(())
    })
    .unwrap();

    assert_eq!(files.len(), 3);
    let first = files[0].borrow().folder.clone().unwrap();
    let second = files[1].borrow().folder.clone().unwrap();
    assert!(first.ptr_eq(&second));
    assert_eq!(first.borrow().path, "/docs");
    assert!(files[2].borrow().folder.is_none());
    assert_eq!(files[2].borrow().folder_id, None);
}

#[test]
fn relation_shapes_come_from_field_types() {
    let user_relations: Vec<(&str, Cardinality)> = <User as sqlgraph::Entity>::relations()
        .iter()
        .map(|r| (r.name, r.cardinality))
        .collect();
    assert_eq!(
        user_relations,
        [("files", Cardinality::List), ("tags", Cardinality::Set)]
    );
    let folder = &<File as sqlgraph::Entity>::relations()[0];
    assert_eq!(folder.cardinality, Cardinality::Single);

    let mut file = File::default();
    assert!(folder.slot(&mut file).is_empty());
}

#[test]
fn relation_misuse_is_a_configuration_error() {
    let conn = database(
        "insert into folders values (1, '/docs');
         insert into files (id, folder_id, name) values (10, 1, 'a');",
    );
    let sql = "select {File.* as f}, {Folder.* as d} from files f left join folders d on d.id = f.folder_id";

    let err = Select::new(&conn, sql)
        .select_joined::<File, _>([EntityMeta::of::<Folder>()], |h, row| {
            let file = h.map_primary(row, Some("f"))?;
            h.join_list::<File, Folder>(row, Some(&file), "folder", Some("d"))?;
            Ok(())
        })
        .unwrap_err();
    assert!(err.is_mapping(MappingErrorKind::Configuration));

    let err = Select::new(&conn, sql)
        .select_joined::<File, _>([EntityMeta::of::<Folder>()], |h, row| {
            let file = h.map_primary(row, Some("f"))?;
            h.join::<File, Folder>(row, Some(&file), "parent", Some("d"))?;
            Ok(())
        })
        .unwrap_err();
    assert!(err.is_mapping(MappingErrorKind::Configuration));
}

#[test]
fn missing_primary_key_column_is_reported() {
    let conn = database("insert into users values (1, 'a');");

    let err = Select::new(&conn, "select name from users")
        .select_beans::<User>()
        .unwrap_err();
    assert!(err.is_mapping(MappingErrorKind::NoColumnFound));
    assert!(err.to_string().contains("select name from users"));

    let err = Select::new(&conn, "select null as id, name from users")
        .select_beans::<User>()
        .unwrap_err();
    assert!(err.is_mapping(MappingErrorKind::NoColumnFound));
}

#[test]
fn plain_columns_map_under_the_table_name() {
    let conn = database(
        "insert into users values (1, 'a'), (2, 'b');
         insert into files (id, user_id, name) values (10, 2, 'x'), (11, 1, 'y'), (12, 2, 'z');",
    );
    // unaliased columns resolve through the table each one was read from
    let users = Select::new(
        &conn,
        "select u.id, u.name, f.id from users u join files f on f.user_id = u.id order by f.id",
    )
    .select_beans::<User>()
    .unwrap();

    let names: Vec<String> = users.iter().map(|u| u.borrow().name.clone()).collect();
    assert_eq!(names, ["b", "a"]);
    assert_eq!(users[0].borrow().id, 2);
}

#[test]
fn conversion_failures_name_the_column() {
    let conn = database("");
    let err = Select::new(&conn, "select 1 as id, 'nobody' as user_id, 'x' as name")
        .select_beans::<File>()
        .unwrap_err();
    match err {
        Error::Mapping(e) => {
            assert_eq!(e.kind, MappingErrorKind::Conversion);
            assert_eq!(e.property.as_deref(), Some("owner_id"));
            assert_eq!(e.position, Some(2));
            assert_eq!(e.requested, Some("Option<i64>"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn expansion_is_idempotent_and_reversible() {
    let mut handler = JoiningRowHandler::<User>::new()
        .entity::<User>()
        .entity::<File>();
    let expanded = handler.expand(USERS_WITH_FILES).unwrap();
    assert!(expanded.starts_with("select u.id as u_0,u.name as u_1, f.id as f_0,"));
    assert_eq!(handler.expand(&expanded).unwrap(), expanded);

    let scope = handler.alias_scope();
    assert_eq!(scope.len(), 2 + 4);
    assert_eq!(scope.get("u", "name"), Some("u_1"));
    assert_eq!(scope.get("f", "user_id"), Some("f_1"));
    assert_eq!(scope.get("f", "folder_id"), Some("f_2"));
}

#[test]
fn unregistered_macro_types_fail_before_mapping() {
    let conn = database("insert into tags values (1, 'red');");
    let err = Select::new(&conn, "select {User.*}, {Tag.*} from users, tags")
        .select_beans::<User>()
        .unwrap_err();
    assert!(err.is_mapping(MappingErrorKind::UnregisteredEntity));
}
