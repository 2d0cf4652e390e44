use chrono::{TimeZone, Utc};
use rstest::{fixture, rstest};
use rusqlite::params;

use scope_cache_key::{
    compute_key, expand_cache_key, CacheKey, Namespace, Scope, ScopeKeyComputer, ScopeKeyError,
    SqliteStore,
};

const JAN_1: &str = "2024-01-01T00:00:00Z";
const JAN_2: &str = "2024-01-02T00:00:00Z";

#[fixture]
fn store() -> SqliteStore {
    let store = SqliteStore::open_in_memory().unwrap();
    store
        .connection()
        .execute_batch(
            "CREATE TABLE items (
                id INTEGER PRIMARY KEY,
                status TEXT NOT NULL DEFAULT 'active',
                updated_at TEXT
            );
            CREATE TABLE widgets (
                id INTEGER PRIMARY KEY,
                updated_at TEXT
            );",
        )
        .unwrap();
    store
}

fn insert(store: &SqliteStore, table: &str, id: i64, updated_at: &str) {
    store
        .connection()
        .execute(
            &format!("INSERT INTO {} (id, updated_at) VALUES (?1, ?2)", table),
            params![id, updated_at],
        )
        .unwrap();
}

fn touch(store: &SqliteStore, id: i64, updated_at: &str) {
    store
        .connection()
        .execute(
            "UPDATE items SET updated_at = ?1 WHERE id = ?2",
            params![updated_at, id],
        )
        .unwrap();
}

#[rstest]
fn single_record_matches_known_digest(store: SqliteStore) {
    insert(&store, "items", 1, JAN_1);
    let key = compute_key(&store, &Scope::table("items")).unwrap();
    assert_eq!(key, "items/4c66d64509b1746b34c89cf8496560b1");
}

#[rstest]
fn touching_a_record_changes_the_digest(store: SqliteStore) {
    insert(&store, "items", 1, JAN_1);
    let before = compute_key(&store, &Scope::table("items")).unwrap();

    touch(&store, 1, JAN_2);
    let after = compute_key(&store, &Scope::table("items")).unwrap();

    assert_eq!(after, "items/8ae1ae1ce916a9de83f7cfaab4ae2ae2");
    assert_ne!(before, after);
}

#[rstest]
fn adding_a_record_changes_the_digest(store: SqliteStore) {
    insert(&store, "items", 1, JAN_1);
    let before = compute_key(&store, &Scope::table("items")).unwrap();

    insert(&store, "items", 2, JAN_1);
    let after = compute_key(&store, &Scope::table("items")).unwrap();

    assert_eq!(after, "items/2b01a194253ba1fbe32e2c5a9ca0048e");
    assert_ne!(before, after);
}

#[rstest]
fn removing_a_record_changes_the_digest(store: SqliteStore) {
    insert(&store, "items", 1, JAN_1);
    insert(&store, "items", 2, JAN_1);
    let before = compute_key(&store, &Scope::table("items")).unwrap();

    store
        .connection()
        .execute("DELETE FROM items WHERE id = 2", [])
        .unwrap();
    let after = compute_key(&store, &Scope::table("items")).unwrap();

    assert_ne!(before, after);
    assert_eq!(after, "items/4c66d64509b1746b34c89cf8496560b1");
}

#[rstest]
fn empty_table_yields_sentinel(store: SqliteStore) {
    let key = compute_key(&store, &Scope::table("items")).unwrap();
    assert_eq!(key, "items/empty");
}

#[rstest]
fn filter_matching_nothing_yields_sentinel(store: SqliteStore) {
    insert(&store, "items", 1, JAN_1);
    let scope = Scope::table("items").where_eq("status", "archived");
    let key = ScopeKeyComputer::new(&store).compute_key(&scope).unwrap();
    assert!(key.is_empty());
    assert_eq!(key.to_string(), "items/empty");
}

#[rstest]
fn repeated_calls_are_deterministic(store: SqliteStore) {
    for id in 1..=20 {
        insert(&store, "items", id, JAN_1);
    }
    let scope = Scope::table("items");
    let first = compute_key(&store, &scope).unwrap();
    for _ in 0..5 {
        assert_eq!(compute_key(&store, &scope).unwrap(), first);
    }
}

#[rstest]
fn insertion_order_does_not_matter(store: SqliteStore) {
    for id in [3, 1, 2] {
        insert(&store, "items", id, JAN_1);
    }
    for id in [2, 3, 1] {
        insert(&store, "widgets", id, JAN_1);
    }

    let items = compute_key(&store, &Scope::table("items").namespace("things")).unwrap();
    let widgets = compute_key(&store, &Scope::table("widgets").namespace("things")).unwrap();
    assert_eq!(items, widgets);
}

#[rstest]
fn namespaces_separate_entity_types(store: SqliteStore) {
    insert(&store, "items", 1, JAN_1);
    insert(&store, "widgets", 1, JAN_1);

    let items = compute_key(&store, &Scope::table("items")).unwrap();
    let widgets = compute_key(&store, &Scope::table("widgets")).unwrap();

    assert_ne!(items, widgets);
    assert_eq!(items.split_once('/').unwrap().1, widgets.split_once('/').unwrap().1);
}

#[rstest]
fn filters_narrow_the_scope(store: SqliteStore) {
    insert(&store, "items", 1, JAN_1);
    insert(&store, "items", 2, JAN_1);
    store
        .connection()
        .execute("UPDATE items SET status = 'archived' WHERE id = 2", [])
        .unwrap();

    let active = compute_key(&store, &Scope::table("items").where_eq("status", "active")).unwrap();
    assert_eq!(active, "items/4c66d64509b1746b34c89cf8496560b1");

    let by_id = compute_key(&store, &Scope::table("items").where_in("id", [1])).unwrap();
    assert_eq!(active, by_id);

    // Changes outside the scope leave its key alone.
    touch(&store, 2, JAN_2);
    let again = compute_key(&store, &Scope::table("items").where_eq("status", "active")).unwrap();
    assert_eq!(active, again);
}

#[rstest]
fn none_filter_matches_null_columns(store: SqliteStore) {
    store
        .connection()
        .execute_batch(
            "CREATE TABLE notes (id INTEGER PRIMARY KEY, updated_at TEXT, deleted_at TEXT);
             INSERT INTO notes VALUES (1, '2024-01-01T00:00:00Z', NULL);
             INSERT INTO notes VALUES (2, '2024-01-01T00:00:00Z', '2024-01-03T00:00:00Z');",
        )
        .unwrap();

    let live = compute_key(&store, &Scope::table("notes").where_eq("deleted_at", None::<&str>)).unwrap();
    assert_eq!(live, "notes/4c66d64509b1746b34c89cf8496560b1");
    assert_eq!(
        live,
        compute_key(&store, &Scope::table("notes").where_null("deleted_at")).unwrap()
    );

    let deleted =
        compute_key(&store, &Scope::table("notes").where_not_eq("deleted_at", None::<&str>)).unwrap();
    assert_ne!(deleted, "notes/empty");
    assert_eq!(
        deleted,
        compute_key(&store, &Scope::table("notes").where_not_null("deleted_at")).unwrap()
    );
}

#[rstest]
fn hostile_filter_values_are_bound(store: SqliteStore) {
    insert(&store, "items", 1, JAN_1);
    let scope = Scope::table("items").where_eq("status", "x' OR '1'='1");
    assert_eq!(compute_key(&store, &scope).unwrap(), "items/empty");
}

#[rstest]
fn custom_columns(store: SqliteStore) {
    store
        .connection()
        .execute_batch(
            "CREATE TABLE posts (uuid TEXT PRIMARY KEY, modified_at TEXT);
             INSERT INTO posts VALUES ('1', '2024-01-01T00:00:00Z');",
        )
        .unwrap();
    let scope = Scope::table("posts")
        .id_column("uuid")
        .updated_at_column("modified_at");
    assert_eq!(
        compute_key(&store, &scope).unwrap(),
        "posts/4c66d64509b1746b34c89cf8496560b1"
    );
}

#[rstest]
fn null_timestamps_still_count(store: SqliteStore) {
    store
        .connection()
        .execute("INSERT INTO items (id, updated_at) VALUES (1, NULL)", [])
        .unwrap();
    let key = compute_key(&store, &Scope::table("items")).unwrap();
    assert_ne!(key, "items/empty");

    touch(&store, 1, JAN_1);
    assert_ne!(compute_key(&store, &Scope::table("items")).unwrap(), key);
}

#[rstest]
fn chrono_timestamps_are_hashed(store: SqliteStore) {
    let first = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let second = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 1).unwrap();
    store
        .connection()
        .execute(
            "INSERT INTO items (id, updated_at) VALUES (1, ?1)",
            params![first],
        )
        .unwrap();
    let before = compute_key(&store, &Scope::table("items")).unwrap();

    store
        .connection()
        .execute("UPDATE items SET updated_at = ?1 WHERE id = 1", params![second])
        .unwrap();
    assert_ne!(compute_key(&store, &Scope::table("items")).unwrap(), before);
}

#[rstest]
fn missing_table_is_a_construction_failure(store: SqliteStore) {
    let err = compute_key(&store, &Scope::table("nowhere")).unwrap_err();
    assert!(matches!(err, ScopeKeyError::QueryConstruction(_)));
}

#[rstest]
fn missing_column_is_a_construction_failure(store: SqliteStore) {
    let scope = Scope::table("items").where_eq("colour", "red");
    let err = compute_key(&store, &scope).unwrap_err();
    assert!(matches!(err, ScopeKeyError::QueryConstruction(_)));
}

#[rstest]
fn composes_with_record_keys(store: SqliteStore) {
    insert(&store, "items", 1, JAN_1);
    let scope_key = ScopeKeyComputer::new(&store)
        .compute_key(&Scope::table("items"))
        .unwrap();
    let community = CacheKey::for_record(Namespace::new("communities").unwrap(), Some(1), None);

    assert_eq!(
        expand_cache_key([&community, &scope_key]),
        "communities/1/items/4c66d64509b1746b34c89cf8496560b1"
    );
}

#[test]
fn file_backed_store_creates_parent_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("db.sqlite3");
    let store = SqliteStore::open(&path).unwrap();
    store
        .connection()
        .execute_batch("CREATE TABLE items (id INTEGER PRIMARY KEY, updated_at TEXT);")
        .unwrap();
    assert_eq!(compute_key(&store, &Scope::table("items")).unwrap(), "items/empty");
    assert!(path.exists());
}
