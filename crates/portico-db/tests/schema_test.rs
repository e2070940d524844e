//! Integration tests for schema initialization using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

async fn fresh_db() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    db
}

#[tokio::test]
async fn schema_migration_applies_successfully() {
    let db = fresh_db().await;

    portico_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("INFO FOR DB").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    let info_str = format!("{:?}", info.expect("INFO FOR DB should return a value"));

    assert!(info_str.contains("product"), "missing product table");
    assert!(info_str.contains("_migration"), "missing _migration table");
}

#[tokio::test]
async fn migration_is_idempotent() {
    let db = fresh_db().await;

    portico_db::run_migrations(&db).await.unwrap();
    portico_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("SELECT * FROM _migration").await.unwrap();
    let records: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    assert_eq!(records.len(), 1, "expected exactly one migration record");
}

#[tokio::test]
async fn product_code_length_is_enforced() {
    let db = fresh_db().await;
    portico_db::run_migrations(&db).await.unwrap();

    db.query("CREATE product SET code = 'GOOD', name = 'Good'")
        .await
        .unwrap()
        .check()
        .unwrap();

    let too_long = db
        .query("CREATE product SET code = 'TOOLONGX', name = 'Bad'")
        .await
        .unwrap()
        .check();
    assert!(too_long.is_err(), "code longer than 6 chars should be rejected");
}

#[tokio::test]
async fn acl_documents_keep_arbitrary_keys() {
    let db = fresh_db().await;
    portico_db::run_migrations(&db).await.unwrap();

    db.query(
        "CREATE product:acl SET code = 'KEYS', name = 'Keys', \
         scope = { acl: { dev: { users: { '1': { get: [ \
         { group: 'G', apis: { '/users/:id': { access: true } } } ] } } } } }",
    )
    .await
    .unwrap()
    .check()
    .unwrap();

    let mut result = db
        .query("SELECT VALUE scope.acl.dev.users FROM product:acl")
        .await
        .unwrap();
    let records: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    let dump = format!("{records:?}");
    assert!(dump.contains("/users/:id"), "route key was not preserved");
}
