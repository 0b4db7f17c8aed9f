use star_etl::builds::{CATEGORIES_QUERY, ORDER_LINES_QUERY};
use star_etl::error::ErrorKind;
use star_etl::source::postgres::PostgresSource;
use star_etl::source::{Source, SourceQuery};
use star_etl::test_utils::database::spawn_source_database;
use star_etl::types::Cell;
use star_postgres::types::TableName;
use star_telemetry::tracing::init_test_tracing;

#[tokio::test(flavor = "multi_thread")]
async fn categories_are_read_with_aliased_columns() {
    init_test_tracing();
    let database = spawn_source_database().await;
    let source = PostgresSource::new(database.config.clone());

    let rows = source.query(&CATEGORIES_QUERY).await.unwrap();

    assert_eq!(rows.columns(), ["CategoryID", "CategoryName", "Description"]);
    assert_eq!(rows.len(), 2);
    assert_eq!(
        rows.rows()[0].values()[..2],
        [Cell::I16(1), Cell::String("Beverages".to_owned())]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn order_lines_join_their_order() {
    init_test_tracing();
    let database = spawn_source_database().await;
    let source = PostgresSource::new(database.config.clone());

    let rows = source.query(&ORDER_LINES_QUERY).await.unwrap();

    assert_eq!(rows.len(), 5);
    let shipped = rows.require_column("ShippedDate").unwrap();
    assert!(rows.rows()[4].values()[shipped].is_null());
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_tables_are_not_failures() {
    init_test_tracing();
    let database = spawn_source_database().await;
    database.run_sql("delete from order_details").await;
    let source = PostgresSource::new(database.config.clone());

    let rows = source.query(&ORDER_LINES_QUERY).await.unwrap();

    assert!(rows.is_empty());
    assert_eq!(rows.columns().len(), 8);
}

#[tokio::test(flavor = "multi_thread")]
async fn query_errors_are_reported() {
    init_test_tracing();
    let database = spawn_source_database().await;
    let source = PostgresSource::new(database.config.clone());
    let query = SourceQuery {
        name: "missing",
        sql: "select * from shippers",
    };

    let err = source.query(&query).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SourceSchemaError);
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_source_is_a_connection_failure() {
    init_test_tracing();
    let database = spawn_source_database().await;
    let mut config = database.config.clone();
    config.port = 1;
    let source = PostgresSource::new(config);

    let err = source.query(&CATEGORIES_QUERY).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SourceConnectionFailed);
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_role_is_an_authentication_error() {
    init_test_tracing();
    let database = spawn_source_database().await;
    let mut config = database.config.clone();
    config.username = "no_such_role".to_owned();
    let source = PostgresSource::new(config);

    let err = source.query(&CATEGORIES_QUERY).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AuthenticationError);
}

#[tokio::test(flavor = "multi_thread")]
async fn probe_counts_customers() {
    init_test_tracing();
    let database = spawn_source_database().await;
    let source = PostgresSource::new(database.config.clone());

    let count = source
        .probe(&TableName::new("public", "customers"))
        .await
        .unwrap();

    assert_eq!(count, 3);
}
