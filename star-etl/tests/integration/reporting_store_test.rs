use sqlx::Row;
use star_etl::contract::{DIM_CATEGORY, DIM_PRODUCT};
use star_etl::error::ErrorKind;
use star_etl::store::postgres::PostgresReportingStore;
use star_etl::store::{ReplaceStats, ReportingStore};
use star_etl::test_utils::database::spawn_reporting_database;
use star_etl::test_utils::rows::{category_rows, product_rows};
use star_etl::test_utils::schema::{CATEGORY_REFERENCE, DEFERRED_CATEGORY_UNIQUENESS};
use star_postgres::sqlx::test_utils::PgDatabase;
use star_telemetry::tracing::init_test_tracing;

async fn category_names(database: &PgDatabase) -> Vec<(i64, i32, String)> {
    sqlx::query(
        r#"select "CategoryKey", "Source_CategoryID", "CategoryName" from "Dim_Category" order by 1"#,
    )
    .fetch_all(&database.pool)
    .await
    .unwrap()
    .into_iter()
    .map(|row| (row.get(0), row.get(1), row.get(2)))
    .collect()
}

#[tokio::test(flavor = "multi_thread")]
async fn replace_clears_prior_rows_and_restarts_identity() {
    init_test_tracing();
    let database = spawn_reporting_database().await;
    let store = PostgresReportingStore::new(database.config.clone(), 1000);
    store
        .replace_table(&DIM_CATEGORY, category_rows(&[(7, "Stale", "old")]))
        .await
        .unwrap();

    let stats = store
        .replace_table(
            &DIM_CATEGORY,
            category_rows(&[(1, "Beverages", "desc1"), (2, "Condiments", "desc2")]),
        )
        .await
        .unwrap();

    assert_eq!(
        stats,
        ReplaceStats {
            deleted: 1,
            inserted: 2
        }
    );
    assert_eq!(
        category_names(&database).await,
        [
            (1, 1, "Beverages".to_owned()),
            (2, 2, "Condiments".to_owned())
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn small_batches_insert_every_row() {
    init_test_tracing();
    let database = spawn_reporting_database().await;
    let store = PostgresReportingStore::new(database.config.clone(), 2);
    let products = (1..=5)
        .map(|id| (id, "Product"))
        .collect::<Vec<_>>();

    let stats = store
        .replace_table(&DIM_PRODUCT, product_rows(&products))
        .await
        .unwrap();

    assert_eq!(stats.inserted, 5);
    let pairs = store.fetch_key_pairs(&DIM_PRODUCT).await.unwrap();
    assert_eq!(pairs.len(), 5);
    assert_eq!(pairs.columns(), ["ProductKey", "Source_ProductID"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_insert_rolls_back_the_clear() {
    init_test_tracing();
    let database = spawn_reporting_database().await;
    let store = PostgresReportingStore::new(database.config.clone(), 1000);
    store
        .replace_table(
            &DIM_CATEGORY,
            category_rows(&[(1, "Beverages", "desc1"), (2, "Condiments", "desc2")]),
        )
        .await
        .unwrap();
    let before = category_names(&database).await;

    // The second row repeats a natural key and violates the unique constraint.
    let err = store
        .replace_table(
            &DIM_CATEGORY,
            category_rows(&[(3, "Confections", "desc3"), (3, "Confections", "desc3")]),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
    assert_eq!(category_names(&database).await, before);
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_commit_keeps_previous_rows() {
    init_test_tracing();
    let database = spawn_reporting_database().await;
    database.run_sql(DEFERRED_CATEGORY_UNIQUENESS).await;
    let store = PostgresReportingStore::new(database.config.clone(), 1000);
    store
        .replace_table(&DIM_CATEGORY, category_rows(&[(1, "Beverages", "desc1")]))
        .await
        .unwrap();
    let before = category_names(&database).await;

    // Both inserts succeed and the duplicate natural key is only reported on commit.
    let err = store
        .replace_table(
            &DIM_CATEGORY,
            category_rows(&[(3, "Confections", "desc3"), (3, "Confections", "desc3")]),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
    assert_eq!(category_names(&database).await, before);
}

#[tokio::test(flavor = "multi_thread")]
async fn truncate_of_a_referenced_table_fails_while_delete_succeeds() {
    init_test_tracing();
    let database = spawn_reporting_database().await;
    database.run_sql(CATEGORY_REFERENCE).await;
    let store = PostgresReportingStore::new(database.config.clone(), 1000);

    let err = store
        .replace_table(&DIM_CATEGORY, category_rows(&[(1, "Beverages", "desc1")]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ClearStrategyMismatch);
    assert!(category_names(&database).await.is_empty());

    // Dim_Product is referenced by the fact table and is cleared with delete.
    store
        .replace_table(&DIM_PRODUCT, product_rows(&[(11, "Queso Cabrales")]))
        .await
        .unwrap();
    let stats = store
        .replace_table(&DIM_PRODUCT, product_rows(&[(11, "Queso Cabrales")]))
        .await
        .unwrap();
    assert_eq!(
        stats,
        ReplaceStats {
            deleted: 1,
            inserted: 1
        }
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn wrong_credentials_are_reported_as_authentication_errors() {
    init_test_tracing();
    let database = spawn_reporting_database().await;
    let mut config = database.config.clone();
    config.username = "no_such_role".to_owned();
    let store = PostgresReportingStore::new(config, 1000);

    let err = store.fetch_key_pairs(&DIM_PRODUCT).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AuthenticationError);
}
