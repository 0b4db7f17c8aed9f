use bigdecimal::BigDecimal;
use sqlx::Row;
use star_config::shared::LoadConfig;
use star_etl::builds::BuildKind;
use star_etl::error::ErrorKind;
use star_etl::load::LoadOutcome;
use star_etl::pipeline::Pipeline;
use star_etl::source::postgres::PostgresSource;
use star_etl::store::postgres::PostgresReportingStore;
use star_etl::test_utils::database::{spawn_reporting_database, spawn_source_database};
use star_postgres::sqlx::test_utils::PgDatabase;
use star_telemetry::tracing::init_test_tracing;
use std::str::FromStr;

type PostgresPipeline = Pipeline<PostgresSource, PostgresReportingStore>;

fn pipeline(source: &PgDatabase, reporting: &PgDatabase) -> PostgresPipeline {
    let config = LoadConfig::default();
    let store = PostgresReportingStore::new(reporting.config.clone(), config.batch_size);

    Pipeline::new(config, PostgresSource::new(source.config.clone()), store)
}

async fn facts(database: &PgDatabase) -> Vec<(i32, i32, Option<i64>, Option<BigDecimal>)> {
    sqlx::query(
        r#"
        select "Source_OrderID", "Source_ProductID", "ProductKey", "ExtendedPrice"
        from "Fact_OrderMetrics"
        order by 1, 2
        "#,
    )
    .fetch_all(&database.pool)
    .await
    .unwrap()
    .into_iter()
    .map(|row| (row.get(0), row.get(1), row.get(2), row.get(3)))
    .collect()
}

async fn product_key(database: &PgDatabase, product_id: i32) -> i64 {
    sqlx::query_scalar(r#"select "ProductKey" from "Dim_Product" where "Source_ProductID" = $1"#)
        .bind(product_id)
        .fetch_one(&database.pool)
        .await
        .unwrap()
}

fn decimal(value: &str) -> Option<BigDecimal> {
    Some(BigDecimal::from_str(value).unwrap())
}

#[tokio::test(flavor = "multi_thread")]
async fn all_builds_produce_the_star_schema() {
    init_test_tracing();
    let source = spawn_source_database().await;
    let reporting = spawn_reporting_database().await;
    let pipeline = pipeline(&source, &reporting);

    let reports = pipeline.run_all().await.unwrap();

    let inserted = reports
        .iter()
        .map(|report| report.outcome.inserted())
        .collect::<Vec<_>>();
    assert_eq!(inserted, [2, 3, 5]);

    let cheese = product_key(&reporting, 11).await;
    let noodles = product_key(&reporting, 42).await;
    let mozzarella = product_key(&reporting, 72).await;
    assert_eq!(
        facts(&reporting).await,
        [
            (10248, 11, Some(cheese), decimal("168")),
            (10248, 42, Some(noodles), decimal("98")),
            (10248, 72, Some(mozzarella), decimal("174")),
            (10249, 42, Some(noodles), decimal("88.2")),
            (10250, 72, Some(mozzarella), decimal("180")),
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn products_missing_from_the_dimension_load_with_a_null_key() {
    init_test_tracing();
    let source = spawn_source_database().await;
    let reporting = spawn_reporting_database().await;
    let pipeline = pipeline(&source, &reporting);
    pipeline.run(BuildKind::CategoryDimension).await.unwrap();
    pipeline.run(BuildKind::ProductDimension).await.unwrap();
    reporting
        .run_sql(r#"delete from "Dim_Product" where "Source_ProductID" = 72"#)
        .await;

    let report = pipeline.run(BuildKind::OrderMetricsFact).await.unwrap();

    assert_eq!(report.outcome.inserted(), 5);
    let missing = facts(&reporting)
        .await
        .into_iter()
        .filter(|(_, product_id, _, _)| *product_id == 72)
        .collect::<Vec<_>>();
    assert_eq!(missing.len(), 2);
    assert!(missing.iter().all(|(_, _, key, _)| key.is_none()));
}

#[tokio::test(flavor = "multi_thread")]
async fn fact_build_without_dimensions_aborts() {
    init_test_tracing();
    let source = spawn_source_database().await;
    let reporting = spawn_reporting_database().await;
    let pipeline = pipeline(&source, &reporting);

    let err = pipeline.run(BuildKind::OrderMetricsFact).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MissingDimensionKeys);
    assert!(facts(&reporting).await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_source_keeps_the_loaded_facts() {
    init_test_tracing();
    let source = spawn_source_database().await;
    let reporting = spawn_reporting_database().await;
    let pipeline = pipeline(&source, &reporting);
    pipeline.run_all().await.unwrap();
    let before = facts(&reporting).await;
    source.run_sql("delete from order_details").await;

    let report = pipeline.run(BuildKind::OrderMetricsFact).await.unwrap();

    assert_eq!(report.outcome, LoadOutcome::SkippedEmpty);
    assert_eq!(facts(&reporting).await, before);
}

#[tokio::test(flavor = "multi_thread")]
async fn rerunning_the_builds_is_idempotent() {
    init_test_tracing();
    let source = spawn_source_database().await;
    let reporting = spawn_reporting_database().await;
    let pipeline = pipeline(&source, &reporting);

    pipeline.run_all().await.unwrap();
    let first = facts(&reporting).await;
    pipeline.run_all().await.unwrap();
    let second = facts(&reporting).await;

    let without_keys = |rows: Vec<(i32, i32, Option<i64>, Option<BigDecimal>)>| {
        rows.into_iter()
            .map(|(order, product, key, price)| (order, product, key.is_some(), price))
            .collect::<Vec<_>>()
    };
    assert_eq!(without_keys(first), without_keys(second));
}
