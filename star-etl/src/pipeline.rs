use metrics::counter;
use star_config::shared::{EmptyDimensionPolicy, LoadConfig};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::bail;
use crate::builds::BuildKind;
use crate::contract::DIM_PRODUCT;
use crate::error::{ErrorKind, EtlResult};
use crate::load::{LoadOutcome, load_table};
use crate::metrics::{
    BUILD_LABEL, ERROR_KIND_LABEL, STAR_BUILD_FAILURES_TOTAL, STAR_ROWS_EXTRACTED_TOTAL,
    STAR_ROWS_LOADED_TOTAL, STAR_UNRESOLVED_KEYS_TOTAL,
};
use crate::resolver::resolve_dimension_keys;
use crate::source::Source;
use crate::store::ReportingStore;
use crate::transform::{transform_category, transform_order_metrics, transform_product};
use crate::types::RowSet;

/// Summary of one completed build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildReport {
    pub build: BuildKind,
    /// Rows returned by the source query.
    pub extracted: usize,
    pub outcome: LoadOutcome,
}

/// Runs builds from a transactional source into a reporting store.
///
/// Builds run one at a time. Every stage finishes, and releases its connection, before the next
/// one starts, so a fact build always sees the committed state of the dimension builds that ran
/// before it.
#[derive(Debug)]
pub struct Pipeline<S, D> {
    config: Arc<LoadConfig>,
    source: S,
    store: D,
}

impl<S, D> Pipeline<S, D>
where
    S: Source + Send + Sync,
    D: ReportingStore + Send + Sync,
{
    pub fn new(config: LoadConfig, source: S, store: D) -> Self {
        Self {
            config: Arc::new(config),
            source,
            store,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn store(&self) -> &D {
        &self.store
    }

    /// Runs a single build.
    pub async fn run(&self, build: BuildKind) -> EtlResult<BuildReport> {
        info!(%build, "starting build");

        match self.run_build(build).await {
            Ok(report) => {
                info!(
                    %build,
                    extracted = report.extracted,
                    inserted = report.outcome.inserted(),
                    "build completed"
                );

                Ok(report)
            }
            Err(err) => {
                error!(%build, error = %err, "build failed");
                counter!(
                    STAR_BUILD_FAILURES_TOTAL,
                    BUILD_LABEL => build.as_str(),
                    ERROR_KIND_LABEL => format!("{:?}", err.kind())
                )
                .increment(1);

                Err(err)
            }
        }
    }

    /// Runs every build, dimensions first, stopping at the first failure.
    pub async fn run_all(&self) -> EtlResult<Vec<BuildReport>> {
        let mut reports = Vec::with_capacity(BuildKind::all().len());
        for build in BuildKind::all() {
            reports.push(self.run(build).await?);
        }

        Ok(reports)
    }

    async fn run_build(&self, build: BuildKind) -> EtlResult<BuildReport> {
        let extracted = self.source.query(build.source_query()).await?;
        let extracted_rows = extracted.len();
        counter!(STAR_ROWS_EXTRACTED_TOTAL, BUILD_LABEL => build.as_str())
            .increment(extracted_rows as u64);

        let rows = match build {
            BuildKind::CategoryDimension => transform_category(extracted)?,
            BuildKind::ProductDimension => transform_product(extracted)?,
            BuildKind::OrderMetricsFact => self.transform_facts(build, extracted).await?,
        };

        let outcome = load_table(&self.store, build.contract(), rows).await?;
        counter!(STAR_ROWS_LOADED_TOTAL, BUILD_LABEL => build.as_str())
            .increment(outcome.inserted());

        Ok(BuildReport {
            build,
            extracted: extracted_rows,
            outcome,
        })
    }

    async fn transform_facts(&self, build: BuildKind, extracted: RowSet) -> EtlResult<RowSet> {
        let products = resolve_dimension_keys(&self.store, &DIM_PRODUCT).await?;

        if products.is_empty() && !extracted.is_empty() {
            match self.config.empty_dimension_policy {
                EmptyDimensionPolicy::Abort => bail!(
                    ErrorKind::MissingDimensionKeys,
                    "Product dimension is empty",
                    format!(
                        "{} has no rows, run the product build before {build}",
                        DIM_PRODUCT.table_name()
                    )
                ),
                EmptyDimensionPolicy::Allow => warn!(
                    %build,
                    "product dimension is empty, every fact row will have a null product key"
                ),
            }
        }

        let transformed = transform_order_metrics(extracted, &products)?;
        if transformed.unresolved > 0 {
            warn!(
                %build,
                rows = transformed.unresolved,
                "fact rows reference products missing from the product dimension"
            );
            counter!(STAR_UNRESOLVED_KEYS_TOTAL, BUILD_LABEL => build.as_str())
                .increment(transformed.unresolved as u64);
        }

        Ok(transformed.rows)
    }
}
