use clap::{Parser, Subcommand, ValueEnum};
use star_etl::builds::BuildKind;

#[derive(Debug, Parser)]
#[command(
    name = "star-loader",
    about = "Loads the reporting star schema from the transactional store"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run one build, or every build with dimensions first
    Run {
        #[arg(value_enum)]
        target: BuildTarget,
    },
    /// Check that the transactional store is reachable by counting the rows of a table
    Probe {
        #[arg(long, default_value = "public")]
        schema: String,
        #[arg(long, default_value = "customers")]
        table: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BuildTarget {
    Category,
    Product,
    OrderMetrics,
    All,
}

impl BuildTarget {
    /// The single build this target names, or [`None`] for every build.
    pub fn build(&self) -> Option<BuildKind> {
        match self {
            BuildTarget::Category => Some(BuildKind::CategoryDimension),
            BuildTarget::Product => Some(BuildKind::ProductDimension),
            BuildTarget::OrderMetrics => Some(BuildKind::OrderMetricsFact),
            BuildTarget::All => None,
        }
    }
}
