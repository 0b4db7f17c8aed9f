use star_etl::error::EtlError;
use std::error::Error;
use thiserror::Error;

/// Result type for loader operations.
pub type LoaderResult<T> = Result<T, LoaderError>;

/// Exit status for failed builds and probes.
const EXIT_FAILURE: u8 = 1;

/// Exit status for configuration problems, reported before anything runs.
const EXIT_CONFIG: u8 = 2;

/// Error type of the loader binary.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// A build or probe failed.
    #[error(transparent)]
    Etl(#[from] EtlError),
    /// Configuration could not be loaded or is invalid.
    #[error("configuration error: {0}")]
    Config(Box<dyn Error + Send + Sync>),
    /// I/O error, for example while starting the runtime.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl LoaderError {
    /// Creates a configuration error from any error.
    pub fn config<E: Error + Send + Sync + 'static>(err: E) -> Self {
        LoaderError::Config(Box::new(err))
    }

    pub fn category(&self) -> &'static str {
        match self {
            LoaderError::Etl(_) => "build error",
            LoaderError::Config(_) => "configuration error",
            LoaderError::Io(_) => "i/o error",
        }
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            LoaderError::Config(_) => EXIT_CONFIG,
            LoaderError::Etl(_) | LoaderError::Io(_) => EXIT_FAILURE,
        }
    }

    /// Returns a user-oriented report for terminal output.
    pub fn render_report(&self) -> String {
        let mut out = String::new();
        out.push_str("star-loader failed\n");
        out.push_str(&format!("category: {}\n", self.category()));
        out.push_str(&format!("error: {self}\n"));

        let mut source = Error::source(self);
        let mut index = 1usize;
        while let Some(err) = source {
            out.push_str(&format!("cause {index}: {err}\n"));
            source = err.source();
            index += 1;
        }

        out
    }
}
