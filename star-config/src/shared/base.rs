use thiserror::Error;

/// Errors raised when a configuration is structurally valid but semantically wrong.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// TLS is enabled but no trusted root certificates are provided.
    #[error("Invalid TLS config: `trusted_root_certs` must be set when `enabled` is true")]
    MissingTrustedRootCerts,
    /// The batch size used for inserts cannot be zero.
    #[error("`load.batch_size` must be greater than 0")]
    BatchSizeZero,
    /// The source and reporting descriptors resolve to the same database.
    #[error(
        "`source` and `reporting` point at the same database `{database}` on `{host}:{port}`, the transactional store must never be written"
    )]
    SameDatabase {
        host: String,
        port: u16,
        database: String,
    },
}
