use thiserror::Error;

#[derive(Debug, Error)]
pub enum LmdbError {
    #[error("LMDB error: {0}")]
    Heed(String),

    #[error("key not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("unsupported schema version {found}, this build supports up to {supported}")]
    SchemaVersion { found: u32, supported: u32 },
}

impl From<heed::Error> for LmdbError {
    fn from(e: heed::Error) -> Self {
        LmdbError::Heed(e.to_string())
    }
}

impl From<bincode::Error> for LmdbError {
    fn from(e: bincode::Error) -> Self {
        LmdbError::Serialization(e.to_string())
    }
}

impl From<LmdbError> for conclave_store::StoreError {
    fn from(e: LmdbError) -> Self {
        match e {
            LmdbError::NotFound(key) => conclave_store::StoreError::NotFound(key),
            LmdbError::Serialization(msg) => conclave_store::StoreError::Serialization(msg),
            LmdbError::SchemaVersion { .. } => {
                conclave_store::StoreError::Corruption(e.to_string())
            }
            other => conclave_store::StoreError::Backend(other.to_string()),
        }
    }
}
