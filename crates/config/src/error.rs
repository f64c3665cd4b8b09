use thiserror::Error;

/// Missing or inconsistent startup configuration. Fatal: the process does
/// not start.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("telegram.token is not set")]
    MissingToken,

    #[error("operator pool is empty: configure at least one operator id")]
    EmptyOperatorPool,

    #[error("no categories configured")]
    NoCategories,

    #[error("duplicate category id: {id}")]
    DuplicateCategory { id: String },

    #[error("category id {id:?} is reserved for menu controls")]
    ReservedCategoryId { id: String },
}
