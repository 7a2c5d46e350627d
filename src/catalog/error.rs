use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("Catalog table not found ({0}): {1}")]
    NotFound(String, String),

    #[error("Catalog table malformed ({0}): {1}")]
    Parse(String, String),

    #[error("Internal lock failed")]
    LockFailed,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnitError {
    #[error("No conversion factor from {from} to {to}")]
    UnsupportedConversion { from: String, to: String },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
