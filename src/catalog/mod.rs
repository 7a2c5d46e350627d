//! Versioned declarative catalog: biomarker definitions, reference ranges
//! and unit conversion factors, plus the components that interpret them.
//!
//! ```text
//! CatalogSource → CatalogStore → { UnitConverter, ReferenceRangeSelector } → CanonicalResolver
//! ```
//!
//! The store is constructed once at process start and shared behind an
//! `Arc`. Tables are parsed on first use and then immutable until
//! `clear_cache()`/`reload()`.

pub mod error;
pub mod ranges;
pub mod resolver;
pub mod source;
pub mod store;
pub mod units;

pub use error::{CatalogError, UnitError};
pub use ranges::ReferenceRangeSelector;
pub use resolver::{CanonicalResolver, Classification};
pub use source::{BundledSource, CatalogSource, CatalogTable, InMemorySource, JsonDirectorySource};
pub use store::{BiomarkerTable, CatalogDocument, CatalogStore, RangeTable};
pub use units::UnitConverter;
