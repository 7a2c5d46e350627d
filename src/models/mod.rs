pub mod biomarker;
pub mod context;
pub mod enums;
pub mod reference;

pub use biomarker::*;
pub use context::*;
pub use reference::*;
