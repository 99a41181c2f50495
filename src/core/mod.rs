pub mod coverage;
pub mod diagnostic;
pub mod etl;
pub mod export;
pub mod fetcher;
pub mod flatten;
pub mod pipeline;
pub mod report;
pub mod windows;

pub use crate::domain::model::{ExtractionResultSet, TransformResult};
pub use crate::domain::ports::{Pipeline, RecordSource, Storage};
pub use crate::utils::error::Result;
