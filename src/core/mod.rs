pub mod bk_tree;
pub mod dataset;
pub mod engine;
pub mod matcher;
pub mod normalizer;
pub mod reference_index;
pub mod report;
pub mod scorer;
pub mod toxicology;

pub use crate::domain::model::{AnalysisReport, IngredientVerdict, RawScanText};
pub use crate::domain::ports::{DatasetSource, Storage};
pub use crate::utils::error::Result;
