//! Archive-readiness checks for climate-model output directories.
//!
//! A [`Characteriser`] is bound to one directory of dataset files and records
//! one verdict per check it runs. [`Characteriser::summarize`] counts the
//! verdicts that are not `GOOD`.

pub mod characterise;
pub mod data;
pub mod errors;
pub mod report;
pub mod sample;

pub use characterise::{variable_id, Characteriser, Expectations};
pub use data::loader::{DatasetLoader, FileLoader, Opened};
pub use data::model::{AttrValue, Coordinate, Dataset, Variable};
pub use data::predicates::{
    has_attribute, has_coordinates, has_named_attribute, has_shape, has_variables, is_in_range,
    Bound, Handle,
};
pub use errors::{Error, Result};
pub use report::{CheckKey, CheckResult, Report, Results, GOOD};
