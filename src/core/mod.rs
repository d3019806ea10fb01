//! Error taxonomy and the small shared vocabulary of the pipeline:
//! report kinds, billing periods, invoice titles and duplicate markers.

mod error;
mod types;

pub use error::*;
pub use types::*;
