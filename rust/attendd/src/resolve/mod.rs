//! Identifier resolution for loosely formatted import data.
//!
//! Everything here is pure: catalogs come in as slices and nothing touches
//! the workspace database.

mod class;
mod day;
mod error;
mod stream;
mod year;

pub use class::{resolve_class, ClassCatalogEntry};
pub use day::{check_period, day_label, normalize_day, parse_period};
pub use error::ResolveError;
pub use stream::{map_department_to_stream, Stream, StreamFallback};
pub use year::{expand_year_variants, year_token};
