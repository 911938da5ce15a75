//! Small pure helpers used by the controllers.

pub mod fuzzy;
pub mod math;

pub use fuzzy::{fuzzy_cmp, fuzzy_search, prefix_search};
pub use math::{change_with_step, clamp, to_precision, MAX_PRECISION};
