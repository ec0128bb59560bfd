//! Market data access port trait.

use crate::domain::bar::Bar;
use crate::domain::error::OpenBellError;
use std::path::Path;

pub trait DataPort {
    /// Loads raw bars from `source` in file order, timestamps already in the
    /// reference timezone. Ordering is left for the resampler to enforce.
    fn load_bars(&self, source: &Path) -> Result<Vec<Bar>, OpenBellError>;
}
