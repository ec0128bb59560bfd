//! Configuration access port trait.

use crate::domain::error::OpenBellError;

/// Read access to sectioned key/value configuration.
///
/// Numeric getters return `default` when the key is absent and
/// `ConfigInvalid` when it is present but does not parse.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> Result<i64, OpenBellError>;
    fn get_double(&self, section: &str, key: &str, default: f64) -> Result<f64, OpenBellError>;
}
