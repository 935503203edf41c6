use serde::{Deserialize, Serialize};
use std::fmt;

/// EPSG-coded coordinate reference system tag.
///
/// Every dataset wrapper in this crate carries one, and any operation
/// combining two datasets checks them for equality instead of relying
/// on convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Crs(u32);

impl Crs {
    /// Geographic longitude/latitude on WGS 84.
    pub const WGS84: Crs = Crs(4326);

    pub const fn epsg(code: u32) -> Self {
        Crs(code)
    }

    pub const fn code(self) -> u32 {
        self.0
    }
}

impl Default for Crs {
    fn default() -> Self {
        Self::WGS84
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}
