//! Polarization markers (TE/TM).

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Polarization {
    /// Dominant Ex.
    TE,
    /// Dominant Ey.
    TM,
}

impl Polarization {
    /// Label from the share of transverse-E energy carried by Ex.
    pub fn from_te_fraction(te_fraction: f64) -> Self {
        if te_fraction >= 0.5 {
            Polarization::TE
        } else {
            Polarization::TM
        }
    }
}

impl fmt::Display for Polarization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Polarization::TE => f.write_str("TE"),
            Polarization::TM => f.write_str("TM"),
        }
    }
}
