//! OIFITS table kinds, standard revisions and well-known keyword/column names.
//!
//! Pure data; no column storage here (see `types` and `model`).

use std::fmt;

use serde::{Deserialize, Serialize};

/// OIFITS standard revision. `V1 < V2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OiStandard {
    V1,
    V2,
}

impl fmt::Display for OiStandard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OiStandard::V1 => write!(f, "OIFITS V1"),
            OiStandard::V2 => write!(f, "OIFITS V2"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TableKind {
    Target,
    Array,
    Wavelength,
    Corr,
    Vis,
    Vis2,
    T3,
    Flux,
}

impl TableKind {
    pub const DATA: [TableKind; 4] = [TableKind::Vis, TableKind::Vis2, TableKind::T3, TableKind::Flux];

    pub fn extname(self) -> &'static str {
        match self {
            TableKind::Target => "OI_TARGET",
            TableKind::Array => "OI_ARRAY",
            TableKind::Wavelength => "OI_WAVELENGTH",
            TableKind::Corr => "OI_CORR",
            TableKind::Vis => "OI_VIS",
            TableKind::Vis2 => "OI_VIS2",
            TableKind::T3 => "OI_T3",
            TableKind::Flux => "OI_FLUX",
        }
    }

    pub fn from_extname(name: &str) -> Option<Self> {
        Some(match name.trim() {
            "OI_TARGET" => TableKind::Target,
            "OI_ARRAY" => TableKind::Array,
            "OI_WAVELENGTH" => TableKind::Wavelength,
            "OI_CORR" => TableKind::Corr,
            "OI_VIS" => TableKind::Vis,
            "OI_VIS2" => TableKind::Vis2,
            "OI_T3" => TableKind::T3,
            "OI_FLUX" => TableKind::Flux,
            _ => return None,
        })
    }

    pub fn is_data(self) -> bool {
        matches!(
            self,
            TableKind::Vis | TableKind::Vis2 | TableKind::T3 | TableKind::Flux
        )
    }

    /// Keyword holding the name this table defines (metadata tables only).
    pub fn name_keyword(self) -> Option<&'static str> {
        match self {
            TableKind::Array => Some(keywords::ARRNAME),
            TableKind::Wavelength => Some(keywords::INSNAME),
            TableKind::Corr => Some(keywords::CORRNAME),
            _ => None,
        }
    }

    /// Oldest standard able to carry this table.
    pub fn min_standard(self) -> OiStandard {
        match self {
            TableKind::Corr | TableKind::Flux => OiStandard::V2,
            _ => OiStandard::V1,
        }
    }

    /// Stations per measurement (STA_INDEX width) for data tables.
    pub fn nb_stations(self) -> usize {
        match self {
            TableKind::Vis | TableKind::Vis2 => 2,
            TableKind::T3 => 3,
            TableKind::Flux => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extname())
    }
}

pub mod keywords {
    pub const EXTNAME: &str = "EXTNAME";
    pub const OI_REVN: &str = "OI_REVN";
    pub const DATE_OBS: &str = "DATE-OBS";
    pub const ARRNAME: &str = "ARRNAME";
    pub const INSNAME: &str = "INSNAME";
    pub const CORRNAME: &str = "CORRNAME";
}

pub mod columns {
    // OI_TARGET
    pub const TARGET_ID: &str = "TARGET_ID";
    pub const TARGET: &str = "TARGET";
    pub const RAEP0: &str = "RAEP0";
    pub const DECEP0: &str = "DECEP0";
    // OI_ARRAY
    pub const TEL_NAME: &str = "TEL_NAME";
    pub const STA_NAME: &str = "STA_NAME";
    // OI_WAVELENGTH
    pub const EFF_WAVE: &str = "EFF_WAVE";
    pub const EFF_BAND: &str = "EFF_BAND";
    // data tables
    pub const TIME: &str = "TIME";
    pub const MJD: &str = "MJD";
    pub const INT_TIME: &str = "INT_TIME";
    pub const STA_INDEX: &str = "STA_INDEX";
    pub const FLAG: &str = "FLAG";
    pub const UCOORD: &str = "UCOORD";
    pub const VCOORD: &str = "VCOORD";
    pub const VISAMP: &str = "VISAMP";
    pub const VISAMPERR: &str = "VISAMPERR";
    pub const VISPHI: &str = "VISPHI";
    pub const VISPHIERR: &str = "VISPHIERR";
    pub const VIS2DATA: &str = "VIS2DATA";
    pub const VIS2ERR: &str = "VIS2ERR";
    pub const T3AMP: &str = "T3AMP";
    pub const T3AMPERR: &str = "T3AMPERR";
    pub const T3PHI: &str = "T3PHI";
    pub const T3PHIERR: &str = "T3PHIERR";
    pub const FLUXDATA: &str = "FLUXDATA";
    pub const FLUXERR: &str = "FLUXERR";
    // derived
    pub const NIGHT_ID: &str = "NIGHT_ID";
    pub const STA_CONF: &str = "STA_CONF";
    pub const BASELINE: &str = "BASELINE";
    pub const SPATIAL_FREQ: &str = "SPATIAL_FREQ";
}

/// Per-channel (row×channel) columns of data tables, stored or derived.
pub fn is_2d_column(name: &str) -> bool {
    use columns::*;
    matches!(
        name,
        FLAG | VISAMP
            | VISAMPERR
            | VISPHI
            | VISPHIERR
            | VIS2DATA
            | VIS2ERR
            | T3AMP
            | T3AMPERR
            | T3PHI
            | T3PHIERR
            | FLUXDATA
            | FLUXERR
            | SPATIAL_FREQ
    )
}
