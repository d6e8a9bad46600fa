//! Static lookup tables for the boundary-condition file family.
//!
//! Maps forcing-type names to their expected argument/component column
//! layout, interpolation and location-type identifiers to internal enums,
//! and domain quantities to the tokens the kernel expects on disk.

use std::fmt;

/// Column layout expected for one forcing type.
///
/// `argument_quantities` lists, in column order, the independent-variable
/// quantity names (commonly just `time`). `component_suffixes` lists the
/// suffixes a raw column name may end with to be recognized as a dependent
/// quantity; the empty suffix matches a bare quantity name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForcingTypeEntry {
    pub name: &'static str,
    pub argument_quantities: &'static [&'static str],
    pub component_suffixes: &'static [&'static str],
}

pub const FORCING_TYPES: [ForcingTypeEntry; 6] = [
    ForcingTypeEntry {
        name: "timeseries",
        argument_quantities: &["time"],
        component_suffixes: &[""],
    },
    ForcingTypeEntry {
        name: "t3d",
        argument_quantities: &["time"],
        component_suffixes: &[""],
    },
    ForcingTypeEntry {
        name: "constant",
        argument_quantities: &[],
        component_suffixes: &[""],
    },
    ForcingTypeEntry {
        name: "harmonic",
        argument_quantities: &["harmonic component"],
        component_suffixes: &["amplitude", "phase"],
    },
    ForcingTypeEntry {
        name: "astronomic",
        argument_quantities: &["astronomic component"],
        component_suffixes: &["amplitude", "phase"],
    },
    ForcingTypeEntry {
        name: "qh-table",
        argument_quantities: &["qhbnd discharge"],
        component_suffixes: &["qhbnd waterlevel"],
    },
];

/// Look up a forcing type by its on-disk name, case-insensitive.
pub fn forcing_type(name: &str) -> Option<&'static ForcingTypeEntry> {
    FORCING_TYPES
        .iter()
        .find(|entry| entry.name.eq_ignore_ascii_case(name.trim()))
}

/// Interpolation directive for a time argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InterpolationKind {
    Linear,
    BlockTo,
    BlockFrom,
}

impl InterpolationKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "linear" => Some(Self::Linear),
            "block-to" => Some(Self::BlockTo),
            "block-from" => Some(Self::BlockFrom),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::BlockTo => "block-to",
            Self::BlockFrom => "block-from",
        }
    }
}

impl fmt::Display for InterpolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Spatial scope of a forcing field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LocationType {
    #[default]
    Global,
    Feature,
    Polygon,
    Grid,
}

impl LocationType {
    /// Parse a location-type name; anything unknown falls back to `Global`.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "feature" => Self::Feature,
            "polygon" => Self::Polygon,
            "grid" => Self::Grid,
            _ => Self::Global,
        }
    }

    pub fn canonical_name(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Feature => "feature",
            Self::Polygon => "polygon",
            Self::Grid => "grid",
        }
    }
}

/// Placeholder written when a domain quantity has no kernel token.
pub const UNKNOWN_QUANTITY_NAME: &str = "unknown";

/// Physical quantity known to the modeling application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DomainQuantity {
    WaterLevel,
    Discharge,
    Velocity,
    Salinity,
    Temperature,
    SedimentConcentration,
    Precipitation,
    BedLevel,
}

impl DomainQuantity {
    /// The token the kernel expects on disk for this quantity.
    pub fn kernel_name(self) -> &'static str {
        match self {
            Self::WaterLevel => "waterlevelbnd",
            Self::Discharge => "dischargebnd",
            Self::Velocity => "velocitybnd",
            Self::Salinity => "salinitybnd",
            Self::Temperature => "temperaturebnd",
            Self::SedimentConcentration => "sedfracbnd",
            Self::Precipitation => "rainfall_rate",
            Self::BedLevel => "bed level",
        }
    }

    /// Reverse lookup from an on-disk token, case-insensitive.
    pub fn from_kernel_name(name: &str) -> Option<Self> {
        const ALL: [DomainQuantity; 8] = [
            DomainQuantity::WaterLevel,
            DomainQuantity::Discharge,
            DomainQuantity::Velocity,
            DomainQuantity::Salinity,
            DomainQuantity::Temperature,
            DomainQuantity::SedimentConcentration,
            DomainQuantity::Precipitation,
            DomainQuantity::BedLevel,
        ];
        ALL.into_iter()
            .find(|quantity| quantity.kernel_name().eq_ignore_ascii_case(name.trim()))
    }
}
