//! Typed data series exchanged between the file layer and the model.
//!
//! A [`ForcingField`] is the in-memory shape of one forcing definition at
//! one support point: its argument series (independent variables, usually
//! time) and component series (dependent values). The file layer fills
//! these from parsed blocks; the model consumes them directly.

use chrono::NaiveDateTime;

use crate::catalog::{DomainQuantity, InterpolationKind, LocationType};

/// How the values of a series are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueKind {
    #[default]
    Text,
    Float,
    Timestamp,
}

/// One parsed value of a series.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SeriesValue {
    Text(String),
    Float(f64),
    Timestamp(NaiveDateTime),
}

impl SeriesValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Text(_) => ValueKind::Text,
            Self::Float(_) => ValueKind::Float,
            Self::Timestamp(_) => ValueKind::Timestamp,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }
}

/// One column of a forcing definition, after type resolution.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DataSeries {
    /// Raw quantity name as it appeared in the file.
    pub name: String,
    pub kind: ValueKind,
    /// Resolved domain quantity, when the name maps to one.
    pub quantity: Option<DomainQuantity>,
    pub unit: String,
    pub values: Vec<SeriesValue>,
    /// Only meaningful on argument series.
    pub interpolation: Option<InterpolationKind>,
}

impl DataSeries {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A complete forcing definition for one support point.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ForcingField {
    /// Support point name, matching the block header name on disk.
    pub name: String,
    pub location_type: LocationType,
    /// Forcing-type name as listed in the catalog.
    pub function_type: String,
    pub arguments: Vec<DataSeries>,
    pub components: Vec<DataSeries>,
}

impl ForcingField {
    pub fn new(name: impl Into<String>, function_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location_type: LocationType::default(),
            function_type: function_type.into(),
            arguments: Vec::new(),
            components: Vec::new(),
        }
    }

    /// All series in on-disk column order: arguments first, then components.
    pub fn all_series(&self) -> impl Iterator<Item = &DataSeries> {
        self.arguments.iter().chain(self.components.iter())
    }

    /// Row count shared by the series, zero when any series is empty.
    pub fn row_count(&self) -> usize {
        self.all_series().map(DataSeries::len).min().unwrap_or(0)
    }
}
