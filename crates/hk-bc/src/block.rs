//! Block data model shared by both dialects.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One data column of a block: a quantity name, an optional unit clause and
/// the raw textual values. Values stay unparsed until resolution because
/// dialects interpret them differently per quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityColumn {
    pub quantity: String,
    pub unit: Option<String>,
    pub values: Vec<String>,
}

impl QuantityColumn {
    pub fn new(quantity: impl Into<String>, unit: Option<String>) -> Self {
        Self {
            quantity: quantity.into(),
            unit,
            values: Vec::new(),
        }
    }
}

/// One self-contained record of a boundary-condition file.
///
/// Dialect-specific header fields (`contents`, `reference-time`, ...) live
/// in `extras` as an ordered key/value list; the dialect interprets them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub support_point: String,
    pub function_type: String,
    pub time_interpolation: Option<String>,
    pub quantities: Vec<QuantityColumn>,
    pub extras: Vec<(String, String)>,
    pub file_path: PathBuf,
    pub line_number: usize,
}

impl Block {
    pub fn new(file_path: impl Into<PathBuf>, line_number: usize) -> Self {
        Self {
            support_point: String::new(),
            function_type: String::new(),
            time_interpolation: None,
            quantities: Vec::new(),
            extras: Vec::new(),
            file_path: file_path.into(),
            line_number,
        }
    }

    /// Value of a dialect-specific header field, if present.
    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extras
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    /// Set a dialect-specific header field, replacing an existing one in
    /// place so header order stays stable.
    pub fn set_extra(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .extras
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
        {
            Some(entry) => entry.1 = value,
            None => self.extras.push((key.to_string(), value)),
        }
    }

    /// Shared row count, `None` when the columns disagree.
    pub fn row_count(&self) -> Option<usize> {
        let mut rows = self.quantities.iter().map(|column| column.values.len());
        let first = rows.next().unwrap_or(0);
        if rows.all(|len| len == first) {
            Some(first)
        } else {
            None
        }
    }

    /// Short provenance label for diagnostics.
    pub fn origin(&self) -> String {
        format!("{}:{}", self.file_path.display(), self.line_number)
    }
}
