//! The two on-disk dialects behind one grammar.
//!
//! The reader and writer are generic; everything dialect-specific comes
//! through [`Dialect`]: which key opens a block, how header keys map onto
//! [`Block`] fields, which file header to emit, and the first-column
//! rewrite the morphology flavour applies on write.

use std::path::Path;

use chrono::NaiveTime;
use hk_core::catalog::forcing_type;
use hk_core::time::{
    format_offset_value, offset_between, parse_absolute_timestamp, TimeUnit,
    REFERENCE_DATE_FORMAT,
};

use crate::block::Block;
use crate::error::BcResult;

/// File-header values for the generic dialect.
pub const BC_FILE_VERSION: &str = "1.01";
pub const BC_FILE_TYPE: &str = "boundConds";

/// Row-count marker shared by both dialects.
pub const RECORD_COUNT_KEY: &str = "records-in-table";

pub trait Dialect {
    fn name(&self) -> &'static str;

    /// Key whose appearance opens a new block.
    fn block_start_key(&self) -> &'static str;

    /// Key introducing one data column.
    fn parameter_key(&self) -> &'static str;

    /// Every fixed key the dialect can emit; drives key-column alignment.
    fn fixed_keys(&self) -> &'static [&'static str];

    /// Record the block-start line's value on a fresh block.
    fn begin_block(&self, value: &str, block: &mut Block);

    /// Route one header key/value onto the block.
    fn apply_header(&self, key: &str, value: &str, block: &mut Block);

    /// Value for the block-start line. `index` is the 1-based position of
    /// the block within the write session.
    fn block_start_value(&self, block: &Block, index: usize) -> String;

    /// Header lines after the block-start line, in write order.
    fn header_entries(&self, block: &Block) -> Vec<(String, String)>;

    /// Rewrite a block into its on-disk shape. The generic dialect writes
    /// blocks verbatim.
    fn prepare_for_write(&self, block: &Block) -> BcResult<Block> {
        Ok(block.clone())
    }

    /// File-header lines emitted before the first block.
    fn file_header_entries(&self) -> &'static [(&'static str, &'static str)] {
        &[]
    }

    /// Header key carrying a per-session block index, for dialects whose
    /// files may repeat a support point.
    fn block_index_key(&self) -> Option<&'static str> {
        None
    }

    /// Top-level keys that belong to the file header, not to any block.
    fn is_file_header_key(&self, key: &str) -> bool {
        self.file_header_entries()
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case(key))
    }

    fn is_valid_function_type(&self, name: &str) -> bool {
        forcing_type(name).is_some()
    }

    /// Key column width: longest fixed key plus one.
    fn key_column_width(&self) -> usize {
        self.fixed_keys()
            .iter()
            .map(|key| key.len())
            .max()
            .unwrap_or(0)
            + 1
    }
}

/// Dialect A: generic boundary-condition blocks (`forcing` / `quantity`).
#[derive(Debug, Clone, Copy, Default)]
pub struct BcDialect;

impl Dialect for BcDialect {
    fn name(&self) -> &'static str {
        "bc"
    }

    fn block_start_key(&self) -> &'static str {
        "forcing"
    }

    fn parameter_key(&self) -> &'static str {
        "quantity"
    }

    fn fixed_keys(&self) -> &'static [&'static str] {
        &[
            "forcing",
            "function",
            "time-interpolation",
            "function-index",
            "offset",
            "factor",
            "quantity",
            "unit",
            RECORD_COUNT_KEY,
        ]
    }

    fn begin_block(&self, value: &str, block: &mut Block) {
        block.support_point = value.to_string();
    }

    fn apply_header(&self, key: &str, value: &str, block: &mut Block) {
        if key.eq_ignore_ascii_case("function") {
            block.function_type = value.to_string();
        } else if key.eq_ignore_ascii_case("time-interpolation") {
            block.time_interpolation = Some(value.to_string());
        } else {
            block.extras.push((key.to_string(), value.to_string()));
        }
    }

    fn block_start_value(&self, block: &Block, _index: usize) -> String {
        block.support_point.clone()
    }

    fn header_entries(&self, block: &Block) -> Vec<(String, String)> {
        let mut entries = vec![("function".to_string(), block.function_type.clone())];
        if let Some(interpolation) = &block.time_interpolation {
            entries.push(("time-interpolation".to_string(), interpolation.clone()));
        }
        entries.extend(block.extras.iter().cloned());
        entries
    }

    fn file_header_entries(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("general", ""),
            ("file-version", BC_FILE_VERSION),
            ("file-type", BC_FILE_TYPE),
        ]
    }

    fn block_index_key(&self) -> Option<&'static str> {
        Some("function-index")
    }
}

/// Dialect B: morphology-flavoured `.bcm` blocks (`table-name` /
/// `parameter`, minutes-from-reference first column).
#[derive(Debug, Clone, Copy, Default)]
pub struct BcmDialect;

/// Extras key holding the table label of a block read from disk.
pub const TABLE_NAME_KEY: &str = "table-name";

impl Dialect for BcmDialect {
    fn name(&self) -> &'static str {
        "bcm"
    }

    fn block_start_key(&self) -> &'static str {
        TABLE_NAME_KEY
    }

    fn parameter_key(&self) -> &'static str {
        "parameter"
    }

    fn fixed_keys(&self) -> &'static [&'static str] {
        &[
            TABLE_NAME_KEY,
            "location",
            "contents",
            "time-function",
            "reference-time",
            "time-unit",
            "interpolation",
            "parameter",
            RECORD_COUNT_KEY,
        ]
    }

    fn begin_block(&self, value: &str, block: &mut Block) {
        block.extras.push((TABLE_NAME_KEY.to_string(), value.to_string()));
    }

    fn apply_header(&self, key: &str, value: &str, block: &mut Block) {
        if key.eq_ignore_ascii_case("location") {
            block.support_point = value.to_string();
        } else if key.eq_ignore_ascii_case("time-function") {
            block.function_type = value.to_string();
        } else if key.eq_ignore_ascii_case("interpolation") {
            block.time_interpolation = Some(value.to_string());
        } else {
            block.extras.push((key.to_string(), value.to_string()));
        }
    }

    fn block_start_value(&self, block: &Block, index: usize) -> String {
        match block.extra(TABLE_NAME_KEY) {
            Some(label) => label.to_string(),
            None => format!("Boundary Section : {index}"),
        }
    }

    fn header_entries(&self, block: &Block) -> Vec<(String, String)> {
        let mut entries = vec![("location".to_string(), block.support_point.clone())];
        if let Some(contents) = block.extra("contents") {
            entries.push(("contents".to_string(), contents.to_string()));
        }
        entries.push(("time-function".to_string(), block.function_type.clone()));
        if let Some(reference) = block.extra("reference-time") {
            entries.push(("reference-time".to_string(), reference.to_string()));
        }
        if let Some(unit) = block.extra("time-unit") {
            entries.push(("time-unit".to_string(), unit.to_string()));
        }
        if let Some(interpolation) = &block.time_interpolation {
            entries.push(("interpolation".to_string(), interpolation.clone()));
        }
        for (key, value) in &block.extras {
            let known = key.eq_ignore_ascii_case(TABLE_NAME_KEY)
                || key.eq_ignore_ascii_case("contents")
                || key.eq_ignore_ascii_case("reference-time")
                || key.eq_ignore_ascii_case("time-unit");
            if !known {
                entries.push((key.clone(), value.clone()));
            }
        }
        entries
    }

    /// Rewrite the first column from absolute `YYYYMMDDHHMMSS` timestamps
    /// into minutes elapsed from the block reference time. The reference is
    /// midnight of the first timestamp's date; a block that already carries
    /// a `reference-time` header was read from disk and is written verbatim.
    fn prepare_for_write(&self, block: &Block) -> BcResult<Block> {
        if block.extra("reference-time").is_some() {
            return Ok(block.clone());
        }
        let Some(first) = block.quantities.first() else {
            return Ok(block.clone());
        };
        let Some(first_value) = first.values.first() else {
            return Ok(block.clone());
        };

        let origin = block.origin();
        let reference = parse_absolute_timestamp(first_value, &origin)?
            .date()
            .and_time(NaiveTime::MIN);

        let mut prepared = block.clone();
        let column = &mut prepared.quantities[0];
        for value in &mut column.values {
            let instant = parse_absolute_timestamp(value, &origin)?;
            *value = format_offset_value(offset_between(reference, instant, TimeUnit::Minutes));
        }
        prepared.set_extra(
            "reference-time",
            reference.format(REFERENCE_DATE_FORMAT).to_string(),
        );
        prepared.set_extra("time-unit", "minutes");
        Ok(prepared)
    }
}

/// Pick the dialect a path is written in, from its extension.
pub fn dialect_for_path(path: &Path) -> &'static dyn Dialect {
    static BC: BcDialect = BcDialect;
    static BCM: BcmDialect = BcmDialect;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("bcm") => &BCM,
        _ => &BC,
    }
}
