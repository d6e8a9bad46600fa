//! Block rendering.
//!
//! Keys are padded to the dialect's key column width; data rows are padded
//! per column to the widest value plus one, with trailing whitespace
//! trimmed. Block numbering within one write session is plain local state
//! on the writer.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::block::Block;
use crate::dialect::{Dialect, RECORD_COUNT_KEY};
use crate::error::{BcError, BcResult};

pub struct BlockWriter<'d, W: Write> {
    dialect: &'d dyn Dialect,
    out: W,
    path: PathBuf,
    blocks_written: usize,
    number_blocks: bool,
}

impl<'d, W: Write> BlockWriter<'d, W> {
    /// Wrap any sink; `path` labels I/O errors and warnings.
    pub fn new(out: W, dialect: &'d dyn Dialect, path: impl Into<PathBuf>) -> Self {
        Self {
            dialect,
            out,
            path: path.into(),
            blocks_written: 0,
            number_blocks: false,
        }
    }

    /// Stamp each block with the dialect's index key and the 1-based
    /// session counter, for files whose support points may repeat. Blocks
    /// already carrying an explicit index keep it.
    pub fn number_blocks(mut self, enabled: bool) -> Self {
        self.number_blocks = enabled;
        self
    }

    fn io(&self, source: std::io::Error) -> BcError {
        BcError::io(&self.path, source)
    }

    /// Emit the dialect's file header, if it has one. Skipped by callers
    /// appending to an existing file.
    pub fn write_file_header(&mut self) -> BcResult<()> {
        let entries = self.dialect.file_header_entries();
        if entries.is_empty() {
            return Ok(());
        }
        let width = self.dialect.key_column_width();
        for (key, value) in entries {
            let line = render_entry(key, value, width);
            writeln!(self.out, "{line}").map_err(|e| self.io(e))?;
        }
        writeln!(self.out).map_err(|e| self.io(e))?;
        Ok(())
    }

    /// Render one block. A block whose columns disagree on row count is not
    /// writable; it is skipped with a warning.
    pub fn write_block(&mut self, block: &Block) -> BcResult<()> {
        let mut prepared = self.dialect.prepare_for_write(block)?;
        let Some(rows) = prepared.row_count() else {
            warn!(
                origin = %prepared.origin(),
                support_point = %prepared.support_point,
                "skipping block with mismatched column lengths"
            );
            return Ok(());
        };

        self.blocks_written += 1;
        if self.number_blocks {
            if let Some(key) = self.dialect.block_index_key() {
                if prepared.extra(key).is_none() {
                    prepared.set_extra(key, self.blocks_written.to_string());
                }
            }
        }
        let width = self.dialect.key_column_width();

        let start_value = self.dialect.block_start_value(&prepared, self.blocks_written);
        let start = render_entry(self.dialect.block_start_key(), &start_value, width);
        writeln!(self.out, "{start}").map_err(|e| self.io(e))?;

        for (key, value) in self.dialect.header_entries(&prepared) {
            let line = render_entry(&key, &value, width);
            writeln!(self.out, "{line}").map_err(|e| self.io(e))?;
        }

        for column in &prepared.quantities {
            let mut line = format!(
                "{:<width$}'{}'",
                self.dialect.parameter_key(),
                column.quantity
            );
            if let Some(unit) = &column.unit {
                line.push_str(&format!(" unit '{unit}'"));
            }
            writeln!(self.out, "{line}").map_err(|e| self.io(e))?;
        }

        if rows > 0 {
            let count_line = render_entry(RECORD_COUNT_KEY, &rows.to_string(), width);
            writeln!(self.out, "{count_line}").map_err(|e| self.io(e))?;

            let widths: Vec<usize> = prepared
                .quantities
                .iter()
                .map(|column| column.values.iter().map(|value| value.len()).max().unwrap_or(0) + 1)
                .collect();
            for row in 0..rows {
                let mut line = String::new();
                for (column, pad) in prepared.quantities.iter().zip(&widths) {
                    line.push_str(&format!("{:<pad$}", column.values[row]));
                }
                writeln!(self.out, "{}", line.trim_end()).map_err(|e| self.io(e))?;
            }
        }

        writeln!(self.out).map_err(|e| self.io(e))?;
        Ok(())
    }

    /// Blocks rendered so far in this session.
    pub fn blocks_written(&self) -> usize {
        self.blocks_written
    }

    pub fn finish(mut self) -> BcResult<W> {
        self.out.flush().map_err(|e| self.io(e))?;
        Ok(self.out)
    }
}

/// Render a `key value` header line; a bare key when the value is empty,
/// the value quoted when it contains whitespace.
fn render_entry(key: &str, value: &str, width: usize) -> String {
    if value.is_empty() {
        return key.to_string();
    }
    if value.contains(char::is_whitespace) {
        format!("{key:<width$}'{value}'")
    } else {
        format!("{key:<width$}{value}")
    }
}

/// Write blocks to a file, optionally appending. Appending suppresses the
/// file header.
pub fn write_blocks(
    path: impl AsRef<Path>,
    dialect: &dyn Dialect,
    blocks: &[Block],
    append: bool,
) -> BcResult<()> {
    let path = path.as_ref();
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .append(append)
        .truncate(!append)
        .open(path)
        .map_err(|source| BcError::io(path, source))?;
    let mut writer = BlockWriter::new(BufWriter::new(file), dialect, path);
    if !append {
        writer.write_file_header()?;
    }
    for block in blocks {
        writer.write_block(block)?;
    }
    writer.finish()?;
    Ok(())
}
