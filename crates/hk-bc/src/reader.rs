//! Lazy block reader.
//!
//! A [`BlockReader`] walks the file line by line and yields one [`Block`]
//! per iteration, so metadata-only scans never pull the whole file into
//! memory. Dropping the reader closes the underlying handle; re-reading a
//! file means opening a fresh reader.
//!
//! Tolerance contract: malformed rows and unknown blocks are warned and
//! skipped, never fatal. Only I/O failures surface as errors.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::block::{Block, QuantityColumn};
use crate::dialect::{Dialect, RECORD_COUNT_KEY};
use crate::error::{BcError, BcResult};
use crate::tokenize::split_line;

pub struct BlockReader<'d, R: BufRead> {
    dialect: &'d dyn Dialect,
    input: R,
    path: PathBuf,
    line_number: usize,
    /// Block-start tokens seen while finishing the previous block.
    pending_start: Option<(Vec<String>, usize)>,
    done: bool,
}

impl<'d> BlockReader<'d, BufReader<File>> {
    /// Open a file for block iteration. Missing or unreadable files fail
    /// here, before any iteration starts.
    pub fn open(path: impl AsRef<Path>, dialect: &'d dyn Dialect) -> BcResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| BcError::io(path, source))?;
        Ok(Self::new(BufReader::new(file), dialect, path))
    }
}

impl<'d, R: BufRead> BlockReader<'d, R> {
    /// Iterate blocks from any buffered source; `path` labels diagnostics.
    pub fn new(input: R, dialect: &'d dyn Dialect, path: impl Into<PathBuf>) -> Self {
        Self {
            dialect,
            input,
            path: path.into(),
            line_number: 0,
            pending_start: None,
            done: false,
        }
    }

    /// Next raw line, tolerant of non-UTF-8 bytes (Latin-1 files).
    fn next_line(&mut self) -> Option<std::io::Result<String>> {
        let mut bytes = Vec::new();
        match self.input.read_until(b'\n', &mut bytes) {
            Err(error) => Some(Err(error)),
            Ok(0) => None,
            Ok(_) => {
                self.line_number += 1;
                let mut line = String::from_utf8_lossy(&bytes).into_owned();
                while line.ends_with('\n') || line.ends_with('\r') {
                    line.pop();
                }
                Some(Ok(line))
            }
        }
    }

    fn tokenize(&self, line: &str) -> Vec<String> {
        let split = split_line(line);
        if split.unmatched_quote {
            warn!(
                path = %self.path.display(),
                line = self.line_number,
                "unmatched quote, treating line as plain text"
            );
        }
        split.tokens
    }

    /// Scan forward to the next block-start line.
    fn find_block_start(&mut self) -> BcResult<Option<(Vec<String>, usize)>> {
        if let Some(start) = self.pending_start.take() {
            return Ok(Some(start));
        }
        while let Some(line) = self.next_line() {
            let line = line.map_err(|source| BcError::io(&self.path, source))?;
            let tokens = self.tokenize(&line);
            let Some(key) = tokens.first() else {
                continue;
            };
            if key.eq_ignore_ascii_case(self.dialect.block_start_key()) {
                return Ok(Some((tokens, self.line_number)));
            }
            if self.dialect.is_file_header_key(key) {
                continue;
            }
            warn!(
                path = %self.path.display(),
                line = self.line_number,
                key = %key,
                "skipping unexpected top-level line"
            );
        }
        Ok(None)
    }

    /// Consume `count` declared data rows into the block's columns. Rows
    /// whose column count disagrees with the declared quantities are
    /// dropped with a warning; the declared line count is consumed either
    /// way.
    fn read_data_rows(&mut self, block: &mut Block, count: usize) -> BcResult<()> {
        for _ in 0..count {
            let Some(line) = self.next_line() else {
                break;
            };
            let line = line.map_err(|source| BcError::io(&self.path, source))?;
            let values = self.tokenize(&line);
            if !block.quantities.is_empty() && values.len() == block.quantities.len() {
                for (column, value) in block.quantities.iter_mut().zip(values) {
                    column.values.push(value);
                }
            } else {
                warn!(
                    path = %self.path.display(),
                    line = self.line_number,
                    expected = block.quantities.len(),
                    found = values.len(),
                    "dropping data row with mismatched column count"
                );
            }
        }
        Ok(())
    }

    fn parse_parameter(&self, tokens: &[String], block: &mut Block) {
        let Some(name) = tokens.get(1) else {
            warn!(
                path = %self.path.display(),
                line = self.line_number,
                "parameter line without a quantity name"
            );
            return;
        };
        let unit = match tokens.get(2) {
            Some(word) if word.eq_ignore_ascii_case("unit") => tokens.get(3).cloned(),
            _ => None,
        };
        block.quantities.push(QuantityColumn::new(name.clone(), unit));
    }

    /// Read one block body after its start line. Returns the finished block
    /// even when it will later be discarded by validation.
    fn read_block_body(&mut self, start: (Vec<String>, usize)) -> BcResult<Block> {
        let (tokens, start_line) = start;
        let mut block = Block::new(&self.path, start_line);
        self.dialect.begin_block(&tokens[1..].join(" "), &mut block);

        while let Some(line) = self.next_line() {
            let line = line.map_err(|source| BcError::io(&self.path, source))?;
            let tokens = self.tokenize(&line);
            let Some(key) = tokens.first() else {
                continue;
            };
            if key.eq_ignore_ascii_case(self.dialect.block_start_key()) {
                self.pending_start = Some((tokens, self.line_number));
                break;
            }
            if key.eq_ignore_ascii_case(self.dialect.parameter_key()) {
                self.parse_parameter(&tokens, &mut block);
            } else if key.eq_ignore_ascii_case(RECORD_COUNT_KEY) {
                let count = tokens
                    .get(1)
                    .and_then(|value| value.parse::<usize>().ok())
                    .unwrap_or_else(|| {
                        warn!(
                            path = %self.path.display(),
                            line = self.line_number,
                            "unreadable record count, assuming zero rows"
                        );
                        0
                    });
                self.read_data_rows(&mut block, count)?;
                break;
            } else {
                let value = tokens[1..].join(" ");
                self.dialect.apply_header(key, &value, &mut block);
            }
        }
        Ok(block)
    }

    /// Decide whether a finished block is yielded or discarded.
    fn validate(&self, block: Block) -> Option<Block> {
        if block.support_point.is_empty() || block.quantities.is_empty() {
            warn!(
                origin = %block.origin(),
                "discarding block without support point or data columns"
            );
            return None;
        }
        if !self.dialect.is_valid_function_type(&block.function_type) {
            warn!(
                origin = %block.origin(),
                support_point = %block.support_point,
                function_type = %block.function_type,
                "discarding block with unknown function type"
            );
            return None;
        }
        Some(block)
    }
}

impl<R: BufRead> Iterator for BlockReader<'_, R> {
    type Item = BcResult<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let start = match self.find_block_start() {
                Ok(Some(start)) => start,
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Err(error) => {
                    self.done = true;
                    return Some(Err(error));
                }
            };
            let block = match self.read_block_body(start) {
                Ok(block) => block,
                Err(error) => {
                    self.done = true;
                    return Some(Err(error));
                }
            };
            if let Some(block) = self.validate(block) {
                return Some(Ok(block));
            }
        }
    }
}

/// Read every block of a file eagerly.
pub fn read_blocks(path: impl AsRef<Path>, dialect: &dyn Dialect) -> BcResult<Vec<Block>> {
    BlockReader::open(path, dialect)?.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{BcDialect, BcmDialect};
    use std::io::Cursor;

    fn read_bc(text: &str) -> Vec<Block> {
        BlockReader::new(Cursor::new(text), &BcDialect, "test.bc")
            .collect::<BcResult<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn reads_a_timeseries_block() {
        let text = "\
general
file-version       1.01
file-type          boundConds

forcing            pl1_0001
function           timeseries
time-interpolation linear
quantity           'time' unit 'seconds since 2021-06-01 12:00:00'
quantity           'waterlevelbnd' unit 'm'
records-in-table   2
0     0.30
3600  0.45
";
        let blocks = read_bc(text);
        assert_eq!(blocks.len(), 1);
        let block = &blocks[0];
        assert_eq!(block.support_point, "pl1_0001");
        assert_eq!(block.function_type, "timeseries");
        assert_eq!(block.time_interpolation.as_deref(), Some("linear"));
        assert_eq!(block.quantities.len(), 2);
        assert_eq!(
            block.quantities[0].unit.as_deref(),
            Some("seconds since 2021-06-01 12:00:00")
        );
        assert_eq!(block.quantities[1].values, vec!["0.30", "0.45"]);
        assert_eq!(block.line_number, 5);
    }

    #[test]
    fn unknown_function_type_drops_only_that_block() {
        let text = "\
forcing            good
function           timeseries
quantity           'time' unit 'minutes since 2000-01-01'
records-in-table   1
0
forcing            bad
function           wavelet
quantity           'time' unit 'minutes since 2000-01-01'
records-in-table   1
0
";
        let blocks = read_bc(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].support_point, "good");
    }

    #[test]
    fn short_rows_are_dropped_not_fatal() {
        let text = "\
forcing            pl1_0001
function           timeseries
quantity           'time' unit 'minutes since 2000-01-01'
quantity           'dischargebnd' unit 'm3/s'
records-in-table   3
0    1.0
60
120  3.0
";
        let blocks = read_bc(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].row_count(), Some(2));
        assert_eq!(blocks[0].quantities[0].values, vec!["0", "120"]);
    }

    #[test]
    fn block_without_columns_is_discarded() {
        let text = "\
forcing            lonely
function           timeseries
records-in-table   0
";
        assert!(read_bc(text).is_empty());
    }

    #[test]
    fn stray_top_level_lines_are_skipped() {
        let text = "\
this is not a block
forcing            pl1_0001
function           constant
quantity           'waterlevelbnd' unit 'm'
records-in-table   1
0.30
";
        let blocks = read_bc(text);
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn reads_a_bcm_block() {
        let text = "\
table-name         'Boundary Section : 1'
contents           'Uniform'
location           pl1_0001
time-function      timeseries
reference-time     20210601
time-unit          minutes
interpolation      linear
parameter          'time' unit 'minutes'
parameter          'bed level' unit 'm'
records-in-table   2
720   1.5
780   1.6
";
        let blocks = BlockReader::new(Cursor::new(text), &BcmDialect, "test.bcm")
            .collect::<BcResult<Vec<_>>>()
            .unwrap();
        assert_eq!(blocks.len(), 1);
        let block = &blocks[0];
        assert_eq!(block.support_point, "pl1_0001");
        assert_eq!(block.function_type, "timeseries");
        assert_eq!(block.extra("table-name"), Some("Boundary Section : 1"));
        assert_eq!(block.extra("reference-time"), Some("20210601"));
        assert_eq!(block.extra("time-unit"), Some("minutes"));
        assert_eq!(block.quantities[1].quantity, "bed level");
    }

    #[test]
    fn early_termination_yields_only_requested_blocks() {
        let text = "\
forcing            one
function           constant
quantity           'waterlevelbnd' unit 'm'
records-in-table   1
0.1
forcing            two
function           constant
quantity           'waterlevelbnd' unit 'm'
records-in-table   1
0.2
";
        let mut reader = BlockReader::new(Cursor::new(text), &BcDialect, "test.bc");
        let first = reader.next().unwrap().unwrap();
        assert_eq!(first.support_point, "one");
        drop(reader);
    }

    #[test]
    fn rereading_same_text_is_structurally_equal() {
        let text = "\
forcing            pl1_0001
function           timeseries
quantity           'time' unit 'minutes since 2000-01-01'
records-in-table   1
0
";
        assert_eq!(read_bc(text), read_bc(text));
    }
}
