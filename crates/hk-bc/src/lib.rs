//! hk-bc: block-structured boundary-condition file grammar.
//!
//! One generic tokenizer/reader/writer handles both on-disk dialects; the
//! differences (block-start key, header keys, first-column write transform)
//! live behind the [`dialect::Dialect`] trait.

pub mod block;
pub mod dialect;
pub mod error;
pub mod reader;
pub mod tokenize;
pub mod writer;

pub use block::{Block, QuantityColumn};
pub use dialect::{dialect_for_path, BcDialect, BcmDialect, Dialect};
pub use error::{BcError, BcResult};
pub use reader::{read_blocks, BlockReader};
pub use writer::{write_blocks, BlockWriter};
