//! hk-forcing: reconciliation between parsed blocks and forcing fields.
//!
//! The resolver decides which block columns are arguments and which are
//! components, parses values into typed series, and builds blocks back from
//! fields on the write path. The session memoizes parsed companion files
//! within one import.

pub mod error;
pub mod resolver;
pub mod session;

pub use error::{ForcingError, ForcingResult};
pub use resolver::{create_block_data, insert_boundary_data, InsertReport};
pub use session::ImportSession;
