//! Per-import parse cache.
//!
//! A higher-level import may reference the same companion file from several
//! boundary definitions. The session memoizes parsed block lists by
//! canonical path so each file is read once; the cache lives only as long
//! as the session the caller owns.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use hk_bc::{read_blocks, Block, Dialect};
use tracing::debug;

use crate::error::ForcingResult;

#[derive(Default)]
pub struct ImportSession {
    cache: HashMap<PathBuf, Rc<Vec<Block>>>,
}

impl ImportSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks of `path`, parsed once per session.
    pub fn blocks(
        &mut self,
        path: impl AsRef<Path>,
        dialect: &dyn Dialect,
    ) -> ForcingResult<Rc<Vec<Block>>> {
        let path = path.as_ref();
        let key = path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf());
        if let Some(blocks) = self.cache.get(&key) {
            debug!(path = %key.display(), "serving blocks from session cache");
            return Ok(Rc::clone(blocks));
        }
        let blocks = Rc::new(read_blocks(path, dialect)?);
        self.cache.insert(key, Rc::clone(&blocks));
        Ok(blocks)
    }

    /// Number of distinct files parsed so far.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Drop every cached file; the next lookup re-reads from disk.
    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hk_bc::BcDialect;
    use std::io::Write;

    fn write_sample(path: &Path) {
        let mut file = std::fs::File::create(path).unwrap();
        write!(
            file,
            "\
forcing            pl1_0001
function           constant
quantity           'waterlevelbnd' unit 'm'
records-in-table   1
0.3
"
        )
        .unwrap();
    }

    #[test]
    fn second_lookup_is_served_from_cache() {
        let dir = std::env::temp_dir().join("hk-forcing-session-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("cache.bc");
        write_sample(&path);
        let path = path.canonicalize().unwrap();

        let mut session = ImportSession::new();
        let first = session.blocks(&path, &BcDialect).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(session.len(), 1);

        // Mutating the file on disk is not seen until the cache is cleared.
        std::fs::remove_file(&path).unwrap();
        let second = session.blocks(&path, &BcDialect).unwrap();
        assert!(Rc::ptr_eq(&first, &second));

        session.clear();
        assert!(session.blocks(&path, &BcDialect).is_err());
    }

    #[test]
    fn missing_file_fails_fast() {
        let mut session = ImportSession::new();
        assert!(session
            .blocks("definitely-not-here.bc", &BcDialect)
            .is_err());
    }
}
