//! Sequential access to the trees of a posterior sample.
//!
//! [TreeStream] wraps a [TreeFileReader] so that at most a couple of trees
//! are held in memory at a time, whatever the size of the sample.

use crate::error::AnalysisError;
use crate::model::Tree;
use crate::nexus::{Burnin, TreeFileReader, TreeFileReaderBuilder};
use std::path::Path;

/// Progress interval when the number of trees is not known upfront.
const PROGRESS_EVERY: usize = 1000;

// =#========================================================================#=
// TREE STREAM
// =#========================================================================#=
/// Forward-only stream over the trees kept after burn-in.
///
/// Trees are addressed either sequentially via [next_tree](Self::next_tree)
/// or by their absolute position in the file via [get](Self::get); burn-in
/// trees count towards that position. Access never goes backwards.
///
/// # Example
/// ```no_run
/// use jumphistory::nexus::Burnin;
/// use jumphistory::stream::TreeStream;
///
/// let mut stream = TreeStream::open("h7n9.trees", Burnin::Count(1000))?;
/// while let Some(tree) = stream.next_tree()? {
///     println!("{} has height {}", tree.id(), tree.root_height());
/// }
/// # Ok::<(), jumphistory::error::AnalysisError>(())
/// ```
pub struct TreeStream {
    reader: TreeFileReader,
    /// Read ahead but not yet handed out
    lookahead: Option<(usize, Tree)>,
    /// Tree returned by the last [get](Self::get)
    cached: Option<(usize, Tree)>,
    /// Smallest index that may still be requested
    min_index: usize,
    num_read: usize,
}

impl TreeStream {
    /// Opens the tree file at `path` (NEXUS or Newick) and discards the burn-in.
    ///
    /// # Errors
    /// * [AnalysisError::Import] if the file cannot be read or the first
    ///   kept tree is malformed
    /// * [AnalysisError::EmptySample] if no tree remains after burn-in
    pub fn open<P: AsRef<Path>>(path: P, burn_in: Burnin) -> Result<Self, AnalysisError> {
        log::info!("Reading trees from {}", path.as_ref().display());
        let reader = TreeFileReaderBuilder::for_file(path)
            .with_burnin(burn_in)
            .build()?;
        Self::from_reader(reader, burn_in)
    }

    /// Opens a stream over tree file content held in a string.
    ///
    /// # Errors
    /// See [open](Self::open).
    pub fn for_str(content: &str, burn_in: Burnin) -> Result<Self, AnalysisError> {
        let reader = TreeFileReaderBuilder::for_file("<string>")
            .with_burnin(burn_in)
            .build_for_str(content)?;
        Self::from_reader(reader, burn_in)
    }

    /// Wraps a configured reader; `burn_in` is only used for error reporting.
    ///
    /// # Errors
    /// See [open](Self::open).
    pub fn from_reader(reader: TreeFileReader, burn_in: Burnin) -> Result<Self, AnalysisError> {
        let mut stream = TreeStream {
            reader,
            lookahead: None,
            cached: None,
            min_index: 0,
            num_read: 0,
        };

        stream.lookahead = stream.read_next()?;
        if stream.lookahead.is_none() {
            return Err(AnalysisError::EmptySample { burn_in });
        }
        Ok(stream)
    }

    /// Returns the number of trees kept after burn-in, if known upfront.
    pub fn num_trees(&self) -> Option<usize> {
        self.reader.num_trees()
    }

    /// Returns the next tree, `Ok(None)` at the end of the sample.
    ///
    /// # Errors
    /// Returns [AnalysisError::Import] on a malformed tree.
    pub fn next_tree(&mut self) -> Result<Option<Tree>, AnalysisError> {
        let next = match self.lookahead.take() {
            Some(entry) => Some(entry),
            None => self.read_next()?,
        };
        Ok(next.map(|(index, tree)| {
            self.min_index = index + 1;
            tree
        }))
    }

    /// Returns the tree at absolute position `index`, or `None` if the
    /// position lies in the burn-in or beyond the last tree.
    ///
    /// Repeating the last index returns the same tree again.
    ///
    /// # Panics
    /// Panics if `index` is smaller than a previously requested index
    /// (the stream cannot rewind).
    ///
    /// # Errors
    /// Returns [AnalysisError::Import] on a malformed tree.
    pub fn get(&mut self, index: usize) -> Result<Option<&Tree>, AnalysisError> {
        if let Some((cached_index, _)) = &self.cached
            && *cached_index == index
        {
            return Ok(self.cached.as_ref().map(|(_, tree)| tree));
        }
        assert!(
            index >= self.min_index,
            "TreeStream cannot rewind: requested tree {index} after tree {}",
            self.min_index.saturating_sub(1)
        );
        self.cached = None;

        loop {
            if self.lookahead.is_none() {
                // Skip without building while the target is further ahead
                while self.reader.next_index() < index {
                    if !self.reader.skip_tree()? {
                        break;
                    }
                }
                self.lookahead = self.read_next()?;
            }

            match self.lookahead.take() {
                None => return Ok(None),
                Some((next_index, _)) if next_index < index => continue,
                Some((next_index, tree)) if next_index == index => {
                    self.min_index = index;
                    self.cached = Some((index, tree));
                    return Ok(self.cached.as_ref().map(|(_, tree)| tree));
                }
                Some(entry) => {
                    self.lookahead = Some(entry);
                    self.min_index = index;
                    return Ok(None);
                }
            }
        }
    }

    /// Reads all remaining trees into memory.
    ///
    /// Needed by analyses that pass over the sample more than once; memory
    /// then grows with the number of trees.
    ///
    /// # Errors
    /// Returns [AnalysisError::Import] on a malformed tree.
    pub fn collect_all(mut self) -> Result<Vec<Tree>, AnalysisError> {
        let mut trees = Vec::with_capacity(self.num_trees().unwrap_or(0));
        while let Some(tree) = self.next_tree()? {
            trees.push(tree);
        }
        Ok(trees)
    }

    fn read_next(&mut self) -> Result<Option<(usize, Tree)>, AnalysisError> {
        let index = self.reader.next_index();
        let Some(tree) = self.reader.next_tree()? else {
            log::info!("Finished reading {} trees", self.num_read);
            return Ok(None);
        };
        self.num_read += 1;
        self.report_progress();
        log::debug!("Read tree {} (position {index})", tree.id());
        Ok(Some((index, tree)))
    }

    fn report_progress(&self) {
        match self.num_trees() {
            Some(total) if total >= 10 => {
                let step = total.div_ceil(10);
                if self.num_read % step == 0 {
                    log::info!(
                        "Read {}/{} trees ({}%)",
                        self.num_read,
                        total,
                        self.num_read * 100 / total
                    );
                }
            }
            Some(_) => {}
            None => {
                if self.num_read % PROGRESS_EVERY == 0 {
                    log::info!("Read {} trees", self.num_read);
                }
            }
        }
    }
}

impl Iterator for TreeStream {
    type Item = Result<Tree, AnalysisError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_tree().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TREES: &str = "(A:1,B:1);\n(A:2,B:2);\n(A:3,B:3);\n(A:4,B:4);\n";

    #[test]
    fn test_burn_in_and_sequential_access() {
        let mut stream = TreeStream::for_str(TREES, Burnin::Count(2)).unwrap();
        assert_eq!(stream.next_tree().unwrap().unwrap().root_height(), 3.0);
        assert_eq!(stream.next_tree().unwrap().unwrap().root_height(), 4.0);
        assert!(stream.next_tree().unwrap().is_none());
    }

    #[test]
    fn test_empty_after_burn_in() {
        let result = TreeStream::for_str(TREES, Burnin::Count(4));
        assert!(matches!(result, Err(AnalysisError::EmptySample { .. })));
    }

    #[test]
    fn test_get_is_monotonic_and_caches() {
        let mut stream = TreeStream::for_str(TREES, Burnin::Count(1)).unwrap();
        assert!(stream.get(0).unwrap().is_none());
        assert_eq!(stream.get(2).unwrap().unwrap().root_height(), 3.0);
        assert_eq!(stream.get(2).unwrap().unwrap().root_height(), 3.0);
        assert_eq!(stream.get(3).unwrap().unwrap().root_height(), 4.0);
        assert!(stream.get(7).unwrap().is_none());
    }

    #[test]
    #[should_panic(expected = "cannot rewind")]
    fn test_get_backwards_panics() {
        let mut stream = TreeStream::for_str(TREES, Burnin::Count(0)).unwrap();
        stream.get(2).unwrap();
        let _ = stream.get(1);
    }
}
