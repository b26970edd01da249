//! Reader for tree files as written by BEAST: NEXUS, or plain Newick lists.
//!
//! This module provides [TreeFileReaderBuilder] / [TreeFileReader], a lazy
//! reader returning one [Tree](crate::model::Tree) at a time, with options
//! for burnin and skipping the initial tree.
//!
//! # Format
//! A NEXUS file typically contains:
//! - An optional TAXA block defining the taxa
//! - A TREES block containing the sampled trees
//! - An optional TRANSLATE command mapping short keys to full taxon labels
//!
//! Files not starting with `#NEXUS` are read as semicolon-separated Newick lists.
//!
//! ## Assumptions
//! * A `TRANSLATE` command, if present, precedes any `TREE` command:
//!   - Comma separated list of pairs `<key> <label>`
//!   - A label with a space in it must be enclosed in single quotes
//!   - An apostrophe inside a quoted label is escaped by doubling it,
//!     e.g. `'Wilson''s storm-petrel'`
//! * One tree command has format `tree <name> [comments] = <Newick string>;`
//! * Blocks other than TAXA and TREES are skipped

mod defs;
mod parser;

pub use self::parser::{Burnin, TreeFileFormat, TreeFileReader, TreeFileReaderBuilder};

use crate::model::Tree;
use crate::parser::ParsingError;
use std::path::Path;

// ============================================================================
// QUICK PARSING API (pub)
// ============================================================================
/// Parses a NEXUS or Newick tree file eagerly and returns all trees after
/// the given burnin.
///
/// # Arguments
/// * `path` - Path to the file (accepting `&str`, `String`, `Path`, or `PathBuf`)
/// * `burnin` - Initial trees to discard
///
/// # Errors
/// Returns an error if the file cannot be opened or parsed.
pub fn parse_file<P: AsRef<Path>>(path: P, burnin: Burnin) -> Result<Vec<Tree>, ParsingError> {
    let mut reader = TreeFileReaderBuilder::for_file(path)
        .with_burnin(burnin)
        .build()?;

    let mut trees = Vec::new();
    while let Some(tree) = reader.next_tree()? {
        trees.push(tree);
    }
    Ok(trees)
}
