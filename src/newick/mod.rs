//! Newick parser for annotated phylogenetic trees.
//!
//! This module provides [`NewickParser`] to parse Newick strings into
//! [`Tree`]s. It may be used directly on plain Newick files or by the
//! [nexus](crate::nexus) reader on the body of each `tree` command.
//!
//! # Quick API
//! * [`parse_file`] - parses all trees of a file
//! * [`parse_str`] - parses a single string
//!
//! # Format
//! The Newick format has the following simple grammar:
//! * `tree ::= vertex ';'`
//! * `vertex ::= leaf | internal_vertex`
//! * `internal_vertex ::= '(' vertex ',' vertex ')' [annotation] [branch_length]`
//! * `leaf ::= label [annotation] [branch_length]`
//! * `branch_length ::= ':' [annotation] number [annotation]`
//! * `annotation ::= '[&' key '=' value (',' key '=' value)* ']'`
//! * `value ::= number | label | '{' value (',' value)* '}'`
//!
//! Furthermore:
//! * Whitespace can occur between elements,
//!   just not within an unquoted label or a branch_length
//! * Comments are square brackets not starting with `&` and can occur
//!   anywhere where whitespace is allowed
//!
//! Markov-jump histories, as logged by BEAST, are nested annotation values:
//! * `A[&location="Hubei",history={{2.5,Fujian,Hubei}}]:1.0`

mod defs;
mod parser;

pub use self::parser::{NewickIterator, NewickParser};

use crate::model::Tree;
use crate::parser::ByteParser;
use crate::parser::ParsingError;
use std::path::Path;

// ============================================================================
// QUICK PARSING API (pub)
// ============================================================================
/// Parses a file containing a semicolon-separated list of Newick strings.
///
/// # Arguments
/// * `path` - Path to the file (accepting `&str`, `String`, `Path`, or `PathBuf`)
///
/// # Errors
/// Returns a [`ParsingError`] if file reading fails or a tree is invalid.
///
/// # Example
/// ```ignore
/// use jumphistory::newick::parse_file;
///
/// let trees = parse_file("h7n9.trees.nwk")?;
/// println!("Parsed {} trees", trees.len());
/// ```
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Vec<Tree>, ParsingError> {
    let byte_parser = ByteParser::from_file_in_memory(path)?;
    NewickParser::new().parse_all(byte_parser)
}

/// Parses a single Newick string.
///
/// # Errors
/// Returns a [`ParsingError`] if the string is not valid Newick format.
///
/// # Example
/// ```
/// use jumphistory::newick::parse_str;
///
/// let tree = parse_str("(A[&location=X]:1,B[&location=Y]:2)[&location=Y];").unwrap();
/// assert_eq!(tree.root_height(), 2.0);
/// ```
pub fn parse_str<S: AsRef<str>>(newick: S) -> Result<Tree, ParsingError> {
    let mut byte_parser = ByteParser::for_str(newick.as_ref());
    NewickParser::new().parse_str(&mut byte_parser)
}
