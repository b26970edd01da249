//! Byte constants for the Newick parser.

/// Newick label delimiters: parentheses, comma, colon, semicolon, whitespace, brackets
pub(crate) const NEWICK_LABEL_DELIMITERS: &[u8] = b"([,:; \n\t\r)]";

/// Bytes ending an annotation key: `key=value`
pub(crate) const ANNOTATION_KEY_DELIMITERS: &[u8] = b"=,] \n\t\r";

/// Bytes ending an unquoted annotation value, e.g. the `2.5` in `{2.5,A,B}`
pub(crate) const ANNOTATION_VALUE_DELIMITERS: &[u8] = b",{}] \n\t\r";

/// Opening of an annotation block, `[&key=value,...]`
pub(crate) const ANNOTATION_START: &[u8] = b"[&";

/// Default guess for number of leaves, when unknown
pub(crate) const DEFAULT_NUM_LEAVES_GUESS: usize = 10;
