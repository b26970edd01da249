//! Byte constants and block names for the NEXUS reader.

/// Nexus label delimiters: comma, semicolon, whitespace
pub(crate) const NEXUS_LABEL_DELIMITERS: &[u8] = b" ,;\t\n\r";

/// Tree name delimiters: `tree STATE_0 [&lnP=-12.3] = ...`
pub(crate) const TREE_NAME_DELIMITERS: &[u8] = b" =;[\t\n\r";

pub(crate) const NEXUS_HEADER: &[u8] = b"#NEXUS";

pub(crate) const BLOCK_BEGIN: &[u8] = b"Begin";

pub(crate) const BLOCK_END: &[u8] = b"End;";

/// Some writers close blocks with `ENDBLOCK;`
pub(crate) const BLOCK_ENDBLOCK: &[u8] = b"Endblock;";

// Taxa block
pub(crate) const DIMENSIONS: &[u8] = b"Dimensions";

pub(crate) const NTAX: &[u8] = b"ntax";

pub(crate) const TAXLABELS: &[u8] = b"Taxlabels";

// Tree block
pub(crate) const TRANSLATE: &[u8] = b"Translate";

pub(crate) const TREE: &[u8] = b"tree";

/// Kinds of NEXUS blocks; only TAXA and TREES are read, the rest skipped.
#[derive(Debug, PartialEq, Clone)]
pub(crate) enum NexusBlock {
    Taxa,
    Trees,
    Other(String),
}

impl NexusBlock {
    /// Parse a block name (case-insensitive) into a NexusBlock variant
    pub(crate) fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "taxa" => NexusBlock::Taxa,
            "trees" => NexusBlock::Trees,
            _ => NexusBlock::Other(name.to_string()),
        }
    }
}
