use crate::model::label_resolver::LabelResolver;
use crate::model::tree::Tree;
use crate::newick::NewickParser;
use crate::nexus::defs::*;
use crate::parser::buffered_byte_source::BufferedByteSource;
use crate::parser::byte_parser::{ByteParser, ReadStrategy};
use crate::parser::byte_source::ByteSource;
use crate::parser::in_memory_byte_source::InMemoryByteSource;
use crate::parser::parsing_error::ParsingError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

// =#========================================================================#=
// BURNIN
// =#========================================================================#=
/// Specifies how many initial trees to skip as burnin.
///
/// Burnin is commonly used in MCMC sampling to discard initial trees
/// before the chain has converged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Burnin {
    /// Skip a fixed number of trees.
    ///
    /// # Example
    /// ```
    /// use jumphistory::nexus::Burnin;
    /// let burnin = Burnin::Count(1001); // Skip first 1001 trees
    /// ```
    Count(usize),

    /// Skip a fraction of all trees, in `[0.0, 1.0)`.
    ///
    /// Requires counting the trees before the first one is returned.
    Percentage(f64),
}

impl Default for Burnin {
    fn default() -> Self {
        Burnin::Count(0)
    }
}

impl Burnin {
    /// Calculates the absolute number of trees to skip given the total tree count.
    pub(crate) fn get_count(&self, num_total_trees: usize) -> usize {
        match self {
            Burnin::Count(n) => *n,
            Burnin::Percentage(p) => (num_total_trees as f64 * p).floor() as usize,
        }
    }

    /// Returns whether the total number of trees must be known to apply this burnin.
    pub(crate) fn needs_count(&self) -> bool {
        matches!(self, Burnin::Percentage(_))
    }
}

/// Syntax of a tree file, detected from its first bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeFileFormat {
    /// `#NEXUS` file with a TREES block
    Nexus,
    /// Semicolon-separated list of Newick strings
    Newick,
}

// =#========================================================================#=
// TREE FILE READER BUILDER
// =#========================================================================#=
/// Builder for configuring and creating a [TreeFileReader].
///
/// # Configuration Options
/// * **Burnin**: [with_burnin()](Self::with_burnin) discards initial trees
/// * **Skip first**: [with_skip_first()](Self::with_skip_first) drops the
///   starting tree some samplers log at state 0
/// * **Counting**: [with_tree_count()](Self::with_tree_count) counts all
///   trees upfront so [num_trees()](TreeFileReader::num_trees) is known;
///   always done for [Burnin::Percentage]
/// * **Read strategy**: [with_buffered_source()](Self::with_buffered_source)
///   or [with_in_memory_source()](Self::with_in_memory_source); by default
///   chosen by file size
///
/// # Example
/// ```no_run
/// use jumphistory::nexus::{TreeFileReaderBuilder, Burnin};
///
/// let mut reader = TreeFileReaderBuilder::for_file("h7n9.trees")
///     .with_burnin(Burnin::Percentage(0.1))
///     .build()?;
/// while let Some(tree) = reader.next_tree()? {
///     println!("{}: root height {}", tree.id(), tree.root_height());
/// }
/// # Ok::<(), jumphistory::parser::ParsingError>(())
/// ```
#[derive(Debug, Clone)]
pub struct TreeFileReaderBuilder {
    path: PathBuf,
    read_strategy: ReadStrategy,
    burnin: Burnin,
    skip_first: bool,
    count_trees: bool,
}

impl TreeFileReaderBuilder {
    /// Creates a builder for the file at `path` with no burnin.
    pub fn for_file<P: AsRef<Path>>(path: P) -> Self {
        TreeFileReaderBuilder {
            path: path.as_ref().to_path_buf(),
            read_strategy: ReadStrategy::Automatic,
            burnin: Burnin::Count(0),
            skip_first: false,
            count_trees: false,
        }
    }

    /// Configure burnin, i.e., discard/skip initial trees.
    ///
    /// If both burnin and [with_skip_first()](Self::with_skip_first) are
    /// configured, the first tree is skipped, then burnin is applied to
    /// the remaining trees.
    pub fn with_burnin(mut self, burnin: Burnin) -> Self {
        self.burnin = burnin;
        self
    }

    /// Configure the reader to skip the first tree.
    pub fn with_skip_first(mut self) -> Self {
        self.skip_first = true;
        self
    }

    /// Count all trees during [build()](Self::build).
    pub fn with_tree_count(mut self) -> Self {
        self.count_trees = true;
        self
    }

    /// Stream the file through a buffered reader.
    pub fn with_buffered_source(mut self) -> Self {
        self.read_strategy = ReadStrategy::Buffered;
        self
    }

    /// Read the entire file into memory upfront.
    pub fn with_in_memory_source(mut self) -> Self {
        self.read_strategy = ReadStrategy::InMemory;
        self
    }

    /// Opens the file, reads the NEXUS header blocks (if any), and applies
    /// skip-first and burnin.
    ///
    /// # Errors
    /// Returns a [ParsingError] if the file cannot be read, a NEXUS file
    /// has no TREES block, or the TAXA block or TRANSLATE command is malformed.
    pub fn build(self) -> Result<TreeFileReader, ParsingError> {
        if self.read_strategy.use_buffered(&self.path) {
            let byte_parser = ByteParser::from_file_buffered(&self.path)?;
            let mut inner = TreeFileReaderInner::new(byte_parser);
            inner.init(&self)?;
            Ok(TreeFileReader::Buffered(inner))
        } else {
            let byte_parser = ByteParser::from_file_in_memory(&self.path)?;
            let mut inner = TreeFileReaderInner::new(byte_parser);
            inner.init(&self)?;
            Ok(TreeFileReader::InMemory(inner))
        }
    }

    /// Same as [build()](Self::build) but over an in-memory string.
    ///
    /// # Errors
    /// See [build()](Self::build).
    pub fn build_for_str(self, content: &str) -> Result<TreeFileReader, ParsingError> {
        let mut inner = TreeFileReaderInner::new(ByteParser::for_str(content));
        inner.init(&self)?;
        Ok(TreeFileReader::InMemory(inner))
    }
}

// =#========================================================================#=
// TREE FILE READER
// =#========================================================================#=
/// Lazy reader over the trees of a NEXUS or plain Newick file.
///
/// Created via [TreeFileReaderBuilder]. Trees are parsed one at a time,
/// so memory use does not grow with the number of samples.
///
/// Trees are numbered by their absolute position in the file, burnin
/// included; [next_index()](Self::next_index) gives the position of the
/// tree [next_tree()](Self::next_tree) returns next. Trees of plain Newick
/// files are named by this position.
#[allow(private_interfaces)]
pub enum TreeFileReader {
    /// Reader with buffered file access
    Buffered(TreeFileReaderInner<BufferedByteSource>),
    /// Reader over an in-memory copy of the file
    InMemory(TreeFileReaderInner<InMemoryByteSource>),
}

/// Helper macro to delegate a method call to the inner reader variant.
macro_rules! delegate {
    ($self:ident, $method:ident $(, $arg:expr)*) => {
        match $self {
            TreeFileReader::Buffered(inner) => inner.$method($($arg),*),
            TreeFileReader::InMemory(inner) => inner.$method($($arg),*),
        }
    };
}

impl TreeFileReader {
    /// Returns the detected file format.
    pub fn format(&self) -> TreeFileFormat {
        delegate!(self, format)
    }

    /// Returns the taxa of the TAXA block; empty if there is none.
    pub fn taxa(&self) -> &[String] {
        delegate!(self, taxa)
    }

    /// Returns the number of trees that will be returned (after burnin),
    /// if the trees were counted.
    pub fn num_trees(&self) -> Option<usize> {
        delegate!(self, num_trees)
    }

    /// Returns the total number of trees including skipped+burnin,
    /// if the trees were counted.
    pub fn num_total_trees(&self) -> Option<usize> {
        delegate!(self, num_total_trees)
    }

    /// Returns the absolute position of the next tree.
    pub fn next_index(&self) -> usize {
        delegate!(self, next_index)
    }

    /// Parses and returns the next tree, `Ok(None)` once all trees are read.
    ///
    /// # Errors
    /// Returns a [ParsingError] if the tree command or Newick string is invalid.
    pub fn next_tree(&mut self) -> Result<Option<Tree>, ParsingError> {
        delegate!(self, next_tree)
    }

    /// Skips the next tree without building it.
    ///
    /// # Returns
    /// `Ok(false)` if there was no tree left.
    ///
    /// # Errors
    /// Returns a [ParsingError] if the tree command is malformed or unterminated.
    pub fn skip_tree(&mut self) -> Result<bool, ParsingError> {
        delegate!(self, skip_tree)
    }
}

// =#========================================================================#=
// TREE FILE READER INNER
// =#========================================================================#=
/// Inner of [TreeFileReader] for type erasure pattern of generic byte source.
pub(crate) struct TreeFileReaderInner<B: ByteSource> {
    format: TreeFileFormat,
    /// Continuously used to parse Newick strings, including resolving labels
    newick_parser: NewickParser,
    /// Accessor to the underlying bytes/file being parsed
    byte_parser: ByteParser<B>,
    /// Taxa in TAXA block order
    taxa: Vec<String>,
    /// Number of trees in the file, if counted
    num_total_trees: Option<usize>,
    /// Number of trees discarded as skip-first and burnin
    num_skipped: usize,
    /// Absolute position of the next tree
    /// - Invariant: `num_skipped <= tree_pos`
    tree_pos: usize,
    /// Set once the end of the TREES block or file was reached
    exhausted: bool,
}

// ============================================================================
// Initialization (private)
// ============================================================================
impl<B: ByteSource> TreeFileReaderInner<B> {
    fn new(byte_parser: ByteParser<B>) -> Self {
        TreeFileReaderInner {
            format: TreeFileFormat::Newick,
            newick_parser: NewickParser::new(),
            byte_parser,
            taxa: Vec::new(),
            num_total_trees: None,
            num_skipped: 0,
            tree_pos: 0,
            exhausted: false,
        }
    }

    /// Detects the format, reads TAXA block and TRANSLATE command of NEXUS
    /// files, and skips the trees to discard.
    fn init(&mut self, config: &TreeFileReaderBuilder) -> Result<(), ParsingError> {
        self.byte_parser.skip_comment_and_whitespace()?;
        if self.byte_parser.consume_if_sequence(NEXUS_HEADER) {
            self.format = TreeFileFormat::Nexus;
            self.init_nexus()?;
        }

        if config.count_trees || config.burnin.needs_count() {
            self.num_total_trees = Some(self.count_trees()?);
        }

        let mut skip_count = usize::from(config.skip_first);
        skip_count += match self.num_total_trees {
            Some(total) => config.burnin.get_count(total.saturating_sub(skip_count)),
            None => config.burnin.get_count(0),
        };

        for _ in 0..skip_count {
            if !self.skip_tree()? {
                break;
            }
        }
        self.num_skipped = self.tree_pos;

        log::debug!(
            "Opened {:?} tree file, {} taxa, skipped {} trees",
            self.format,
            self.taxa.len(),
            self.num_skipped
        );
        Ok(())
    }

    /// Walks the NEXUS blocks up to the TREES block; other blocks are skipped.
    fn init_nexus(&mut self) -> Result<(), ParsingError> {
        loop {
            self.byte_parser.skip_comment_and_whitespace()?;
            if self.byte_parser.is_eof() {
                return Err(ParsingError::invalid_trees_block(
                    &mut self.byte_parser,
                    "No TREES block found".to_string(),
                ));
            }

            match self.detect_next_block()? {
                NexusBlock::Taxa => self.parse_taxa_block()?,
                NexusBlock::Trees => break,
                NexusBlock::Other(name) => {
                    log::trace!("Skipping NEXUS block {name}");
                    self.skip_to_block_end()?;
                }
            }
        }

        let translation = self.parse_tree_block_translate()?;
        let resolver = match translation {
            Some(map) => LabelResolver::with_translation(map, self.taxa.clone()),
            None => LabelResolver::Verbatim,
        };
        let mut newick_parser = NewickParser::new().with_resolver(resolver);
        if !self.taxa.is_empty() {
            newick_parser = newick_parser.with_num_leaves(self.taxa.len());
        }
        self.newick_parser = newick_parser;
        Ok(())
    }

    /// Counts the trees from the current position, then restores it.
    fn count_trees(&mut self) -> Result<usize, ParsingError> {
        let saved_pos = self.byte_parser.position();
        let saved_tree_pos = self.tree_pos;

        let mut count = 0;
        while self.skip_tree()? {
            count += 1;
        }

        self.byte_parser.set_position(saved_pos);
        self.tree_pos = saved_tree_pos;
        self.exhausted = false;
        Ok(count)
    }
}

// ============================================================================
// Getters / Tree retrieval (private, delegated)
// ============================================================================
impl<B: ByteSource> TreeFileReaderInner<B> {
    fn format(&self) -> TreeFileFormat {
        self.format
    }

    fn taxa(&self) -> &[String] {
        &self.taxa
    }

    fn num_trees(&self) -> Option<usize> {
        self.num_total_trees
            .map(|total| total.saturating_sub(self.num_skipped))
    }

    fn num_total_trees(&self) -> Option<usize> {
        self.num_total_trees
    }

    fn next_index(&self) -> usize {
        self.tree_pos
    }

    fn next_tree(&mut self) -> Result<Option<Tree>, ParsingError> {
        if self.exhausted {
            return Ok(None);
        }
        let tree = match self.format {
            TreeFileFormat::Nexus => self.parse_nexus_tree()?,
            TreeFileFormat::Newick => self.parse_newick_tree()?,
        };
        match tree {
            Some(tree) => {
                self.tree_pos += 1;
                Ok(Some(tree))
            }
            None => {
                self.exhausted = true;
                Ok(None)
            }
        }
    }

    fn skip_tree(&mut self) -> Result<bool, ParsingError> {
        if self.exhausted {
            return Ok(false);
        }
        let skipped = match self.format {
            TreeFileFormat::Nexus => self.skip_nexus_tree()?,
            TreeFileFormat::Newick => self.skip_newick_tree()?,
        };
        if skipped {
            self.tree_pos += 1;
        } else {
            self.exhausted = true;
        }
        Ok(skipped)
    }
}

// ============================================================================
// Parsing helpers (private)
// ============================================================================
impl<B: ByteSource> TreeFileReaderInner<B> {
    /// Consumes `BEGIN <name>;` and returns the block type.
    fn detect_next_block(&mut self) -> Result<NexusBlock, ParsingError> {
        if !self.byte_parser.consume_if_sequence(BLOCK_BEGIN) {
            return Err(ParsingError::invalid_formatting(&mut self.byte_parser));
        }
        self.byte_parser.skip_comment_and_whitespace()?;

        let block_name = self.byte_parser.parse_unquoted_label(b"; \t\n\r")?;
        self.byte_parser.skip_comment_and_whitespace()?;
        if block_name.is_empty() || !self.byte_parser.consume_if(b';') {
            return Err(ParsingError::invalid_block_name(&mut self.byte_parser));
        }

        Ok(NexusBlock::from_name(&block_name))
    }

    /// Consumes the block end if it comes next.
    fn consume_block_end(&mut self) -> bool {
        self.byte_parser.consume_if_sequence(BLOCK_END)
            || self.byte_parser.consume_if_sequence(BLOCK_ENDBLOCK)
    }

    /// Skips commands until and including `END;`.
    fn skip_to_block_end(&mut self) -> Result<(), ParsingError> {
        loop {
            self.byte_parser.skip_comment_and_whitespace()?;
            if self.consume_block_end() {
                return Ok(());
            }
            if !self.byte_parser.consume_statement() {
                return Err(ParsingError::unexpected_eof(&mut self.byte_parser));
            }
        }
    }

    /// Parses a TAXA block: `DIMENSIONS NTAX=n;` and `TAXLABELS ...;`,
    /// ignoring any other command.
    ///
    /// # Errors
    /// Returns an [InvalidTaxaBlock](crate::parser::ParsingErrorType::InvalidTaxaBlock)
    /// error if the number of labels does not match `ntax`.
    fn parse_taxa_block(&mut self) -> Result<(), ParsingError> {
        let mut ntax = None;
        loop {
            self.byte_parser.skip_comment_and_whitespace()?;
            if self.consume_block_end() {
                break;
            }

            if self.byte_parser.consume_if_sequence(DIMENSIONS) {
                ntax = Some(self.parse_taxa_block_ntax()?);
            } else if self.byte_parser.consume_if_sequence(TAXLABELS) {
                self.parse_taxa_block_labels()?;
            } else if !self.byte_parser.consume_statement() {
                return Err(ParsingError::unexpected_eof(&mut self.byte_parser));
            }
        }

        if let Some(ntax) = ntax
            && ntax != self.taxa.len()
        {
            return Err(ParsingError::invalid_taxa_block(
                &mut self.byte_parser,
                format!(
                    "Number of parsed labels ({}) did not match ntax value ({ntax}).",
                    self.taxa.len()
                ),
            ));
        }
        Ok(())
    }

    /// Parses the rest of `DIMENSIONS NTAX=n;`.
    fn parse_taxa_block_ntax(&mut self) -> Result<usize, ParsingError> {
        self.byte_parser.skip_whitespace();
        if !self.byte_parser.consume_if_sequence(NTAX) {
            return Err(ParsingError::invalid_taxa_block(
                &mut self.byte_parser,
                String::from("Expected 'NTAX' in TAXA block."),
            ));
        }
        self.byte_parser.skip_whitespace();
        if !self.byte_parser.consume_if(b'=') {
            return Err(ParsingError::invalid_taxa_block(
                &mut self.byte_parser,
                String::from("Expected '=' in TAXA block."),
            ));
        }
        self.byte_parser.skip_whitespace();

        let ntax_str = self.byte_parser.parse_unquoted_label(b"; \t\n\r")?;
        let ntax = ntax_str.parse().map_err(|_| {
            ParsingError::invalid_taxa_block(
                &mut self.byte_parser,
                format!("Cannot parse `ntax` value: {ntax_str}"),
            )
        })?;

        if !self.byte_parser.consume_statement() {
            return Err(ParsingError::unexpected_eof(&mut self.byte_parser));
        }
        Ok(ntax)
    }

    /// Parses the labels of `TAXLABELS label1 label2 ...;`.
    fn parse_taxa_block_labels(&mut self) -> Result<(), ParsingError> {
        loop {
            self.byte_parser.skip_comment_and_whitespace()?;
            if self.byte_parser.consume_if(b';') {
                return Ok(());
            }
            if self.byte_parser.is_eof() {
                return Err(ParsingError::unexpected_eof(&mut self.byte_parser));
            }

            let label = self.byte_parser.parse_label(NEXUS_LABEL_DELIMITERS)?;
            if label.is_empty() {
                // Stray comma
                self.byte_parser.next_byte();
            } else {
                self.taxa.push(label);
            }
        }
    }

    /// Parses `TRANSLATE key label, ...;` if it comes next in the TREES block.
    fn parse_tree_block_translate(
        &mut self,
    ) -> Result<Option<HashMap<String, String>>, ParsingError> {
        self.byte_parser.skip_comment_and_whitespace()?;
        if !self.byte_parser.consume_if_sequence(TRANSLATE) {
            return Ok(None);
        }

        let mut map = HashMap::with_capacity(self.taxa.len());
        loop {
            self.byte_parser.skip_comment_and_whitespace()?;
            if self.byte_parser.consume_if(b';') {
                break;
            }

            let key = self.byte_parser.parse_label(NEXUS_LABEL_DELIMITERS)?;
            let label = self.byte_parser.parse_label(NEXUS_LABEL_DELIMITERS)?;
            if key.is_empty() || label.is_empty() {
                return Err(ParsingError::invalid_translate_command(
                    &mut self.byte_parser,
                    "Expected '<key> <label>' pair".to_string(),
                ));
            }
            if map.insert(key.clone(), label).is_some() {
                return Err(ParsingError::invalid_translate_command(
                    &mut self.byte_parser,
                    format!("Duplicate key '{key}'"),
                ));
            }

            self.byte_parser.skip_comment_and_whitespace()?;
            if self.byte_parser.consume_if(b',') {
                continue;
            }
            if self.byte_parser.consume_if(b';') {
                break;
            }
            let found = self.byte_parser.peek().map(|b| b as char);
            return Err(ParsingError::invalid_translate_command(
                &mut self.byte_parser,
                format!("Unexpected {found:?} in TRANSLATE."),
            ));
        }

        if !self.taxa.is_empty() && map.len() != self.taxa.len() {
            log::warn!(
                "TRANSLATE maps {} keys but TAXA block lists {} taxa",
                map.len(),
                self.taxa.len()
            );
        }
        Ok(Some(map))
    }

    /// Moves to the next `tree` keyword, skipping other commands.
    ///
    /// # Returns
    /// `Ok(false)` at `END;` or EOF.
    fn seek_tree_command(&mut self) -> Result<bool, ParsingError> {
        loop {
            self.byte_parser.skip_comment_and_whitespace()?;
            if self.byte_parser.is_eof() || self.consume_block_end() {
                return Ok(false);
            }
            if self.byte_parser.consume_if_sequence(TREE) {
                return Ok(true);
            }
            if !self.byte_parser.consume_statement() {
                return Err(ParsingError::unexpected_eof(&mut self.byte_parser));
            }
        }
    }

    /// Parses `tree <name> [comments] = <newick>;`.
    fn parse_nexus_tree(&mut self) -> Result<Option<Tree>, ParsingError> {
        if !self.seek_tree_command()? {
            return Ok(None);
        }

        let name = self.byte_parser.parse_label(TREE_NAME_DELIMITERS)?;
        // BEAST puts [&lnP=...] between name and '='
        self.byte_parser.skip_comment_and_whitespace()?;
        if !self.byte_parser.consume_if(b'=') {
            return Err(ParsingError::invalid_trees_block(
                &mut self.byte_parser,
                String::from("Expected '=' after tree name in tree command."),
            ));
        }

        let tree = self.newick_parser.parse_str(&mut self.byte_parser)?;
        Ok(Some(tree.with_name(name)))
    }

    fn skip_nexus_tree(&mut self) -> Result<bool, ParsingError> {
        if !self.seek_tree_command()? {
            return Ok(false);
        }
        if !self.byte_parser.consume_statement() {
            return Err(ParsingError::unexpected_eof(&mut self.byte_parser));
        }
        Ok(true)
    }

    fn parse_newick_tree(&mut self) -> Result<Option<Tree>, ParsingError> {
        self.byte_parser.skip_comment_and_whitespace()?;
        if self.byte_parser.is_eof() {
            return Ok(None);
        }
        let tree = self.newick_parser.parse_str(&mut self.byte_parser)?;
        Ok(Some(tree.with_name(self.tree_pos.to_string())))
    }

    fn skip_newick_tree(&mut self) -> Result<bool, ParsingError> {
        self.byte_parser.skip_comment_and_whitespace()?;
        if self.byte_parser.is_eof() {
            return Ok(false);
        }
        if !self.byte_parser.consume_statement() {
            return Err(ParsingError::unexpected_eof(&mut self.byte_parser));
        }
        Ok(true)
    }
}
