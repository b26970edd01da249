use crate::model::annotation::AnnotationValue;
use crate::model::label_resolver::LabelResolver;
use crate::model::tree::{Tree, VertexIndex};
use crate::model::tree_builder::TreeBuilder;
use crate::newick::defs::{
    ANNOTATION_KEY_DELIMITERS, ANNOTATION_START, ANNOTATION_VALUE_DELIMITERS,
    DEFAULT_NUM_LEAVES_GUESS, NEWICK_LABEL_DELIMITERS,
};
use crate::parser::byte_parser::ByteParser;
use crate::parser::byte_source::ByteSource;
use crate::parser::parsing_error::ParsingError;

/// Annotations and branch length following a vertex, before the vertex exists.
type VertexSuffix = (Vec<(String, AnnotationValue)>, Option<f64>);

// =#========================================================================#=
// NEWICK PARSER
// =#========================================================================#=
/// Parser (configuration) for annotated binary Newick trees.
///
/// Reads one tree per call to [parse_str](Self::parse_str), resolving leaf
/// labels with a [LabelResolver] and collecting `[&...]` annotations for
/// every vertex. The resulting [Tree] has its heights computed.
///
/// # Configuration
/// * `with_num_leaves(num_leaves)` - Number of leaves for pre-allocation,
///   otherwise inferred from the first parsed tree
/// * `with_resolver(resolver)` - Resolver for TRANSLATE keys of Nexus files
///
/// # Example
/// ```
/// use jumphistory::newick::NewickParser;
/// use jumphistory::parser::ByteParser;
///
/// let mut byte_parser = ByteParser::for_str("(A[&location=Hubei]:1.0,B:1.0)[&location=Hubei];");
/// let tree = NewickParser::new().parse_str(&mut byte_parser).unwrap();
/// assert_eq!(tree.num_leaves(), 2);
/// ```
#[derive(Debug)]
pub struct NewickParser {
    num_leaves: Option<usize>,
    resolver: LabelResolver,
    builder: TreeBuilder,
    leaves_seen: usize,
}

impl Default for NewickParser {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Configuration (pub)
// ============================================================================
impl NewickParser {
    /// Creates a parser with verbatim labels and unknown number of leaves.
    pub fn new() -> Self {
        Self {
            num_leaves: None,
            resolver: LabelResolver::Verbatim,
            builder: TreeBuilder::new(),
            leaves_seen: 0,
        }
    }

    /// Sets the expected number of leaves per tree (allocation hint).
    pub fn with_num_leaves(mut self, num_leaves: usize) -> Self {
        self.num_leaves = Some(num_leaves);
        self
    }

    /// Sets the [LabelResolver] used for leaf labels.
    pub fn with_resolver(mut self, resolver: LabelResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Returns the [LabelResolver] used for leaf labels.
    pub fn resolver(&self) -> &LabelResolver {
        &self.resolver
    }
}

// ============================================================================
// Parsing (pub)
// ============================================================================
impl NewickParser {
    /// Parses a single Newick tree, up to and including its `;`.
    ///
    /// # Arguments
    /// * `parser` - Byte parser positioned at (comments or whitespace before) the tree
    ///
    /// # Errors
    /// Returns a [ParsingError] if the Newick syntax or an annotation is
    /// invalid, a label cannot be resolved, or the tree lacks branch lengths.
    pub fn parse_str<S: ByteSource>(
        &mut self,
        parser: &mut ByteParser<S>,
    ) -> Result<Tree, ParsingError> {
        self.builder
            .init_next(self.num_leaves.unwrap_or(DEFAULT_NUM_LEAVES_GUESS));
        self.leaves_seen = 0;

        self.parse_root(parser)?;

        if self.num_leaves.is_none() {
            self.num_leaves = Some(self.leaves_seen);
        }
        self.builder.finish_tree()
    }

    /// Parses all remaining trees until EOF.
    ///
    /// # Errors
    /// Returns the first [ParsingError] encountered.
    pub fn parse_all<S: ByteSource>(
        &mut self,
        mut parser: ByteParser<S>,
    ) -> Result<Vec<Tree>, ParsingError> {
        let mut trees = Vec::new();
        loop {
            parser.skip_comment_and_whitespace()?;
            if parser.is_eof() {
                break;
            }
            trees.push(self.parse_str(&mut parser)?);
        }
        Ok(trees)
    }

    /// Turns this parser into an iterator over the trees of `parser`.
    pub fn into_iter<S: ByteSource>(self, parser: ByteParser<S>) -> NewickIterator<S> {
        NewickIterator {
            newick_parser: self,
            byte_parser: parser,
            failed: false,
        }
    }
}

// ============================================================================
// Recursive descent (private)
// ============================================================================
impl NewickParser {
    /// Parses `(left,right)[annotations][:length];` and adds the root.
    fn parse_root<S: ByteSource>(&mut self, parser: &mut ByteParser<S>) -> Result<(), ParsingError> {
        // Skips a leading [&R] / [&U] rooting flag as well
        parser.skip_comment_and_whitespace()?;

        let children = self.parse_children(parser)?;
        let (annotations, branch_len) = self.parse_vertex_suffix(parser)?;
        let root = self.builder.add_root(children, branch_len);
        self.store_annotations(root, annotations);

        parser.skip_comment_and_whitespace()?;
        if !parser.consume_if(b';') {
            let found = parser.peek().map(|b| b as char);
            return Err(ParsingError::invalid_newick_string(
                parser,
                format!("Expected ';' at end of tree but found {found:?}"),
            ));
        }
        Ok(())
    }

    /// Dispatches on `(` to an internal vertex, otherwise a leaf.
    fn parse_vertex<S: ByteSource>(
        &mut self,
        parser: &mut ByteParser<S>,
    ) -> Result<VertexIndex, ParsingError> {
        parser.skip_comment_and_whitespace()?;
        if parser.peek_is(b'(') {
            self.parse_internal_vertex(parser)
        } else {
            self.parse_leaf(parser)
        }
    }

    fn parse_internal_vertex<S: ByteSource>(
        &mut self,
        parser: &mut ByteParser<S>,
    ) -> Result<VertexIndex, ParsingError> {
        let children = self.parse_children(parser)?;
        let (annotations, branch_len) = self.parse_vertex_suffix(parser)?;
        let index = self.builder.add_internal(children, branch_len);
        self.store_annotations(index, annotations);
        Ok(index)
    }

    /// Parses `(left,right)`; expects the parser at `(`.
    fn parse_children<S: ByteSource>(
        &mut self,
        parser: &mut ByteParser<S>,
    ) -> Result<(VertexIndex, VertexIndex), ParsingError> {
        if !parser.consume_if(b'(') {
            let found = parser.peek().map(|b| b as char);
            return Err(ParsingError::invalid_newick_string(
                parser,
                format!("Expected '(' before children but found {found:?}"),
            ));
        }
        let left = self.parse_vertex(parser)?;

        parser.skip_comment_and_whitespace()?;
        if !parser.consume_if(b',') {
            let found = parser.peek().map(|b| b as char);
            return Err(ParsingError::invalid_newick_string(
                parser,
                format!("Expected ',' between children but found {found:?} (only binary trees are supported)"),
            ));
        }
        let right = self.parse_vertex(parser)?;

        parser.skip_comment_and_whitespace()?;
        if !parser.consume_if(b')') {
            let found = parser.peek().map(|b| b as char);
            return Err(ParsingError::invalid_newick_string(
                parser,
                format!("Expected ')' after children but found {found:?}"),
            ));
        }
        Ok((left, right))
    }

    /// Parses `label[annotations][:length]` and adds the leaf.
    fn parse_leaf<S: ByteSource>(
        &mut self,
        parser: &mut ByteParser<S>,
    ) -> Result<VertexIndex, ParsingError> {
        let parsed_label = parser.parse_label(NEWICK_LABEL_DELIMITERS)?;
        if parsed_label.is_empty() {
            return Err(ParsingError::invalid_newick_string(
                parser,
                "Empty leaf label".to_string(),
            ));
        }
        let label = self
            .resolver
            .resolve_label(&parsed_label)
            .map_err(|e| ParsingError::unresolved_label(parser, e.to_string()))?;

        let (annotations, branch_len) = self.parse_vertex_suffix(parser)?;
        let index = self.builder.add_leaf(branch_len, label);
        self.store_annotations(index, annotations);
        self.leaves_seen += 1;
        Ok(index)
    }

    /// Parses what may follow a vertex: annotation blocks before and after
    /// the `:`, and the branch length itself.
    ///
    /// BEAST writes `A[&location=X]:1.0`, other tools `A:[&rate=1]1.0`
    /// or `A:1.0[&rate=1]`; all three are accepted.
    fn parse_vertex_suffix<S: ByteSource>(
        &mut self,
        parser: &mut ByteParser<S>,
    ) -> Result<VertexSuffix, ParsingError> {
        let mut annotations = Vec::new();
        self.parse_annotation_blocks(parser, &mut annotations)?;

        let mut branch_len = None;
        if parser.consume_if(b':') {
            self.parse_annotation_blocks(parser, &mut annotations)?;
            branch_len = Some(self.parse_number(parser)?);
            self.parse_annotation_blocks(parser, &mut annotations)?;
        }
        Ok((annotations, branch_len))
    }

    fn parse_annotation_blocks<S: ByteSource>(
        &mut self,
        parser: &mut ByteParser<S>,
        annotations: &mut Vec<(String, AnnotationValue)>,
    ) -> Result<(), ParsingError> {
        parser.skip_plain_comments_and_whitespace()?;
        while parser.consume_if_sequence(ANNOTATION_START) {
            self.parse_annotation_entries(parser, annotations)?;
            parser.skip_plain_comments_and_whitespace()?;
        }
        Ok(())
    }

    /// Parses `key=value,...]` after the opening `[&`.
    fn parse_annotation_entries<S: ByteSource>(
        &mut self,
        parser: &mut ByteParser<S>,
        annotations: &mut Vec<(String, AnnotationValue)>,
    ) -> Result<(), ParsingError> {
        loop {
            parser.skip_whitespace();
            if parser.consume_if(b']') {
                return Ok(());
            }

            let key = parser.parse_label(ANNOTATION_KEY_DELIMITERS)?;
            parser.skip_whitespace();
            if key.is_empty() || !parser.consume_if(b'=') {
                return Err(ParsingError::invalid_annotation(
                    parser,
                    format!("Expected 'key=value' but found key '{key}'"),
                ));
            }
            let value = self.parse_annotation_value(parser)?;
            annotations.push((key, value));

            parser.skip_whitespace();
            match parser.next_byte() {
                Some(b',') => continue,
                Some(b']') => return Ok(()),
                Some(b) => {
                    return Err(ParsingError::invalid_annotation(
                        parser,
                        format!("Expected ',' or ']' after value but found {:?}", b as char),
                    ));
                }
                None => return Err(ParsingError::unexpected_eof(parser)),
            }
        }
    }

    /// Parses a scalar or a (nested) `{...}` array.
    ///
    /// Unquoted scalars are read by [AnnotationValue::from_unquoted], so
    /// numbers keep the text they were written with.
    fn parse_annotation_value<S: ByteSource>(
        &mut self,
        parser: &mut ByteParser<S>,
    ) -> Result<AnnotationValue, ParsingError> {
        parser.skip_whitespace();
        match parser.peek() {
            None => Err(ParsingError::unexpected_eof(parser)),
            Some(b'{') => {
                parser.next_byte();
                let mut items = Vec::new();
                parser.skip_whitespace();
                if parser.consume_if(b'}') {
                    return Ok(AnnotationValue::Array(items));
                }
                loop {
                    items.push(self.parse_annotation_value(parser)?);
                    parser.skip_whitespace();
                    match parser.next_byte() {
                        Some(b',') => continue,
                        Some(b'}') => return Ok(AnnotationValue::Array(items)),
                        Some(b) => {
                            return Err(ParsingError::invalid_annotation(
                                parser,
                                format!("Expected ',' or '}}' in array but found {:?}", b as char),
                            ));
                        }
                        None => return Err(ParsingError::unexpected_eof(parser)),
                    }
                }
            }
            Some(quote @ (b'"' | b'\'')) => {
                Ok(AnnotationValue::String(parser.parse_quoted_label(quote)?))
            }
            Some(_) => {
                let raw = parser.parse_unquoted_label(ANNOTATION_VALUE_DELIMITERS)?;
                if raw.is_empty() {
                    return Err(ParsingError::invalid_annotation(
                        parser,
                        "Missing annotation value".to_string(),
                    ));
                }
                Ok(AnnotationValue::from_unquoted(raw))
            }
        }
    }

    /// Parses a number such as `0.25` or `1.5e-10`.
    fn parse_number<S: ByteSource>(&mut self, parser: &mut ByteParser<S>) -> Result<f64, ParsingError> {
        let mut number = String::new();
        while let Some(b) = parser.peek() {
            if b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E') {
                number.push(b as char);
                parser.next_byte();
            } else {
                break;
            }
        }
        number.parse().map_err(|_| {
            ParsingError::invalid_newick_string(parser, format!("Invalid branch length: '{number}'"))
        })
    }

    fn store_annotations(&mut self, vertex: VertexIndex, annotations: Vec<(String, AnnotationValue)>) {
        for (key, value) in annotations {
            self.builder.add_annotation(key, vertex, value);
        }
    }
}

// =#========================================================================#=
// NEWICK ITERATOR
// =#========================================================================#=
/// Iterator over the trees of a semicolon-separated Newick list.
///
/// Stops after the first error.
pub struct NewickIterator<S: ByteSource> {
    newick_parser: NewickParser,
    byte_parser: ByteParser<S>,
    failed: bool,
}

impl<S: ByteSource> Iterator for NewickIterator<S> {
    type Item = Result<Tree, ParsingError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if let Err(e) = self.byte_parser.skip_comment_and_whitespace() {
            self.failed = true;
            return Some(Err(e));
        }
        if self.byte_parser.is_eof() {
            return None;
        }
        let result = self.newick_parser.parse_str(&mut self.byte_parser);
        self.failed = result.is_err();
        Some(result)
    }
}

// =#========================================================================#=
// TESTS
// =#========================================================================#=
#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParsingErrorType;

    fn parse(newick: &str) -> Result<Tree, ParsingError> {
        NewickParser::new().parse_str(&mut ByteParser::for_str(newick))
    }

    #[test]
    fn test_beast_annotations() {
        let tree = parse(
            "[&R] ((A[&location=\"Hubei\",history={{2.5,Fujian,Hubei}}]:1.0,\
             B[&location=Fujian]:1.0)[&location=Fujian,rate=0.5]:2.0,\
             C[&location=Fujian]:3.0)[&location=Fujian];",
        )
        .unwrap();

        let a = tree.leaf_by_label("A").unwrap();
        assert_eq!(tree.annotation("location", a), Some(&"Hubei".into()));
        let history = tree.annotation("history", a).unwrap().as_array().unwrap();
        let jump = history[0].as_array().unwrap();
        assert_eq!(jump[0], 2.5.into());
        assert_eq!(jump[1], "Fujian".into());

        let ab = tree.parent(a).unwrap();
        assert_eq!(tree.annotation("rate", ab), Some(&0.5.into()));
        assert_eq!(
            tree.annotation("location", tree.root_index()),
            Some(&"Fujian".into())
        );
        assert!((tree.root_height() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_annotation_after_colon_and_after_length() {
        let tree = parse("(A:[&rate=1]1.0,B:2.0[&rate=2]);").unwrap();
        let a = tree.leaf_by_label("A").unwrap();
        let b = tree.leaf_by_label("B").unwrap();
        assert_eq!(tree.annotation("rate", a), Some(&1_i64.into()));
        assert_eq!(tree.annotation("rate", b), Some(&2_i64.into()));
    }

    #[test]
    fn test_plain_comments_are_skipped() {
        let tree = parse("(A[a comment]:1,[another] B:1)[&location=X];").unwrap();
        assert_eq!(tree.num_leaves(), 2);
        assert!(tree.annotation("location", tree.root_index()).is_some());
    }

    #[test]
    fn test_key_without_value_is_error() {
        let err = parse("(A[&location]:1,B:1);").unwrap_err();
        assert!(matches!(err.kind(), ParsingErrorType::InvalidAnnotation(_)));
    }

    #[test]
    fn test_missing_branch_length_is_error() {
        let err = parse("(A:1,B);").unwrap_err();
        assert!(matches!(err.kind(), ParsingErrorType::InvalidTreeStructure(_)));
    }

    #[test]
    fn test_structure_errors_name_the_byte_found() {
        let cases = [
            ("A:1;", "Expected '(' before children but found Some('A')"),
            ("(A:1;B:1);", "Expected ',' between children but found Some(';')"),
            ("(A:1,B:1,C:1);", "Expected ')' after children but found Some(',')"),
            ("(A:1,B:1)", "Expected ';' at end of tree but found None"),
        ];
        for (newick, expected) in cases {
            let err = parse(newick).unwrap_err();
            match err.kind() {
                ParsingErrorType::InvalidNewickString(msg) => {
                    assert!(msg.starts_with(expected), "{newick}: {msg}")
                }
                other => panic!("{newick}: unexpected error {other:?}"),
            }
        }
    }

    #[test]
    fn test_iterator_over_list() {
        let byte_parser = ByteParser::for_str("(A:1,B:1);\n(A:2,B:2);\n");
        let trees: Vec<_> = NewickParser::new()
            .into_iter(byte_parser)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(trees.len(), 2);
        assert_eq!(trees[1].root_height(), 2.0);
    }
}
