//! Builder that assembles [Tree]s while a parser reads Newick syntax.
//!
//! # Builder lifecycle
//! A builder can construct multiple trees sequentially:
//!
//! ```text
//! Empty ──→ init_next() ──→ Building ──→ add_*/set_name ──→ finish_tree() ──→ Empty
//!   ↑                                                                           │
//!   └───────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::model::annotation::AnnotationValue;
use crate::model::tree::{Tree, VertexIndex};
use crate::model::vertex::BranchLength;
use crate::parser::parsing_error::{ParsingError, ParsingErrorType};

// =#========================================================================#=
// TREE BUILDER
// =#========================================================================#=
/// Constructs [Tree]s vertex by vertex, bottom-up.
///
/// The parser drives the lifecycle:
/// 1. [init_next](Self::init_next) prepares a new tree
/// 2. [add_leaf](Self::add_leaf), [add_internal](Self::add_internal),
///    [add_root](Self::add_root) and [add_annotation](Self::add_annotation)
///    build structure and data
/// 3. [set_name](Self::set_name) optionally assigns a name
/// 4. [finish_tree](Self::finish_tree) validates, computes heights and
///    returns the tree
#[derive(Debug, Default)]
pub struct TreeBuilder {
    tree: Option<Tree>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepares the builder for a new tree, dropping any unfinished one.
    ///
    /// # Arguments
    /// * `num_leaves` - Expected number of leaves (hint for allocation)
    pub fn init_next(&mut self, num_leaves: usize) {
        self.tree = Some(Tree::new(num_leaves));
    }

    fn tree_mut(&mut self) -> &mut Tree {
        self.tree.get_or_insert_with(|| Tree::new(0))
    }

    /// Adds a leaf and returns its index.
    ///
    /// Negative or non-finite branch lengths are dropped.
    pub fn add_leaf(&mut self, branch_len: Option<f64>, label: String) -> VertexIndex {
        let branch_length = branch_len.and_then(BranchLength::try_new);
        self.tree_mut().add_leaf(branch_length, label)
    }

    /// Adds an internal (non-root) vertex above two previously added vertices.
    pub fn add_internal(
        &mut self,
        children: (VertexIndex, VertexIndex),
        branch_len: Option<f64>,
    ) -> VertexIndex {
        let branch_length = branch_len.and_then(BranchLength::try_new);
        self.tree_mut().add_internal_vertex(children, branch_length)
    }

    /// Adds the root above two previously added vertices.
    pub fn add_root(
        &mut self,
        children: (VertexIndex, VertexIndex),
        branch_len: Option<f64>,
    ) -> VertexIndex {
        let branch_length = branch_len.and_then(BranchLength::try_new);
        self.tree_mut().add_root(children, branch_length)
    }

    /// Attaches an annotation value to a vertex of the tree under construction.
    pub fn add_annotation(&mut self, key: String, vertex: VertexIndex, value: AnnotationValue) {
        self.tree_mut().add_annotation(key, vertex, value);
    }

    pub fn set_name(&mut self, tree_name: String) {
        self.tree_mut().set_name(tree_name);
    }

    /// Finalizes the tree under construction and resets the builder.
    ///
    /// # Errors
    /// Returns an [InvalidTreeStructure](ParsingErrorType::InvalidTreeStructure)
    /// error if no tree was started or [Tree::finish] rejects it.
    pub fn finish_tree(&mut self) -> Result<Tree, ParsingError> {
        let mut tree = self.tree.take().ok_or_else(|| {
            ParsingError::without_context(ParsingErrorType::InvalidTreeStructure(
                "no tree under construction".to_string(),
            ))
        })?;
        tree.finish()?;
        Ok(tree)
    }
}
