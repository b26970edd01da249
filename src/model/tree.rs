//! Arena-backed binary tree with vertex heights and annotations.
//!
//! Provides [Tree], the object every analysis in this crate walks, and
//! [VertexIndex], the integer handle vertices are addressed by. Parent and
//! child links are indices into one vector, so lineages can be followed in
//! either direction without reference cycles.

use crate::model::annotation::{AnnotationValue, Annotations};
use crate::model::vertex::{BranchLength, Vertex};
use crate::parser::parsing_error::{ParsingError, ParsingErrorType};

/// Float comparison tolerance for heights.
pub const EPSILON: f64 = 1e-7;

/// Index of a vertex in a tree (arena).
pub type VertexIndex = usize;

/// *During construction only*, index for unset root.
const NO_ROOT_SET_INDEX: VertexIndex = usize::MAX;

/// Prefix BEAST puts in front of the MCMC state in tree names.
const STATE_PREFIX: &str = "STATE_";

// =$========================================================================$=
// TREE
// =$========================================================================$=
/// A rooted binary phylogenetic tree using the arena pattern on [Vertex].
///
/// # Structure
/// - All vertices are stored in one vector and referenced by [VertexIndex].
/// - Heights are distances before the most recent tip: the youngest leaf has
///   height `0.0` and the root the largest height. They are derived from the
///   branch lengths once, when construction is finished.
/// - Per-vertex data parsed from `[&...]` blocks lives in [Annotations].
///
/// # Construction
/// Add leaves, internal vertices and finally the root (bottom-up), then call
/// [finish](Self::finish). Usually done by
/// [TreeBuilder](crate::model::TreeBuilder) while parsing.
#[derive(Debug, Clone)]
pub struct Tree {
    /// Vertices of this tree (arena pattern)
    vertices: Vec<Vertex>,
    /// Height of each vertex, parallel to `vertices`
    heights: Vec<f64>,
    /// Index of the root of this tree
    root_index: VertexIndex,
    /// Name of tree; e.g. `STATE_10000` when parsed from a BEAST Nexus file
    name: Option<String>,
    annotations: Annotations,
}

// ============================================================================
// Construction (pub)
// ============================================================================
impl Tree {
    /// Creates an empty tree with capacity for `num_leaves` leaves.
    pub fn new(num_leaves: usize) -> Self {
        let capacity = (2 * num_leaves).saturating_sub(1);
        Tree {
            vertices: Vec::with_capacity(capacity),
            heights: Vec::new(),
            root_index: NO_ROOT_SET_INDEX,
            name: None,
            annotations: Annotations::new(capacity),
        }
    }

    /// Attaches a name to this tree.
    pub fn with_name(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }

    /// Sets the name of this tree.
    pub fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }

    /// Adds a leaf and returns its index.
    pub fn add_leaf(&mut self, branch_length: Option<BranchLength>, label: String) -> VertexIndex {
        let index = self.vertices.len();
        self.vertices.push(Vertex::new_leaf(index, branch_length, label));
        index
    }

    /// Adds an internal vertex above `children` and returns its index.
    ///
    /// # Panics
    /// Panics if a child index is out of bounds or the child is the root.
    pub fn add_internal_vertex(
        &mut self,
        children: (VertexIndex, VertexIndex),
        branch_length: Option<BranchLength>,
    ) -> VertexIndex {
        let index = self.vertices.len();
        self.vertices
            .push(Vertex::new_internal(index, children, branch_length));
        self.vertices[children.0].set_parent(index);
        self.vertices[children.1].set_parent(index);
        index
    }

    /// Adds the root above `children` and returns its index.
    ///
    /// # Panics
    /// Panics if a child index is out of bounds or the child is the root.
    pub fn add_root(
        &mut self,
        children: (VertexIndex, VertexIndex),
        branch_length: Option<BranchLength>,
    ) -> VertexIndex {
        let index = self.vertices.len();
        self.vertices
            .push(Vertex::new_root(index, children, branch_length));
        self.vertices[children.0].set_parent(index);
        self.vertices[children.1].set_parent(index);
        self.root_index = index;
        index
    }

    /// Stores an annotation value for a vertex.
    pub fn add_annotation(&mut self, key: String, vertex: VertexIndex, value: AnnotationValue) {
        self.annotations.add(key, vertex, value);
    }

    /// Completes construction: validates the structure and computes heights.
    ///
    /// # Errors
    /// Returns a [ParsingError] of kind
    /// [InvalidTreeStructure](ParsingErrorType::InvalidTreeStructure)
    /// if the root is missing, the arena is inconsistent, or a non-root
    /// vertex lacks a branch length.
    pub fn finish(&mut self) -> Result<(), ParsingError> {
        if !self.is_valid() {
            return Err(ParsingError::without_context(
                ParsingErrorType::InvalidTreeStructure("inconsistent vertex links".to_string()),
            ));
        }
        if !self.vertices_have_branch_lengths() {
            return Err(ParsingError::without_context(
                ParsingErrorType::InvalidTreeStructure(
                    "heights need a branch length on every non-root vertex".to_string(),
                ),
            ));
        }

        // Depth below root in pre-order, then flip into heights
        let mut depths = vec![0.0; self.vertices.len()];
        for index in self.pre_order_indices() {
            if let Some(parent) = self.vertices[index].parent() {
                let length = self.vertices[index].branch_length().map_or(0.0, |bl| *bl);
                depths[index] = depths[parent] + length;
            }
        }
        let max_depth = depths.iter().copied().fold(0.0, f64::max);
        self.heights = depths.iter().map(|depth| max_depth - depth).collect();
        self.annotations.resize(self.vertices.len());

        Ok(())
    }
}

// ============================================================================
// Getters / Accessors (pub)
// ============================================================================
impl Tree {
    /// Returns the name of this tree, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the identifier used in output tables: the name without a
    /// leading `STATE_`, or an empty string for unnamed trees.
    pub fn id(&self) -> &str {
        match &self.name {
            Some(name) => name.strip_prefix(STATE_PREFIX).unwrap_or(name),
            None => "",
        }
    }

    /// Returns whether the root has been added.
    pub fn is_root_set(&self) -> bool {
        self.root_index != NO_ROOT_SET_INDEX
    }

    /// Returns the index of the root.
    pub fn root_index(&self) -> VertexIndex {
        self.root_index
    }

    /// Returns the root vertex.
    ///
    /// # Panics
    /// Panics if the root has not been set.
    pub fn root(&self) -> &Vertex {
        &self.vertices[self.root_index]
    }

    /// Returns the vertex at `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn vertex(&self, index: VertexIndex) -> &Vertex {
        &self.vertices[index]
    }

    /// Returns the number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Returns the number of leaves.
    pub fn num_leaves(&self) -> usize {
        self.vertices.iter().filter(|v| v.is_leaf()).count()
    }

    /// Returns the parent of `index`, `None` for the root.
    pub fn parent(&self, index: VertexIndex) -> Option<VertexIndex> {
        self.vertices[index].parent()
    }

    /// Returns the children of `index`, `None` for leaves.
    pub fn children(&self, index: VertexIndex) -> Option<(VertexIndex, VertexIndex)> {
        self.vertices[index].children()
    }

    pub fn is_root(&self, index: VertexIndex) -> bool {
        index == self.root_index
    }

    pub fn is_leaf(&self, index: VertexIndex) -> bool {
        self.vertices[index].is_leaf()
    }

    /// Returns the taxon label of a leaf.
    pub fn label(&self, index: VertexIndex) -> Option<&str> {
        self.vertices[index].label()
    }

    /// Returns the height of `index` (time before the youngest tip).
    ///
    /// # Panics
    /// Panics if the tree has not been [finished](Self::finish).
    pub fn height(&self, index: VertexIndex) -> f64 {
        self.heights[index]
    }

    /// Returns the height of the root.
    pub fn root_height(&self) -> f64 {
        self.heights[self.root_index]
    }

    /// Returns the annotation `key` of vertex `index`.
    pub fn annotation(&self, key: &str, index: VertexIndex) -> Option<&AnnotationValue> {
        self.annotations.get(key, index)
    }

    /// Returns all annotations of this tree.
    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    /// Returns whether all non-root vertices have branch lengths.
    pub fn vertices_have_branch_lengths(&self) -> bool {
        self.vertices.iter().all(Vertex::has_branch_length)
    }

    /// Returns the indices of all leaves, in arena order.
    pub fn leaves(&self) -> impl Iterator<Item = VertexIndex> + '_ {
        self.vertices
            .iter()
            .filter(|v| v.is_leaf())
            .map(Vertex::index)
    }

    /// Returns the leaf carrying `label`, if any.
    pub fn leaf_by_label(&self, label: &str) -> Option<VertexIndex> {
        self.vertices
            .iter()
            .find(|v| v.label() == Some(label))
            .map(Vertex::index)
    }

    /// Returns `index` followed by its ancestors up to and including the root.
    pub fn path_to_root(&self, index: VertexIndex) -> Vec<VertexIndex> {
        let mut path = vec![index];
        let mut current = index;
        while let Some(parent) = self.parent(current) {
            path.push(parent);
            current = parent;
        }
        path
    }

    /// Returns the leaves in the subtree of `index` (the vertex itself for a leaf).
    pub fn leaves_below(&self, index: VertexIndex) -> Vec<VertexIndex> {
        let mut leaves = Vec::new();
        let mut stack = vec![index];
        while let Some(current) = stack.pop() {
            match self.children(current) {
                Some((left, right)) => {
                    stack.push(right);
                    stack.push(left);
                }
                None => leaves.push(current),
            }
        }
        leaves
    }

    /// Returns the most recent common ancestor of `vertices`,
    /// `None` if the slice is empty.
    pub fn mrca(&self, vertices: &[VertexIndex]) -> Option<VertexIndex> {
        let (first, rest) = vertices.split_first()?;
        let mut ancestors = self.path_to_root(*first);
        for &other in rest {
            let other_path = self.path_to_root(other);
            // Keep the common suffix (towards the root)
            let common = ancestors
                .iter()
                .rev()
                .zip(other_path.iter().rev())
                .take_while(|(a, b)| a == b)
                .count();
            ancestors.drain(..ancestors.len() - common);
        }
        ancestors.first().copied()
    }

    /// Validates the arena: one root, consistent parent/child links, and
    /// indices matching positions.
    pub fn is_valid(&self) -> bool {
        if !self.is_root_set() || self.root_index >= self.vertices.len() {
            return false;
        }

        let mut num_roots = 0;
        let mut num_leaves = 0;
        for (index, vertex) in self.vertices.iter().enumerate() {
            if vertex.index() != index {
                return false;
            }
            if vertex.is_root() {
                num_roots += 1;
            }
            if let Some(label) = vertex.label() {
                if label.is_empty() {
                    return false;
                }
                num_leaves += 1;
            }

            if let Some((left, right)) = vertex.children() {
                if left >= self.vertices.len() || right >= self.vertices.len() {
                    return false;
                }
                if self.vertices[left].parent() != Some(index)
                    || self.vertices[right].parent() != Some(index)
                {
                    return false;
                }
            }

            if !vertex.is_root() {
                let Some(parent) = vertex.parent() else {
                    return false;
                };
                match self.vertices.get(parent).and_then(Vertex::children) {
                    Some((left, right)) if left == index || right == index => {}
                    _ => return false,
                }
            }
        }

        // n leaves give 2n - 1 vertices in a binary tree
        num_roots == 1 && num_leaves == self.vertices.len().div_ceil(2)
    }
}

impl std::ops::Index<VertexIndex> for Tree {
    type Output = Vertex;

    fn index(&self, index: VertexIndex) -> &Self::Output {
        &self.vertices[index]
    }
}

// =$========================================================================$=
// ITERATORS
// =$========================================================================$=
impl Tree {
    /// Returns an iterator over the vertices in post-order (children before parents).
    pub fn post_order_iter(&self) -> PostOrderIter<'_> {
        PostOrderIter::new(self)
    }

    /// Returns an iterator over the vertices in pre-order (parents before children).
    pub fn pre_order_iter(&self) -> PreOrderIter<'_> {
        PreOrderIter::new(self)
    }

    fn pre_order_indices(&self) -> Vec<VertexIndex> {
        self.pre_order_iter().map(Vertex::index).collect()
    }
}

/// Stack-based post-order traversal.
pub struct PostOrderIter<'a> {
    tree: &'a Tree,
    stack: Vec<(VertexIndex, bool)>, // (index, children_visited)
}

impl<'a> PostOrderIter<'a> {
    fn new(tree: &'a Tree) -> Self {
        let mut stack = Vec::new();
        if tree.is_root_set() {
            stack.push((tree.root_index, false));
        }
        PostOrderIter { tree, stack }
    }
}

impl<'a> Iterator for PostOrderIter<'a> {
    type Item = &'a Vertex;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((index, children_visited)) = self.stack.pop() {
            let vertex = &self.tree[index];
            match vertex.children() {
                Some((left, right)) if !children_visited => {
                    self.stack.push((index, true));
                    self.stack.push((right, false));
                    self.stack.push((left, false));
                }
                _ => return Some(vertex),
            }
        }
        None
    }
}

/// Stack-based pre-order traversal.
pub struct PreOrderIter<'a> {
    tree: &'a Tree,
    stack: Vec<VertexIndex>,
}

impl<'a> PreOrderIter<'a> {
    fn new(tree: &'a Tree) -> Self {
        let mut stack = Vec::new();
        if tree.is_root_set() {
            stack.push(tree.root_index);
        }
        PreOrderIter { tree, stack }
    }
}

impl<'a> Iterator for PreOrderIter<'a> {
    type Item = &'a Vertex;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.stack.pop()?;
        let vertex = &self.tree[index];
        if let Some((left, right)) = vertex.children() {
            self.stack.push(right);
            self.stack.push(left);
        }
        Some(vertex)
    }
}

// =$========================================================================$=
// TESTS
// =$========================================================================$=
#[cfg(test)]
mod tests {
    use super::*;

    /// ((A:1,B:3):2,C:1.5) with root branch unset
    fn small_tree() -> Tree {
        let mut tree = Tree::new(3).with_name("STATE_2000".to_string());
        let a = tree.add_leaf(Some(BranchLength::new(1.0)), "A".to_string());
        let b = tree.add_leaf(Some(BranchLength::new(3.0)), "B".to_string());
        let ab = tree.add_internal_vertex((a, b), Some(BranchLength::new(2.0)));
        let c = tree.add_leaf(Some(BranchLength::new(1.5)), "C".to_string());
        tree.add_root((ab, c), None);
        tree.finish().unwrap();
        tree
    }

    #[test]
    fn test_heights_from_branch_lengths() {
        let tree = small_tree();
        // depths: A=3, B=5, AB=2, C=1.5; max depth 5
        assert!((tree.height(0) - 2.0).abs() < EPSILON);
        assert!((tree.height(1) - 0.0).abs() < EPSILON);
        assert!((tree.height(2) - 3.0).abs() < EPSILON);
        assert!((tree.height(3) - 3.5).abs() < EPSILON);
        assert!((tree.root_height() - 5.0).abs() < EPSILON);
    }

    #[test]
    fn test_id_strips_state_prefix() {
        assert_eq!(small_tree().id(), "2000");
        assert_eq!(Tree::new(2).with_name("mcc".to_string()).id(), "mcc");
    }

    #[test]
    fn test_mrca_and_leaves_below() {
        let tree = small_tree();
        assert_eq!(tree.mrca(&[0, 1]), Some(2));
        assert_eq!(tree.mrca(&[0, 3]), Some(4));
        assert_eq!(tree.mrca(&[3]), Some(3));
        assert_eq!(tree.mrca(&[]), None);
        assert_eq!(tree.leaves_below(2), vec![0, 1]);
        assert_eq!(tree.leaves_below(3), vec![3]);
        assert_eq!(tree.path_to_root(1), vec![1, 2, 4]);
    }

    #[test]
    fn test_traversal_orders() {
        let tree = small_tree();
        let post: Vec<_> = tree.post_order_iter().map(Vertex::index).collect();
        let pre: Vec<_> = tree.pre_order_iter().map(Vertex::index).collect();
        assert_eq!(post, vec![0, 1, 2, 3, 4]);
        assert_eq!(pre, vec![4, 2, 0, 1, 3]);
    }

    #[test]
    fn test_finish_requires_branch_lengths() {
        let mut tree = Tree::new(2);
        let a = tree.add_leaf(None, "A".to_string());
        let b = tree.add_leaf(Some(BranchLength::new(1.0)), "B".to_string());
        tree.add_root((a, b), None);
        assert!(tree.is_valid());
        assert!(tree.finish().is_err());
    }
}
