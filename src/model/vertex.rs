//! Vertex of the arena-backed [Tree](crate::model::Tree).

use crate::model::tree::VertexIndex;
use std::ops::Deref;

/// During construction, internal vertices and leaves might not have a parent yet.
const NO_PARENT_SET: VertexIndex = usize::MAX;

// =#========================================================================#=
// VERTEX
// =#========================================================================#=
/// A vertex (node) of a binary phylogenetic tree.
///
/// # Invariants
/// - `index` is the vertex's position in the tree arena
/// - `parent` equals `NO_PARENT_SET` only while the tree is being built
/// - a leaf owns its taxon label; internal vertices and the root are unlabelled
#[derive(PartialEq, Debug, Clone)]
pub enum Vertex {
    /// Root vertex (no parent, two children)
    Root {
        index: VertexIndex,
        children: (VertexIndex, VertexIndex),
        /// Length of a root branch, if the file carries one
        branch_length: Option<BranchLength>,
    },
    /// Internal vertex (parent and two children)
    Internal {
        index: VertexIndex,
        parent: VertexIndex,
        children: (VertexIndex, VertexIndex),
        branch_length: Option<BranchLength>,
    },
    /// Leaf vertex (parent and taxon label)
    Leaf {
        index: VertexIndex,
        parent: VertexIndex,
        branch_length: Option<BranchLength>,
        label: String,
    },
}

impl Vertex {
    /// Creates a new root vertex.
    pub fn new_root(
        index: VertexIndex,
        children: (VertexIndex, VertexIndex),
        branch_length: Option<BranchLength>,
    ) -> Self {
        Vertex::Root {
            index,
            children,
            branch_length,
        }
    }

    /// Creates a new internal vertex; its parent is set once the parent is added.
    pub fn new_internal(
        index: VertexIndex,
        children: (VertexIndex, VertexIndex),
        branch_length: Option<BranchLength>,
    ) -> Self {
        Vertex::Internal {
            index,
            parent: NO_PARENT_SET,
            children,
            branch_length,
        }
    }

    /// Creates a new leaf; its parent is set once the parent is added.
    pub fn new_leaf(index: VertexIndex, branch_length: Option<BranchLength>, label: String) -> Self {
        Vertex::Leaf {
            index,
            parent: NO_PARENT_SET,
            branch_length,
            label,
        }
    }

    /// Returns the arena index of this vertex.
    pub fn index(&self) -> VertexIndex {
        match self {
            Vertex::Root { index, .. }
            | Vertex::Internal { index, .. }
            | Vertex::Leaf { index, .. } => *index,
        }
    }

    /// Returns the length of the branch above this vertex, if known.
    pub fn branch_length(&self) -> Option<BranchLength> {
        match self {
            Vertex::Root { branch_length, .. }
            | Vertex::Internal { branch_length, .. }
            | Vertex::Leaf { branch_length, .. } => *branch_length,
        }
    }

    /// Returns whether the branch above this vertex has a length.
    /// A root always counts as having one.
    pub fn has_branch_length(&self) -> bool {
        self.is_root() || self.branch_length().is_some()
    }

    /// Returns the taxon label if this is a leaf.
    pub fn label(&self) -> Option<&str> {
        match self {
            Vertex::Leaf { label, .. } => Some(label),
            _ => None,
        }
    }

    /// Returns the children unless this is a leaf.
    pub fn children(&self) -> Option<(VertexIndex, VertexIndex)> {
        match self {
            Vertex::Root { children, .. } | Vertex::Internal { children, .. } => Some(*children),
            Vertex::Leaf { .. } => None,
        }
    }

    /// Returns the parent index; `None` for the root and for vertices
    /// whose parent has not been added yet.
    pub fn parent(&self) -> Option<VertexIndex> {
        match self {
            Vertex::Internal { parent, .. } | Vertex::Leaf { parent, .. } => {
                (*parent != NO_PARENT_SET).then_some(*parent)
            }
            Vertex::Root { .. } => None,
        }
    }

    /// Returns whether a parent has been set.
    pub fn has_parent(&self) -> bool {
        self.parent().is_some()
    }

    /// Sets the parent of a non-root vertex.
    ///
    /// # Panics
    /// Panics if called on the root.
    pub fn set_parent(&mut self, new_parent: VertexIndex) {
        match self {
            Vertex::Root { .. } => panic!("Cannot set parent on root vertex"),
            Vertex::Internal { parent, .. } | Vertex::Leaf { parent, .. } => *parent = new_parent,
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, Vertex::Root { .. })
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Vertex::Internal { .. })
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Vertex::Leaf { .. })
    }
}

// =#========================================================================#=
// BRANCH LENGTH
// =#========================================================================#=
/// Length of the branch between a vertex and its parent, non-negative and finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BranchLength(f64);

impl BranchLength {
    /// Creates a new branch length.
    ///
    /// # Panics
    /// Panics if `length` is negative or not finite.
    pub fn new(length: f64) -> Self {
        assert!(length >= 0.0, "Branch length must be non-negative, got {}", length);
        assert!(length.is_finite(), "Branch length must be finite, got {}", length);
        BranchLength(length)
    }

    /// Creates a branch length, or `None` for negative or non-finite values.
    pub fn try_new(length: f64) -> Option<Self> {
        (length >= 0.0 && length.is_finite()).then_some(BranchLength(length))
    }
}

impl Deref for BranchLength {
    type Target = f64;
    fn deref(&self) -> &f64 {
        &self.0
    }
}
