//! Tree model: arena-backed trees, vertices, annotations, and construction.
//!
//! The main type is [Tree]; trees are built by a [TreeBuilder] while the
//! [newick](crate::newick) or [nexus](crate::nexus) parsers read a file.

/// Vertex annotations parsed from `[&...]` blocks
pub mod annotation;
/// Resolution of Nexus TRANSLATE keys
pub mod label_resolver;
/// Phylogenetic tree structure and operations
pub mod tree;
/// Tree construction during parsing
pub mod tree_builder;
/// Tree vertex types (root, internal, leaf)
pub mod vertex;

pub use annotation::{AnnotationValue, Annotations};
pub use label_resolver::{LabelResolver, LabelResolvingError};
pub use tree::{EPSILON, PostOrderIter, PreOrderIter, Tree, VertexIndex};
pub use tree_builder::TreeBuilder;
pub use vertex::{BranchLength, Vertex};
