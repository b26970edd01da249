use jumphistory::model::{BranchLength, Vertex};

// ============= Branch Length Tests =============
#[test]
fn test_branch_lengths() {
    let vertex = Vertex::new_internal(5, (1, 2), Some(BranchLength::new(1.234)));
    assert_eq!(*vertex.branch_length().unwrap(), 1.234);
}

#[test]
#[should_panic]
fn test_negative_branch_length() {
    let _ = BranchLength::new(-1.0);
}

#[test]
fn test_try_new_rejects_invalid_lengths() {
    assert!(BranchLength::try_new(-0.5).is_none());
    assert!(BranchLength::try_new(f64::INFINITY).is_none());
    assert_eq!(BranchLength::try_new(2.5).map(|bl| *bl), Some(2.5));
}

// ============= Vertex Variant Consistency Tests =============
#[test]
fn test_is_x() {
    let leaf = Vertex::new_leaf(0, Some(BranchLength::new(0.5)), "A/Hubei/1/2013".to_string());
    assert!(leaf.is_leaf());
    assert!(!leaf.is_internal());

    let vertex = Vertex::new_internal(0, (1, 2), Some(BranchLength::new(0.5)));
    assert!(vertex.is_internal());

    let root = Vertex::new_root(2, (0, 1), None);
    assert!(root.is_root());
    assert!(root.has_branch_length());
}

#[test]
fn test_nonleaf_vertex_has_no_label() {
    let internal = Vertex::new_internal(0, (1, 2), Some(BranchLength::new(0.5)));
    assert_eq!(internal.label(), None);

    let root = Vertex::new_root(0, (12, 34), Some(BranchLength::new(0.6)));
    assert_eq!(root.label(), None);
    assert_eq!(root.children(), Some((12, 34)));
}

#[test]
fn test_parent_is_set_later() {
    let mut leaf = Vertex::new_leaf(3, Some(BranchLength::new(1.0)), "B_Fujian".to_string());
    assert!(!leaf.has_parent());
    assert_eq!(leaf.parent(), None);

    leaf.set_parent(7);
    assert!(leaf.has_parent());
    assert_eq!(leaf.parent(), Some(7));
    assert_eq!(leaf.children(), None);
}
