mod common;

use nestree::domain::{DomainError, TreeId};
use nestree::ApplicationError;

use common::{assert_valid, child_names, container, names, sample_tree, shapes};

const TREE: TreeId = TreeId(1);

#[test]
fn given_sample_tree_when_moving_before_sibling_then_order_changes() {
    // Arrange
    let c = container();
    let ids = sample_tree(&c, TREE);

    // Act
    c.mutation().move_before(TREE, ids["C"], TREE, ids["B"]).unwrap();

    // Assert
    assert_eq!(names(&c, TREE), vec!["A", "C", "B", "D", "E"]);
    assert_valid(&c, TREE);
}

#[test]
fn given_sample_tree_when_moving_after_sibling_then_siblings_swap() {
    // Arrange
    let c = container();
    let ids = sample_tree(&c, TREE);

    // Act
    c.mutation().move_after(TREE, ids["D"], TREE, ids["E"]).unwrap();

    // Assert
    assert_eq!(child_names(&c, TREE, ids["B"]), vec!["E", "D"]);
    assert_valid(&c, TREE);
}

#[test]
fn given_sample_tree_when_moving_to_last_child_of_leaf_then_leaf_grows() {
    // Arrange
    let c = container();
    let ids = sample_tree(&c, TREE);

    // Act
    c.mutation().move_to_last_child(TREE, ids["C"], TREE, ids["D"]).unwrap();

    // Assert
    assert_eq!(
        shapes(&c, TREE),
        vec![(1, 1, 10), (2, 2, 9), (3, 3, 6), (5, 4, 5), (4, 7, 8)]
    );
    assert_eq!(c.traversal().parent(TREE, ids["C"]).unwrap(), Some(ids["D"]));
    assert_valid(&c, TREE);
}

#[test]
fn given_sample_tree_when_moving_at_index_zero_then_becomes_first_child() {
    // Arrange
    let c = container();
    let ids = sample_tree(&c, TREE);

    // Act
    c.mutation().move_at_index(TREE, ids["E"], TREE, ids["A"], 0).unwrap();

    // Assert
    assert_eq!(child_names(&c, TREE, ids["A"]), vec!["E", "B", "C"]);
    assert_eq!(child_names(&c, TREE, ids["B"]), vec!["D"]);
    assert_valid(&c, TREE);
}

#[test]
fn given_sample_tree_when_moving_under_own_descendant_then_child_of_yourself() {
    // Arrange
    let c = container();
    let ids = sample_tree(&c, TREE);
    let before = shapes(&c, TREE);

    // Act
    let err = c
        .mutation()
        .move_at_index(TREE, ids["B"], TREE, ids["D"], 0)
        .unwrap_err();

    // Assert
    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::ChildOfYourself { .. })
    ));
    assert_eq!(shapes(&c, TREE), before);
}

#[test]
fn given_sample_tree_when_moving_into_own_subtree_by_sibling_then_child_of_yourself() {
    // Arrange
    let c = container();
    let ids = sample_tree(&c, TREE);
    let before = shapes(&c, TREE);

    // Act
    let err = c.mutation().move_after(TREE, ids["B"], TREE, ids["E"]).unwrap_err();

    // Assert
    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::ChildOfYourself { .. })
    ));
    assert_eq!(shapes(&c, TREE), before);
}

#[test]
fn given_sample_tree_when_moving_at_index_of_itself_then_child_of_yourself() {
    // Arrange
    let c = container();
    let ids = sample_tree(&c, TREE);

    // Act
    let err = c
        .mutation()
        .move_at_index(TREE, ids["B"], TREE, ids["A"], 0)
        .unwrap_err();

    // Assert
    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::ChildOfYourself { .. })
    ));
}

#[test]
fn given_sample_tree_when_moving_before_root_then_root_error() {
    // Arrange
    let c = container();
    let ids = sample_tree(&c, TREE);

    // Act
    let err = c.mutation().move_before(TREE, ids["B"], TREE, ids["A"]).unwrap_err();

    // Assert
    assert!(matches!(err, ApplicationError::Domain(DomainError::Root { .. })));
}

#[test]
fn given_root_when_moving_before_itself_then_child_of_yourself() {
    // Arrange
    let c = container();
    let ids = sample_tree(&c, TREE);
    let before = shapes(&c, TREE);

    // Act
    let err = c.mutation().move_before(TREE, ids["A"], TREE, ids["A"]).unwrap_err();

    // Assert
    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::ChildOfYourself { .. })
    ));
    assert_eq!(shapes(&c, TREE), before);
}

#[test]
fn given_sample_tree_when_moving_root_below_itself_then_rejected() {
    // Arrange
    let c = container();
    let ids = sample_tree(&c, TREE);

    // Act
    let err = c.mutation().move_after(TREE, ids["A"], TREE, ids["C"]).unwrap_err();

    // Assert
    assert!(err.domain().is_some());
    assert_valid(&c, TREE);
}

#[test]
fn given_missing_node_when_moving_then_node_not_found() {
    // Arrange
    let c = container();
    let ids = sample_tree(&c, TREE);

    // Act
    let err = c
        .mutation()
        .move_before(TREE, nestree::NodeId(99), TREE, ids["C"])
        .unwrap_err();

    // Assert
    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::NodeNotFound { .. })
    ));
}

#[test]
fn given_subtree_when_moving_to_empty_position_in_other_tree_then_whole_subtree_moves() {
    // Arrange
    let c = container();
    let ids = sample_tree(&c, TREE);
    let other = TreeId(2);
    let host = c
        .mutation()
        .append_child(other, None, common::named("H"))
        .unwrap();

    // Act
    c.mutation().move_to_last_child(TREE, ids["B"], other, host).unwrap();

    // Assert
    assert_eq!(names(&c, TREE), vec!["A", "C"]);
    assert_eq!(names(&c, other), vec!["H", "B", "D", "E"]);
    assert_eq!(c.traversal().size(other, None).unwrap(), 4);
    assert_valid(&c, TREE);
    assert_valid(&c, other);
}
