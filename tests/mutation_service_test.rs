mod common;

use std::collections::BTreeMap;

use rstest::rstest;

use nestree::domain::{DomainError, NodeId, Payload, TreeId, Value};
use nestree::ApplicationError;

use common::{assert_valid, build, child_names, container, leaf, named, names, sample_tree, shapes, t};

const TREE: TreeId = TreeId(1);

/// `R[c1, c2, c3]`, laid out as R(1,8) c1(2,3) c2(4,5) c3(6,7).
fn flat_tree(c: &nestree::infrastructure::di::ServiceContainer) -> BTreeMap<&'static str, NodeId> {
    build(c, TREE, &t("R", vec![leaf("c1"), leaf("c2"), leaf("c3")]))
}

#[test]
fn given_existing_root_when_appending_without_parent_then_root_error() {
    // Arrange
    let c = container();
    flat_tree(&c);

    // Act
    let err = c.mutation().append_child(TREE, None, named("R2")).unwrap_err();

    // Assert
    assert!(matches!(err, ApplicationError::Domain(DomainError::Root { .. })));
    assert_eq!(c.traversal().size(TREE, None).unwrap(), 4);
}

#[test]
fn given_missing_parent_when_appending_then_node_not_found() {
    // Arrange
    let c = container();
    flat_tree(&c);

    // Act
    let err = c
        .mutation()
        .append_child(TREE, Some(NodeId(42)), named("x"))
        .unwrap_err();

    // Assert
    assert_eq!(
        err.domain(),
        Some(&DomainError::NodeNotFound {
            tree: TREE,
            node: NodeId(42)
        })
    );
}

#[test]
fn given_flat_tree_when_inserting_after_first_child_then_new_node_takes_its_slot() {
    // Arrange
    let c = container();
    let ids = flat_tree(&c);

    // Act
    let id = c.mutation().insert_after(TREE, ids["c1"], named("new")).unwrap();

    // Assert
    let node = c.traversal().node(TREE, id).unwrap();
    assert_eq!((node.lft(), node.rgt()), (4, 5));
    let root = c.traversal().node(TREE, ids["R"]).unwrap();
    assert_eq!((root.lft(), root.rgt()), (1, 10));
    assert_eq!(child_names(&c, TREE, ids["R"]), vec!["c1", "new", "c2", "c3"]);
    assert_valid(&c, TREE);
}

#[test]
fn given_flat_tree_when_inserting_before_child_then_new_left_sibling() {
    // Arrange
    let c = container();
    let ids = flat_tree(&c);

    // Act
    c.mutation().insert_before(TREE, ids["c2"], named("new")).unwrap();

    // Assert
    assert_eq!(child_names(&c, TREE, ids["R"]), vec!["c1", "new", "c2", "c3"]);
    assert_valid(&c, TREE);
}

#[rstest]
#[case(0, vec!["new", "c1", "c2", "c3"])]
#[case(1, vec!["c1", "new", "c2", "c3"])]
#[case(2, vec!["c1", "c2", "new", "c3"])]
#[case(-1, vec!["c1", "c2", "new", "c3"])]
#[case(-3, vec!["new", "c1", "c2", "c3"])]
fn given_flat_tree_when_inserting_at_index_then_lands_in_front_of_that_child(
    #[case] index: i64,
    #[case] expected: Vec<&str>,
) {
    // Arrange
    let c = container();
    let ids = flat_tree(&c);

    // Act
    c.mutation()
        .insert_child_at_index(TREE, ids["R"], index, named("new"))
        .unwrap();

    // Assert
    assert_eq!(child_names(&c, TREE, ids["R"]), expected);
    assert_valid(&c, TREE);
}

#[rstest]
#[case(3)]
#[case(7)]
#[case(-4)]
fn given_flat_tree_when_inserting_out_of_range_then_index_error(#[case] index: i64) {
    // Arrange
    let c = container();
    let ids = flat_tree(&c);
    let before = shapes(&c, TREE);

    // Act
    let err = c
        .mutation()
        .insert_child_at_index(TREE, ids["R"], index, named("new"))
        .unwrap_err();

    // Assert
    assert_eq!(err.domain(), Some(&DomainError::IndexOutOfRange { index, count: 3 }));
    assert_eq!(shapes(&c, TREE), before);
}

#[test]
fn given_leaf_when_inserting_at_index_zero_then_index_error() {
    // Arrange
    let c = container();
    let ids = flat_tree(&c);

    // Act
    let err = c
        .mutation()
        .insert_child_at_index(TREE, ids["c1"], 0, named("new"))
        .unwrap_err();

    // Assert
    assert_eq!(err.domain(), Some(&DomainError::IndexOutOfRange { index: 0, count: 0 }));
}

#[test]
fn given_undeclared_field_when_appending_then_unknown_field() {
    // Arrange
    let c = container();
    let ids = flat_tree(&c);
    let mut payload = named("x");
    payload.insert("colour".into(), Value::from("red"));

    // Act
    let err = c.mutation().append_child(TREE, Some(ids["R"]), payload).unwrap_err();

    // Assert
    assert_eq!(err.domain(), Some(&DomainError::UnknownField("colour".into())));
    assert_eq!(c.traversal().size(TREE, None).unwrap(), 4);
}

#[test]
fn given_sample_tree_when_deleting_with_close_then_intervals_contiguous() {
    // Arrange
    let c = container();
    let ids = sample_tree(&c, TREE);

    // Act
    let removed = c.mutation().delete_node(TREE, ids["B"], true).unwrap();

    // Assert
    assert_eq!(removed, 3);
    assert_eq!(shapes(&c, TREE), vec![(1, 1, 4), (5, 2, 3)]);
    assert_valid(&c, TREE);
}

#[test]
fn given_sample_tree_when_deleting_without_close_then_gaps_until_closed() {
    // Arrange
    let c = container();
    let ids = sample_tree(&c, TREE);

    // Act
    let removed = c.mutation().delete_node(TREE, ids["B"], false).unwrap();

    // Assert
    assert_eq!(removed, 3);
    assert_eq!(shapes(&c, TREE), vec![(1, 1, 10), (5, 8, 9)]);
    assert!(c.traversal().verify(TREE).is_err());
    assert_eq!(c.traversal().root(TREE).unwrap(), Some(ids["A"]));

    assert_eq!(c.mutation().close_gaps(TREE).unwrap(), 2);
    assert_eq!(shapes(&c, TREE), vec![(1, 1, 4), (5, 2, 3)]);
    assert_eq!(c.mutation().close_gaps(TREE).unwrap(), 0);
    assert_valid(&c, TREE);
}

#[test]
fn given_root_when_deleting_then_tree_disappears() {
    // Arrange
    let c = container();
    let ids = sample_tree(&c, TREE);

    // Act
    let removed = c.mutation().delete_node(TREE, ids["A"], true).unwrap();

    // Assert
    assert_eq!(removed, 5);
    assert!(shapes(&c, TREE).is_empty());
    assert!(c.forest().tree_ids().unwrap().is_empty());
}

#[test]
fn given_node_when_updating_then_payload_merged_and_intervals_kept() {
    // Arrange
    let c = container();
    let ids = sample_tree(&c, TREE);
    let before = shapes(&c, TREE);
    let mut fields = Payload::new();
    fields.insert("kind".into(), Value::from("branch"));

    // Act
    c.mutation().update_node(TREE, ids["B"], fields).unwrap();

    // Assert
    let node = c.traversal().node(TREE, ids["B"]).unwrap();
    assert_eq!(node.field("name"), Value::from("B"));
    assert_eq!(node.field("kind"), Value::from("branch"));
    assert_eq!(shapes(&c, TREE), before);
}

#[test]
fn given_empty_fields_when_updating_then_empty_update() {
    // Arrange
    let c = container();
    let ids = sample_tree(&c, TREE);

    // Act
    let err = c.mutation().update_node(TREE, ids["B"], Payload::new()).unwrap_err();

    // Assert
    assert_eq!(err.domain(), Some(&DomainError::EmptyUpdate(ids["B"])));
}

#[test]
fn given_mutations_when_done_then_node_ids_stable() {
    // Arrange
    let c = container();
    let ids = sample_tree(&c, TREE);

    // Act
    c.mutation().insert_child_at_index(TREE, ids["A"], 0, named("F")).unwrap();
    c.mutation().move_after(TREE, ids["D"], TREE, ids["C"]).unwrap();

    // Assert
    for (name, id) in &ids {
        let node = c.traversal().node(TREE, *id).unwrap();
        assert_eq!(node.field("name"), Value::from(*name));
    }
    assert_eq!(names(&c, TREE), vec!["A", "F", "B", "E", "C", "D"]);
    assert_valid(&c, TREE);
}
