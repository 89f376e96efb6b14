//! Laws of the binary-tree index arithmetic used by the collectives.

use phold_sim_core::BinaryTree;

#[test]
fn test_capacity_is_one_less_than_power_of_two() {
    for d in 0..30 {
        assert_eq!(BinaryTree::capacity(d), (1u64 << (d + 1)) - 1);
    }
}

#[test]
fn test_begin_is_previous_end() {
    for d in 1..30 {
        assert_eq!(BinaryTree::begin(d), BinaryTree::end(d - 1));
    }
    assert_eq!(BinaryTree::begin(0), 0);
}

#[test]
fn test_depth_ranges_partition_the_indices() {
    // Every index in [begin(d), end(d)) reports depth d.
    for d in 0..12u32 {
        for i in BinaryTree::begin(d)..BinaryTree::end(d) {
            assert_eq!(BinaryTree::depth(i), d);
        }
    }
}

#[test]
fn test_children_of_parent_round_trip() {
    for i in 1..10_000u64 {
        let (left, right) = BinaryTree::children(BinaryTree::parent(i));
        assert!(i == left || i == right);
    }
}

#[test]
fn test_parent_of_children_round_trip() {
    for i in 0..5_000u64 {
        let (left, right) = BinaryTree::children(i);
        assert_eq!(BinaryTree::parent(left), i);
        assert_eq!(BinaryTree::parent(right), i);
    }
}

#[test]
fn test_max_depth_covers_population() {
    // end(depth(N - 1)) >= N: the deepest level has room for every LP.
    for n in 2..1_000u64 {
        let max_depth = BinaryTree::depth(n - 1);
        assert!(BinaryTree::end(max_depth) >= n);
    }
}

#[test]
fn test_tie_break_order_is_left_then_right() {
    let (left, right) = BinaryTree::children(0);
    assert_eq!((left, right), (1, 2));
    assert!(left < right);
}
