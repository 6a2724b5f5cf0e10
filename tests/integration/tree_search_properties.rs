//! Property tests for tree search.

use figma_sync::document::Node;
use figma_sync::tree::{find_all, find_by_kind, find_by_name_pattern, find_first, NamePattern};
use proptest::prelude::*;

const KINDS: [&str; 4] = ["FRAME", "COMPONENT", "INSTANCE", "GROUP"];
const NAMES: [&str; 5] = ["Icons", "icon/home", "Arrow", "Frame 12", "ICONS set"];

fn arb_tree() -> impl Strategy<Value = Node> {
    let leaf = (0usize..KINDS.len(), 0usize..NAMES.len())
        .prop_map(|(k, n)| Node::new("", NAMES[n], KINDS[k]));
    let tree = leaf.prop_recursive(4, 48, 5, |inner| {
        (
            0usize..KINDS.len(),
            0usize..NAMES.len(),
            prop::collection::vec(inner, 0..5),
        )
            .prop_map(|(k, n, children)| Node::new("", NAMES[n], KINDS[k]).with_children(children))
    });
    tree.prop_map(|mut root| {
        assign_ids(&mut root, &mut 0);
        root
    })
}

fn assign_ids(node: &mut Node, next: &mut usize) {
    node.id = format!("n{}", next);
    *next += 1;
    for child in &mut node.children {
        assign_ids(child, next);
    }
}

fn preorder_ids(node: &Node, out: &mut Vec<String>) {
    out.push(node.id.clone());
    for child in &node.children {
        preorder_ids(child, out);
    }
}

proptest! {
    #[test]
    fn find_all_true_visits_every_node_in_preorder(root in arb_tree()) {
        let mut expected = Vec::new();
        preorder_ids(&root, &mut expected);
        let found: Vec<String> = find_all(&root, |_| true).into_iter().map(|n| n.id.clone()).collect();
        prop_assert_eq!(found, expected);
    }

    #[test]
    fn find_by_kind_is_an_ordered_subset(root in arb_tree(), k in 0usize..KINDS.len()) {
        let mut order = Vec::new();
        preorder_ids(&root, &mut order);
        let found = find_by_kind(&root, KINDS[k]);
        prop_assert!(found.iter().all(|n| n.kind == KINDS[k]));

        let positions: Vec<usize> = found
            .iter()
            .map(|n| order.iter().position(|id| id == &n.id).unwrap())
            .collect();
        prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn find_first_is_head_of_find_all(root in arb_tree(), k in 0usize..KINDS.len()) {
        let first = find_first(&root, |n| n.kind == KINDS[k]).map(|n| n.id.clone());
        let all = find_all(&root, |n| n.kind == KINDS[k]);
        prop_assert_eq!(first, all.first().map(|n| n.id.clone()));
    }

    #[test]
    fn name_search_is_case_insensitive_and_deterministic(root in arb_tree()) {
        let pattern = NamePattern::new("icons");
        let once: Vec<&str> = find_by_name_pattern(&root, &pattern).iter().map(|n| n.id.as_str()).collect();
        let again: Vec<&str> = find_by_name_pattern(&root, &pattern).iter().map(|n| n.id.as_str()).collect();
        prop_assert_eq!(&once, &again);
        let expected: Vec<&str> = find_all(&root, |n| n.name.to_lowercase().contains("icons"))
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        prop_assert_eq!(once, expected);
    }
}
