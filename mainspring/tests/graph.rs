//! End-to-end tests of the scheduler's graph.

use mainspring::graph::Graph;

#[test]
fn diamond_sorts_from_seed_only() {
    let mut graph = Graph::<&str, ()>::new();
    let a = graph.add_node("a");
    let b = graph.add_node("b");
    let c = graph.add_node("c");
    let d = graph.add_node("d");
    let e = graph.add_node("e");
    let f = graph.add_node("f");

    graph.add_edge(a, b, ()).unwrap();
    graph.add_edge(a, c, ()).unwrap();
    graph.add_edge(b, d, ()).unwrap();
    graph.add_edge(c, d, ()).unwrap();
    // A disconnected component that the seeded sort must not visit.
    graph.add_edge(e, f, ()).unwrap();

    let sorted = graph.topological_sort_from(a).unwrap();
    assert!(!sorted.has_cycles);
    assert_eq!(sorted.order.len(), 4);

    let position = |node| sorted.order.iter().position(|x| *x == node).unwrap();
    assert!(position(a) < position(b));
    assert!(position(a) < position(c));
    assert!(position(b) < position(d));
    assert!(position(c) < position(d));
    assert!(!sorted.order.contains(&e));
    assert!(!sorted.order.contains(&f));
}

#[test]
fn cycles_are_reported_with_an_acyclic_prefix() {
    let mut graph = Graph::<&str, ()>::new();
    let x = graph.add_node("x");
    let y = graph.add_node("y");
    let z = graph.add_node("z");

    graph.add_edge(x, y, ()).unwrap();
    graph.add_edge(y, z, ()).unwrap();
    graph.add_edge(z, x, ()).unwrap();

    let sorted = graph.topological_sort_from(x).unwrap();
    assert!(sorted.has_cycles);
    assert!(sorted.order.len() < 3);
}

#[test]
fn ties_break_toward_the_smallest_index() {
    let mut graph = Graph::<(), ()>::new();
    let root = graph.add_node(());
    let high = graph.add_node(());
    let low = graph.add_node(());
    // Both successors become ready together; the earlier index goes first.
    graph.add_edge(root, high, ()).unwrap();
    graph.add_edge(root, low, ()).unwrap();

    let sorted = graph.topological_sort_from(root).unwrap();
    assert_eq!(sorted.order, vec![root, high, low]);
}

#[test]
fn remove_node_relocates_the_last_node() {
    let mut graph = Graph::<&str, ()>::new();
    let a = graph.add_node("a");
    let b = graph.add_node("b");
    let c = graph.add_node("c");
    let d = graph.add_node("d");

    graph.add_edge(a, b, ()).unwrap();
    graph.add_edge(c, b, ()).unwrap();
    graph.add_edge(d, a, ()).unwrap();
    graph.add_edge(b, d, ()).unwrap();

    assert_eq!(graph.remove_node(b), Ok("b"));
    assert_eq!(graph.node_count(), 3);

    // The node that held the largest index now answers at the vacated one.
    assert_eq!(graph.node_weight(b), Ok(&"d"));

    // No surviving edge mentions the removed node's payload: only d -> a
    // remains, with d relocated to b's index.
    assert_eq!(graph.edge_count(), 1);
    assert!(graph.contains_edge(b, a).unwrap());
    assert_eq!(graph.out_degree(a), Ok(0));
    assert_eq!(graph.out_degree(c), Ok(0));
}

#[test]
fn removing_the_last_node_relocates_nothing() {
    let mut graph = Graph::<u32, ()>::new();
    let first = graph.add_node(10);
    let last = graph.add_node(20);
    graph.add_edge(first, last, ()).unwrap();

    assert_eq!(graph.remove_node(last), Ok(20));
    assert_eq!(graph.node_count(), 1);
    assert_eq!(graph.node_weight(first), Ok(&10));
    assert_eq!(graph.edge_count(), 0);
}
