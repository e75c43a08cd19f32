//! Structural properties of the arena document under random edits

use proptest::prelude::*;
use reskin_dom::{Document, MutationOrigin, NodeId};

#[derive(Debug, Clone)]
enum Op {
    Append { parent: usize, child: usize },
    InsertFirst { parent: usize, child: usize },
    Remove(usize),
    Class(usize, bool),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..12usize, 0..12usize).prop_map(|(parent, child)| Op::Append { parent, child }),
        (0..12usize, 0..12usize).prop_map(|(parent, child)| Op::InsertFirst { parent, child }),
        (0..12usize).prop_map(Op::Remove),
        (0..12usize, any::<bool>()).prop_map(|(n, on)| Op::Class(n, on)),
    ]
}

fn check_links(doc: &Document) {
    for node in doc.descendants(doc.root()) {
        let parent = doc.parent(node).expect("connected node has a parent");
        assert!(doc.children(parent).contains(&node));
        for &c in doc.children(node) {
            assert_eq!(doc.parent(c), Some(node));
        }
    }
}

proptest! {
    #[test]
    fn parent_child_links_stay_consistent(ops in prop::collection::vec(op(), 1..60)) {
        let mut doc = Document::new();
        let body = doc.body();
        let nodes: Vec<NodeId> = (0..12)
            .map(|_| {
                let n = doc.create_element("div");
                doc.append_child(body, n).unwrap();
                n
            })
            .collect();

        for op in ops {
            // Errors (stale handles, cycles) are expected; the tree must stay sound either way.
            let _ = match op {
                Op::Append { parent, child } => doc.append_child(nodes[parent], nodes[child]),
                Op::InsertFirst { parent, child } => doc.prepend_child(nodes[parent], nodes[child]),
                Op::Remove(n) => doc.remove(nodes[n]),
                Op::Class(n, on) => doc.toggle_class(nodes[n], "x", on),
            };
            check_links(&doc);
        }
    }

    #[test]
    fn engine_writes_are_stamped(count in 1usize..20) {
        let mut doc = Document::new();
        let body = doc.body();
        doc.take_records();
        doc.with_origin(MutationOrigin::Engine, |doc| {
            for i in 0..count {
                let n = doc.create_element("span");
                doc.append_child(body, n).unwrap();
                doc.set_attr(n, "data-i", &i.to_string()).unwrap();
            }
        });
        let records = doc.take_records();
        prop_assert_eq!(records.len(), count * 2);
        prop_assert!(records.iter().all(|r| r.is_engine()));
    }
}
