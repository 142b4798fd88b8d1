//! Assemble nested reply threads from flat rows
//!
//! Rows are indexed by parent once, then materialised from the index with an
//! explicit stack, so the build is linear in the number of replies and uses
//! constant call depth however long a reply chain gets.
//!
//! A reply whose parent is not among the input rows (deleted, or removed by
//! the visibility filter) is promoted to a root. A malformed cycle is broken
//! at the first member reached, so every input row appears exactly once.
//!
//! Threads nest at most `MAX_REPLY_DEPTH` levels below a root. Anything
//! deeper is attached, in thread order, as leaves of its ancestor at the
//! last allowed level, which keeps serialising and dropping the result
//! shallow as well.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Deepest nesting level a returned node may sit at (roots are level 0)
pub const MAX_REPLY_DEPTH: usize = 32;

/// A row with an optional parent pointer
pub trait Threaded {
    fn id(&self) -> Uuid;
    fn parent_id(&self) -> Option<Uuid>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode<T> {
    #[serde(flatten)]
    pub item: T,
    pub replies: Vec<TreeNode<T>>,
}

impl<T> TreeNode<T> {
    fn leaf(item: T) -> Self {
        Self {
            item,
            replies: Vec::new(),
        }
    }

    /// Number of nodes in this subtree, including itself
    pub fn size(&self) -> usize {
        1 + self.replies.iter().map(TreeNode::size).sum::<usize>()
    }
}

type ChildIndex = HashMap<Option<Uuid>, Vec<usize>>;

/// Build the forest under `root`
///
/// With `root = None` the result contains every input row. With
/// `root = Some(id)` only the descendants of `id` are returned.
pub fn build_reply_tree<T: Threaded>(items: Vec<T>, root: Option<Uuid>) -> Vec<TreeNode<T>> {
    let ids: HashSet<Uuid> = items.iter().map(Threaded::id).collect();

    let mut children: ChildIndex = HashMap::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let parent = item
            .parent_id()
            .filter(|p| *p != item.id() && ids.contains(p));
        children.entry(parent).or_default().push(idx);
    }

    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    let top = children.get(&root).cloned().unwrap_or_default();
    let mut forest = assemble(&top, &children, &mut slots);

    if root.is_none() {
        // Whatever is left belongs to a parent cycle
        for idx in 0..slots.len() {
            if slots[idx].is_some() {
                forest.extend(assemble(&[idx], &children, &mut slots));
            }
        }
    }

    forest
}

/// A node whose children are still being built
struct Frame<T> {
    item: T,
    replies: Vec<TreeNode<T>>,
    pending: std::vec::IntoIter<usize>,
}

impl<T: Threaded> Frame<T> {
    fn open(item: T, children: &ChildIndex) -> Self {
        let pending = children
            .get(&Some(item.id()))
            .cloned()
            .unwrap_or_default()
            .into_iter();
        Self {
            item,
            replies: Vec::new(),
            pending,
        }
    }
}

/// Depth-first build of the subtrees rooted at `roots`
///
/// The frame stack never holds more than `MAX_REPLY_DEPTH` entries; a child
/// that would go deeper is flattened into its parent instead.
fn assemble<T: Threaded>(
    roots: &[usize],
    children: &ChildIndex,
    slots: &mut [Option<T>],
) -> Vec<TreeNode<T>> {
    let mut forest = Vec::new();
    let mut stack: Vec<Frame<T>> = Vec::new();

    for &root in roots {
        let Some(item) = slots[root].take() else {
            continue;
        };
        stack.push(Frame::open(item, children));

        while let Some(top) = stack.last_mut() {
            match top.pending.next() {
                Some(child) => {
                    let Some(item) = slots[child].take() else {
                        continue;
                    };
                    if stack.len() < MAX_REPLY_DEPTH {
                        stack.push(Frame::open(item, children));
                    } else {
                        let leaves = flatten(item, children, slots);
                        if let Some(top) = stack.last_mut() {
                            top.replies.extend(leaves);
                        }
                    }
                }
                None => {
                    let Some(done) = stack.pop() else {
                        break;
                    };
                    let node = TreeNode {
                        item: done.item,
                        replies: done.replies,
                    };
                    match stack.last_mut() {
                        Some(parent) => parent.replies.push(node),
                        None => forest.push(node),
                    }
                }
            }
        }
    }

    forest
}

/// `item` and all of its descendants as leaves, in thread order
fn flatten<T: Threaded>(
    item: T,
    children: &ChildIndex,
    slots: &mut [Option<T>],
) -> Vec<TreeNode<T>> {
    let mut pending: Vec<usize> = Vec::new();
    if let Some(kids) = children.get(&Some(item.id())) {
        pending.extend(kids.iter().rev());
    }

    let mut leaves = vec![TreeNode::leaf(item)];
    while let Some(idx) = pending.pop() {
        let Some(item) = slots[idx].take() else {
            continue;
        };
        if let Some(kids) = children.get(&Some(item.id())) {
            pending.extend(kids.iter().rev());
        }
        leaves.push(TreeNode::leaf(item));
    }
    leaves
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct Row {
        id: Uuid,
        parent: Option<Uuid>,
    }

    impl Threaded for Row {
        fn id(&self) -> Uuid {
            self.id
        }
        fn parent_id(&self) -> Option<Uuid> {
            self.parent
        }
    }

    fn row(id: Uuid, parent: Option<Uuid>) -> Row {
        Row { id, parent }
    }

    fn ids<T: Threaded>(nodes: &[TreeNode<T>]) -> Vec<Uuid> {
        nodes.iter().map(|n| n.item.id()).collect()
    }

    #[test]
    fn test_basic_forest() {
        let (r1, r2, r3) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let forest = build_reply_tree(
            vec![row(r1, None), row(r2, Some(r1)), row(r3, None)],
            None,
        );

        assert_eq!(ids(&forest), vec![r1, r3]);
        assert_eq!(ids(&forest[0].replies), vec![r2]);
        assert!(forest[0].replies[0].replies.is_empty());
        assert!(forest[1].replies.is_empty());
    }

    #[test]
    fn test_children_match_parent_pointers_and_count_is_preserved() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let d = Uuid::new_v4();
        let e = Uuid::new_v4();
        let rows = vec![
            row(a, None),
            row(b, Some(a)),
            row(c, Some(a)),
            row(d, Some(c)),
            row(e, Some(b)),
        ];
        let forest = build_reply_tree(rows.clone(), None);

        assert_eq!(forest.iter().map(TreeNode::size).sum::<usize>(), rows.len());

        fn check(node: &TreeNode<Row>, rows: &[Row]) {
            let expected: Vec<Uuid> = rows
                .iter()
                .filter(|r| r.parent == Some(node.item.id))
                .map(|r| r.id)
                .collect();
            assert_eq!(node.replies.iter().map(|n| n.item.id).collect::<Vec<_>>(), expected);
            for child in &node.replies {
                check(child, rows);
            }
        }
        for node in &forest {
            check(node, &rows);
        }
    }

    #[test]
    fn test_orphans_are_promoted_to_roots() {
        let root = Uuid::new_v4();
        let orphan = Uuid::new_v4();
        let orphan_child = Uuid::new_v4();
        let deleted_parent = Uuid::new_v4();

        let forest = build_reply_tree(
            vec![
                row(root, None),
                row(orphan, Some(deleted_parent)),
                row(orphan_child, Some(orphan)),
            ],
            None,
        );

        assert_eq!(ids(&forest), vec![root, orphan]);
        assert_eq!(ids(&forest[1].replies), vec![orphan_child]);
    }

    #[test]
    fn test_subtree_for_given_root() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let forest = build_reply_tree(
            vec![row(a, None), row(b, Some(a)), row(c, Some(b))],
            Some(a),
        );
        assert_eq!(ids(&forest), vec![b]);
        assert_eq!(ids(&forest[0].replies), vec![c]);
    }

    #[test]
    fn test_cycles_do_not_lose_rows() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let self_loop = Uuid::new_v4();
        let forest = build_reply_tree(
            vec![row(a, Some(b)), row(b, Some(a)), row(self_loop, Some(self_loop))],
            None,
        );
        assert_eq!(forest.iter().map(TreeNode::size).sum::<usize>(), 3);
    }

    #[test]
    fn test_serializes_with_nested_replies_field() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let forest = build_reply_tree(vec![row(a, None), row(b, Some(a))], None);
        let json = serde_json::to_value(&forest).unwrap();
        assert_eq!(json[0]["id"], a.to_string());
        assert_eq!(json[0]["replies"][0]["id"], b.to_string());
        assert_eq!(json[0]["replies"][0]["replies"], serde_json::json!([]));
    }

    fn depth<T>(forest: &[TreeNode<T>]) -> usize {
        let mut deepest = 0;
        let mut pending: Vec<(&TreeNode<T>, usize)> = forest.iter().map(|n| (n, 0)).collect();
        while let Some((node, level)) = pending.pop() {
            deepest = deepest.max(level);
            pending.extend(node.replies.iter().map(|n| (n, level + 1)));
        }
        deepest
    }

    fn chain(len: usize) -> Vec<Row> {
        let mut rows = Vec::with_capacity(len);
        let mut parent = None;
        for _ in 0..len {
            let id = Uuid::new_v4();
            rows.push(row(id, parent));
            parent = Some(id);
        }
        rows
    }

    #[test]
    fn test_deep_chain_builds_on_small_stack() {
        let worker = std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(|| {
                let rows = chain(100_000);
                let first = rows[0].id;
                let forest = build_reply_tree(rows, None);

                assert_eq!(ids(&forest), vec![first]);
                assert_eq!(forest[0].size(), 100_000);
                assert_eq!(depth(&forest), MAX_REPLY_DEPTH);

                let json = serde_json::to_string(&forest).unwrap();
                assert!(json.starts_with(&format!("[{{\"id\":\"{}\"", first)));
                drop(forest);
            })
            .unwrap();
        worker.join().unwrap();
    }

    #[test]
    fn test_replies_past_max_depth_are_flattened_in_thread_order() {
        let mut rows = chain(MAX_REPLY_DEPTH + 1);
        let last = rows[MAX_REPLY_DEPTH].id;
        let anchor = rows[MAX_REPLY_DEPTH - 1].id;

        // Two branches under the last nesting level, each with a child
        let (b1, b2) = (Uuid::new_v4(), Uuid::new_v4());
        rows.push(row(b1, Some(last)));
        rows.push(row(b2, Some(last)));
        let (c1, c2) = (Uuid::new_v4(), Uuid::new_v4());
        rows.push(row(c1, Some(b1)));
        rows.push(row(c2, Some(b2)));

        let total = rows.len();
        let forest = build_reply_tree(rows, None);
        assert_eq!(forest[0].size(), total);
        assert_eq!(depth(&forest), MAX_REPLY_DEPTH);

        let mut node = &forest[0];
        while node.item.id != anchor {
            node = &node.replies[0];
        }
        assert_eq!(ids(&node.replies), vec![last, b1, c1, b2, c2]);
        assert!(node.replies.iter().all(|n| n.replies.is_empty()));
    }

    #[test]
    fn test_shallow_threads_are_not_flattened() {
        let rows = chain(MAX_REPLY_DEPTH);
        let forest = build_reply_tree(rows, None);
        assert_eq!(depth(&forest), MAX_REPLY_DEPTH - 1);
        assert_eq!(forest[0].size(), MAX_REPLY_DEPTH);
    }
}
