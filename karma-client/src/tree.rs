use std::collections::{HashMap, HashSet};

use crate::api::{Comment, CommentId, Entity, Error};

/// A comment along with its replies, oldest first.
///
/// Reply chains may nest arbitrarily deep even though the stored `depth` is
/// clamped, so every walk over a tree here uses an explicit stack.
#[derive(Debug, Eq, serde::Deserialize, serde::Serialize)]
pub struct CommentNode {
    pub comment: Comment,
    pub children: Vec<CommentNode>,
}

impl CommentNode {
    pub fn leaf(comment: Comment) -> CommentNode {
        CommentNode {
            comment,
            children: Vec::new(),
        }
    }

    /// Whether the presentation layer should still offer to reply here
    pub fn can_reply(&self) -> bool {
        self.comment.can_reply()
    }

    pub fn find(&self, id: CommentId) -> Option<&CommentNode> {
        walk(std::slice::from_ref(self)).find(|n| n.comment.id == id)
    }

    /// Number of comments below this one
    pub fn descendants(&self) -> usize {
        walk(&self.children).count()
    }
}

impl Clone for CommentNode {
    fn clone(&self) -> CommentNode {
        CommentNode {
            comment: self.comment.clone(),
            children: assemble(
                walk(&self.children)
                    .map(|n| (n.comment.clone(), n.children.len()))
                    .collect(),
            ),
        }
    }
}

impl PartialEq for CommentNode {
    fn eq(&self, other: &CommentNode) -> bool {
        // a pre-order listing along with child counts determines the tree
        let mut a = walk(std::slice::from_ref(self));
        let mut b = walk(std::slice::from_ref(other));
        loop {
            match (a.next(), b.next()) {
                (None, None) => return true,
                (Some(x), Some(y))
                    if x.comment == y.comment && x.children.len() == y.children.len() => {}
                _ => return false,
            }
        }
    }
}

impl Drop for CommentNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut n) = pending.pop() {
            pending.append(&mut n.children);
        }
    }
}

/// Pre-order iterator over a forest, see `walk`
pub struct Walk<'a> {
    stack: Vec<&'a CommentNode>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a CommentNode;

    fn next(&mut self) -> Option<&'a CommentNode> {
        let n = self.stack.pop()?;
        self.stack.extend(n.children.iter().rev());
        Some(n)
    }
}

/// Visits every node of `forest`, parents before their replies, siblings in
/// order. This is the display order of a thread.
pub fn walk(forest: &[CommentNode]) -> Walk<'_> {
    Walk {
        stack: forest.iter().rev().collect(),
    }
}

pub fn find_in(forest: &[CommentNode], id: CommentId) -> Option<&CommentNode> {
    walk(forest).find(|n| n.comment.id == id)
}

fn find_in_mut(forest: &mut [CommentNode], id: CommentId) -> Option<&mut CommentNode> {
    let mut stack = forest.iter_mut().rev().collect::<Vec<_>>();
    while let Some(n) = stack.pop() {
        if n.comment.id == id {
            return Some(n);
        }
        stack.extend(n.children.iter_mut().rev());
    }
    None
}

/// Rebuilds a forest from its pre-order listing of comments and child counts
fn assemble(preorder: Vec<(Comment, usize)>) -> Vec<CommentNode> {
    let mut built = Vec::with_capacity(preorder.len());
    for (comment, num_children) in preorder.into_iter().rev() {
        // the children were built last, so they sit on top in reverse order
        let mut children = built.split_off(built.len().saturating_sub(num_children));
        children.reverse();
        built.push(CommentNode { comment, children });
    }
    built.reverse();
    built
}

/// Builds the reply forest of a flat list of comments.
///
/// Siblings are ordered by creation date, comments created at the same time
/// keeping their order in `comments`. Depths are recomputed from the actual
/// tree shape and clamped to `MAX_DEPTH`. Comments whose parent is not in
/// `comments` are kept as top-level comments.
pub fn build(comments: &[Comment]) -> Result<Vec<CommentNode>, Error> {
    let mut by_id = HashMap::with_capacity(comments.len());
    for c in comments {
        if by_id.insert(c.id, c).is_some() {
            return Err(Error::InvalidArgument(format!(
                "comment {} appears twice",
                c.id
            )));
        }
    }
    check_acyclic(comments, &by_id)?;

    let mut children = HashMap::<Option<CommentId>, Vec<&Comment>>::new();
    for c in comments {
        let parent = match c.parent_id {
            Some(p) if by_id.contains_key(&p) => Some(p),
            Some(p) => {
                tracing::warn!(comment = ?c.id, parent = ?p, "parent comment not found, showing as top-level");
                None
            }
            None => None,
        };
        children.entry(parent).or_default().push(c);
    }
    for siblings in children.values_mut() {
        siblings.sort_by_key(|c| c.date);
    }

    let replies = |parent: Option<CommentId>| children.get(&parent).map_or(&[][..], |v| &v[..]);
    let mut preorder = Vec::with_capacity(comments.len());
    let mut stack = replies(None)
        .iter()
        .rev()
        .map(|c| (*c, Comment::depth_under(None)))
        .collect::<Vec<_>>();
    while let Some((c, depth)) = stack.pop() {
        let below = replies(Some(c.id));
        let child_depth = Comment::depth_under(Some(depth));
        stack.extend(below.iter().rev().map(|r| (*r, child_depth)));
        let mut comment = c.clone();
        comment.depth = depth;
        preorder.push((comment, below.len()));
    }
    Ok(assemble(preorder))
}

/// Fails on the first comment, in input order, whose parent chain loops
fn check_acyclic(
    comments: &[Comment],
    by_id: &HashMap<CommentId, &Comment>,
) -> Result<(), Error> {
    // comments whose parent chain is already known to end
    let mut rooted = HashSet::with_capacity(comments.len());
    for c in comments {
        let mut path = HashSet::new();
        let mut cur = Some(c);
        while let Some(comm) = cur {
            if rooted.contains(&comm.id) {
                break;
            }
            if !path.insert(comm.id) {
                return Err(Error::CycleDetected(comm.id));
            }
            cur = comm.parent_id.and_then(|p| by_id.get(&p).copied());
        }
        rooted.extend(path);
    }
    Ok(())
}

/// Inserts a new comment into an already-built forest, after all its
/// siblings created no later than it
pub fn attach(mut forest: Vec<CommentNode>, mut comment: Comment) -> Result<Vec<CommentNode>, Error> {
    if find_in(&forest, comment.id).is_some() {
        return Err(Error::InvalidArgument(format!(
            "comment {} is already in the thread",
            comment.id
        )));
    }
    let siblings = match comment.parent_id {
        None => {
            comment.depth = 0;
            &mut forest
        }
        Some(p) => {
            let parent =
                find_in_mut(&mut forest, p).ok_or(Error::NotFound(Entity::Comment(p)))?;
            comment.depth = Comment::depth_under(Some(parent.comment.depth));
            &mut parent.children
        }
    };
    let pos = siblings.partition_point(|n| n.comment.date <= comment.date);
    siblings.insert(pos, CommentNode::leaf(comment));
    Ok(forest)
}

/// Swaps in a new value for a comment already in the forest, eg. after a
/// vote. Its replies and depth are kept.
pub fn replace(mut forest: Vec<CommentNode>, mut comment: Comment) -> Result<Vec<CommentNode>, Error> {
    let node = find_in_mut(&mut forest, comment.id)
        .ok_or(Error::NotFound(Entity::Comment(comment.id)))?;
    comment.depth = node.comment.depth;
    node.comment = comment;
    Ok(forest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::{PostId, Time, Vote, Votes, MAX_DEPTH},
        test_util::at_hour,
        VotableExt,
    };

    fn comment(id: u64, parent: Option<u64>, date: Time) -> Comment {
        Comment {
            id: CommentId(id),
            post_id: PostId(1),
            parent_id: parent.map(CommentId),
            author: String::from("alice"),
            date,
            content: format!("comment {id}"),
            votes: Votes::default(),
            depth: 0,
        }
    }

    /// (id, depth, children) of a forest, for compact comparisons
    #[derive(Debug, PartialEq)]
    struct Shape(u64, u8, Vec<Shape>);

    fn shape(forest: &[CommentNode]) -> Vec<Shape> {
        forest
            .iter()
            .map(|n| Shape(n.comment.id.0, n.comment.depth, shape(&n.children)))
            .collect()
    }

    #[test]
    fn depth_is_clamped_but_structure_kept() {
        let comments = vec![
            comment(1, None, at_hour(0)),
            comment(2, Some(1), at_hour(1)),
            comment(3, Some(2), at_hour(2)),
            comment(4, Some(3), at_hour(3)),
        ];
        let forest = build(&comments).unwrap();
        assert_eq!(
            shape(&forest),
            vec![Shape(1, 0, vec![Shape(2, 1, vec![Shape(3, 2, vec![Shape(4, 2, vec![])])])])]
        );
        let deepest = find_in(&forest, CommentId(4)).unwrap();
        assert_eq!(deepest.comment.depth, MAX_DEPTH);
        assert!(!deepest.can_reply());
        assert!(find_in(&forest, CommentId(2)).unwrap().can_reply());
    }

    #[test]
    fn siblings_oldest_first_ties_in_input_order() {
        let comments = vec![
            comment(5, None, at_hour(3)),
            comment(1, None, at_hour(1)),
            comment(3, Some(1), at_hour(4)),
            comment(2, Some(1), at_hour(2)),
            comment(4, None, at_hour(3)),
        ];
        let forest = build(&comments).unwrap();
        assert_eq!(
            shape(&forest),
            vec![
                Shape(1, 0, vec![Shape(2, 1, vec![]), Shape(3, 1, vec![])]),
                Shape(5, 0, vec![]),
                Shape(4, 0, vec![]),
            ]
        );
    }

    #[test]
    fn stored_depths_are_recomputed() {
        let mut c = comment(2, Some(1), at_hour(1));
        c.depth = 0;
        let forest = build(&[comment(1, None, at_hour(0)), c]).unwrap();
        assert_eq!(forest[0].children[0].comment.depth, 1);
    }

    #[test]
    fn orphans_become_top_level() {
        let forest = build(&[comment(1, None, at_hour(0)), comment(2, Some(42), at_hour(1))])
            .unwrap();
        assert_eq!(shape(&forest), vec![Shape(1, 0, vec![]), Shape(2, 0, vec![])]);
    }

    #[test]
    fn empty() {
        assert_eq!(build(&[]).unwrap(), Vec::new());
    }

    #[test]
    fn cycles_are_reported() {
        let looped = vec![
            comment(3, Some(1), at_hour(0)),
            comment(1, Some(2), at_hour(1)),
            comment(2, Some(1), at_hour(2)),
        ];
        assert_eq!(build(&looped), Err(Error::CycleDetected(CommentId(1))));

        let own_parent = vec![comment(1, None, at_hour(0)), comment(7, Some(7), at_hour(1))];
        assert_eq!(build(&own_parent), Err(Error::CycleDetected(CommentId(7))));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let comments = vec![comment(1, None, at_hour(0)), comment(1, None, at_hour(1))];
        assert!(matches!(build(&comments), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn attach_keeps_sibling_order() {
        let forest = build(&[
            comment(1, None, at_hour(0)),
            comment(2, Some(1), at_hour(1)),
            comment(3, Some(1), at_hour(5)),
            comment(4, None, at_hour(2)),
        ])
        .unwrap();

        let forest = attach(forest, comment(5, Some(1), at_hour(3))).unwrap();
        let forest = attach(forest, comment(6, None, at_hour(2))).unwrap();
        let forest = attach(forest, comment(7, Some(5), at_hour(6))).unwrap();
        let forest = attach(forest, comment(8, Some(7), at_hour(7))).unwrap();
        assert_eq!(
            shape(&forest),
            vec![
                Shape(
                    1,
                    0,
                    vec![
                        Shape(2, 1, vec![]),
                        Shape(5, 1, vec![Shape(7, 2, vec![Shape(8, 2, vec![])])]),
                        Shape(3, 1, vec![]),
                    ]
                ),
                Shape(4, 0, vec![]),
                Shape(6, 0, vec![]),
            ]
        );
        assert_eq!(forest[0].descendants(), 5);
    }

    #[test]
    fn attach_matches_rebuild() {
        let comments = vec![
            comment(1, None, at_hour(0)),
            comment(2, Some(1), at_hour(1)),
            comment(3, None, at_hour(2)),
            comment(4, Some(2), at_hour(3)),
        ];
        let mut forest = Vec::new();
        for c in comments.iter().cloned() {
            forest = attach(forest, c).unwrap();
        }
        assert_eq!(forest, build(&comments).unwrap());
    }

    #[test]
    fn attach_errors() {
        let forest = build(&[comment(1, None, at_hour(0))]).unwrap();
        assert_eq!(
            attach(forest.clone(), comment(2, Some(9), at_hour(1))),
            Err(Error::NotFound(Entity::Comment(CommentId(9))))
        );
        assert!(matches!(
            attach(forest, comment(1, None, at_hour(1))),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn replace_after_vote() {
        let forest = build(&[
            comment(1, None, at_hour(0)),
            comment(2, Some(1), at_hour(1)),
            comment(3, Some(2), at_hour(2)),
        ])
        .unwrap();
        let voted = find_in(&forest, CommentId(2))
            .unwrap()
            .comment
            .apply_vote(Vote::Up);
        let forest = replace(forest, voted).unwrap();
        let node = find_in(&forest, CommentId(2)).unwrap();
        assert_eq!(node.comment.votes.upvotes, 1);
        assert_eq!(node.comment.depth, 1);
        assert_eq!(node.children.len(), 1);

        assert_eq!(
            replace(forest, comment(9, None, at_hour(0))),
            Err(Error::NotFound(Entity::Comment(CommentId(9))))
        );
    }

    #[test]
    fn walk_is_display_order() {
        let forest = build(&[
            comment(1, None, at_hour(0)),
            comment(2, Some(1), at_hour(1)),
            comment(3, None, at_hour(2)),
            comment(4, Some(2), at_hour(3)),
            comment(5, Some(1), at_hour(4)),
        ])
        .unwrap();
        assert_eq!(
            walk(&forest).map(|n| n.comment.id.0).collect::<Vec<_>>(),
            vec![1, 2, 4, 5, 3]
        );
    }

    #[test]
    fn deep_reply_chain() {
        const LEN: u64 = 100_000;
        let chain = |i: u64| comment(i, (i > 1).then(|| i - 1), at_hour(0));
        let comments = (1..=LEN).map(chain).collect::<Vec<_>>();
        let forest = build(&comments).unwrap();
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].descendants(), LEN as usize - 1);
        assert_eq!(find_in(&forest, CommentId(LEN)).unwrap().comment.depth, MAX_DEPTH);
        assert!(walk(&forest).map(|n| n.comment.id.0).eq(1..=LEN));

        let copy = forest.clone();
        assert!(copy == forest);
        let forest = attach(forest, comment(LEN + 1, Some(LEN), at_hour(1))).unwrap();
        assert!(copy != forest);
        let forest = replace(forest, comment(LEN, Some(LEN - 1), at_hour(0))).unwrap();
        assert_eq!(forest[0].descendants(), LEN as usize);
        drop(forest);

        // parents listed after their replies
        let reversed = (1..=LEN).rev().map(chain).collect::<Vec<_>>();
        assert!(build(&reversed).unwrap() == copy);
    }

    #[test]
    fn fuzz_acyclic_input_builds_completely() {
        bolero::check!()
            .with_type::<Vec<(Option<u8>, u8)>>()
            .cloned()
            .for_each(|links| {
                // parents always point to an earlier comment, so no cycles
                let comments = links
                    .iter()
                    .enumerate()
                    .map(|(i, (parent, hour))| {
                        let parent = match (*parent, i) {
                            (Some(p), i) if i > 0 => Some((p as usize % i) as u64),
                            _ => None,
                        };
                        comment(i as u64, parent, at_hour(*hour as i64))
                    })
                    .collect::<Vec<_>>();
                let forest = build(&comments).expect("building acyclic forest");
                let total: usize = forest.iter().map(|n| 1 + n.descendants()).sum();
                assert_eq!(total, comments.len());
                fn check(nodes: &[CommentNode], depth: u8) {
                    for w in nodes.windows(2) {
                        assert!(w[0].comment.date <= w[1].comment.date);
                    }
                    for n in nodes {
                        assert_eq!(n.comment.depth, depth);
                        check(&n.children, Comment::depth_under(Some(depth)));
                    }
                }
                check(&forest, 0);
            })
    }
}
