use std::{collections::HashMap, sync::Arc};

use crate::{
    api::{Comment, CommentId},
    CommentNode, CommentPatch, CommentStats,
};

/// Turn a flat list of comments into a forest following `parent_comment_id`.
///
/// Roots keep the order in which they appear in `flat`, and so do the replies
/// of each comment. A comment whose parent is not in `flat` is a root.
///
/// Ids are expected to be unique. If they are not, the last comment with a
/// given id is the one replies get attached to; every comment still shows up
/// exactly once in the result.
///
/// Comments caught in a parent cycle are not dropped: the first of them is
/// promoted to a root after all the regular roots, which cuts the cycle.
pub fn organize_comments(flat: &[Comment]) -> Vec<Arc<CommentNode>> {
    let mut index = HashMap::with_capacity(flat.len());
    for (i, c) in flat.iter().enumerate() {
        index.insert(&c.id, i);
    }

    let mut children = vec![Vec::new(); flat.len()];
    let mut roots = Vec::new();
    for (i, c) in flat.iter().enumerate() {
        match c.parent_comment_id.as_ref().and_then(|p| index.get(p)) {
            Some(&parent) => children[parent].push(i),
            None => roots.push(i),
        }
    }

    let mut placed = vec![false; flat.len()];
    let mut built = vec![None; flat.len()];
    let mut forest = Vec::with_capacity(roots.len());
    for r in roots {
        forest.push(materialize(r, flat, &children, &mut placed, &mut built));
    }
    for i in 0..flat.len() {
        if !placed[i] {
            tracing::warn!(
                comment_id = %flat[i].id,
                "comment is part of a reply cycle, promoting it to top-level"
            );
            forest.push(materialize(i, flat, &children, &mut placed, &mut built));
        }
    }
    forest
}

/// Builds the subtree rooted at `root` bottom-up, with an explicit stack
fn materialize(
    root: usize,
    flat: &[Comment],
    children: &[Vec<usize>],
    placed: &mut [bool],
    built: &mut [Option<Arc<CommentNode>>],
) -> Arc<CommentNode> {
    placed[root] = true;
    let mut stack = vec![(root, false)];
    while let Some((i, expanded)) = stack.pop() {
        if !expanded {
            stack.push((i, true));
            for &c in children[i].iter().rev() {
                if !placed[c] {
                    placed[c] = true;
                    stack.push((c, false));
                }
            }
            continue;
        }
        // All the children pushed above are built by now. Children placed
        // elsewhere (only possible for a cycle) have nothing in `built` yet.
        let replies = children[i]
            .iter()
            .filter_map(|&c| built[c].take())
            .collect::<im::Vector<_>>();
        let reply_count = replies.iter().map(|r| r.reply_count + 1).sum();
        built[i] = Some(Arc::new(CommentNode {
            comment: flat[i].clone(),
            replies,
            reply_count,
        }));
    }
    built[root]
        .take()
        .expect("materialize always builds its root")
}

pub fn calculate_comment_stats(nodes: &[Arc<CommentNode>]) -> CommentStats {
    let mut total_replies = 0;
    let mut stack = nodes.iter().collect::<Vec<_>>();
    while let Some(n) = stack.pop() {
        total_replies += n.replies.len();
        stack.extend(n.replies.iter());
    }
    CommentStats {
        main_comments: nodes.len(),
        total_replies,
        total_comments: nodes.len() + total_replies,
    }
}

/// Pre-order search: a comment is checked before its replies, and earlier
/// siblings before later ones
pub fn find_comment_by_id(nodes: &[Arc<CommentNode>], id: &CommentId) -> Option<Arc<CommentNode>> {
    let mut stack = nodes.iter().rev().collect::<Vec<_>>();
    while let Some(n) = stack.pop() {
        if n.comment.id == *id {
            return Some(n.clone());
        }
        stack.extend(n.replies.iter().rev());
    }
    None
}

/// Depth of comment `id`, top-level comments being at depth 1
pub fn comment_depth(nodes: &[Arc<CommentNode>], id: &CommentId) -> Option<usize> {
    let mut stack = nodes.iter().rev().map(|n| (n, 1)).collect::<Vec<_>>();
    while let Some((n, depth)) = stack.pop() {
        if n.comment.id == *id {
            return Some(depth);
        }
        stack.extend(n.replies.iter().rev().map(|r| (r, depth + 1)));
    }
    None
}

/// Whether a reply to `id` would still fit within `max_reply_depth` levels
pub fn can_reply_to(nodes: &[Arc<CommentNode>], id: &CommentId, max_reply_depth: usize) -> bool {
    comment_depth(nodes, id).map_or(false, |d| d < max_reply_depth)
}

pub fn get_max_reply_depth(nodes: &[Arc<CommentNode>]) -> usize {
    let mut max = 0;
    let mut stack = nodes.iter().map(|n| (n, 1)).collect::<Vec<_>>();
    while let Some((n, depth)) = stack.pop() {
        max = max.max(depth);
        stack.extend(n.replies.iter().map(|r| (r, depth + 1)));
    }
    max
}

/// Pre-order flat list of every comment in the forest
pub fn flatten_tree(nodes: &[Arc<CommentNode>]) -> Vec<Comment> {
    let mut res = Vec::new();
    let mut stack = nodes.iter().rev().collect::<Vec<_>>();
    while let Some(n) = stack.pop() {
        res.push(n.comment.clone());
        stack.extend(n.replies.iter().rev());
    }
    res
}

/// Returns a new forest where comment `id` has `patch` applied.
///
/// Every ancestor of the patched comment is a new node, everything else is
/// shared with `nodes`. If `id` is not found, all the nodes are shared.
pub fn update_comment_in_tree(
    nodes: &[Arc<CommentNode>],
    id: &CommentId,
    patch: &CommentPatch,
) -> Vec<Arc<CommentNode>> {
    let mut res = nodes.to_vec();
    for (i, n) in nodes.iter().enumerate() {
        if let Some(updated) = update_node(n, id, patch) {
            res[i] = updated;
            break;
        }
    }
    res
}

fn update_node(
    node: &Arc<CommentNode>,
    id: &CommentId,
    patch: &CommentPatch,
) -> Option<Arc<CommentNode>> {
    if node.comment.id == *id {
        let mut comment = node.comment.clone();
        patch.apply(&mut comment);
        return Some(Arc::new(CommentNode {
            comment,
            replies: node.replies.clone(),
            reply_count: node.reply_count,
        }));
    }
    for (i, r) in node.replies.iter().enumerate() {
        if let Some(updated) = update_node(r, id, patch) {
            let mut replies = node.replies.clone();
            replies.set(i, updated);
            return Some(Arc::new(CommentNode {
                comment: node.comment.clone(),
                replies,
                reply_count: node.reply_count,
            }));
        }
    }
    None
}

/// Returns a new forest without comment `id` and without any of its replies.
///
/// Replies are never promoted: deleting a comment deletes its whole thread.
pub fn remove_comment_from_tree(
    nodes: &[Arc<CommentNode>],
    id: &CommentId,
) -> Vec<Arc<CommentNode>> {
    match remove_in(nodes.iter(), id) {
        Some((res, _)) => res,
        None => nodes.to_vec(),
    }
}

/// Returns the remaining nodes and the number of removed comments, or `None`
/// if nothing under `nodes` matched
fn remove_in<'a>(
    nodes: impl Iterator<Item = &'a Arc<CommentNode>>,
    id: &CommentId,
) -> Option<(Vec<Arc<CommentNode>>, usize)> {
    let mut res = Vec::new();
    let mut removed = 0;
    let mut changed = false;
    for n in nodes {
        if n.comment.id == *id {
            changed = true;
            removed += n.reply_count + 1;
            continue;
        }
        match remove_in(n.replies.iter(), id) {
            None => res.push(n.clone()),
            Some((replies, r)) => {
                changed = true;
                removed += r;
                res.push(Arc::new(CommentNode {
                    comment: n.comment.clone(),
                    replies: replies.into_iter().collect(),
                    reply_count: n.reply_count.saturating_sub(r),
                }));
            }
        }
    }
    changed.then_some((res, removed))
}

/// Adds a freshly created comment as the last reply of its parent, or as the
/// last top-level comment if it has no parent in the forest
pub fn insert_comment_in_tree(
    nodes: &[Arc<CommentNode>],
    comment: Comment,
) -> Vec<Arc<CommentNode>> {
    let mut res = nodes.to_vec();
    if let Some(parent) = &comment.parent_comment_id {
        let leaf = Arc::new(CommentNode::leaf(comment.clone()));
        for (i, n) in nodes.iter().enumerate() {
            if let Some(updated) = insert_under(n, parent, &leaf) {
                res[i] = updated;
                return res;
            }
        }
        tracing::debug!(
            comment_id = %comment.id,
            parent_id = %parent,
            "parent of new comment is not displayed, adding it at top-level"
        );
    }
    res.push(Arc::new(CommentNode::leaf(comment)));
    res
}

fn insert_under(
    node: &Arc<CommentNode>,
    parent: &CommentId,
    leaf: &Arc<CommentNode>,
) -> Option<Arc<CommentNode>> {
    if node.comment.id == *parent {
        let mut replies = node.replies.clone();
        replies.push_back(leaf.clone());
        return Some(Arc::new(CommentNode {
            comment: node.comment.clone(),
            replies,
            reply_count: node.reply_count + 1,
        }));
    }
    for (i, r) in node.replies.iter().enumerate() {
        if let Some(updated) = insert_under(r, parent, leaf) {
            let mut replies = node.replies.clone();
            replies.set(i, updated);
            return Some(Arc::new(CommentNode {
                comment: node.comment.clone(),
                replies,
                reply_count: node.reply_count + 1,
            }));
        }
    }
    None
}
