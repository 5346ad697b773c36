use std::{cmp::Ordering, sync::Arc};

use crate::{
    api::{Comment, SortOrder},
    CommentNode,
};

pub trait SortOrderExt {
    fn compare(&self, a: &Comment, b: &Comment) -> Ordering;

    /// Sorts `nodes` and, with the same order, the replies at every depth.
    /// Comments that compare equal keep their relative order.
    fn sort(&self, nodes: &[Arc<CommentNode>]) -> Vec<Arc<CommentNode>>;
}

impl SortOrderExt for SortOrder {
    fn compare(&self, a: &Comment, b: &Comment) -> Ordering {
        match self {
            SortOrder::Newest => b.created_at.cmp(&a.created_at),
            SortOrder::Oldest => a.created_at.cmp(&b.created_at),
            SortOrder::MostLiked => b.like_count().cmp(&a.like_count()),
        }
    }

    fn sort(&self, nodes: &[Arc<CommentNode>]) -> Vec<Arc<CommentNode>> {
        sort_level(*self, nodes.iter())
    }
}

pub fn sort_comments(nodes: &[Arc<CommentNode>], order: SortOrder) -> Vec<Arc<CommentNode>> {
    order.sort(nodes)
}

fn sort_level<'a>(
    order: SortOrder,
    nodes: impl Iterator<Item = &'a Arc<CommentNode>>,
) -> Vec<Arc<CommentNode>> {
    let mut indexed = nodes.enumerate().collect::<Vec<_>>();
    // sort_unstable is fine as ties are explicitly resolved by input position
    indexed.sort_unstable_by(|(ia, a), (ib, b)| {
        order
            .compare(&a.comment, &b.comment)
            .then_with(|| ia.cmp(ib))
    });
    indexed
        .into_iter()
        .map(|(_, n)| match n.replies.is_empty() {
            true => n.clone(),
            false => Arc::new(CommentNode {
                comment: n.comment.clone(),
                replies: sort_level(order, n.replies.iter()).into_iter().collect(),
                reply_count: n.reply_count,
            }),
        })
        .collect()
}
