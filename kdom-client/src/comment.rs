use std::{collections::HashSet, sync::Arc};

use crate::api::{Comment, Time, UserId};

/// A comment together with its materialized replies
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,

    /// Direct replies, in display order
    pub replies: im::Vector<Arc<CommentNode>>,

    /// Number of descendants at any depth
    pub reply_count: usize,
}

impl CommentNode {
    pub fn leaf(comment: Comment) -> CommentNode {
        CommentNode {
            comment,
            replies: im::Vector::new(),
            reply_count: 0,
        }
    }
}

impl Drop for CommentNode {
    /// Unlinks the replies with an explicit stack, so that dropping a very
    /// deep thread does not recurse once per level
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.replies)
            .into_iter()
            .collect::<Vec<_>>();
        while let Some(n) = stack.pop() {
            // shared subtrees are still owned elsewhere and left alone
            if let Ok(mut n) = Arc::try_unwrap(n) {
                stack.extend(std::mem::take(&mut n.replies));
            }
        }
    }
}

/// Fields to overwrite on a comment, `None` meaning "leave as is"
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CommentPatch {
    pub text: Option<String>,
    pub is_edited: Option<bool>,
    pub edited_at: Option<Option<Time>>,
    pub liker_ids: Option<HashSet<UserId>>,
    pub like_count: Option<Option<u64>>,
}

impl CommentPatch {
    pub fn edit(text: String, at: Time) -> CommentPatch {
        CommentPatch {
            text: Some(text),
            is_edited: Some(true),
            edited_at: Some(Some(at)),
            ..CommentPatch::default()
        }
    }

    /// Like or unlike `comment` on behalf of `user`, whichever is not the current state
    pub fn toggle_like(comment: &Comment, user: &UserId) -> CommentPatch {
        let mut likers = comment.liker_ids.clone();
        let count = comment.like_count();
        let count = match likers.remove(user) {
            true => count.saturating_sub(1),
            false => {
                likers.insert(user.clone());
                count + 1
            }
        };
        CommentPatch {
            liker_ids: Some(likers),
            like_count: Some(Some(count)),
            ..CommentPatch::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == CommentPatch::default()
    }

    pub fn apply(&self, c: &mut Comment) {
        if let Some(text) = &self.text {
            c.text = text.clone();
        }
        if let Some(is_edited) = self.is_edited {
            c.is_edited = is_edited;
        }
        if let Some(edited_at) = self.edited_at {
            c.edited_at = edited_at;
        }
        if let Some(likers) = &self.liker_ids {
            c.liker_ids = likers.clone();
        }
        if let Some(like_count) = self.like_count {
            c.like_count = like_count;
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentStats {
    pub main_comments: usize,
    pub total_replies: usize,
    pub total_comments: usize,
}
