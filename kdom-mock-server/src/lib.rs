use std::collections::HashSet;

use anyhow::anyhow;
use async_trait::async_trait;
use kdom_client::{
    api::{self, Comment, CommentId, Error, TargetType, Time, TrackingKey, UserId, ViewEvent},
    CommentPatch, ViewSink,
};
use parking_lot::Mutex;

mod scheduler;
pub use scheduler::{ManualScheduler, ManualTask};

/// In-memory stand-in for the discussion endpoints of the backend
pub struct MockServer {
    // in creation order, like the backend returns them
    comments: Vec<Comment>,
}

impl MockServer {
    pub fn new() -> MockServer {
        MockServer {
            comments: Vec::new(),
        }
    }

    pub fn create_comment(&mut self, c: Comment) -> Result<Comment, Error> {
        c.validate()?;
        if self.comments.iter().any(|o| o.id == c.id) {
            return Err(Error::CommentIdAlreadyUsed(c.id));
        }
        if let Some(parent) = &c.parent_comment_id {
            if !self.comments.iter().any(|o| o.id == *parent) {
                return Err(Error::CommentNotFound(parent.clone()));
            }
        }
        self.comments.push(c.clone());
        Ok(c)
    }

    pub fn fetch_discussion(&self, target_type: TargetType, target_id: &str) -> Vec<Comment> {
        self.comments
            .iter()
            .filter(|c| c.target_type == target_type && c.target_id == target_id)
            .cloned()
            .collect()
    }

    pub fn edit_comment(
        &mut self,
        id: &CommentId,
        text: String,
        at: Time,
    ) -> Result<Comment, Error> {
        api::validate_string(&text)?;
        let c = self.find_mut(id)?;
        CommentPatch::edit(text, at).apply(c);
        Ok(c.clone())
    }

    pub fn toggle_like(&mut self, id: &CommentId, user: &UserId) -> Result<Comment, Error> {
        let c = self.find_mut(id)?;
        CommentPatch::toggle_like(c, user).apply(c);
        Ok(c.clone())
    }

    /// Deletes the comment along with all of its replies, returning how many
    /// comments were deleted
    pub fn delete_comment(&mut self, id: &CommentId) -> Result<usize, Error> {
        self.find_mut(id)?;
        let mut doomed = HashSet::new();
        doomed.insert(id.clone());
        // replies can only be created after their parent, so one pass in
        // creation order finds the whole thread
        for c in self.comments.iter() {
            if let Some(parent) = &c.parent_comment_id {
                if doomed.contains(parent) {
                    doomed.insert(c.id.clone());
                }
            }
        }
        let before = self.comments.len();
        self.comments.retain(|c| !doomed.contains(&c.id));
        Ok(before - self.comments.len())
    }

    fn find_mut(&mut self, id: &CommentId) -> Result<&mut Comment, Error> {
        self.comments
            .iter_mut()
            .find(|c| c.id == *id)
            .ok_or_else(|| Error::CommentNotFound(id.clone()))
    }
}

impl Default for MockServer {
    fn default() -> MockServer {
        MockServer::new()
    }
}

/// Analytics sink that remembers everything it received, and can be told to
/// reject some content
#[derive(Default)]
pub struct MockSink {
    delivered: Mutex<Vec<ViewEvent>>,
    failing: Mutex<HashSet<TrackingKey>>,
    attempts: Mutex<usize>,
}

impl MockSink {
    pub fn new() -> MockSink {
        MockSink::default()
    }

    pub fn fail_for(&self, key: TrackingKey) {
        self.failing.lock().insert(key);
    }

    pub fn delivered(&self) -> Vec<ViewEvent> {
        self.delivered.lock().clone()
    }

    pub fn delivered_keys(&self) -> Vec<String> {
        self.delivered
            .lock()
            .iter()
            .map(|e| e.key().to_string())
            .collect()
    }

    /// Number of `send` calls, successful or not
    pub fn attempts(&self) -> usize {
        *self.attempts.lock()
    }
}

#[async_trait]
impl ViewSink for MockSink {
    async fn send(&self, event: ViewEvent) -> anyhow::Result<()> {
        *self.attempts.lock() += 1;
        let key = event.key();
        if self.failing.lock().contains(&key) {
            return Err(anyhow!("mock sink rejects {key}"));
        }
        tracing::trace!(%key, "mock sink received view");
        self.delivered.lock().push(event);
        Ok(())
    }
}
