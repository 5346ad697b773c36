use std::{collections::HashSet, fmt, str::FromStr};

use chrono::Utc;

use crate::{Error, Time, UserId};

#[derive(
    Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(transparent)]
pub struct CommentId(pub String);

impl CommentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CommentId {
    fn from(s: &str) -> CommentId {
        CommentId(String::from(s))
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a discussion is attached to
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    PartialEq,
    bolero::generator::TypeGenerator,
    serde::Deserialize,
    serde::Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Post,
    KDom,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Post => "post",
            TargetType::KDom => "kdom",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = Error;

    fn from_str(s: &str) -> Result<TargetType, Error> {
        match s {
            "post" => Ok(TargetType::Post),
            "kdom" => Ok(TargetType::KDom),
            _ => Err(Error::UnknownContentType(String::from(s))),
        }
    }
}

/// A comment as returned by the discussion endpoints, with its parent given by
/// reference
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub target_type: TargetType,
    pub target_id: String,

    pub author_id: UserId,
    pub author_name: String,
    #[serde(default)]
    pub author_avatar_url: Option<String>,

    pub text: String,
    pub created_at: Time,
    #[serde(default)]
    pub is_edited: bool,
    #[serde(default)]
    pub edited_at: Option<Time>,

    /// None for a top-level comment
    #[serde(default)]
    pub parent_comment_id: Option<CommentId>,

    #[serde(default)]
    pub liker_ids: HashSet<UserId>,

    /// Some backends send the like count precomputed, others only the likers
    #[serde(default)]
    pub like_count: Option<u64>,
}

impl Comment {
    pub fn now(
        id: CommentId,
        target_type: TargetType,
        target_id: String,
        author_id: UserId,
        author_name: String,
        text: String,
        parent_comment_id: Option<CommentId>,
    ) -> Comment {
        Comment {
            id,
            target_type,
            target_id,
            author_id,
            author_name,
            author_avatar_url: None,
            text,
            created_at: Utc::now(),
            is_edited: false,
            edited_at: None,
            parent_comment_id,
            liker_ids: HashSet::new(),
            like_count: None,
        }
    }

    pub fn like_count(&self) -> u64 {
        self.like_count.unwrap_or(self.liker_ids.len() as u64)
    }

    pub fn is_liked_by(&self, user: &UserId) -> bool {
        self.liker_ids.contains(user)
    }

    pub fn is_root(&self) -> bool {
        self.parent_comment_id.is_none()
    }

    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_string(&self.id.0)?;
        crate::validate_string(&self.target_id)?;
        crate::validate_string(&self.author_name)?;
        crate::validate_string(&self.text)?;
        if let Some(parent) = &self.parent_comment_id {
            crate::validate_string(&parent.0)?;
        }
        Ok(())
    }
}
