use crate::CommentId;

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Comment not found {0}")]
    CommentNotFound(CommentId),

    #[error("Comment id already used {0}")]
    CommentIdAlreadyUsed(CommentId),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown content type {0:?}")]
    UnknownContentType(String),

    #[error("Unknown sort order {0:?}")]
    UnknownSortOrder(String),

    #[error("Null byte in string is not allowed {0:?}")]
    NullByteInString(String),
}
