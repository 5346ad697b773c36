use chrono::Utc;

pub type Time = chrono::DateTime<Utc>;

mod comment;
pub use comment::{Comment, CommentId, TargetType};

mod config;
pub use config::{Config, SortOrder};

mod error;
pub use error::Error;

mod user;
pub use user::UserId;

mod view;
pub use view::{ContentType, TrackingKey, ViewEvent};

/// Strings coming from the API end up in the UI and in tracking keys, where
/// null bytes are never legitimate
pub fn validate_string(s: &str) -> Result<(), Error> {
    match s.contains('\0') {
        true => Err(Error::NullByteInString(String::from(s))),
        false => Ok(()),
    }
}
