mod comment;
pub use comment::{CommentNode, CommentPatch, CommentStats};

mod mention;
pub use mention::extract_mentions;

mod order;
pub use order::{sort_comments, SortOrderExt};

mod schedule;
pub use schedule::{ScheduledTask, Scheduler, TokioScheduler, TokioTask};

mod tracking;
pub use tracking::{ViewItem, ViewSink, ViewTracker};

mod tree;
pub use tree::{
    calculate_comment_stats, can_reply_to, comment_depth, find_comment_by_id, flatten_tree,
    get_max_reply_depth, insert_comment_in_tree, organize_comments, remove_comment_from_tree,
    update_comment_in_tree,
};

pub mod api {
    pub use kdom_api::*;
}

pub mod prelude {
    pub use crate::SortOrderExt;
}
