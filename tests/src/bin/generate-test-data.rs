use std::collections::HashSet;

use chrono::{Duration, Utc};
use kdom_api::{Comment, CommentId, TargetType, UserId};
use rand::{seq::SliceRandom, Rng};

const NUM_USERS: usize = 8;
const NUM_COMMENTS: usize = 200;

/// Probability that a comment answers a previous one rather than the post
const REPLY_RATIO: f64 = 0.7;

const COMMENT_WORD_COUNT: usize = 25;
const MAX_LIKES: usize = 5;

fn main() {
    let mut rng = rand::thread_rng();

    let target_type = match rng.gen_bool(0.5) {
        true => TargetType::Post,
        false => TargetType::KDom,
    };
    let target_id = uuid::Uuid::new_v4().to_string();

    let users = (0..NUM_USERS)
        .map(|_| {
            let name = lipsum::lipsum_words_with_rng(&mut rng, 1).to_lowercase();
            let name = name.trim_end_matches(|c: char| !c.is_alphanumeric());
            (UserId(uuid::Uuid::new_v4().to_string()), String::from(name))
        })
        .collect::<Vec<_>>();

    // comments are emitted in creation order, so replies always come after
    // their parent
    let mut now = Utc::now() - Duration::days(7);
    let mut comments: Vec<Comment> = Vec::with_capacity(NUM_COMMENTS);
    for _ in 0..NUM_COMMENTS {
        now = now + Duration::seconds(rng.gen_range(1..3600));
        let (author_id, author_name) = users.choose(&mut rng).expect("there are users").clone();

        let parent = match comments.is_empty() || !rng.gen_bool(REPLY_RATIO) {
            true => None,
            false => comments.choose(&mut rng).map(|c| c.id.clone()),
        };

        let mut text = lipsum::lipsum_words_with_rng(&mut rng, COMMENT_WORD_COUNT);
        if rng.gen_bool(0.2) {
            let (_, mentioned) = users.choose(&mut rng).expect("there are users");
            text = format!("@{mentioned} {text}");
        }

        let num_likes = rng.gen_range(0..=MAX_LIKES);
        let liker_ids = users
            .choose_multiple(&mut rng, num_likes)
            .map(|(id, _)| id.clone())
            .collect::<HashSet<_>>();

        let is_edited = rng.gen_bool(0.1);
        comments.push(Comment {
            id: CommentId(uuid::Uuid::new_v4().to_string()),
            target_type,
            target_id: target_id.clone(),
            author_id,
            author_name,
            author_avatar_url: None,
            text,
            created_at: now,
            is_edited,
            edited_at: is_edited.then(|| now + Duration::minutes(5)),
            parent_comment_id: parent,
            liker_ids,
            like_count: None,
        });
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&comments).expect("serializing comments")
    );
}
