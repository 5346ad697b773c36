use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context};
use kdom_client::{
    api::{Comment, Config, SortOrder, TargetType, TrackingKey, UserId},
    calculate_comment_stats, extract_mentions, get_max_reply_depth, organize_comments,
    prelude::*,
    CommentNode, TokioScheduler, ViewItem, ViewTracker,
};

mod sink;
use sink::HttpViewSink;

#[derive(structopt::StructOpt)]
struct Opt {
    /// JSON configuration file, overridden by the flags below
    #[structopt(long, env = "KDOM_CONFIG")]
    config: Option<PathBuf>,

    /// Number of views that forces a flush
    #[structopt(long, env = "KDOM_BATCH_SIZE")]
    batch_size: Option<usize>,

    /// Milliseconds to wait before flushing an incomplete batch
    #[structopt(long, env = "KDOM_BATCH_DELAY_MS")]
    batch_delay_ms: Option<u64>,

    /// Milliseconds between two views of a bulk report
    #[structopt(long, env = "KDOM_ITEM_SPACING_MS")]
    item_spacing_ms: Option<u64>,

    /// Maximum depth at which replies are still allowed
    #[structopt(long, env = "KDOM_MAX_REPLY_DEPTH")]
    max_reply_depth: Option<usize>,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Display a discussion as a tree
    Show {
        /// Read the flat comment list from this JSON file
        #[structopt(long)]
        file: Option<PathBuf>,

        /// Fetch the discussion from this server instead
        #[structopt(long)]
        host: Option<String>,

        /// post or kdom
        #[structopt(long)]
        target_type: Option<TargetType>,

        #[structopt(long)]
        target_id: Option<String>,

        /// newest, oldest or mostLiked
        #[structopt(long)]
        sort: Option<SortOrder>,

        /// Print the sorted tree as JSON
        #[structopt(long)]
        json: bool,
    },

    /// Report views of some content
    TrackViews {
        #[structopt(long)]
        host: String,

        #[structopt(long)]
        viewer: Option<String>,

        /// Content, as `post:<id>` or `kdom:<id>`
        content: Vec<TrackingKey>,
    },

    /// List the users mentioned in a text
    Mentions { text: String },
}

fn api_token() -> Option<String> {
    std::env::var("KDOM_TOKEN").ok()
}

fn load_config(opt: &Opt) -> anyhow::Result<Config> {
    let mut config = match &opt.config {
        None => Config::default(),
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {path:?}"))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing config file {path:?}"))?
        }
    };
    if let Some(batch_size) = opt.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(batch_delay_ms) = opt.batch_delay_ms {
        config.batch_delay_ms = batch_delay_ms;
    }
    if let Some(item_spacing_ms) = opt.item_spacing_ms {
        config.item_spacing_ms = item_spacing_ms;
    }
    if let Some(max_reply_depth) = opt.max_reply_depth {
        config.max_reply_depth = max_reply_depth;
    }
    config.validate()?;
    Ok(config)
}

async fn fetch_discussion(
    host: &str,
    target_type: TargetType,
    target_id: &str,
) -> anyhow::Result<Vec<Comment>> {
    let mut req = reqwest::Client::new().get(format!(
        "{host}/api/comments/{target_type}/{target_id}"
    ));
    if let Some(token) = api_token() {
        req = req.bearer_auth(token);
    }
    req.send()
        .await
        .context("fetching discussion")?
        .error_for_status()
        .context("fetching discussion")?
        .json()
        .await
        .context("parsing discussion")
}

fn render(forest: &[Arc<CommentNode>], config: &Config) -> String {
    let stats = calculate_comment_stats(forest);
    let mut out = format!(
        "{} comments ({} top-level, {} replies), {} levels deep\n",
        stats.total_comments,
        stats.main_comments,
        stats.total_replies,
        get_max_reply_depth(forest)
    );
    let mut stack = forest.iter().rev().map(|n| (n, 1)).collect::<Vec<_>>();
    while let Some((n, depth)) = stack.pop() {
        let c = &n.comment;
        out.push_str(&format!(
            "{:indent$}- {} ({}, {} likes{}): {}\n",
            "",
            c.author_name,
            c.created_at.format("%Y-%m-%d %H:%M"),
            c.like_count(),
            if c.is_edited { ", edited" } else { "" },
            c.text.replace('\n', " "),
            indent = (depth - 1) * 2,
        ));
        let mentions = extract_mentions(&c.text);
        if !mentions.is_empty() {
            out.push_str(&format!(
                "{:indent$}  mentions: {}\n",
                "",
                mentions.join(", "),
                indent = (depth - 1) * 2,
            ));
        }
        if depth >= config.max_reply_depth && !n.replies.is_empty() {
            tracing::warn!(comment_id = %c.id, depth, "replies nested deeper than allowed");
        }
        stack.extend(n.replies.iter().rev().map(|r| (r, depth + 1)));
    }
    out
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let opt = <Opt as structopt::StructOpt>::from_args();
    let config = load_config(&opt)?;

    match opt.cmd {
        Command::Show {
            file,
            host,
            target_type,
            target_id,
            sort,
            json,
        } => {
            let flat: Vec<Comment> = match (file, host) {
                (Some(file), _) => {
                    let raw = std::fs::read_to_string(&file)
                        .with_context(|| format!("reading discussion file {file:?}"))?;
                    serde_json::from_str(&raw)
                        .with_context(|| format!("parsing discussion file {file:?}"))?
                }
                (None, Some(host)) => {
                    let target_type = target_type.context("--target-type is required with --host")?;
                    let target_id = target_id.context("--target-id is required with --host")?;
                    fetch_discussion(&host, target_type, &target_id).await?
                }
                (None, None) => return Err(anyhow!("one of --file or --host is required")),
            };
            let forest = sort.unwrap_or(config.sort_order).sort(&organize_comments(&flat));
            match json {
                true => println!("{}", serde_json::to_string_pretty(&forest)?),
                false => print!("{}", render(&forest, &config)),
            }
        }
        Command::TrackViews {
            host,
            viewer,
            content,
        } => {
            let scheduler = TokioScheduler::current()?;
            let sink = Arc::new(HttpViewSink::new(host, api_token()));
            let tracker = ViewTracker::new(config, sink, scheduler.clone());
            let viewer_id = viewer.map(UserId);
            tracker
                .record_views(content.iter().map(|key| ViewItem {
                    content_type: key.content_type(),
                    content_id: String::from(key.content_id()),
                    viewer_id: viewer_id.clone(),
                }))
                .await;
            tracker.dispose();
            scheduler.join_spawned().await;
            tracing::info!(num_views = content.len(), "reported views");
        }
        Command::Mentions { text } => {
            for name in extract_mentions(&text) {
                println!("{name}");
            }
        }
    }

    Ok(())
}
