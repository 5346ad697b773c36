use std::{str::FromStr, time::Duration};

use crate::Error;

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    Hash,
    PartialEq,
    bolero::generator::TypeGenerator,
    serde::Deserialize,
    serde::Serialize,
)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    MostLiked,
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<SortOrder, Error> {
        match s {
            "newest" => Ok(SortOrder::Newest),
            "oldest" => Ok(SortOrder::Oldest),
            "mostLiked" | "most-liked" => Ok(SortOrder::MostLiked),
            _ => Err(Error::UnknownSortOrder(String::from(s))),
        }
    }
}

/// Knobs shared by discussion rendering and view tracking
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Number of pending views that forces an immediate flush
    pub batch_size: usize,

    /// Idle window after the first pending view before a scheduled flush
    pub batch_delay_ms: u64,

    /// Pause between items of a bulk view report
    pub item_spacing_ms: u64,

    pub sort_order: SortOrder,

    /// Advisory only, the tree functions never enforce it
    pub max_reply_depth: usize,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            batch_size: 5,
            batch_delay_ms: 2000,
            item_spacing_ms: 100,
            sort_order: SortOrder::Newest,
            max_reply_depth: 5,
        }
    }
}

impl Config {
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn item_spacing(&self) -> Duration {
        Duration::from_millis(self.item_spacing_ms)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig(String::from(
                "batch size must be at least 1",
            )));
        }
        if self.max_reply_depth == 0 {
            return Err(Error::InvalidConfig(String::from(
                "max reply depth must be at least 1",
            )));
        }
        Ok(())
    }
}
