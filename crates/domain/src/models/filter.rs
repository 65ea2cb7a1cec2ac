use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether a [`ProfileFilter`] narrows a timeline down (`Include`) or cuts
/// matching entries out (`Exclude`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    Include,
    Exclude,
}

/// The closed set of keys a filter may match on (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKey {
    Repo,
    Subreddit,
    TwitterAccount,
    Keyword,
}

impl FilterKey {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "repo" => Some(FilterKey::Repo),
            "subreddit" => Some(FilterKey::Subreddit),
            "twitter_account" => Some(FilterKey::TwitterAccount),
            "keyword" => Some(FilterKey::Keyword),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKey::Repo => "repo",
            FilterKey::Subreddit => "subreddit",
            FilterKey::TwitterAccount => "twitter_account",
            FilterKey::Keyword => "keyword",
        }
    }
}

/// A single `(profile, account, kind, key, value)` filter rule (§3, §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileFilter {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub account_id: Uuid,
    pub kind: FilterKind,
    pub key: FilterKey,
    pub value: String,
}
