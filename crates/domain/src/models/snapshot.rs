use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::account::Platform;
use crate::models::timeline::TimelineSnapshotPayload;

/// A parent edge recorded when a snapshot is written with source lineage
/// (§4.2, Design Notes §9). Persisted as a plain edge row, never
/// materialized into a pointer graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParentRef {
    pub store_id: String,
    pub version: i64,
    pub role: String,
}

/// One commit, keyed by `sha` within its repo (§3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Commit {
    pub sha: String,
    pub message: String,
    pub repo: String,
    pub branch: String,
    pub author_date: DateTime<Utc>,
    pub url: String,
    pub additions: i64,
    pub deletions: i64,
    pub files_changed: i64,
}

/// All known commits for one repo, content-addressed and merged by sha.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RepoCommits {
    pub repo: String,
    pub commits: Vec<Commit>,
    pub oldest_sha: Option<String>,
    pub newest_sha: Option<String>,
}

/// One pull request, keyed by `number` within its repo (§3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PullRequest {
    pub number: u64,
    pub repo: String,
    pub title: String,
    pub url: String,
    pub commit_shas: Vec<String>,
    pub merge_commit_sha: Option<String>,
    pub merged_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// All known pull requests for one repo, merged by number.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RepoPullRequests {
    pub repo: String,
    pub pull_requests: Vec<PullRequest>,
    pub oldest_number: Option<u64>,
    pub newest_number: Option<u64>,
}

/// One social-A (Reddit) post, keyed by `id` (§3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub id: String,
    pub subreddit: String,
    pub title: String,
    pub url: String,
    pub content: String,
    pub created_utc: i64,
    pub score: i64,
    pub num_comments: i64,
}

/// One social-A (Reddit) comment, keyed by `id` (§3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: String,
    pub subreddit: String,
    pub parent_post_id: String,
    pub parent_post_title: String,
    pub parent_post_url: String,
    pub is_op: bool,
    pub content: String,
    pub created_utc: i64,
    pub url: String,
}

/// A tweet or repost reference carried on a [`Tweet`] (§4.6).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReferencedTweetKind {
    Retweeted,
    Quoted,
    RepliedTo,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferencedTweet {
    pub kind: ReferencedTweetKind,
    pub id: String,
}

/// One microblog (Twitter) tweet, keyed by `id` (§3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tweet {
    pub id: String,
    pub author_handle: String,
    pub text: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub in_reply_to_user_id: Option<String>,
    pub referenced_tweets: Vec<ReferencedTweet>,
    pub retweet_count: i64,
    pub quote_count: i64,
}

/// Platform-summary payload carried by a `<platform>/<account>/meta`
/// snapshot (§3). Closed per platform family; `GitHub`/`Reddit`/`Twitter`
/// are the multi-store platforms that have a meta store at all.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "platform", rename_all = "snake_case")]
pub enum PlatformMeta {
    GitHub {
        username: String,
        repos: Vec<String>,
    },
    Reddit {
        username: String,
        subreddits: Vec<String>,
    },
    Twitter {
        username: String,
    },
}

impl PlatformMeta {
    pub fn platform(&self) -> Platform {
        match self {
            PlatformMeta::GitHub { .. } => Platform::GitHub,
            PlatformMeta::Reddit { .. } => Platform::Reddit,
            PlatformMeta::Twitter { .. } => Platform::Twitter,
        }
    }
}

/// The closed set of payloads a [`Snapshot`] may carry. One variant per
/// store shape in §6.3's grammar, plus `Raw` for the three single-store
/// platforms (mastodon/youtube/linear) whose wire shape is
/// platform-specific and passed through as-received, and `Timeline` for
/// `timeline/<user>` snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum SnapshotPayload {
    Meta(PlatformMeta),
    Commits(RepoCommits),
    PullRequests(RepoPullRequests),
    Posts(Vec<Post>),
    Comments(Vec<Comment>),
    Tweets(Vec<Tweet>),
    Raw(serde_json::Value),
    Timeline(TimelineSnapshotPayload),
}

/// The atomic persisted unit in the Versioned Store (§4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub store_id: String,
    pub version: i64,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
    pub tags: Vec<String>,
    pub parents: Vec<ParentRef>,
    pub payload: SnapshotPayload,
}

/// Lightweight listing entry returned by `List` (§4.2), without the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub store_id: String,
    pub version: i64,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
    pub tags: Vec<String>,
}
