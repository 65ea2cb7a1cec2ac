use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::account::Platform;

/// A commit's contribution to an enriched PR (§4.6 step 4), resolved by
/// sha from the commit collection; shas with no match are silently
/// skipped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PullRequestCommitRef {
    pub sha: String,
    pub message: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommitItemPayload {
    pub sha: String,
    pub message: String,
    pub repo: String,
    pub branch: String,
    pub additions: i64,
    pub deletions: i64,
    pub files_changed: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PullRequestItemPayload {
    pub repo: String,
    pub number: u64,
    pub commits: Vec<PullRequestCommitRef>,
    pub merge_commit_sha: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostItemPayload {
    pub subreddit: String,
    pub content: String,
    pub has_media: bool,
    pub score: i64,
    pub num_comments: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommentItemPayload {
    pub subreddit: String,
    pub content: String,
    pub parent_post_title: String,
    pub parent_post_url: String,
    pub is_op: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TweetItemPayload {
    pub author_handle: String,
    pub content: String,
    pub is_reply: bool,
    pub is_repost: bool,
    pub repost_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoItemPayload {
    pub channel: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskItemPayload {
    pub status: String,
    pub description: String,
}

/// The normalized, discriminated payload carried by a [`TimelineItem`];
/// the active variant always matches `TimelineItem::item_type` (§3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum TimelineItemPayload {
    Commit(CommitItemPayload),
    PullRequest(PullRequestItemPayload),
    Post(PostItemPayload),
    Comment(CommentItemPayload),
    Tweet(TweetItemPayload),
    Video(VideoItemPayload),
    Task(TaskItemPayload),
}

impl TimelineItemPayload {
    /// `payload.content` / `payload.message` as referenced by the keyword
    /// matcher (§4.7); `title` is matched separately by the caller.
    pub fn searchable_text(&self) -> Option<&str> {
        match self {
            TimelineItemPayload::Commit(p) => Some(&p.message),
            TimelineItemPayload::Post(p) => Some(&p.content),
            TimelineItemPayload::Comment(p) => Some(&p.content),
            TimelineItemPayload::Tweet(p) => Some(&p.content),
            TimelineItemPayload::Video(p) => Some(&p.description),
            TimelineItemPayload::Task(p) => Some(&p.description),
            TimelineItemPayload::PullRequest(_) => None,
        }
    }

    pub fn repo(&self) -> Option<&str> {
        match self {
            TimelineItemPayload::Commit(p) => Some(&p.repo),
            TimelineItemPayload::PullRequest(p) => Some(&p.repo),
            _ => None,
        }
    }

    pub fn subreddit(&self) -> Option<&str> {
        match self {
            TimelineItemPayload::Post(p) => Some(&p.subreddit),
            TimelineItemPayload::Comment(p) => Some(&p.subreddit),
            _ => None,
        }
    }

    pub fn author_handle(&self) -> Option<&str> {
        match self {
            TimelineItemPayload::Tweet(p) => Some(&p.author_handle),
            _ => None,
        }
    }
}

/// The normalized, cross-platform entry shape the Assembler produces (§3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimelineItem {
    /// Platform-qualified, e.g. `"github:commit:owner/repo:abc1234"`.
    pub id: String,
    pub platform: Platform,
    pub timestamp: DateTime<Utc>,
    pub title: String,
    pub url: String,
    pub payload: TimelineItemPayload,
    /// The account this item originated from, so filters (§4.7) can be
    /// applied without re-normalizing.
    pub account_id: uuid::Uuid,
}

/// A derived bundle of commits sharing `(repo, branch, date)` (§3, §4.6
/// step 5).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommitGroup {
    pub repo: String,
    pub branch: String,
    pub date: String,
    pub commits: Vec<TimelineItem>,
    pub total_additions: i64,
    pub total_deletions: i64,
    pub total_files_changed: i64,
}

impl CommitGroup {
    /// The timestamp of the group's first (most recent) commit, used for
    /// within-bucket ordering (§4.6 step 6).
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.commits.first().map(|c| c.timestamp)
    }

    pub fn recompute_totals(commits: &[TimelineItem]) -> (i64, i64, i64) {
        commits.iter().fold((0, 0, 0), |(add, del, files), item| {
            if let TimelineItemPayload::Commit(c) = &item.payload {
                (add + c.additions, del + c.deletions, files + c.files_changed)
            } else {
                (add, del, files)
            }
        })
    }
}

/// Either a standalone normalized item or a grouped bundle of commits,
/// placed into a [`DateGroup`] (§4.6 step 6).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "entry_type")]
pub enum DateEntry {
    Item(TimelineItem),
    CommitGroup(CommitGroup),
}

impl DateEntry {
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            DateEntry::Item(item) => Some(item.timestamp),
            DateEntry::CommitGroup(group) => group.timestamp(),
        }
    }
}

/// `(date-key yyyy-mm-dd) -> entries`, descending by date-key (§3, §4.6
/// step 6).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DateGroup {
    pub date_key: String,
    pub entries: Vec<DateEntry>,
}

/// The payload carried by a `timeline/<user>` snapshot (§4.6 step 7).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimelineSnapshotPayload {
    pub generated_at: DateTime<Utc>,
    pub groups: Vec<DateGroup>,
}
