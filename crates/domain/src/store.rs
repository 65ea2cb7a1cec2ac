//! Store-id grammar and the Versioned Store contract (§4.2, §6.3).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::StoreError;
use crate::models::snapshot::{Snapshot, SnapshotMeta};

/// The closed set of store-id shapes this core persists. Parsing rejects
/// anything outside this grammar rather than opening an arbitrary path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreId {
    /// `media/raw/<platform>/<account_id>`
    Raw { platform: String, account_id: String },
    /// `media/timeline/<user_id>`
    Timeline { user_id: String },
    /// `media/github/<account_id>/meta`, `media/reddit/<account_id>/meta`,
    /// `media/twitter/<account_id>/meta`
    Meta { platform: String, account_id: String },
    /// `media/github/<account_id>/commits/<owner>/<repo>`
    GitHubCommits {
        account_id: String,
        owner: String,
        repo: String,
    },
    /// `media/github/<account_id>/prs/<owner>/<repo>`
    GitHubPullRequests {
        account_id: String,
        owner: String,
        repo: String,
    },
    /// `media/reddit/<account_id>/posts`
    RedditPosts { account_id: String },
    /// `media/reddit/<account_id>/comments`
    RedditComments { account_id: String },
    /// `media/twitter/<account_id>/tweets`
    TwitterTweets { account_id: String },
}

impl StoreId {
    /// Renders back to the canonical `media/...` path. Round-trips through
    /// [`StoreId::parse`].
    pub fn to_path(&self) -> String {
        match self {
            StoreId::Raw {
                platform,
                account_id,
            } => format!("media/raw/{platform}/{account_id}"),
            StoreId::Timeline { user_id } => format!("media/timeline/{user_id}"),
            StoreId::Meta {
                platform,
                account_id,
            } => format!("media/{platform}/{account_id}/meta"),
            StoreId::GitHubCommits {
                account_id,
                owner,
                repo,
            } => format!("media/github/{account_id}/commits/{owner}/{repo}"),
            StoreId::GitHubPullRequests {
                account_id,
                owner,
                repo,
            } => format!("media/github/{account_id}/prs/{owner}/{repo}"),
            StoreId::RedditPosts { account_id } => format!("media/reddit/{account_id}/posts"),
            StoreId::RedditComments { account_id } => {
                format!("media/reddit/{account_id}/comments")
            }
            StoreId::TwitterTweets { account_id } => format!("media/twitter/{account_id}/tweets"),
        }
    }

    /// Parses a store id, rejecting anything that does not match the
    /// grammar in §6.3.
    pub fn parse(path: &str) -> Result<Self, StoreError> {
        let segments: Vec<&str> = path.split('/').collect();
        let invalid = || StoreError::ParseError(format!("invalid store id: {path}"));

        match segments.as_slice() {
            ["media", "raw", platform, account_id] => Ok(StoreId::Raw {
                platform: (*platform).to_string(),
                account_id: (*account_id).to_string(),
            }),
            ["media", "timeline", user_id] => Ok(StoreId::Timeline {
                user_id: (*user_id).to_string(),
            }),
            ["media", platform, account_id, "meta"]
                if matches!(*platform, "github" | "reddit" | "twitter") =>
            {
                Ok(StoreId::Meta {
                    platform: (*platform).to_string(),
                    account_id: (*account_id).to_string(),
                })
            }
            ["media", "github", account_id, "commits", owner, repo] => {
                Ok(StoreId::GitHubCommits {
                    account_id: (*account_id).to_string(),
                    owner: (*owner).to_string(),
                    repo: (*repo).to_string(),
                })
            }
            ["media", "github", account_id, "prs", owner, repo] => {
                Ok(StoreId::GitHubPullRequests {
                    account_id: (*account_id).to_string(),
                    owner: (*owner).to_string(),
                    repo: (*repo).to_string(),
                })
            }
            ["media", "reddit", account_id, "posts"] => Ok(StoreId::RedditPosts {
                account_id: (*account_id).to_string(),
            }),
            ["media", "reddit", account_id, "comments"] => Ok(StoreId::RedditComments {
                account_id: (*account_id).to_string(),
            }),
            ["media", "twitter", account_id, "tweets"] => Ok(StoreId::TwitterTweets {
                account_id: (*account_id).to_string(),
            }),
            _ => Err(invalid()),
        }
    }
}

/// Lineage edge supplied by the caller when writing a derived snapshot
/// (§4.2 "Parent lineage"). Persisted as a plain edge row, never a
/// materialized graph.
#[derive(Debug, Clone)]
pub struct ParentLink {
    pub store_id: String,
    pub version: i64,
    pub role: String,
}

/// Options accepted by [`VersionedStore::put`].
#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    pub tags: Vec<String>,
    pub parents: Vec<ParentLink>,
}

/// Pagination options accepted by [`VersionedStore::list`].
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub before: Option<i64>,
    pub limit: Option<i64>,
}

/// The contract every typed store implements (§4.2). Implementations MUST
/// validate the store id parses before opening it.
#[async_trait]
pub trait VersionedStore: Send + Sync {
    /// Appends a snapshot. If the content hash equals the current head's,
    /// returns the current head's version unchanged rather than writing a
    /// new one.
    async fn put(
        &self,
        store_id: &StoreId,
        payload: &crate::models::snapshot::SnapshotPayload,
        options: PutOptions,
    ) -> Result<i64, StoreError>;

    async fn get_latest(&self, store_id: &StoreId) -> Result<Option<Snapshot>, StoreError>;

    async fn get(&self, store_id: &StoreId, version: i64) -> Result<Option<Snapshot>, StoreError>;

    async fn list(
        &self,
        store_id: &StoreId,
        options: ListOptions,
    ) -> Result<Vec<SnapshotMeta>, StoreError>;

    /// Removes every store this account owns (`media/raw/*/<account_id>`,
    /// `media/<platform>/<account_id>/...`) and their snapshots, tags, and
    /// parent-lineage rows. Returns the number of distinct store ids
    /// removed. Never touches `media/timeline/<user_id>` — the timeline is
    /// regenerated by the caller, not deleted here.
    async fn purge_account(&self, account_id: &str) -> Result<u64, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_shape() {
        let ids = [
            "media/raw/github/acct-1",
            "media/timeline/user-1",
            "media/github/acct-1/meta",
            "media/reddit/acct-1/meta",
            "media/twitter/acct-1/meta",
            "media/github/acct-1/commits/rustlang/rust",
            "media/github/acct-1/prs/rustlang/rust",
            "media/reddit/acct-1/posts",
            "media/reddit/acct-1/comments",
            "media/twitter/acct-1/tweets",
        ];
        for id in ids {
            let parsed = StoreId::parse(id).unwrap();
            assert_eq!(parsed.to_path(), id);
        }
    }

    #[test]
    fn rejects_unknown_shapes() {
        assert!(StoreId::parse("media/mastodon/acct-1/meta").is_err());
        assert!(StoreId::parse("media/github/acct-1/commits/rustlang").is_err());
        assert!(StoreId::parse("not/a/store/id").is_err());
    }
}
