//! Account Processor (C5, §4.5). Orchestrates C1 (Provider) through C4
//! (Merger) for a single account: decrypt token, fetch, merge, persist,
//! update bookkeeping. Depends only on domain traits; infra supplies the
//! concrete provider, vault, and store implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::{ProviderError, StoreError};
use crate::models::account::{Account, Platform};
use crate::models::rate_limit::RateLimitRecord;
use crate::models::snapshot::SnapshotPayload;
use crate::services::merge::merge_by_key;
use crate::services::providers::{MultiStoreFetchResult, MultiStoreProvider, SingleStoreProvider};
use crate::services::rate_limit::{is_minimum_interval_satisfied, record_failure, record_success, should_fetch};
use crate::services::vault::CredentialVault;
use crate::store::{ParentLink, PutOptions, StoreId, VersionedStore};

/// Refreshes an expired access token using a stored refresh token.
/// Infra implements this per platform over the platform's OAuth token
/// endpoint.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken, ProviderError>;
}

#[derive(Debug, Clone)]
pub struct RefreshedToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Per-collection merge outcome reported up to the caller for bookkeeping
/// (§4.4 "store merge").
#[derive(Debug, Clone, Default)]
pub struct MergeStats {
    pub collection: String,
    pub version: i64,
    pub new_count: usize,
    pub total: usize,
}

/// The compact descriptor the Assembler consumes (§4.5 step 7).
#[derive(Debug, Clone)]
pub struct RawSnapshotDescriptor {
    pub account_id: Uuid,
    pub platform: Platform,
    pub stats: Vec<MergeStats>,
}

/// Outcome of [`process_multi_store_account`] / [`process_single_store_account`],
/// carrying both the descriptor for the Assembler and the updated
/// bookkeeping fields the caller must persist.
pub struct ProcessOutcome {
    pub descriptor: Option<RawSnapshotDescriptor>,
    pub rate_limit: RateLimitRecord,
    pub refreshed_token: Option<RefreshedToken>,
    pub fetched: bool,
}

fn gate(account: &Account, rate_limit: &RateLimitRecord, now: DateTime<Utc>) -> bool {
    if !should_fetch(rate_limit, now) {
        return false;
    }
    is_minimum_interval_satisfied(
        account.last_fetched_at,
        account.platform.minimum_fetch_interval_days(),
        now,
    )
}

/// Decrypts the stored access token (§4.5 step 3). Returns `None` on
/// failure, matching the spec's "log structured error, return nil".
fn decrypt_token(vault: &dyn CredentialVault, account: &Account) -> Option<String> {
    match vault.decrypt(&account.access_token_encrypted) {
        Ok(plaintext) => Some(plaintext),
        Err(err) => {
            tracing::error!(account_id = %account.id, error = %err, "token decryption failed");
            None
        }
    }
}

/// `storeWithMerge`: read the store's latest snapshot of the same shape,
/// merge the incoming collection by key, and write if changed (§4.4).
async fn store_with_merge<T, F, K>(
    store: &dyn VersionedStore,
    store_id: &StoreId,
    existing_extract: impl FnOnce(Option<SnapshotPayload>) -> Vec<T>,
    incoming: Vec<T>,
    key_fn: F,
    rewrap: impl FnOnce(Vec<T>) -> SnapshotPayload,
    collection_name: &str,
    tags: Vec<String>,
) -> Result<MergeStats, StoreError>
where
    T: Clone,
    F: Fn(&T) -> K,
    K: Eq + std::hash::Hash,
{
    let latest = store.get_latest(store_id).await?;
    let existing = existing_extract(latest.map(|s| s.payload));
    let (merged, new_count) = merge_by_key(existing, incoming, key_fn);
    let total = merged.len();
    let payload = rewrap(merged);
    let version = store
        .put(store_id, &payload, PutOptions { tags, parents: vec![] })
        .await?;

    Ok(MergeStats {
        collection: collection_name.to_string(),
        version,
        new_count,
        total,
    })
}

/// §4.5 step 4, multi-store branch: fetch via the provider, `storeWithMerge`
/// each returned collection, and separately write a meta snapshot.
async fn write_multi_store_result(
    store: &dyn VersionedStore,
    account: &Account,
    result: MultiStoreFetchResult,
) -> Result<Vec<MergeStats>, StoreError> {
    let platform = account.platform.as_str();
    let account_id = account.id.to_string();
    let tags = vec![format!("platform:{platform}"), format!("account:{account_id}")];

    let mut stats = Vec::new();

    let meta_store_id = StoreId::Meta {
        platform: platform.to_string(),
        account_id: account_id.clone(),
    };
    store
        .put(
            &meta_store_id,
            &SnapshotPayload::Meta(result.meta),
            PutOptions {
                tags: tags.clone(),
                parents: vec![],
            },
        )
        .await?;

    for repo_commits in result.commits {
        let parts: Vec<&str> = repo_commits.repo.splitn(2, '/').collect();
        let (owner, repo) = (
            parts.first().copied().unwrap_or_default(),
            parts.get(1).copied().unwrap_or_default(),
        );
        let store_id = StoreId::GitHubCommits {
            account_id: account_id.clone(),
            owner: owner.to_string(),
            repo: repo.to_string(),
        };
        let repo_name = repo_commits.repo.clone();
        let merged = store_with_merge(
            store,
            &store_id,
            |existing| match existing {
                Some(SnapshotPayload::Commits(c)) => c.commits,
                _ => Vec::new(),
            },
            repo_commits.commits,
            |c| c.sha.clone(),
            move |commits| {
                let oldest_sha = commits.first().map(|c: &crate::models::snapshot::Commit| c.sha.clone());
                let newest_sha = commits.last().map(|c: &crate::models::snapshot::Commit| c.sha.clone());
                SnapshotPayload::Commits(crate::models::snapshot::RepoCommits {
                    repo: repo_name,
                    commits,
                    oldest_sha,
                    newest_sha,
                })
            },
            "commits",
            tags.clone(),
        )
        .await?;
        stats.push(merged);
    }

    for repo_prs in result.pull_requests {
        let parts: Vec<&str> = repo_prs.repo.splitn(2, '/').collect();
        let (owner, repo) = (
            parts.first().copied().unwrap_or_default(),
            parts.get(1).copied().unwrap_or_default(),
        );
        let store_id = StoreId::GitHubPullRequests {
            account_id: account_id.clone(),
            owner: owner.to_string(),
            repo: repo.to_string(),
        };
        let repo_name = repo_prs.repo.clone();
        let merged = store_with_merge(
            store,
            &store_id,
            |existing| match existing {
                Some(SnapshotPayload::PullRequests(p)) => p.pull_requests,
                _ => Vec::new(),
            },
            repo_prs.pull_requests,
            |pr| pr.number,
            move |pull_requests| {
                let oldest_number = pull_requests.iter().map(|p: &crate::models::snapshot::PullRequest| p.number).min();
                let newest_number = pull_requests.iter().map(|p: &crate::models::snapshot::PullRequest| p.number).max();
                SnapshotPayload::PullRequests(crate::models::snapshot::RepoPullRequests {
                    repo: repo_name,
                    pull_requests,
                    oldest_number,
                    newest_number,
                })
            },
            "pull_requests",
            tags.clone(),
        )
        .await?;
        stats.push(merged);
    }

    if !result.posts.is_empty() {
        let store_id = StoreId::RedditPosts {
            account_id: account_id.clone(),
        };
        let merged = store_with_merge(
            store,
            &store_id,
            |existing| match existing {
                Some(SnapshotPayload::Posts(p)) => p,
                _ => Vec::new(),
            },
            result.posts,
            |p| p.id.clone(),
            SnapshotPayload::Posts,
            "posts",
            tags.clone(),
        )
        .await?;
        stats.push(merged);
    }

    if !result.comments.is_empty() {
        let store_id = StoreId::RedditComments {
            account_id: account_id.clone(),
        };
        let merged = store_with_merge(
            store,
            &store_id,
            |existing| match existing {
                Some(SnapshotPayload::Comments(c)) => c,
                _ => Vec::new(),
            },
            result.comments,
            |c| c.id.clone(),
            SnapshotPayload::Comments,
            "comments",
            tags.clone(),
        )
        .await?;
        stats.push(merged);
    }

    if !result.tweets.is_empty() {
        let store_id = StoreId::TwitterTweets {
            account_id: account_id.clone(),
        };
        let merged = store_with_merge(
            store,
            &store_id,
            |existing| match existing {
                Some(SnapshotPayload::Tweets(t)) => t,
                _ => Vec::new(),
            },
            result.tweets,
            |t| t.id.clone(),
            SnapshotPayload::Tweets,
            "tweets",
            tags.clone(),
        )
        .await?;
        stats.push(merged);
    }

    Ok(stats)
}

/// `ProcessAccount` for a multi-store platform (code-host, social-A,
/// microblog) (§4.5).
pub async fn process_multi_store_account(
    vault: &dyn CredentialVault,
    store: &dyn VersionedStore,
    refresher: Option<&dyn TokenRefresher>,
    account: &Account,
    rate_limit: RateLimitRecord,
    provider: &dyn MultiStoreProvider,
    now: DateTime<Utc>,
) -> ProcessOutcome {
    let mut rate_limit = rate_limit;

    if !gate(account, &rate_limit, now) {
        return ProcessOutcome {
            descriptor: None,
            rate_limit,
            refreshed_token: None,
            fetched: false,
        };
    }

    let Some(mut access_token) = decrypt_token(vault, account) else {
        return ProcessOutcome {
            descriptor: None,
            rate_limit,
            refreshed_token: None,
            fetched: false,
        };
    };

    let mut refreshed_token = None;
    let mut attempt = provider.fetch(&access_token).await;

    if let Err(ProviderError::AuthExpired(_)) = &attempt {
        if let (Some(refresh_token), Some(refresher)) = (&account.refresh_token_encrypted, refresher) {
            if let Ok(plaintext_refresh) = vault.decrypt(refresh_token) {
                if let Ok(refreshed) = refresher.refresh(&plaintext_refresh).await {
                    access_token = refreshed.access_token.clone();
                    refreshed_token = Some(refreshed);
                    attempt = provider.fetch(&access_token).await;
                }
            }
        }
    }

    match attempt {
        Ok(result) => match write_multi_store_result(store, account, result).await {
            Ok(stats) => {
                record_success(&mut rate_limit, None, None);
                ProcessOutcome {
                    descriptor: Some(RawSnapshotDescriptor {
                        account_id: account.id,
                        platform: account.platform,
                        stats,
                    }),
                    rate_limit,
                    refreshed_token,
                    fetched: true,
                }
            }
            Err(err) => {
                tracing::error!(account_id = %account.id, error = %err, "store write failed");
                ProcessOutcome {
                    descriptor: None,
                    rate_limit,
                    refreshed_token,
                    fetched: false,
                }
            }
        },
        Err(ref err @ ProviderError::RateLimited { .. }) => {
            record_failure(&mut rate_limit, err, now);
            ProcessOutcome {
                descriptor: None,
                rate_limit,
                refreshed_token,
                fetched: false,
            }
        }
        Err(err) => {
            record_failure(&mut rate_limit, &err, now);
            tracing::warn!(account_id = %account.id, error = %err, "fetch failed");
            ProcessOutcome {
                descriptor: None,
                rate_limit,
                refreshed_token,
                fetched: false,
            }
        }
    }
}

/// `ProcessAccount` for a single-store platform (social-B, video-host,
/// task-tracker) (§4.5 step 4).
pub async fn process_single_store_account(
    vault: &dyn CredentialVault,
    store: &dyn VersionedStore,
    account: &Account,
    rate_limit: RateLimitRecord,
    provider: &dyn SingleStoreProvider,
    now: DateTime<Utc>,
) -> ProcessOutcome {
    let mut rate_limit = rate_limit;

    if !gate(account, &rate_limit, now) {
        return ProcessOutcome {
            descriptor: None,
            rate_limit,
            refreshed_token: None,
            fetched: false,
        };
    }

    let Some(access_token) = decrypt_token(vault, account) else {
        return ProcessOutcome {
            descriptor: None,
            rate_limit,
            refreshed_token: None,
            fetched: false,
        };
    };

    match provider.fetch(&access_token).await {
        Ok(raw) => {
            let store_id = StoreId::Raw {
                platform: account.platform.as_str().to_string(),
                account_id: account.id.to_string(),
            };
            let tags = vec![
                format!("platform:{}", account.platform.as_str()),
                format!("account:{}", account.id),
            ];
            match store
                .put(&store_id, &SnapshotPayload::Raw(raw), PutOptions { tags, parents: vec![] })
                .await
            {
                Ok(version) => {
                    record_success(&mut rate_limit, None, None);
                    ProcessOutcome {
                        descriptor: Some(RawSnapshotDescriptor {
                            account_id: account.id,
                            platform: account.platform,
                            stats: vec![MergeStats {
                                collection: "raw".to_string(),
                                version,
                                new_count: 0,
                                total: 0,
                            }],
                        }),
                        rate_limit,
                        refreshed_token: None,
                        fetched: true,
                    }
                }
                Err(err) => {
                    tracing::error!(account_id = %account.id, error = %err, "store write failed");
                    ProcessOutcome {
                        descriptor: None,
                        rate_limit,
                        refreshed_token: None,
                        fetched: false,
                    }
                }
            }
        }
        Err(err) => {
            record_failure(&mut rate_limit, &err, now);
            tracing::warn!(account_id = %account.id, error = %err, "fetch failed");
            ProcessOutcome {
                descriptor: None,
                rate_limit,
                refreshed_token: None,
                fetched: false,
            }
        }
    }
}
