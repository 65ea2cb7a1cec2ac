//! Wires the Account Processor (C5) and Timeline Assembler (C6) to
//! `ServerInfra`'s concrete providers/vault/store, implementing the
//! `AccountSync`/`TimelineRegenerator` traits the Sync Scheduler (C8)
//! depends on.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use domain::errors::DomainError;
use domain::models::account::{Account, Platform};
use domain::models::rate_limit::RateLimitRecord;
use domain::models::snapshot::SnapshotPayload;
use domain::models::timeline::{TaskItemPayload, TimelineItem, TimelineItemPayload, VideoItemPayload};
use domain::repositories::{AccountRepository, AccountSettingRepository, PlatformCredentialRepository, ProfileRepository};
use domain::services::account_processor::{process_multi_store_account, process_single_store_account, ProcessOutcome, TokenRefresher};
use domain::services::assembler::{combine_user_timeline, AssemblerInput};
use domain::services::scheduler::{AccountSync, TimelineRegenerator};
use domain::services::vault::CredentialVault;
use domain::store::{PutOptions, StoreId, VersionedStore};

use crate::providers::OAuthTokenRefresher;
use crate::ServerInfra;

/// Reads the JSON array stored under account-setting key `repos` (GitHub)
/// or `subreddits`/`instance_url` (unused for fetch scoping today, kept
/// for parity with the settings endpoint). Defaults to empty/`None` when
/// the setting is absent, matching "no repos tracked yet" rather than an
/// error.
async fn setting_string_list(infra: &ServerInfra, account_id: Uuid, key: &str) -> Vec<String> {
    match infra.db.find_by_account(account_id).await {
        Ok(settings) => settings
            .into_iter()
            .find(|s| s.key == key)
            .and_then(|s| serde_json::from_value::<Vec<String>>(s.value).ok())
            .unwrap_or_default(),
        Err(err) => {
            tracing::error!(account_id = %account_id, error = %err, "failed to read account settings");
            Vec::new()
        }
    }
}

async fn setting_string(infra: &ServerInfra, account_id: Uuid, key: &str) -> Option<String> {
    match infra.db.find_by_account(account_id).await {
        Ok(settings) => settings
            .into_iter()
            .find(|s| s.key == key)
            .and_then(|s| s.value.as_str().map(str::to_string)),
        Err(_) => None,
    }
}

/// Resolves the `(client_id, client_secret)` pair governing one account's
/// OAuth refresh: a profile's bring-your-own credential overrides the
/// system-wide one for its platform (§4.8).
async fn oauth_credentials(infra: &ServerInfra, profile_id: Uuid, platform: Platform) -> Option<(String, String)> {
    if let Ok(creds) = PlatformCredentialRepository::find_by_profile(&infra.db, profile_id).await {
        if let Some(byo) = creds.into_iter().find(|c| c.platform == platform) {
            if let Ok(secret) = infra.vault.decrypt(&byo.client_secret_encrypted) {
                return Some((byo.client_id, secret));
            }
        }
    }

    match platform {
        Platform::GitHub => infra.system_github_credentials().map(|(id, secret)| (id.to_string(), secret.to_string())),
        Platform::Reddit => infra.system_reddit_credentials().map(|(id, secret)| (id.to_string(), secret.to_string())),
        Platform::Twitter => infra.system_twitter_credentials().map(|(id, secret)| (id.to_string(), secret.to_string())),
        _ => None,
    }
}

fn token_refresher(infra: &ServerInfra, platform: Platform, client_id: &str, client_secret: &str) -> OAuthTokenRefresher {
    match platform {
        Platform::GitHub => infra.github_token_refresher(client_id, client_secret),
        Platform::Reddit => infra.reddit_token_refresher(client_id, client_secret),
        Platform::Twitter => infra.twitter_token_refresher(client_id, client_secret),
        _ => unreachable!("oauth_credentials only resolves for multi-store platforms"),
    }
}

/// Binds C5's pipeline to `ServerInfra`'s concrete collaborators, resolved
/// fresh per account since tracked repos, the Mastodon instance, and BYO
/// credentials are all per-account/per-profile configuration.
pub struct InfraAccountSync {
    infra: Arc<ServerInfra>,
}

impl InfraAccountSync {
    pub fn new(infra: Arc<ServerInfra>) -> Self {
        Self { infra }
    }

    async fn sync_multi_store(&self, account: &Account, rate_limit: RateLimitRecord, now: DateTime<Utc>) -> ProcessOutcome {
        let refresher_creds = oauth_credentials(&self.infra, account.profile_id, account.platform).await;
        let refresher = refresher_creds
            .as_ref()
            .map(|(id, secret)| token_refresher(&self.infra, account.platform, id, secret));
        let refresher: Option<&dyn TokenRefresher> = refresher.as_ref().map(|r| r as &dyn TokenRefresher);

        match account.platform {
            Platform::GitHub => {
                let repos = setting_string_list(&self.infra, account.id, "repos").await;
                let provider = self.infra.github_provider(repos);
                process_multi_store_account(&self.infra.vault, &self.infra.store, refresher, account, rate_limit, &provider, now).await
            }
            Platform::Reddit => {
                let provider = self.infra.reddit_provider();
                process_multi_store_account(&self.infra.vault, &self.infra.store, refresher, account, rate_limit, &provider, now).await
            }
            Platform::Twitter => {
                let provider = self.infra.twitter_provider();
                process_multi_store_account(&self.infra.vault, &self.infra.store, refresher, account, rate_limit, &provider, now).await
            }
            _ => unreachable!("caller only dispatches multi-store platforms here"),
        }
    }

    async fn sync_single_store(&self, account: &Account, rate_limit: RateLimitRecord, now: DateTime<Utc>) -> ProcessOutcome {
        match account.platform {
            Platform::Mastodon => {
                let instance_base_url = setting_string(&self.infra, account.id, "instance_url")
                    .unwrap_or_else(|| "https://mastodon.social".to_string());
                let provider = self.infra.mastodon_provider(instance_base_url);
                process_single_store_account(&self.infra.vault, &self.infra.store, account, rate_limit, &provider, now).await
            }
            Platform::YouTube => {
                let provider = self.infra.youtube_provider();
                process_single_store_account(&self.infra.vault, &self.infra.store, account, rate_limit, &provider, now).await
            }
            Platform::Linear => {
                let provider = self.infra.linear_provider();
                process_single_store_account(&self.infra.vault, &self.infra.store, account, rate_limit, &provider, now).await
            }
            _ => unreachable!("caller only dispatches single-store platforms here"),
        }
    }
}

#[async_trait]
impl AccountSync for InfraAccountSync {
    async fn sync_account(&self, account: &Account, rate_limit: RateLimitRecord, now: DateTime<Utc>) -> ProcessOutcome {
        if account.platform.is_multi_store() {
            self.sync_multi_store(account, rate_limit, now).await
        } else {
            self.sync_single_store(account, rate_limit, now).await
        }
    }
}

/// Turns a single-store platform's passthrough `Raw` payload into the
/// timeline items the Assembler folds in as `other_items`. Mastodon has
/// no dedicated `TimelineItemPayload` variant (§3 only defines Video/Task
/// for the single-store family beyond posts/comments/tweets), so its raw
/// statuses surface only via the raw snapshot endpoint, not the timeline.
fn normalize_single_store(account_id: Uuid, platform: Platform, raw: &serde_json::Value) -> Vec<TimelineItem> {
    match platform {
        Platform::YouTube => raw
            .pointer("/videos/items")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        let snippet = item.get("snippet")?;
                        let video_id = item.pointer("/contentDetails/videoId")?.as_str()?;
                        let title = snippet.get("title").and_then(|v| v.as_str()).unwrap_or_default();
                        let description = snippet.get("description").and_then(|v| v.as_str()).unwrap_or_default();
                        let channel = snippet.get("channelTitle").and_then(|v| v.as_str()).unwrap_or_default();
                        let published_at = snippet
                            .get("publishedAt")
                            .and_then(|v| v.as_str())
                            .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
                            .map(|v| v.with_timezone(&Utc))
                            .unwrap_or_else(Utc::now);
                        Some(TimelineItem {
                            id: format!("youtube:video:{video_id}"),
                            platform,
                            timestamp: published_at,
                            title: title.to_string(),
                            url: format!("https://www.youtube.com/watch?v={video_id}"),
                            payload: TimelineItemPayload::Video(VideoItemPayload {
                                channel: channel.to_string(),
                                description: description.to_string(),
                            }),
                            account_id,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default(),
        Platform::Linear => raw
            .pointer("/data/viewer/assignedIssues/nodes")
            .and_then(|v| v.as_array())
            .map(|nodes| {
                nodes
                    .iter()
                    .filter_map(|node| {
                        let id = node.get("identifier").and_then(|v| v.as_str())?;
                        let title = node.get("title").and_then(|v| v.as_str()).unwrap_or_default();
                        let url = node.get("url").and_then(|v| v.as_str()).unwrap_or_default();
                        let status = node.pointer("/state/name").and_then(|v| v.as_str()).unwrap_or("unknown");
                        let updated_at = node
                            .get("updatedAt")
                            .and_then(|v| v.as_str())
                            .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
                            .map(|v| v.with_timezone(&Utc))
                            .unwrap_or_else(Utc::now);
                        Some(TimelineItem {
                            id: format!("linear:issue:{id}"),
                            platform,
                            timestamp: updated_at,
                            title: title.to_string(),
                            url: url.to_string(),
                            payload: TimelineItemPayload::Task(TaskItemPayload {
                                status: status.to_string(),
                                description: title.to_string(),
                            }),
                            account_id,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Binds C6's pure assembly function to live store reads for one user's
/// accounts (§4.6 steps 1-2, 7).
pub struct InfraTimelineRegenerator {
    infra: Arc<ServerInfra>,
}

impl InfraTimelineRegenerator {
    pub fn new(infra: Arc<ServerInfra>) -> Self {
        Self { infra }
    }
}

#[async_trait]
impl TimelineRegenerator for InfraTimelineRegenerator {
    async fn regenerate(&self, user_id: Uuid) -> Result<(), DomainError> {
        let profiles = self.infra.db.find_by_owner(user_id).await?;
        let mut input = AssemblerInput::default();

        for profile in profiles {
            let accounts = AccountRepository::find_by_profile(&self.infra.db, profile.id).await?;
            for account in accounts {
                load_account_into_input(&self.infra, &account, &mut input).await;
            }
        }

        let payload = combine_user_timeline(input, Utc::now());
        let store_id = StoreId::Timeline {
            user_id: user_id.to_string(),
        };
        self.infra
            .store
            .put(
                &store_id,
                &SnapshotPayload::Timeline(payload),
                PutOptions {
                    tags: vec![format!("user:{user_id}")],
                    parents: vec![],
                },
            )
            .await?;

        Ok(())
    }
}

async fn load_account_into_input(infra: &Arc<ServerInfra>, account: &Account, input: &mut AssemblerInput) {
    match account.platform {
        Platform::GitHub => {
            let repos = setting_string_list(infra, account.id, "repos").await;
            for repo in repos {
                let parts: Vec<&str> = repo.splitn(2, '/').collect();
                let (owner, repo_name) = (
                    parts.first().copied().unwrap_or_default(),
                    parts.get(1).copied().unwrap_or_default(),
                );

                let commits_id = StoreId::GitHubCommits {
                    account_id: account.id.to_string(),
                    owner: owner.to_string(),
                    repo: repo_name.to_string(),
                };
                if let Ok(Some(snapshot)) = infra.store.get_latest(&commits_id).await {
                    if let SnapshotPayload::Commits(c) = snapshot.payload {
                        input.commits.extend(c.commits.into_iter().map(|commit| (account.id, account.platform, commit)));
                    }
                }

                let prs_id = StoreId::GitHubPullRequests {
                    account_id: account.id.to_string(),
                    owner: owner.to_string(),
                    repo: repo_name.to_string(),
                };
                if let Ok(Some(snapshot)) = infra.store.get_latest(&prs_id).await {
                    if let SnapshotPayload::PullRequests(p) = snapshot.payload {
                        input
                            .pull_requests
                            .extend(p.pull_requests.into_iter().map(|pr| (account.id, account.platform, pr)));
                    }
                }
            }
        }
        Platform::Reddit => {
            let posts_id = StoreId::RedditPosts {
                account_id: account.id.to_string(),
            };
            if let Ok(Some(snapshot)) = infra.store.get_latest(&posts_id).await {
                if let SnapshotPayload::Posts(posts) = snapshot.payload {
                    input.posts.extend(posts.into_iter().map(|p| (account.id, account.platform, p)));
                }
            }

            let comments_id = StoreId::RedditComments {
                account_id: account.id.to_string(),
            };
            if let Ok(Some(snapshot)) = infra.store.get_latest(&comments_id).await {
                if let SnapshotPayload::Comments(comments) = snapshot.payload {
                    input.comments.extend(comments.into_iter().map(|c| (account.id, account.platform, c)));
                }
            }
        }
        Platform::Twitter => {
            let tweets_id = StoreId::TwitterTweets {
                account_id: account.id.to_string(),
            };
            if let Ok(Some(snapshot)) = infra.store.get_latest(&tweets_id).await {
                if let SnapshotPayload::Tweets(tweets) = snapshot.payload {
                    input.tweets.extend(tweets.into_iter().map(|t| (account.id, account.platform, t)));
                }
            }
        }
        Platform::Mastodon | Platform::YouTube | Platform::Linear => {
            let raw_id = StoreId::Raw {
                platform: account.platform.as_str().to_string(),
                account_id: account.id.to_string(),
            };
            if let Ok(Some(snapshot)) = infra.store.get_latest(&raw_id).await {
                if let SnapshotPayload::Raw(raw) = snapshot.payload {
                    input.other_items.extend(normalize_single_store(account.id, account.platform, &raw));
                }
            }
        }
    }
}
