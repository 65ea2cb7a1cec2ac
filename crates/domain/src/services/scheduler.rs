//! Sync Scheduler (C8, §4.5 step 7, §5). Fans out over active accounts:
//! users run sequentially, a user's accounts run concurrently via
//! [`tokio::task::JoinSet`], and that user's timeline regenerates once
//! the batch completes.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::DomainError;
use crate::models::account::Account;
use crate::models::rate_limit::RateLimitRecord;
use crate::repositories::{AccountRepository, ProfileRepository, RateLimitRepository};
use crate::services::account_processor::ProcessOutcome;

/// Resolves the right provider/vault/store for one account and runs C5's
/// pipeline. Infra binds this per platform so the scheduler stays
/// platform-agnostic.
#[async_trait]
pub trait AccountSync: Send + Sync {
    async fn sync_account(
        &self,
        account: &Account,
        rate_limit: RateLimitRecord,
        now: DateTime<Utc>,
    ) -> ProcessOutcome;
}

/// Regenerates one user's `timeline/<user>` snapshot from the latest
/// per-account stores (§4.6). Infra binds this to the Assembler plus
/// store access.
#[async_trait]
pub trait TimelineRegenerator: Send + Sync {
    async fn regenerate(&self, user_id: Uuid) -> Result<(), DomainError>;
}

/// Active accounts for one user, pre-grouped by the caller (a SQL join
/// in infra) since the domain layer does not perform joins itself.
#[derive(Debug, Clone)]
pub struct UserAccounts {
    pub user_id: Uuid,
    pub accounts: Vec<Account>,
}

/// The non-error summary `HandleCron` always returns (§7 "Cron never
/// surfaces an error").
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CronSummary {
    pub processed: usize,
    pub updated_users: usize,
    pub failed_accounts: usize,
    pub timelines_generated: usize,
}

/// Collaborators injected into the scheduler. Held behind `Arc` so a
/// single instance can be shared across the `JoinSet`'s spawned tasks.
pub struct SchedulerDeps {
    pub account_repo: Arc<dyn AccountRepository>,
    pub profile_repo: Arc<dyn ProfileRepository>,
    pub rate_limit_repo: Arc<dyn RateLimitRepository>,
    pub account_sync: Arc<dyn AccountSync>,
    pub timeline_regenerator: Arc<dyn TimelineRegenerator>,
}

async fn sync_one_account(deps: Arc<SchedulerDeps>, account: Account, now: DateTime<Utc>) -> bool {
    let rate_limit = deps
        .rate_limit_repo
        .find_by_account(account.id)
        .await
        .ok()
        .flatten()
        .unwrap_or_else(|| RateLimitRecord::new(account.id));

    let outcome = deps.account_sync.sync_account(&account, rate_limit, now).await;

    if let Err(err) = deps.rate_limit_repo.upsert(&outcome.rate_limit).await {
        tracing::error!(account_id = %account.id, error = %err, "failed to persist rate limit state");
    }

    if outcome.fetched {
        let mut updated = account.clone();
        updated.last_fetched_at = Some(now);
        if let Some(refreshed) = &outcome.refreshed_token {
            updated.token_expires_at = refreshed.expires_at;
        }
        if let Err(err) = deps.account_repo.update(&updated).await {
            tracing::error!(account_id = %account.id, error = %err, "failed to persist account bookkeeping");
        }
    }

    outcome.fetched
}

/// `HandleCron`: the top-level periodic trigger (§5).
pub async fn handle_cron(deps: Arc<SchedulerDeps>, batches: Vec<UserAccounts>, now: DateTime<Utc>) -> CronSummary {
    let mut summary = CronSummary::default();

    for batch in batches {
        let mut join_set = tokio::task::JoinSet::new();
        for account in batch.accounts {
            summary.processed += 1;
            let deps = deps.clone();
            join_set.spawn(async move { sync_one_account(deps, account, now).await });
        }

        let mut any_fetched = false;
        while let Some(result) = join_set.join_next().await {
            match result {
                Ok(fetched) => any_fetched |= fetched,
                Err(err) => {
                    summary.failed_accounts += 1;
                    tracing::error!(user_id = %batch.user_id, error = %err, "account sync task panicked");
                }
            }
        }

        if let Err(err) = deps.timeline_regenerator.regenerate(batch.user_id).await {
            tracing::error!(user_id = %batch.user_id, error = %err, "timeline regeneration failed");
        } else {
            summary.timelines_generated += 1;
        }

        if any_fetched {
            summary.updated_users += 1;
        }
    }

    summary
}

/// `RefreshOne` (§5, §7 user-visible failures): the caller acknowledges
/// immediately; this future is spawned by the caller as a detached
/// background task so it outlives the acknowledging response.
pub async fn refresh_one(deps: Arc<SchedulerDeps>, account_id: Uuid, now: DateTime<Utc>) -> Result<(), DomainError> {
    let Some(account) = deps.account_repo.find_by_id(account_id).await? else {
        return Err(DomainError::NotFound(format!("account {account_id}")));
    };
    let user_id = find_owning_user(&deps, &account).await?;
    sync_one_account(deps.clone(), account, now).await;
    deps.timeline_regenerator.regenerate(user_id).await
}

/// `RefreshAll` for every active account of one user.
pub async fn refresh_all(deps: Arc<SchedulerDeps>, user_id: Uuid, accounts: Vec<Account>, now: DateTime<Utc>) -> CronSummary {
    handle_cron(deps, vec![UserAccounts { user_id, accounts }], now).await
}

async fn find_owning_user(deps: &Arc<SchedulerDeps>, account: &Account) -> Result<Uuid, DomainError> {
    let profile = deps
        .profile_repo
        .find_by_id(account.profile_id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("profile {}", account.profile_id)))?;
    Ok(profile.owner_user_id)
}
