//! Profile Filter (C7, §4.7). Applied at read time, never persisted.

use std::collections::HashMap;

use uuid::Uuid;

use crate::models::filter::{FilterKey, FilterKind, ProfileFilter};
use crate::models::timeline::{DateEntry, DateGroup, TimelineItem, TimelineItemPayload};

fn matches(item: &TimelineItem, key: FilterKey, value: &str) -> bool {
    let value = value.to_ascii_lowercase();
    match key {
        FilterKey::Repo => item
            .payload
            .repo()
            .is_some_and(|r| r.eq_ignore_ascii_case(&value)),
        FilterKey::Subreddit => item
            .payload
            .subreddit()
            .is_some_and(|s| s.eq_ignore_ascii_case(&value)),
        FilterKey::TwitterAccount => item
            .payload
            .author_handle()
            .is_some_and(|h| h.eq_ignore_ascii_case(&value)),
        FilterKey::Keyword => {
            let title_hit = item.title.to_ascii_lowercase().contains(&value);
            let body_hit = item
                .payload
                .searchable_text()
                .is_some_and(|t| t.to_ascii_lowercase().contains(&value));
            title_hit || body_hit
        }
    }
}

/// Whether `item` survives the include/exclude rules scoped to its
/// account (§4.7 step 4). Accounts with no filters pass everything.
fn item_survives(item: &TimelineItem, filters_by_account: &HashMap<Uuid, Vec<&ProfileFilter>>) -> bool {
    let Some(filters) = filters_by_account.get(&item.account_id) else {
        return true;
    };

    let excludes: Vec<&&ProfileFilter> = filters.iter().filter(|f| f.kind == FilterKind::Exclude).collect();
    if excludes.iter().any(|f| matches(item, f.key, &f.value)) {
        return false;
    }

    let includes: Vec<&&ProfileFilter> = filters.iter().filter(|f| f.kind == FilterKind::Include).collect();
    if !includes.is_empty() && !includes.iter().any(|f| matches(item, f.key, &f.value)) {
        return false;
    }

    true
}

/// Applies §4.7's filtering, `before`/`limit` windowing to a full
/// timeline already restricted to the profile's own accounts (steps 2-3
/// are the caller's responsibility since they require store access).
pub fn apply_profile_filter(
    groups: Vec<DateGroup>,
    filters: &[ProfileFilter],
    before: Option<&str>,
    limit: Option<usize>,
) -> Vec<DateGroup> {
    let mut filters_by_account: HashMap<Uuid, Vec<&ProfileFilter>> = HashMap::new();
    for f in filters {
        filters_by_account.entry(f.account_id).or_default().push(f);
    }

    let mut filtered_groups: Vec<DateGroup> = groups
        .into_iter()
        .filter(|g| before.is_none_or(|b| g.date_key.as_str() < b))
        .filter_map(|group| filter_group(group, &filters_by_account))
        .collect();

    if let Some(limit) = limit {
        filtered_groups = apply_item_limit(filtered_groups, limit);
    }

    filtered_groups
}

fn filter_group(
    group: DateGroup,
    filters_by_account: &HashMap<Uuid, Vec<&ProfileFilter>>,
) -> Option<DateGroup> {
    let entries: Vec<DateEntry> = group
        .entries
        .into_iter()
        .filter_map(|entry| filter_entry(entry, filters_by_account))
        .collect();

    if entries.is_empty() {
        None
    } else {
        Some(DateGroup {
            date_key: group.date_key,
            entries,
        })
    }
}

fn filter_entry(
    entry: DateEntry,
    filters_by_account: &HashMap<Uuid, Vec<&ProfileFilter>>,
) -> Option<DateEntry> {
    match entry {
        DateEntry::Item(item) => {
            if item_survives(&item, filters_by_account) {
                Some(DateEntry::Item(item))
            } else {
                None
            }
        }
        DateEntry::CommitGroup(mut group) => {
            group.commits.retain(|c| item_survives(c, filters_by_account));
            if group.commits.is_empty() {
                return None;
            }
            let (additions, deletions, files) =
                crate::models::timeline::CommitGroup::recompute_totals(&group.commits);
            group.total_additions = additions;
            group.total_deletions = deletions;
            group.total_files_changed = files;
            Some(DateEntry::CommitGroup(group))
        }
    }
}

/// §4.7 step 6: consume whole groups until adding another would exceed
/// `limit` items, then include one truncated tail group.
fn apply_item_limit(groups: Vec<DateGroup>, limit: usize) -> Vec<DateGroup> {
    let mut result = Vec::new();
    let mut consumed = 0usize;

    for group in groups {
        let group_size = entries_item_count(&group);
        if consumed + group_size <= limit {
            consumed += group_size;
            result.push(group);
            continue;
        }

        let remaining = limit.saturating_sub(consumed);
        if remaining > 0 {
            result.push(truncate_group(group, remaining));
        }
        break;
    }

    result
}

fn entries_item_count(group: &DateGroup) -> usize {
    group
        .entries
        .iter()
        .map(|e| match e {
            DateEntry::Item(_) => 1,
            DateEntry::CommitGroup(g) => g.commits.len(),
        })
        .sum()
}

fn truncate_group(group: DateGroup, remaining: usize) -> DateGroup {
    let mut taken = 0usize;
    let mut entries = Vec::new();

    for entry in group.entries {
        if taken >= remaining {
            break;
        }
        match entry {
            DateEntry::Item(item) => {
                entries.push(DateEntry::Item(item));
                taken += 1;
            }
            DateEntry::CommitGroup(mut commit_group) => {
                let take_n = (remaining - taken).min(commit_group.commits.len());
                commit_group.commits.truncate(take_n);
                let (additions, deletions, files) =
                    crate::models::timeline::CommitGroup::recompute_totals(&commit_group.commits);
                commit_group.total_additions = additions;
                commit_group.total_deletions = deletions;
                commit_group.total_files_changed = files;
                taken += take_n;
                entries.push(DateEntry::CommitGroup(commit_group));
            }
        }
    }

    DateGroup {
        date_key: group.date_key,
        entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::timeline::{CommitItemPayload, PostItemPayload};
    use chrono::Utc;

    fn post_item(account_id: Uuid, subreddit: &str) -> TimelineItem {
        TimelineItem {
            id: "reddit:post:1".into(),
            platform: crate::models::account::Platform::Reddit,
            timestamp: Utc::now(),
            title: "hello world".into(),
            url: "https://example.test".into(),
            payload: TimelineItemPayload::Post(PostItemPayload {
                subreddit: subreddit.into(),
                content: "body".into(),
                has_media: false,
                score: 1,
                num_comments: 0,
            }),
            account_id,
        }
    }

    fn commit_item(account_id: Uuid, repo: &str) -> TimelineItem {
        TimelineItem {
            id: "github:commit:abc".into(),
            platform: crate::models::account::Platform::GitHub,
            timestamp: Utc::now(),
            title: "fix bug".into(),
            url: "https://example.test".into(),
            payload: TimelineItemPayload::Commit(CommitItemPayload {
                sha: "abc".into(),
                message: "fix bug".into(),
                repo: repo.into(),
                branch: "main".into(),
                additions: 1,
                deletions: 1,
                files_changed: 1,
            }),
            account_id,
        }
    }

    #[test]
    fn exclude_filter_drops_matching_item() {
        let account_id = Uuid::new_v4();
        let filters = vec![ProfileFilter {
            id: Uuid::new_v4(),
            profile_id: Uuid::new_v4(),
            account_id,
            kind: FilterKind::Exclude,
            key: FilterKey::Subreddit,
            value: "rust".into(),
        }];
        let groups = vec![DateGroup {
            date_key: "2026-01-05".into(),
            entries: vec![DateEntry::Item(post_item(account_id, "rust"))],
        }];
        let filtered = apply_profile_filter(groups, &filters, None, None);
        assert!(filtered.is_empty());
    }

    #[test]
    fn include_filter_keeps_only_matching_items() {
        let account_id = Uuid::new_v4();
        let filters = vec![ProfileFilter {
            id: Uuid::new_v4(),
            profile_id: Uuid::new_v4(),
            account_id,
            kind: FilterKind::Include,
            key: FilterKey::Subreddit,
            value: "rust".into(),
        }];
        let groups = vec![DateGroup {
            date_key: "2026-01-05".into(),
            entries: vec![
                DateEntry::Item(post_item(account_id, "rust")),
                DateEntry::Item(post_item(account_id, "golang")),
            ],
        }];
        let filtered = apply_profile_filter(groups, &filters, None, None);
        assert_eq!(filtered[0].entries.len(), 1);
    }

    #[test]
    fn commit_group_drops_when_all_commits_filtered_out() {
        let account_id = Uuid::new_v4();
        let filters = vec![ProfileFilter {
            id: Uuid::new_v4(),
            profile_id: Uuid::new_v4(),
            account_id,
            kind: FilterKind::Exclude,
            key: FilterKey::Repo,
            value: "o/r".into(),
        }];
        let group = crate::models::timeline::CommitGroup {
            repo: "o/r".into(),
            branch: "main".into(),
            date: "2026-01-05".into(),
            commits: vec![commit_item(account_id, "o/r")],
            total_additions: 1,
            total_deletions: 1,
            total_files_changed: 1,
        };
        let groups = vec![DateGroup {
            date_key: "2026-01-05".into(),
            entries: vec![DateEntry::CommitGroup(group)],
        }];
        let filtered = apply_profile_filter(groups, &filters, None, None);
        assert!(filtered.is_empty());
    }

    #[test]
    fn before_filter_is_strict_less_than() {
        let groups = vec![
            DateGroup {
                date_key: "2026-01-05".into(),
                entries: vec![DateEntry::Item(post_item(Uuid::new_v4(), "rust"))],
            },
            DateGroup {
                date_key: "2026-01-01".into(),
                entries: vec![DateEntry::Item(post_item(Uuid::new_v4(), "rust"))],
            },
        ];
        let filtered = apply_profile_filter(groups, &[], Some("2026-01-05"), None);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].date_key, "2026-01-01");
    }

    #[test]
    fn limit_truncates_mid_group() {
        let account_id = Uuid::new_v4();
        let group = crate::models::timeline::CommitGroup {
            repo: "o/r".into(),
            branch: "main".into(),
            date: "2026-01-05".into(),
            commits: vec![
                commit_item(account_id, "o/r"),
                commit_item(account_id, "o/r"),
                commit_item(account_id, "o/r"),
            ],
            total_additions: 3,
            total_deletions: 3,
            total_files_changed: 3,
        };
        let groups = vec![DateGroup {
            date_key: "2026-01-05".into(),
            entries: vec![DateEntry::CommitGroup(group)],
        }];
        let filtered = apply_profile_filter(groups, &[], None, Some(2));
        match &filtered[0].entries[0] {
            DateEntry::CommitGroup(g) => assert_eq!(g.commits.len(), 2),
            _ => panic!("expected commit group"),
        }
    }
}
