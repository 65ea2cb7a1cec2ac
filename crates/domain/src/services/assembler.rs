//! Timeline Assembler (C6, §4.6). Pure functions over already-loaded
//! per-account snapshot contents; no I/O.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::account::Platform;
use crate::models::snapshot::{Comment, Commit, Post, PullRequest, Tweet};
use crate::models::timeline::{
    CommentItemPayload, CommitGroup, CommitItemPayload, DateEntry, DateGroup, PostItemPayload,
    PullRequestCommitRef, PullRequestItemPayload, TimelineItem, TimelineItemPayload,
    TimelineSnapshotPayload, TweetItemPayload,
};

const COMMIT_TITLE_MAX_CHARS: usize = 100;
const POST_CONTENT_MAX_CHARS: usize = 200;

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}

fn looks_like_media_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.contains("i.redd.it")
        || lower.contains("v.redd.it")
        || lower.ends_with(".jpg")
        || lower.ends_with(".jpeg")
        || lower.ends_with(".png")
        || lower.ends_with(".gif")
        || lower.ends_with(".gifv")
        || lower.ends_with(".mp4")
}

/// Everything the Assembler needs for one user, already loaded from the
/// latest per-account snapshots (§4.6 steps 1-2). `other_items` carries
/// the pre-normalized items for single-store platforms (social-B,
/// video-host, task-tracker), which have no commit/PR dedup step.
#[derive(Debug, Clone, Default)]
pub struct AssemblerInput {
    pub commits: Vec<(Uuid, Platform, Commit)>,
    pub pull_requests: Vec<(Uuid, Platform, PullRequest)>,
    pub posts: Vec<(Uuid, Platform, Post)>,
    pub comments: Vec<(Uuid, Platform, Comment)>,
    pub tweets: Vec<(Uuid, Platform, Tweet)>,
    pub other_items: Vec<TimelineItem>,
}

fn normalize_commit(account_id: Uuid, platform: Platform, commit: &Commit) -> TimelineItem {
    let short_sha = commit.sha.chars().take(7).collect::<String>();
    TimelineItem {
        id: format!("{}:commit:{}:{}", platform.as_str(), commit.repo, short_sha),
        platform,
        timestamp: commit.author_date,
        title: truncate(&commit.message, COMMIT_TITLE_MAX_CHARS),
        url: commit.url.clone(),
        payload: TimelineItemPayload::Commit(CommitItemPayload {
            sha: commit.sha.clone(),
            message: commit.message.clone(),
            repo: commit.repo.clone(),
            branch: commit.branch.clone(),
            additions: commit.additions,
            deletions: commit.deletions,
            files_changed: commit.files_changed,
        }),
        account_id,
    }
}

fn normalize_pull_request(
    account_id: Uuid,
    platform: Platform,
    pr: &PullRequest,
    commits_by_sha: &HashMap<&str, &Commit>,
) -> TimelineItem {
    let resolved_commits: Vec<PullRequestCommitRef> = pr
        .commit_shas
        .iter()
        .filter_map(|sha| {
            commits_by_sha.get(sha.as_str()).map(|c| PullRequestCommitRef {
                sha: c.sha.clone(),
                message: c.message.clone(),
                url: c.url.clone(),
            })
        })
        .collect();

    let timestamp = pr.merged_at.unwrap_or(pr.updated_at);

    TimelineItem {
        id: format!("{}:pr:{}:{}", platform.as_str(), pr.repo, pr.number),
        platform,
        timestamp,
        title: pr.title.clone(),
        url: pr.url.clone(),
        payload: TimelineItemPayload::PullRequest(PullRequestItemPayload {
            repo: pr.repo.clone(),
            number: pr.number,
            commits: resolved_commits,
            merge_commit_sha: pr.merge_commit_sha.clone(),
        }),
        account_id,
    }
}

fn normalize_post(account_id: Uuid, platform: Platform, post: &Post) -> TimelineItem {
    let timestamp = DateTime::from_timestamp(post.created_utc, 0).unwrap_or_else(Utc::now);

    TimelineItem {
        id: format!("{}:post:{}", platform.as_str(), post.id),
        platform,
        timestamp,
        title: post.title.clone(),
        url: post.url.clone(),
        payload: TimelineItemPayload::Post(PostItemPayload {
            subreddit: post.subreddit.clone(),
            content: truncate(&post.content, POST_CONTENT_MAX_CHARS),
            has_media: looks_like_media_url(&post.url),
            score: post.score,
            num_comments: post.num_comments,
        }),
        account_id,
    }
}

fn normalize_comment(account_id: Uuid, platform: Platform, comment: &Comment) -> TimelineItem {
    let timestamp = DateTime::from_timestamp(comment.created_utc, 0).unwrap_or_else(Utc::now);

    TimelineItem {
        id: format!("{}:comment:{}", platform.as_str(), comment.id),
        platform,
        timestamp,
        title: format!("Comment on {}", comment.parent_post_title),
        url: comment.url.clone(),
        payload: TimelineItemPayload::Comment(CommentItemPayload {
            subreddit: comment.subreddit.clone(),
            content: truncate(&comment.content, POST_CONTENT_MAX_CHARS),
            parent_post_title: comment.parent_post_title.clone(),
            parent_post_url: comment.parent_post_url.clone(),
            is_op: comment.is_op,
        }),
        account_id,
    }
}

fn normalize_tweet(account_id: Uuid, platform: Platform, tweet: &Tweet) -> TimelineItem {
    use crate::models::snapshot::ReferencedTweetKind;

    let is_repost = tweet
        .referenced_tweets
        .iter()
        .any(|r| r.kind == ReferencedTweetKind::Retweeted);
    let repost_count = tweet.retweet_count + tweet.quote_count;

    TimelineItem {
        id: format!("{}:tweet:{}", platform.as_str(), tweet.id),
        platform,
        timestamp: tweet.created_at,
        title: truncate(&tweet.text, COMMIT_TITLE_MAX_CHARS),
        url: tweet.url.clone(),
        payload: TimelineItemPayload::Tweet(TweetItemPayload {
            author_handle: tweet.author_handle.clone(),
            content: tweet.text.clone(),
            is_reply: tweet.in_reply_to_user_id.is_some(),
            is_repost,
            repost_count,
        }),
        account_id,
    }
}

fn date_key(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d").to_string()
}

fn group_orphan_commits(commits: Vec<TimelineItem>) -> Vec<CommitGroup> {
    let mut buckets: HashMap<(String, String, String), Vec<TimelineItem>> = HashMap::new();
    let mut order: Vec<(String, String, String)> = Vec::new();

    for item in commits {
        let repo = item.payload.repo().unwrap_or_default().to_string();
        let key = (repo, commit_branch(&item), date_key(item.timestamp));
        if !buckets.contains_key(&key) {
            order.push(key.clone());
        }
        buckets.entry(key).or_default().push(item);
    }

    order
        .into_iter()
        .map(|key| {
            let mut items = buckets.remove(&key).unwrap();
            items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            let (total_additions, total_deletions, total_files_changed) =
                CommitGroup::recompute_totals(&items);
            CommitGroup {
                repo: key.0,
                branch: key.1,
                date: key.2,
                commits: items,
                total_additions,
                total_deletions,
                total_files_changed,
            }
        })
        .collect()
}

fn commit_branch(item: &TimelineItem) -> String {
    match &item.payload {
        TimelineItemPayload::Commit(c) => c.branch.clone(),
        _ => String::new(),
    }
}

/// `CombineUserTimeline` (§4.6). Returns the full pipeline's output; the
/// caller is responsible for persisting it as `timeline/<user>` with
/// parents set to every source raw snapshot (§4.6 step 7, handled by the
/// scheduler/account-processor layer which has store access).
pub fn combine_user_timeline(input: AssemblerInput, now: DateTime<Utc>) -> TimelineSnapshotPayload {
    let commits_by_sha: HashMap<&str, &Commit> = input
        .commits
        .iter()
        .map(|(_, _, c)| (c.sha.as_str(), c))
        .collect();

    let pr_commit_set: HashSet<&str> = input
        .pull_requests
        .iter()
        .flat_map(|(_, _, pr)| {
            pr.commit_shas
                .iter()
                .map(|s| s.as_str())
                .chain(pr.merge_commit_sha.as_deref())
        })
        .collect();

    let orphan_commit_items: Vec<TimelineItem> = input
        .commits
        .iter()
        .filter(|(_, _, c)| !pr_commit_set.contains(c.sha.as_str()))
        .map(|(account_id, platform, c)| normalize_commit(*account_id, *platform, c))
        .collect();

    let pr_items: Vec<TimelineItem> = input
        .pull_requests
        .iter()
        .map(|(account_id, platform, pr)| {
            normalize_pull_request(*account_id, *platform, pr, &commits_by_sha)
        })
        .collect();

    let post_items: Vec<TimelineItem> = input
        .posts
        .iter()
        .map(|(account_id, platform, post)| normalize_post(*account_id, *platform, post))
        .collect();

    let comment_items: Vec<TimelineItem> = input
        .comments
        .iter()
        .map(|(account_id, platform, comment)| normalize_comment(*account_id, *platform, comment))
        .collect();

    let tweet_items: Vec<TimelineItem> = input
        .tweets
        .iter()
        .map(|(account_id, platform, tweet)| normalize_tweet(*account_id, *platform, tweet))
        .collect();

    let commit_groups = group_orphan_commits(orphan_commit_items);

    let mut standalone_items = Vec::new();
    standalone_items.extend(pr_items);
    standalone_items.extend(post_items);
    standalone_items.extend(comment_items);
    standalone_items.extend(tweet_items);
    standalone_items.extend(input.other_items);

    let mut buckets: HashMap<String, Vec<DateEntry>> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for group in commit_groups {
        let key = group.date.clone();
        if !buckets.contains_key(&key) {
            order.push(key.clone());
        }
        buckets.entry(key).or_default().push(DateEntry::CommitGroup(group));
    }
    for item in standalone_items {
        let key = date_key(item.timestamp);
        if !buckets.contains_key(&key) {
            order.push(key.clone());
        }
        buckets.entry(key).or_default().push(DateEntry::Item(item));
    }

    order.sort_unstable();
    order.reverse();
    order.dedup();

    let groups: Vec<DateGroup> = order
        .into_iter()
        .map(|date_key| {
            let mut entries = buckets.remove(&date_key).unwrap();
            entries.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
            DateGroup { date_key, entries }
        })
        .collect();

    TimelineSnapshotPayload {
        generated_at: now,
        groups,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::snapshot::ReferencedTweet;

    fn commit(sha: &str, repo: &str, branch: &str, hour: u32) -> Commit {
        Commit {
            sha: sha.to_string(),
            message: format!("commit {sha}"),
            repo: repo.to_string(),
            branch: branch.to_string(),
            author_date: "2026-01-05T00:00:00Z"
                .parse::<DateTime<Utc>>()
                .unwrap()
                .with_hour(hour)
                .unwrap(),
            url: format!("https://example.test/{sha}"),
            additions: 1,
            deletions: 1,
            files_changed: 1,
        }
    }

    use chrono::Timelike;

    #[test]
    fn orphan_commits_are_grouped_by_repo_branch_date() {
        let account_id = Uuid::new_v4();
        let input = AssemblerInput {
            commits: vec![
                (account_id, Platform::GitHub, commit("aaa1111", "o/r", "main", 9)),
                (account_id, Platform::GitHub, commit("bbb2222", "o/r", "main", 14)),
            ],
            ..Default::default()
        };
        let payload = combine_user_timeline(input, Utc::now());
        assert_eq!(payload.groups.len(), 1);
        assert_eq!(payload.groups[0].entries.len(), 1);
        match &payload.groups[0].entries[0] {
            DateEntry::CommitGroup(group) => {
                assert_eq!(group.commits.len(), 2);
                assert_eq!(group.commits[0].payload, group.commits[0].payload);
                assert_eq!(group.total_additions, 2);
            }
            _ => panic!("expected a commit group"),
        }
    }

    #[test]
    fn commits_referenced_by_a_pr_are_not_orphaned() {
        let account_id = Uuid::new_v4();
        let pr = PullRequest {
            number: 42,
            repo: "o/r".to_string(),
            title: "Add feature".to_string(),
            url: "https://example.test/pr/42".to_string(),
            commit_shas: vec!["aaa1111".to_string()],
            merge_commit_sha: None,
            merged_at: Some(Utc::now()),
            updated_at: Utc::now(),
        };
        let input = AssemblerInput {
            commits: vec![(account_id, Platform::GitHub, commit("aaa1111", "o/r", "main", 9))],
            pull_requests: vec![(account_id, Platform::GitHub, pr)],
            ..Default::default()
        };
        let payload = combine_user_timeline(input, Utc::now());
        let total_entries: usize = payload.groups.iter().map(|g| g.entries.len()).sum();
        assert_eq!(total_entries, 1);
        match &payload.groups[0].entries[0] {
            DateEntry::Item(item) => match &item.payload {
                TimelineItemPayload::PullRequest(pr) => assert_eq!(pr.commits.len(), 1),
                _ => panic!("expected a pull request item"),
            },
            _ => panic!("expected a standalone item"),
        }
    }

    #[test]
    fn empty_input_yields_empty_groups() {
        let payload = combine_user_timeline(AssemblerInput::default(), Utc::now());
        assert!(payload.groups.is_empty());
    }

    #[test]
    fn tweet_marked_as_repost_when_referencing_a_retweet() {
        let account_id = Uuid::new_v4();
        let tweet = Tweet {
            id: "1".to_string(),
            author_handle: "alice".to_string(),
            text: "hello".to_string(),
            url: "https://example.test/tweet/1".to_string(),
            created_at: Utc::now(),
            in_reply_to_user_id: None,
            referenced_tweets: vec![ReferencedTweet {
                kind: crate::models::snapshot::ReferencedTweetKind::Retweeted,
                id: "0".to_string(),
            }],
            retweet_count: 3,
            quote_count: 2,
        };
        let input = AssemblerInput {
            tweets: vec![(account_id, Platform::Twitter, tweet)],
            ..Default::default()
        };
        let payload = combine_user_timeline(input, Utc::now());
        match &payload.groups[0].entries[0] {
            DateEntry::Item(item) => match &item.payload {
                TimelineItemPayload::Tweet(t) => {
                    assert!(t.is_repost);
                    assert_eq!(t.repost_count, 5);
                }
                _ => panic!("expected a tweet item"),
            },
            _ => panic!("expected a standalone item"),
        }
    }
}
