//! Reddit adapter: the social-A multi-store platform (§3, §4.1).

use async_trait::async_trait;
use domain::errors::ProviderError;
use domain::models::snapshot::{Comment, Post, PlatformMeta};
use domain::services::providers::{classify_http_status, MultiStoreFetchResult, MultiStoreProvider};
use reqwest::Client;
use serde::Deserialize;

const PAGE_SIZE: usize = 100;
const BASE_URL: &str = "https://oauth.reddit.com";

pub struct RedditProvider {
    client: Client,
}

impl RedditProvider {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str, token: &str) -> Result<T, ProviderError> {
        let response = self
            .client
            .get(format!("{BASE_URL}{path}"))
            .header("Authorization", format!("Bearer {token}"))
            .header("User-Agent", "aggregator:v1")
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(classify_http_status(status, None));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))
    }
}

#[derive(Deserialize)]
struct RedditMe {
    name: String,
}

#[derive(Deserialize)]
struct RedditListing<T> {
    data: RedditListingData<T>,
}

#[derive(Deserialize)]
struct RedditListingData<T> {
    children: Vec<RedditChild<T>>,
}

#[derive(Deserialize)]
struct RedditChild<T> {
    data: T,
}

#[derive(Deserialize)]
struct RedditSubreddit {
    display_name: String,
}

#[derive(Deserialize)]
struct RedditPostData {
    id: String,
    subreddit: String,
    title: String,
    url: String,
    selftext: String,
    created_utc: f64,
    score: i64,
    num_comments: i64,
}

#[derive(Deserialize)]
struct RedditCommentData {
    id: String,
    subreddit: String,
    link_id: String,
    link_title: Option<String>,
    link_url: Option<String>,
    is_submitter: bool,
    body: String,
    created_utc: f64,
    permalink: String,
}

#[async_trait]
impl MultiStoreProvider for RedditProvider {
    async fn fetch(&self, access_token: &str) -> Result<MultiStoreFetchResult, ProviderError> {
        let me: RedditMe = self.get("/api/v1/me", access_token).await?;

        let subscribed: RedditListing<RedditSubreddit> = self
            .get(
                &format!("/subreddits/mine/subscriber?limit={}", self.page_size()),
                access_token,
            )
            .await?;
        let subreddits = subscribed
            .data
            .children
            .into_iter()
            .map(|c| c.data.display_name)
            .collect();

        let submitted: RedditListing<RedditPostData> = self
            .get(
                &format!("/user/{}/submitted?limit={}", me.name, self.page_size()),
                access_token,
            )
            .await?;
        let posts = submitted
            .data
            .children
            .into_iter()
            .map(|c| Post {
                id: c.data.id,
                subreddit: c.data.subreddit,
                title: c.data.title,
                url: c.data.url,
                content: c.data.selftext,
                created_utc: c.data.created_utc as i64,
                score: c.data.score,
                num_comments: c.data.num_comments,
            })
            .collect();

        let commented: RedditListing<RedditCommentData> = self
            .get(
                &format!("/user/{}/comments?limit={}", me.name, self.page_size()),
                access_token,
            )
            .await?;
        let comments = commented
            .data
            .children
            .into_iter()
            .map(|c| Comment {
                id: c.data.id,
                subreddit: c.data.subreddit,
                parent_post_id: c.data.link_id,
                parent_post_title: c.data.link_title.unwrap_or_default(),
                parent_post_url: c.data.link_url.unwrap_or_default(),
                is_op: c.data.is_submitter,
                content: c.data.body,
                created_utc: c.data.created_utc as i64,
                url: format!("https://reddit.com{}", c.data.permalink),
            })
            .collect();

        Ok(MultiStoreFetchResult {
            meta: PlatformMeta::Reddit {
                username: me.name,
                subreddits,
            },
            commits: Vec::new(),
            pull_requests: Vec::new(),
            posts,
            comments,
            tweets: Vec::new(),
        })
    }

    fn page_size(&self) -> usize {
        PAGE_SIZE
    }
}
