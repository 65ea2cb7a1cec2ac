//! Twitter/X adapter: the microblog multi-store platform (§3, §4.1).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::errors::ProviderError;
use domain::models::snapshot::{PlatformMeta, ReferencedTweet, ReferencedTweetKind, Tweet};
use domain::services::providers::{classify_http_status, MultiStoreFetchResult, MultiStoreProvider};
use reqwest::Client;
use serde::Deserialize;

const PAGE_SIZE: usize = 100;
const BASE_URL: &str = "https://api.twitter.com/2";

pub struct TwitterProvider {
    client: Client,
}

impl TwitterProvider {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str, token: &str) -> Result<T, ProviderError> {
        let response = self
            .client
            .get(format!("{BASE_URL}{path}"))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let retry_after = response
                .headers()
                .get("x-rate-limit-reset")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(classify_http_status(status, retry_after));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))
    }

    async fn fetch_user(&self, path: &str, token: &str) -> Result<TwUserEnvelope, ProviderError> {
        self.get(path, token).await
    }

    async fn fetch_tweets_for_user(&self, user_id: &str, token: &str) -> Result<MultiStoreFetchResult, ProviderError> {
        let tweets: TwTweetsEnvelope = self
            .get(
                &format!(
                    "/users/{user_id}/tweets?max_results={}&tweet.fields=created_at,referenced_tweets,public_metrics,author_id",
                    self.page_size()
                ),
                token,
            )
            .await?;

        let mapped = tweets
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|t| {
                let referenced_tweets = t
                    .referenced_tweets
                    .unwrap_or_default()
                    .into_iter()
                    .map(|r| ReferencedTweet {
                        kind: match r.kind.as_str() {
                            "retweeted" => ReferencedTweetKind::Retweeted,
                            "quoted" => ReferencedTweetKind::Quoted,
                            _ => ReferencedTweetKind::RepliedTo,
                        },
                        id: r.id,
                    })
                    .collect();

                Tweet {
                    id: t.id,
                    author_handle: user_id.to_string(),
                    text: t.text,
                    url: format!("https://twitter.com/i/web/status/{}", t.id_for_url()),
                    created_at: t.created_at.unwrap_or_else(Utc::now),
                    in_reply_to_user_id: t.in_reply_to_user_id,
                    referenced_tweets,
                    retweet_count: t.public_metrics.as_ref().map(|m| m.retweet_count).unwrap_or(0),
                    quote_count: t.public_metrics.as_ref().map(|m| m.quote_count).unwrap_or(0),
                }
            })
            .collect();

        Ok(MultiStoreFetchResult {
            meta: PlatformMeta::Twitter {
                username: user_id.to_string(),
            },
            commits: Vec::new(),
            pull_requests: Vec::new(),
            posts: Vec::new(),
            comments: Vec::new(),
            tweets: mapped,
        })
    }
}

#[derive(Deserialize)]
struct TwUserEnvelope {
    data: TwUser,
}

#[derive(Deserialize)]
struct TwUser {
    id: String,
    username: String,
}

#[derive(Deserialize, Default)]
struct TwTweetsEnvelope {
    data: Option<Vec<TwTweet>>,
}

#[derive(Deserialize)]
struct TwTweet {
    id: String,
    text: String,
    created_at: Option<DateTime<Utc>>,
    in_reply_to_user_id: Option<String>,
    referenced_tweets: Option<Vec<TwReferencedTweet>>,
    public_metrics: Option<TwPublicMetrics>,
}

impl TwTweet {
    fn id_for_url(&self) -> &str {
        &self.id
    }
}

#[derive(Deserialize)]
struct TwReferencedTweet {
    #[serde(rename = "type")]
    kind: String,
    id: String,
}

#[derive(Deserialize)]
struct TwPublicMetrics {
    retweet_count: i64,
    quote_count: i64,
}

#[async_trait]
impl MultiStoreProvider for TwitterProvider {
    async fn fetch(&self, access_token: &str) -> Result<MultiStoreFetchResult, ProviderError> {
        let me = self.fetch_user("/users/me", access_token).await?;
        self.fetch_tweets_for_user(&me.data.id, access_token).await
    }

    async fn fetch_for_username(
        &self,
        access_token: &str,
        handle: &str,
    ) -> Result<MultiStoreFetchResult, ProviderError> {
        let user = self
            .fetch_user(&format!("/users/by/username/{handle}"), access_token)
            .await?;
        let mut result = self.fetch_tweets_for_user(&user.data.id, access_token).await?;
        result.meta = PlatformMeta::Twitter {
            username: user.data.username,
        };
        Ok(result)
    }

    fn page_size(&self) -> usize {
        PAGE_SIZE
    }
}
