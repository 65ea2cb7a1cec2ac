//! HTTP adapters for every platform in the closed set (§4.1). Each struct
//! is constructed per-account by the caller (carrying the account's
//! tracked repos/subreddits) and implements the domain's
//! [`domain::services::providers::MultiStoreProvider`] or
//! [`domain::services::providers::SingleStoreProvider`] contract.

pub mod github;
pub mod linear;
pub mod mastodon;
pub mod reddit;
pub mod refresh;
pub mod twitter;
pub mod youtube;

pub use github::GitHubProvider;
pub use linear::LinearProvider;
pub use mastodon::MastodonProvider;
pub use reddit::RedditProvider;
pub use refresh::OAuthTokenRefresher;
pub use twitter::TwitterProvider;
pub use youtube::YouTubeProvider;
