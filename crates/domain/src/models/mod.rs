pub mod account;
pub mod credential;
pub mod filter;
pub mod profile;
pub mod rate_limit;
pub mod snapshot;
pub mod timeline;
pub mod user;

pub use account::*;
pub use credential::*;
pub use filter::*;
pub use profile::*;
pub use rate_limit::*;
pub use snapshot::*;
pub use timeline::*;
pub use user::*;
