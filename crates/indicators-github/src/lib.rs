pub mod content;
mod http;
pub mod repo_client;
pub mod tree;
pub mod version;

pub use repo_client::GitHubRepoClient;
pub use version::HttpVersionSource;
