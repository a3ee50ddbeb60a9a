//! Typed client for the blog REST service, plus its caching wrapper.

mod api_types;
mod cached_client;
mod client;
mod keys;
pub mod types;

pub use cached_client::CachedBlogClient;
