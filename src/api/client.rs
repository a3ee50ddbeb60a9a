use chrono::{SecondsFormat, Utc};
use color_eyre::{eyre::eyre, Result};
use url::Url;

use crate::api::api_types::{CreateBlogBody, PageResponse};
use crate::api::types::{Blog, CreateBlogInput, Page};
use crate::config::Config;

/// Number of posts per page on the paginated endpoint.
pub const BLOGS_PER_PAGE: u32 = 5;

/// Blog service API client.
///
/// Stateless translation of the four REST operations into typed results.
/// Any non-success status becomes a generic failure naming the operation;
/// retries and caching live in the layer above.
#[derive(Clone)]
pub struct BlogClient {
  http: reqwest::Client,
  base_url: Url,
}

impl BlogClient {
  pub fn new(config: &Config) -> Result<Self> {
    let base_url = Url::parse(&config.api.url)
      .map_err(|e| eyre!("Invalid API url {}: {}", config.api.url, e))?;

    Ok(Self {
      http: reqwest::Client::new(),
      base_url,
    })
  }

  fn endpoint(&self, path: &str) -> Result<Url> {
    self
      .base_url
      .join(path)
      .map_err(|e| eyre!("Invalid endpoint {}: {}", path, e))
  }

  /// Fetch the full collection.
  pub async fn get_blogs(&self) -> Result<Vec<Blog>> {
    let url = self.endpoint("/blogs")?;

    let response = self
      .http
      .get(url)
      .send()
      .await
      .map_err(|e| eyre!("Failed to fetch blogs: {}", e))?;

    if !response.status().is_success() {
      return Err(eyre!("Failed to fetch blogs (status {})", response.status()));
    }

    response
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse blogs: {}", e))
  }

  /// Fetch one page of the collection.
  ///
  /// The endpoint answers with either a bare array or a `{data, pages}`
  /// envelope; both are normalized here.
  pub async fn get_blogs_page(&self, page: u32) -> Result<Page> {
    let mut url = self.endpoint("/blogs")?;
    url
      .query_pairs_mut()
      .append_pair("_page", &page.to_string())
      .append_pair("_per_page", &BLOGS_PER_PAGE.to_string());

    let response = self
      .http
      .get(url)
      .send()
      .await
      .map_err(|e| eyre!("Failed to fetch blogs page {}: {}", page, e))?;

    if !response.status().is_success() {
      return Err(eyre!(
        "Failed to fetch blogs page {} (status {})",
        page,
        response.status()
      ));
    }

    let body: PageResponse = response
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse blogs page {}: {}", page, e))?;

    Ok(body.into_page(page))
  }

  /// Fetch a single post by id. A 404 is the same generic failure as any
  /// other non-success status.
  pub async fn get_blog(&self, id: u64) -> Result<Blog> {
    let url = self.endpoint(&format!("/blogs/{}", id))?;

    let response = self
      .http
      .get(url)
      .send()
      .await
      .map_err(|e| eyre!("Failed to fetch blog {}: {}", id, e))?;

    if !response.status().is_success() {
      return Err(eyre!(
        "Failed to fetch blog {} (status {})",
        id,
        response.status()
      ));
    }

    response
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse blog {}: {}", id, e))
  }

  /// Publish a new post. The body is the author's input plus a creation
  /// timestamp; the service assigns `id` and its own `date` authority.
  pub async fn create_blog(&self, input: &CreateBlogInput) -> Result<Blog> {
    let url = self.endpoint("/blogs")?;
    let body = CreateBlogBody {
      input,
      date: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    };

    let response = self
      .http
      .post(url)
      .json(&body)
      .send()
      .await
      .map_err(|e| eyre!("Failed to create blog: {}", e))?;

    if !response.status().is_success() {
      return Err(eyre!(
        "Failed to create blog (status {})",
        response.status()
      ));
    }

    response
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse created blog: {}", e))
  }
}
