//! Serde shapes matching the blog service's wire format.
//!
//! The paginated endpoint answers with either a bare JSON array or an
//! envelope carrying the total page count. That union is decoded exactly once
//! here; everything downstream only ever sees a normalized [`Page`].

use serde::{Deserialize, Serialize};

use super::types::{Blog, CreateBlogInput, Page};

/// Response body of `GET /blogs?_page=..&_per_page=..`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PageResponse {
  Envelope { data: Vec<Blog>, pages: u32 },
  Bare(Vec<Blog>),
}

impl PageResponse {
  /// Normalize into a [`Page`] for the requested page index.
  ///
  /// A bare array carries no page count and is treated as a single page.
  pub fn into_page(self, page: u32) -> Page {
    let (blogs, pages) = match self {
      PageResponse::Envelope { data, pages } => (data, pages),
      PageResponse::Bare(blogs) => (blogs, 1),
    };
    Page {
      blogs,
      next_page: (page < pages).then_some(page + 1),
    }
  }
}

/// Body of `POST /blogs`: the author's input plus a creation timestamp in the
/// service's format.
#[derive(Debug, Serialize)]
pub struct CreateBlogBody<'a> {
  #[serde(flatten)]
  pub input: &'a CreateBlogInput,
  pub date: String,
}
