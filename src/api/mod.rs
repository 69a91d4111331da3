//! Remote catalog API.
//!
//! [`CatalogClient`] is the concrete page source for the feed and also
//! serves the item detail, episode and comment endpoints.

mod client;
mod types;

pub use client::{
    novel_page_url, validate_base_url, ApiError, CatalogClient, DEFAULT_BASE_URL, DEFAULT_TIMEOUT,
};
pub use types::{
    split_line_breaks, Comment, CommentSubmission, EpisodeBody, EpisodeDetail, EpisodeKey, Novel,
    NovelDetail, NovelId, ViewerCount,
};

/// Genre types offered by the catalog, in menu order.
pub const GENRES: &[&str] = &[
    "로맨스",
    "판타지",
    "현대",
    "무협",
    "SF",
    "시대/역사",
    "게임",
    "퓨전",
    "회귀물",
    "빙의",
    "먼치킨",
    "스포츠",
    "성인",
    "BL/백합",
    "기타",
];
