//! Wire types for the catalog API.
//!
//! Every endpoint wraps its payload in `{"data": ...}`. Identifiers arrive as
//! JSON numbers from some endpoints and strings from others, so they are
//! normalized to strings on the way in.

use crate::feed::Record;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Response envelope shared by all endpoints.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: Option<T>,
}

/// Stable identifier of a novel, as the server spells it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NovelId(pub String);

impl fmt::Display for NovelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NovelId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<u64> for NovelId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl<'de> Deserialize<'de> for NovelId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        string_or_number(deserializer).map(NovelId)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Unsigned(u64),
    Signed(i64),
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s,
        StringOrNumber::Unsigned(n) => n.to_string(),
        StringOrNumber::Signed(n) => n.to_string(),
    })
}

/// One catalog entry. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Novel {
    pub id: NovelId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub img: Option<String>,
}

impl Record for Novel {
    type Id = NovelId;

    fn id(&self) -> NovelId {
        self.id.clone()
    }
}

/// View count for one episode on the detail page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ViewerCount {
    pub episode_no: u32,
    #[serde(default)]
    pub viewer_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NovelDetail {
    pub id: NovelId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub img: Option<String>,
    #[serde(default)]
    pub viewer_counts: Vec<ViewerCount>,
}

impl NovelDetail {
    /// Episodes newest first.
    pub fn sort_episodes(&mut self) {
        self.viewer_counts
            .sort_by(|a, b| b.episode_no.cmp(&a.episode_no));
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EpisodeBody {
    #[serde(default)]
    pub episode_titles: Option<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub comment: String,
}

/// Payload of `episodedetail/{id}/{episode}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EpisodeDetail {
    pub episode: EpisodeBody,
    #[serde(default)]
    pub episode_count: u32,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub comments: Vec<Comment>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Where an episode sits, used to key the reader.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EpisodeKey {
    pub novel_id: NovelId,
    pub episode_no: u32,
}

impl EpisodeKey {
    pub fn new(novel_id: NovelId, episode_no: u32) -> Self {
        Self {
            novel_id,
            episode_no,
        }
    }

    pub fn previous(&self) -> Option<Self> {
        (self.episode_no > 1).then(|| Self::new(self.novel_id.clone(), self.episode_no - 1))
    }

    /// Next episode, if `episode_count` says there is one.
    pub fn next(&self, episode_count: u32) -> Option<Self> {
        (self.episode_no < episode_count)
            .then(|| Self::new(self.novel_id.clone(), self.episode_no + 1))
    }
}

impl EpisodeDetail {
    pub fn heading(&self, episode_no: u32) -> String {
        match self.episode.episode_titles.as_deref() {
            Some(titles) if !titles.trim().is_empty() => {
                format!("Episode {} - {}", episode_no, titles)
            }
            _ => format!("Episode {}", episode_no),
        }
    }

    /// Body split on `\r\n`, `\r` or `\n`.
    pub fn body_lines(&self) -> Vec<&str> {
        split_line_breaks(&self.episode.description)
    }
}

pub fn split_line_breaks(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = text;
    while let Some(pos) = rest.find(['\r', '\n']) {
        lines.push(&rest[..pos]);
        let skip = if rest[pos..].starts_with("\r\n") { 2 } else { 1 };
        rest = &rest[pos + skip..];
    }
    lines.push(rest);
    lines
}

/// Body of `POST submitcomment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentSubmission {
    pub name: String,
    pub email: String,
    pub comment: String,
    #[serde(rename = "episodeId")]
    pub episode_id: String,
    pub id: String,
}

impl CommentSubmission {
    pub fn new(key: &EpisodeKey, name: &str, email: &str, comment: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            comment: comment.to_string(),
            episode_id: key.episode_no.to_string(),
            id: key.novel_id.0.clone(),
        }
    }

    /// Name of the first blank field, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.name.trim().is_empty() {
            Some("name")
        } else if self.email.trim().is_empty() {
            Some("email")
        } else if self.comment.trim().is_empty() {
            Some("comment")
        } else {
            None
        }
    }

    /// What the comment list shows right after a successful post.
    pub fn echo(&self) -> Comment {
        Comment {
            name: self.name.clone(),
            comment: self.comment.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_novel_id_accepts_number_or_string() {
        let a: Novel = serde_json::from_str(r#"{"id": 42, "title": "A"}"#).unwrap();
        let b: Novel = serde_json::from_str(r#"{"id": "42", "title": "A"}"#).unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.id.to_string(), "42");
    }

    #[test]
    fn test_novel_ignores_unknown_fields() {
        let novel: Novel =
            serde_json::from_str(r#"{"id": 1, "title": "T", "img": null, "extra": [1,2]}"#)
                .unwrap();
        assert_eq!(novel.img, None);
    }

    #[test]
    fn test_envelope_null_data() {
        let env: Envelope<Vec<Novel>> = serde_json::from_str(r#"{"data": null}"#).unwrap();
        assert!(env.data.is_none());
        let env: Envelope<Vec<Novel>> = serde_json::from_str("{}").unwrap();
        assert!(env.data.is_none());
    }

    #[test]
    fn test_detail_sorts_episodes_descending() {
        let mut detail: NovelDetail = serde_json::from_str(
            r#"{"id": 7, "title": "T", "description": "d",
                "viewer_counts": [{"episode_no": 1, "viewer_count": 10},
                                  {"episode_no": 3, "viewer_count": 4},
                                  {"episode_no": 2, "viewer_count": 8}]}"#,
        )
        .unwrap();
        detail.sort_episodes();
        let order: Vec<u32> = detail.viewer_counts.iter().map(|v| v.episode_no).collect();
        assert_eq!(order, vec![3, 2, 1]);
    }

    #[test]
    fn test_episode_heading() {
        let mut ep: EpisodeDetail = serde_json::from_str(
            r#"{"episode": {"episode_titles": null, "description": "x"},
                "episode_count": 3, "count": 1, "title": "N", "comments": null}"#,
        )
        .unwrap();
        assert_eq!(ep.heading(2), "Episode 2");
        assert!(ep.comments.is_empty());
        ep.episode.episode_titles = Some("The Gate".into());
        assert_eq!(ep.heading(2), "Episode 2 - The Gate");
    }

    #[test]
    fn test_split_line_breaks_handles_all_styles() {
        assert_eq!(split_line_breaks("a\r\nb\rc\nd"), vec!["a", "b", "c", "d"]);
        assert_eq!(split_line_breaks("one"), vec!["one"]);
        assert_eq!(split_line_breaks("x\n\ny"), vec!["x", "", "y"]);
    }

    #[test]
    fn test_episode_key_navigation() {
        let key = EpisodeKey::new(NovelId::from(5u64), 1);
        assert!(key.previous().is_none());
        assert_eq!(key.next(3).map(|k| k.episode_no), Some(2));

        let last = EpisodeKey::new(NovelId::from(5u64), 3);
        assert_eq!(last.previous().map(|k| k.episode_no), Some(2));
        assert!(last.next(3).is_none());
    }

    #[test]
    fn test_comment_submission_wire_shape() {
        let key = EpisodeKey::new(NovelId::from("12"), 4);
        let sub = CommentSubmission::new(&key, "kim", "k@example.com", "great");
        let json = serde_json::to_value(&sub).unwrap();
        assert_eq!(json["episodeId"], "4");
        assert_eq!(json["id"], "12");
        assert_eq!(json["name"], "kim");
        assert!(sub.missing_field().is_none());
    }

    #[test]
    fn test_comment_submission_requires_all_fields() {
        let key = EpisodeKey::new(NovelId::from("1"), 1);
        assert_eq!(
            CommentSubmission::new(&key, " ", "e", "c").missing_field(),
            Some("name")
        );
        assert_eq!(
            CommentSubmission::new(&key, "n", "", "c").missing_field(),
            Some("email")
        );
        assert_eq!(
            CommentSubmission::new(&key, "n", "e", "\n").missing_field(),
            Some("comment")
        );
    }
}
