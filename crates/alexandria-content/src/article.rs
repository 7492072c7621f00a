//! The resolved content model: articles, categories, and what a path
//! resolves to.

use alexandria_types::{ContentPath, Timestamp};
use serde::Serialize;

use crate::codec::{self, CodecError, Metadata};

/// A single wiki page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Article {
    pub path: ContentPath,
    pub metadata: Metadata,
    /// Raw Markdown body, stored verbatim.
    pub content: Vec<u8>,
}

impl Article {
    /// Create an article stamped with the current time.
    pub fn new(path: ContentPath, title: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path,
            metadata: Metadata {
                title: title.into(),
                last_edited_at: Timestamp::now(),
            },
            content: content.into(),
        }
    }

    pub fn title(&self) -> &str {
        &self.metadata.title
    }

    pub fn last_edited_at(&self) -> Timestamp {
        self.metadata.last_edited_at
    }

    /// Render the body as HTML.
    pub fn to_html(&self) -> String {
        codec::to_html(&self.content)
    }

    /// Decode an article from its on-disk bytes.
    pub fn from_bytes(path: ContentPath, bytes: &[u8]) -> Result<Self, CodecError> {
        let (metadata, content) = codec::parse(bytes)?;
        Ok(Self {
            path,
            metadata,
            content,
        })
    }

    /// Encode the article into its on-disk bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        codec::serialize(&self.metadata, &self.content)
    }
}

/// A directory of articles and subcategories.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Category {
    pub path: ContentPath,
    /// Last path segment, `"."` for the root.
    pub name: String,
    /// `None` only for the root.
    pub parent: Option<ContentPath>,
    /// Entry names with extensions stripped, sorted and de-duplicated.
    pub entries: Vec<String>,
}

impl Category {
    pub fn is_root(&self) -> bool {
        self.path.is_root()
    }

    /// Full path of a listed entry.
    pub fn entry_path(&self, entry: &str) -> Option<ContentPath> {
        self.path.join(entry).ok()
    }
}

/// What a path resolves to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolved {
    /// An article, plus the listing of the category that contains it.
    Article { article: Article, category: Category },
    Category(Category),
}

impl Resolved {
    pub fn article(&self) -> Option<&Article> {
        match self {
            Self::Article { article, .. } => Some(article),
            Self::Category(_) => None,
        }
    }

    /// The category itself, or the one containing the article.
    pub fn category(&self) -> &Category {
        match self {
            Self::Article { category, .. } => category,
            Self::Category(category) => category,
        }
    }

    pub fn into_article(self) -> Option<Article> {
        match self {
            Self::Article { article, .. } => Some(article),
            Self::Category(_) => None,
        }
    }
}
