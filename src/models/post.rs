//! Harvested post data structures.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::utils::extract_post_no;

/// One listing row, before the detail page is visited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostStub {
    /// Visible title text
    pub title: String,

    /// Link to the detail page as found in the listing
    pub detail_ref: String,

    /// Date as printed by the source (full-precision attribute when present)
    pub raw_date: String,
}

impl PostStub {
    /// Stable id of the post: its numeric `no`, or the whole reference.
    pub fn post_id(&self) -> String {
        extract_post_no(&self.detail_ref).unwrap_or_else(|| self.detail_ref.clone())
    }
}

/// A harvested post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    /// Post number, unique within a harvest run
    pub id: String,

    /// Post title
    pub title: String,

    /// Plain-text body (empty when the detail page was skipped or failed)
    #[serde(default)]
    pub body: String,

    /// Date as printed by the source
    pub raw_date: String,

    /// Calendar date; `None` rows never reach the aggregator
    pub date: Option<NaiveDate>,

    /// Detail page URL
    pub source_url: String,
}

impl Post {
    /// Build a post from its listing row.
    pub fn from_stub(
        stub: PostStub,
        body: String,
        date: Option<NaiveDate>,
        source_url: String,
    ) -> Self {
        Self {
            id: stub.post_id(),
            title: stub.title,
            body,
            raw_date: stub.raw_date,
            date,
            source_url,
        }
    }

    /// Title and body as one text.
    pub fn text(&self) -> String {
        format!("{} {}", self.title, self.body)
    }

    /// True when only the title was collected.
    pub fn is_title_only(&self) -> bool {
        self.body.is_empty()
    }
}
