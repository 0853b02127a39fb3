use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    Cover,
    #[default]
    Content,
    Summary,
}

/// One page of a parsed outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub index: usize,
    #[serde(rename = "type")]
    pub page_type: PageType,
    pub content: String,
}

/// What a caller hands the generator.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub topic: String,
    pub images: Vec<Vec<u8>>,
    pub source_content: Option<String>,
}

/// Outcome of one outline request. Serializes with a `success` flag next to
/// the payload of whichever variant applies.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutlineResult {
    Success {
        success: Flag<true>,
        outline: String,
        pages: Vec<Page>,
        has_images: bool,
    },
    Failure {
        success: Flag<false>,
        error: String,
    },
}

impl OutlineResult {
    pub fn success(outline: String, pages: Vec<Page>, has_images: bool) -> Self {
        OutlineResult::Success { success: Flag, outline, pages, has_images }
    }

    pub fn failure(error: String) -> Self {
        OutlineResult::Failure { success: Flag, error }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, OutlineResult::Success { .. })
    }

    pub fn pages(&self) -> &[Page] {
        match self {
            OutlineResult::Success { pages, .. } => pages,
            OutlineResult::Failure { .. } => &[],
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            OutlineResult::Failure { error, .. } => Some(error),
            OutlineResult::Success { .. } => None,
        }
    }
}

/// A boolean fixed at the type level, so a variant cannot carry the wrong
/// `success` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flag<const B: bool>;

impl<const B: bool> Serialize for Flag<B> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(B)
    }
}

/// Normalized result of scraping one web page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedPage {
    pub title: String,
    pub content: String,
    pub word_count: usize,
    pub url: String,
}
