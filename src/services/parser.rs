use regex::Regex;
use std::sync::LazyLock;

use crate::models::{Page, PageType};

static PAGE_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<page>").unwrap());

// `[tag]` at the very start of a page, tag without whitespace.
static TYPE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\[(\S+)\]").unwrap());

const LEGACY_DELIMITER: &str = "---";

/// Page-type tags the model is asked to put at the top of each page.
const TYPE_TAGS: &[(&str, PageType)] = &[
    ("封面", PageType::Cover),
    ("内容", PageType::Content),
    ("总结", PageType::Summary),
];

/// Splits raw model output into pages.
///
/// `<page>` (any case) is the delimiter when present anywhere in the text;
/// otherwise the older `---` format is assumed. Blank segments are dropped
/// and do not consume an index.
pub fn parse_outline(text: &str) -> Vec<Page> {
    let segments: Vec<&str> = if PAGE_MARKER.is_match(text) {
        PAGE_MARKER.split(text).collect()
    } else {
        text.split(LEGACY_DELIMITER).collect()
    };

    segments
        .into_iter()
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .enumerate()
        .map(|(index, segment)| Page {
            index,
            page_type: page_type_of(segment),
            content: segment.to_string(),
        })
        .collect()
}

/// Resolves the leading `[tag]` of a page; unknown or missing tags are content.
pub fn page_type_of(segment: &str) -> PageType {
    TYPE_TAG
        .captures(segment)
        .and_then(|caps| caps.get(1))
        .and_then(|tag| lookup_tag(tag.as_str()))
        .unwrap_or_default()
}

fn lookup_tag(tag: &str) -> Option<PageType> {
    TYPE_TAGS.iter().find(|(name, _)| *name == tag).map(|(_, page_type)| *page_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_blank_input_yield_no_pages() {
        assert!(parse_outline("").is_empty());
        assert!(parse_outline("   ").is_empty());
        assert!(parse_outline("\n<page>\n  <PAGE>  ").is_empty());
    }

    #[test]
    fn splits_on_page_marker_any_case() {
        let pages = parse_outline("[封面]\nTitle\n<page>[内容]\nBody\n<PaGe>[总结]\nEnd");
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].page_type, PageType::Cover);
        assert_eq!(pages[1].page_type, PageType::Content);
        assert_eq!(pages[2].page_type, PageType::Summary);
        assert_eq!(pages[2].content, "[总结]\nEnd");
    }

    #[test]
    fn uppercase_marker_alone_selects_page_mode() {
        let pages = parse_outline("one --- still one<PAGE>two");
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].content, "one --- still one");
    }

    #[test]
    fn legacy_delimiter_is_ignored_when_page_marker_present() {
        let pages = parse_outline("[封面]\nA\n---\nB\n<page>\n[内容]\nC");
        assert_eq!(pages.len(), 2);
        assert!(pages[0].content.contains("---"));
    }

    #[test]
    fn legacy_delimiter_splits_without_page_marker() {
        let raw = "[封面]\nA\n---\n\n---\n[内容]\nB\n---\n[总结]\nC\n---";
        let pages = parse_outline(raw);
        let expected = raw.split("---").filter(|s| !s.trim().is_empty()).count();
        assert_eq!(pages.len(), expected);
        assert_eq!(pages.len(), 3);
    }

    #[test]
    fn indices_are_contiguous_after_dropping_blank_segments() {
        let pages = parse_outline("<page>\n\n<page>first<page>   <page>second");
        let indices: Vec<usize> = pages.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(pages[1].content, "second");
    }

    #[test]
    fn no_delimiter_yields_single_content_page() {
        let pages = parse_outline("  just some text\nwith lines  ");
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].page_type, PageType::Content);
        assert_eq!(pages[0].content, "just some text\nwith lines");
    }

    #[test]
    fn tag_stays_in_content() {
        let pages = parse_outline("[封面]\n春季新品");
        assert_eq!(pages[0].content, "[封面]\n春季新品");
    }

    #[test]
    fn unknown_or_misplaced_tags_default_to_content() {
        assert_eq!(page_type_of("[目录]\nx"), PageType::Content);
        assert_eq!(page_type_of("intro [封面]"), PageType::Content);
        assert_eq!(page_type_of("[封 面]"), PageType::Content);
        assert_eq!(page_type_of("no tag"), PageType::Content);
        assert_eq!(page_type_of("[总结]"), PageType::Summary);
    }

    #[test]
    fn reparsing_is_stable() {
        let raw = "[封面]\nTitle\n<page>[内容]\nBody --- dash\n<page>[总结]\nBye";
        assert_eq!(parse_outline(raw), parse_outline(raw));
    }
}
