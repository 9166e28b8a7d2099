//! Exchange classification by URL substring

use serde::{Deserialize, Serialize};

/// The four kinds of upstream exchange the pool reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeKind {
    /// One tile image of a page
    Tile,
    /// Encrypted slot announcement preceding a tile
    PreTile,
    /// Title, author and page count
    Metadata,
    /// Outline tree
    Bookmark,
}

impl ExchangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeKind::Tile => "tile",
            ExchangeKind::PreTile => "pre_tile",
            ExchangeKind::Metadata => "metadata",
            ExchangeKind::Bookmark => "bookmark",
        }
    }
}

/// URL substrings identifying each exchange kind
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UrlPatterns {
    pub tile: String,
    pub pre_tile: String,
    pub metadata: String,
    pub bookmark: String,
}

impl Default for UrlPatterns {
    fn default() -> Self {
        Self {
            tile: "/deep/page/lmg/".to_string(),
            pre_tile: "/deep/page/once/get".to_string(),
            metadata: "/api/v7/read/initread".to_string(),
            bookmark: "/deep/book/v1/catatree".to_string(),
        }
    }
}

impl UrlPatterns {
    /// Classify a response URL. Patterns are tried in the order tile,
    /// pre-tile, metadata, bookmark and the first match wins.
    pub fn classify(&self, url: &str) -> Option<ExchangeKind> {
        [
            (&self.tile, ExchangeKind::Tile),
            (&self.pre_tile, ExchangeKind::PreTile),
            (&self.metadata, ExchangeKind::Metadata),
            (&self.bookmark, ExchangeKind::Bookmark),
        ]
        .into_iter()
        .find(|(pattern, _)| !pattern.is_empty() && url.contains(pattern.as_str()))
        .map(|(_, kind)| kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_default_patterns() {
        let patterns = UrlPatterns::default();
        assert_eq!(
            patterns.classify("https://host/deep/page/lmg/3238891/3?k=abc"),
            Some(ExchangeKind::Tile)
        );
        assert_eq!(
            patterns.classify("https://host/deep/page/once/get?bid=1&pnum=3&k=abc"),
            Some(ExchangeKind::PreTile)
        );
        assert_eq!(
            patterns.classify("https://host/api/v7/read/initread?bid=1"),
            Some(ExchangeKind::Metadata)
        );
        assert_eq!(
            patterns.classify("https://host/deep/book/v1/catatree?bid=1"),
            Some(ExchangeKind::Bookmark)
        );
        assert_eq!(patterns.classify("https://host/static/app.js"), None);
    }

    #[test]
    fn test_first_match_wins() {
        let patterns = UrlPatterns {
            tile: "/page/".to_string(),
            pre_tile: "/page/once".to_string(),
            ..UrlPatterns::default()
        };
        assert_eq!(patterns.classify("https://host/page/once"), Some(ExchangeKind::Tile));
    }

    #[test]
    fn test_empty_pattern_never_matches() {
        let patterns = UrlPatterns {
            bookmark: String::new(),
            ..UrlPatterns::default()
        };
        assert_eq!(patterns.classify("https://host/anything"), None);
    }
}
