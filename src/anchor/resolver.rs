//! Anchor resolution
//!
//! Captures a `Locator` from a live range and finds it again in a possibly
//! changed document. Strategies, tried in order:
//!
//! 1. Quote with context: exact occurrences scored on prefix, suffix and
//!    position proximity; accepted above the configured threshold
//! 2. Quote only: approximate occurrences within a small edit budget
//! 3. Position (revalidation only): a window around the recorded offsets

use crate::dom::{Surface, TextRange};

use super::fuzzy::{score_candidate, search_chars, Match};
use super::position::PositionIndexer;
use super::types::Locator;

/// Which strategy produced an anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    QuoteWithContext,
    QuoteOnly,
    Position,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::QuoteWithContext => "quote_with_context",
            Strategy::QuoteOnly => "quote_only",
            Strategy::Position => "position",
        }
    }
}

/// A resolved anchor in absolute char offsets
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorMatch {
    pub start: usize,
    pub end: usize,
    pub strategy: Strategy,
    pub score: f64,
}

pub struct AnchorResolver<'a> {
    surface: Surface<'a>,
    indexer: PositionIndexer<'a>,
    chars: Vec<char>,
}

impl<'a> AnchorResolver<'a> {
    pub fn new(surface: Surface<'a>) -> Self {
        let indexer = PositionIndexer::new(surface);
        let chars = indexer.full_text().chars().collect();
        Self {
            surface,
            indexer,
            chars,
        }
    }

    pub fn indexer(&self) -> &PositionIndexer<'a> {
        &self.indexer
    }

    /// Describe a range portably. `None` for a collapsed range, a range
    /// outside the container, or one covering no text.
    pub fn capture(&self, range: &TextRange) -> Option<Locator> {
        let (start, end) = self.indexer.range_offsets(range)?;
        if start == end {
            return None;
        }
        let context = self.surface.config.context_len;
        let exact: String = self.chars[start..end].iter().collect();
        let prefix: String = self.chars[start.saturating_sub(context)..start].iter().collect();
        let suffix: String = self.chars[end..(end + context).min(self.chars.len())]
            .iter()
            .collect();
        let raw_text = self
            .indexer
            .display_text(range)
            .filter(|display| *display != exact);

        Some(Locator {
            exact,
            prefix,
            suffix,
            position_start: start,
            position_end: end,
            raw_text,
        })
    }

    /// Find a locator in the current text
    pub fn resolve(&self, locator: &Locator) -> Option<TextRange> {
        let found = self.resolve_match(locator)?;
        self.to_range(found.start, found.end)
    }

    pub fn resolve_match(&self, locator: &Locator) -> Option<AnchorMatch> {
        let exact: Vec<char> = locator.exact.chars().collect();
        if exact.is_empty() {
            return None;
        }

        if let Some(found) = self.by_context(locator, &exact) {
            tracing::debug!(
                strategy = found.strategy.as_str(),
                start = found.start,
                end = found.end,
                "Resolved locator"
            );
            return Some(found);
        }

        let found = self.by_quote(locator, &exact);
        match &found {
            Some(found) => tracing::debug!(
                strategy = found.strategy.as_str(),
                start = found.start,
                end = found.end,
                "Resolved locator"
            ),
            None => tracing::debug!(exact = %locator.exact, "Locator did not resolve"),
        }
        found
    }

    fn by_context(&self, locator: &Locator, exact: &[char]) -> Option<AnchorMatch> {
        let hint = locator.position_start;
        search_chars(&self.chars, exact, 0)
            .into_iter()
            .map(|m| (score_candidate(&m, locator, &self.chars), m))
            .min_by(|(sa, a), (sb, b)| {
                sb.total_cmp(sa)
                    .then(a.start.abs_diff(hint).cmp(&b.start.abs_diff(hint)))
                    .then(a.start.cmp(&b.start))
            })
            .filter(|(score, _)| *score > self.surface.config.context_threshold)
            .map(|(score, m)| AnchorMatch {
                start: m.start,
                end: m.end,
                strategy: Strategy::QuoteWithContext,
                score,
            })
    }

    fn by_quote(&self, locator: &Locator, exact: &[char]) -> Option<AnchorMatch> {
        let hint = locator.position_start;
        let best = search_chars(&self.chars, exact, self.surface.config.lenient_max_errors)
            .into_iter()
            .min_by_key(|m| {
                (
                    m.errors,
                    m.len().abs_diff(exact.len()),
                    m.start.abs_diff(hint),
                    m.start,
                )
            })?;
        Some(self.lenient_match(best, exact.len(), Strategy::QuoteOnly))
    }

    /// Re-check a locator near its recorded offsets: the recorded range if
    /// it still holds the quote, else the closest approximate occurrence in
    /// a window around it
    pub fn revalidate(&self, locator: &Locator) -> Option<TextRange> {
        let found = self.revalidate_match(locator)?;
        self.to_range(found.start, found.end)
    }

    pub fn revalidate_match(&self, locator: &Locator) -> Option<AnchorMatch> {
        let exact: Vec<char> = locator.exact.chars().collect();
        if exact.is_empty() {
            return None;
        }
        let (start, end) = (locator.position_start, locator.position_end);
        if start < end && end <= self.chars.len() && self.chars[start..end] == exact[..] {
            return Some(AnchorMatch {
                start,
                end,
                strategy: Strategy::Position,
                score: 1.0,
            });
        }

        let window_start = start.saturating_sub(exact.len()).min(self.chars.len());
        let window_end = (end + exact.len()).min(self.chars.len());
        if window_start >= window_end {
            return None;
        }
        let budget = (exact.len() / 10).max(1);
        let best = search_chars(&self.chars[window_start..window_end], &exact, budget)
            .into_iter()
            .map(|m| Match {
                start: m.start + window_start,
                end: m.end + window_start,
                errors: m.errors,
            })
            .min_by_key(|m| (m.errors, m.start.abs_diff(start), m.start))?;
        Some(self.lenient_match(best, exact.len(), Strategy::Position))
    }

    fn lenient_match(&self, m: Match, exact_len: usize, strategy: Strategy) -> AnchorMatch {
        AnchorMatch {
            start: m.start,
            end: m.end,
            strategy,
            score: 1.0 - m.errors as f64 / exact_len as f64,
        }
    }

    /// Live range for absolute offsets
    pub fn to_range(&self, start: usize, end: usize) -> Option<TextRange> {
        let start = self.indexer.offset_to_start_point(start)?;
        let end = self.indexer.offset_to_point(end)?;
        Some(TextRange::new(start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MarkerConfig;
    use crate::dom::{parse_xml, Document, NodeId, Point};

    fn body(doc: &Document) -> NodeId {
        doc.descendants(doc.root())
            .find(|n| doc.tag(*n) == Some("body"))
            .unwrap()
    }

    fn text_node(doc: &Document, content: &str) -> NodeId {
        doc.descendants(doc.root())
            .find(|n| doc.text(*n) == Some(content))
            .unwrap()
    }

    #[test]
    fn test_capture_collects_context() {
        let doc = parse_xml("<body><p>Hi, Hello world! Bye.</p></body>").unwrap();
        let config = MarkerConfig::default();
        let text = text_node(&doc, "Hi, Hello world! Bye.");
        let resolver = AnchorResolver::new(Surface::new(&doc, body(&doc), &config));

        let locator = resolver
            .capture(&TextRange::new(Point::new(text, 4), Point::new(text, 15)))
            .unwrap();
        assert_eq!(locator.exact, "Hello world");
        assert_eq!(locator.prefix, "Hi, ");
        assert_eq!(locator.suffix, "! Bye.");
        assert_eq!((locator.position_start, locator.position_end), (4, 15));
        assert_eq!(locator.raw_text, None);

        let collapsed = TextRange::new(Point::new(text, 3), Point::new(text, 3));
        assert!(resolver.capture(&collapsed).is_none());
    }

    #[test]
    fn test_resolve_after_context_shift() {
        let config = MarkerConfig::default();
        let locator = {
            let doc = parse_xml("<body><p>Hi, Hello world! Bye.</p></body>").unwrap();
            let text = text_node(&doc, "Hi, Hello world! Bye.");
            let resolver = AnchorResolver::new(Surface::new(&doc, body(&doc), &config));
            resolver
                .capture(&TextRange::new(Point::new(text, 4), Point::new(text, 15)))
                .unwrap()
        };

        let doc = parse_xml("<body><p>Hi there, Hello world! Bye.</p></body>").unwrap();
        let resolver = AnchorResolver::new(Surface::new(&doc, body(&doc), &config));
        let found = resolver.resolve_match(&locator).unwrap();
        assert_eq!((found.start, found.end), (10, 21));
        assert_eq!(found.strategy, Strategy::QuoteWithContext);
    }

    #[test]
    fn test_resolve_prefers_matching_context() {
        let config = MarkerConfig::default();
        let doc = parse_xml("<body><p>A cat sat. The cat ran.</p></body>").unwrap();
        let resolver = AnchorResolver::new(Surface::new(&doc, body(&doc), &config));
        let locator = Locator {
            exact: "cat".to_string(),
            prefix: "The ".to_string(),
            suffix: " ran.".to_string(),
            position_start: 0,
            position_end: 3,
            raw_text: None,
        };

        let found = resolver.resolve_match(&locator).unwrap();
        assert_eq!(found.start, 15);
    }

    #[test]
    fn test_resolve_falls_back_to_lenient_quote() {
        let config = MarkerConfig::default();
        let doc = parse_xml("<body><p>Hello wurld</p></body>").unwrap();
        let resolver = AnchorResolver::new(Surface::new(&doc, body(&doc), &config));
        let locator = Locator {
            exact: "Hello world".to_string(),
            prefix: String::new(),
            suffix: String::new(),
            position_start: 0,
            position_end: 11,
            raw_text: None,
        };

        let found = resolver.resolve_match(&locator).unwrap();
        assert_eq!(found.strategy, Strategy::QuoteOnly);
        assert_eq!((found.start, found.end), (0, 11));
    }

    #[test]
    fn test_unresolvable_locator() {
        let config = MarkerConfig::default();
        let doc = parse_xml("<body><p>Nothing similar here</p></body>").unwrap();
        let resolver = AnchorResolver::new(Surface::new(&doc, body(&doc), &config));
        let locator = Locator {
            exact: "zebra crossing".to_string(),
            prefix: String::new(),
            suffix: String::new(),
            position_start: 0,
            position_end: 14,
            raw_text: None,
        };
        assert!(resolver.resolve(&locator).is_none());
    }

    #[test]
    fn test_revalidate_by_position() {
        let config = MarkerConfig::default();
        let doc = parse_xml("<body><p>abc Hello world xyz</p></body>").unwrap();
        let resolver = AnchorResolver::new(Surface::new(&doc, body(&doc), &config));
        let mut locator = Locator {
            exact: "Hello world".to_string(),
            prefix: String::new(),
            suffix: String::new(),
            position_start: 4,
            position_end: 15,
            raw_text: None,
        };

        let found = resolver.revalidate_match(&locator).unwrap();
        assert_eq!((found.start, found.end, found.score), (4, 15, 1.0));

        locator.position_start = 6;
        locator.position_end = 17;
        let found = resolver.revalidate_match(&locator).unwrap();
        assert_eq!((found.start, found.end), (4, 15));
        assert_eq!(found.strategy, Strategy::Position);
    }

    #[test]
    fn test_capture_records_block_breaks() {
        let config = MarkerConfig::default();
        let doc = parse_xml("<body><p>first</p><p>second</p></body>").unwrap();
        let first = text_node(&doc, "first");
        let second = text_node(&doc, "second");
        let resolver = AnchorResolver::new(Surface::new(&doc, body(&doc), &config));

        let locator = resolver
            .capture(&TextRange::new(Point::new(first, 2), Point::new(second, 3)))
            .unwrap();
        assert_eq!(locator.exact, "rstsec");
        assert_eq!(locator.raw_text.as_deref(), Some("rst\nsec"));
        assert_eq!(locator.display_text(), "rst\nsec");
    }
}
