//! Torznab search-result parsing.
//!
//! Torznab is RSS with `torznab:attr` extensions; trackers expose it as a
//! search transport. Parsing is tolerant: malformed XML yields whatever
//! items were complete before the error, never an error itself.

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

use super::types::ExistingTorrent;

#[derive(Default)]
struct ItemBuilder {
    title: Option<String>,
    link: Option<String>,
    guid: Option<String>,
    size: Option<u64>,
}

impl ItemBuilder {
    fn build(self) -> Option<ExistingTorrent> {
        Some(ExistingTorrent {
            title: self.title?,
            link: self.link,
            guid: self.guid,
            size: self.size,
            exact_match: false,
        })
    }
}

/// Parse a Torznab/RSS response body into search hits.
pub fn parse_torznab_results(xml: &str) -> Vec<ExistingTorrent> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut results = Vec::new();
    let mut current: Option<ItemBuilder> = None;
    let mut text_target: Option<&'static str> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.name();
                let local = name.local_name();
                match local.as_ref() {
                    b"item" => current = Some(ItemBuilder::default()),
                    b"title" if current.is_some() => text_target = Some("title"),
                    b"link" if current.is_some() => text_target = Some("link"),
                    b"guid" if current.is_some() => text_target = Some("guid"),
                    b"size" if current.is_some() => text_target = Some("size"),
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                // <torznab:attr name="size" value="..."/>
                if e.name().local_name().as_ref() == b"attr" {
                    if let Some(item) = current.as_mut() {
                        let mut attr_name = None;
                        let mut attr_value = None;
                        for attr in e.attributes().flatten() {
                            let value = String::from_utf8_lossy(&attr.value).to_string();
                            match attr.key.local_name().as_ref() {
                                b"name" => attr_name = Some(value),
                                b"value" => attr_value = Some(value),
                                _ => {}
                            }
                        }
                        if attr_name.as_deref() == Some("size") {
                            if let Some(raw) = attr_value {
                                item.size = item.size.or_else(|| raw.parse().ok());
                            }
                        }
                    }
                }
            }
            Ok(Event::Text(text)) => {
                if let (Some(target), Some(item)) = (text_target, current.as_mut()) {
                    if let Ok(value) = text.unescape() {
                        let value = value.to_string();
                        match target {
                            "title" => item.title = Some(value),
                            "link" => item.link = Some(value),
                            "guid" => item.guid = Some(value),
                            "size" => item.size = value.parse().ok(),
                            _ => {}
                        }
                    }
                }
                text_target = None;
            }
            Ok(Event::End(e)) => {
                if e.name().local_name().as_ref() == b"item" {
                    if let Some(item) = current.take().and_then(ItemBuilder::build) {
                        results.push(item);
                    }
                }
                text_target = None;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                debug!(error = %e, parsed = results.len(), "Stopping on malformed XML");
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:torznab="http://torznab.com/schemas/2015/feed">
  <channel>
    <title>Search results</title>
    <item>
      <title>Movie.2024.1080p.WEB-DL.x264-GRP</title>
      <guid>https://tracker.example/details/123</guid>
      <link>https://tracker.example/download/123</link>
      <size>4200000000</size>
      <torznab:attr name="seeders" value="12"/>
    </item>
    <item>
      <title>Movie.2024.720p.WEB-DL.x264-GRP</title>
      <link>https://tracker.example/download/124</link>
      <torznab:attr name="size" value="2100000000"/>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_items() {
        let results = parse_torznab_results(FEED);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Movie.2024.1080p.WEB-DL.x264-GRP");
        assert_eq!(results[0].size, Some(4_200_000_000));
        assert_eq!(results[0].guid.as_deref(), Some("https://tracker.example/details/123"));
    }

    #[test]
    fn test_size_from_torznab_attr() {
        let results = parse_torznab_results(FEED);
        assert_eq!(results[1].size, Some(2_100_000_000));
    }

    #[test]
    fn test_empty_feed() {
        let empty = r#"<rss><channel><title>none</title></channel></rss>"#;
        assert!(parse_torznab_results(empty).is_empty());
    }

    #[test]
    fn test_malformed_xml_returns_partial() {
        // Second item is truncated mid-tag; the first must survive.
        let broken = r#"<rss><channel>
          <item><title>Good.Release.1080p</title></item>
          <item><title>Broken"#;
        let results = parse_torznab_results(broken);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Good.Release.1080p");
    }

    #[test]
    fn test_not_xml_at_all() {
        assert!(parse_torznab_results("{\"this\": \"is json\"}").is_empty());
    }

    #[test]
    fn test_item_without_title_skipped() {
        let feed = r#"<rss><channel><item><link>x</link></item></rss>"#;
        assert!(parse_torznab_results(feed).is_empty());
    }
}
