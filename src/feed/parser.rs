// src/feed/parser.rs
//! RSS 2.0 document -> channel title + normalized items.
//!
//! Elements are matched on their full qualified name, so `itunes:title` or
//! `media:title` never shadow `title`. Unknown elements are skipped. For fields
//! that repeat, the first occurrence wins.

use quick_xml::escape::unescape_with;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use super::{Enclosure, NormalizedItem, ParsedFeed};
use crate::error::ParseError;

/// Parse one raw RSS 2.0 document.
pub fn parse_feed(raw: &str) -> Result<ParsedFeed, ParseError> {
    let mut reader = Reader::from_str(raw);
    reader.config_mut().trim_text(true);

    let (root, self_closed) = loop {
        match next_event(&mut reader)? {
            Event::Start(e) => break (qname(&e), false),
            Event::Empty(e) => break (qname(&e), true),
            Event::Eof => return Err(ParseError::Empty),
            _ => {}
        }
    };
    if root != "rss" {
        return Err(ParseError::NotRss(root));
    }
    if self_closed {
        return Err(missing_channel());
    }

    loop {
        match next_event(&mut reader)? {
            Event::Start(e) if e.name().as_ref() == b"channel" => return read_channel(&mut reader),
            Event::Empty(e) if e.name().as_ref() == b"channel" => {
                return Ok(ParsedFeed {
                    channel_title: String::new(),
                    items: Vec::new(),
                })
            }
            Event::Start(_) => skip_element(&mut reader)?,
            Event::End(_) | Event::Eof => return Err(missing_channel()),
            _ => {}
        }
    }
}

fn read_channel(reader: &mut Reader<&[u8]>) -> Result<ParsedFeed, ParseError> {
    let mut title = None;
    let mut items = Vec::new();
    loop {
        match next_event(reader)? {
            Event::Start(e) => match e.name().as_ref() {
                b"title" => keep_first(&mut title, read_text(reader)?),
                b"item" => items.push(read_item(reader)?.normalize()),
                _ => skip_element(reader)?,
            },
            Event::Empty(e) if e.name().as_ref() == b"item" => {
                items.push(ItemBuilder::default().normalize())
            }
            Event::End(_) => break,
            Event::Eof => return Err(truncated()),
            _ => {}
        }
    }
    Ok(ParsedFeed {
        channel_title: title.unwrap_or_default(),
        items,
    })
}

#[derive(Default)]
struct ItemBuilder {
    title: Option<String>,
    link: Option<String>,
    pub_date: Option<String>,
    description: Option<String>,
    author: Option<String>,
    itunes_author: Option<String>,
    enclosure: Option<Enclosure>,
}

impl ItemBuilder {
    fn normalize(self) -> NormalizedItem {
        NormalizedItem {
            title: self.title.unwrap_or_default(),
            id: self.link,
            published: self.pub_date.as_deref().and_then(parse_pub_date),
            description: self.description,
            author: self.itunes_author.or(self.author),
            enclosure: self.enclosure,
        }
    }
}

fn read_item(reader: &mut Reader<&[u8]>) -> Result<ItemBuilder, ParseError> {
    let mut it = ItemBuilder::default();
    loop {
        match next_event(reader)? {
            Event::Start(e) => match e.name().as_ref() {
                b"title" => keep_first(&mut it.title, read_text(reader)?),
                b"link" => keep_first(&mut it.link, read_text(reader)?),
                b"pubDate" => keep_first(&mut it.pub_date, read_text(reader)?),
                b"description" => keep_first(&mut it.description, read_text(reader)?),
                b"author" => keep_first(&mut it.author, read_text(reader)?),
                b"itunes:author" => keep_first(&mut it.itunes_author, read_text(reader)?),
                b"enclosure" => {
                    if it.enclosure.is_none() {
                        it.enclosure = read_enclosure(&e);
                    }
                    skip_element(reader)?;
                }
                _ => skip_element(reader)?,
            },
            Event::Empty(e) if e.name().as_ref() == b"enclosure" => {
                if it.enclosure.is_none() {
                    it.enclosure = read_enclosure(&e);
                }
            }
            Event::End(_) => return Ok(it),
            Event::Eof => return Err(truncated()),
            _ => {}
        }
    }
}

/// All three attributes or nothing.
fn read_enclosure(e: &BytesStart<'_>) -> Option<Enclosure> {
    Some(Enclosure {
        url: attribute(e, "url")?,
        mime_type: attribute(e, "type")?,
        length: attribute(e, "length")?,
    })
}

fn attribute(e: &BytesStart<'_>, name: &str) -> Option<String> {
    let attr = e.try_get_attribute(name).ok()??;
    let raw = String::from_utf8_lossy(&attr.value);
    Some(unescape_lossy(&raw))
}

/// Text content of the element just opened, up to its end tag. CDATA is taken
/// verbatim; nested elements are skipped.
fn read_text(reader: &mut Reader<&[u8]>) -> Result<String, ParseError> {
    let mut out = String::new();
    loop {
        match next_event(reader)? {
            Event::Text(t) => out.push_str(&decode_text(&t)),
            Event::CData(c) => out.push_str(&String::from_utf8_lossy(&c)),
            Event::Start(_) => skip_element(reader)?,
            Event::End(_) => return Ok(out),
            Event::Eof => return Err(truncated()),
            _ => {}
        }
    }
}

/// Consume everything up to the end tag of the element just opened.
fn skip_element(reader: &mut Reader<&[u8]>) -> Result<(), ParseError> {
    let mut depth = 1usize;
    loop {
        match next_event(reader)? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Event::Eof => return Err(truncated()),
            _ => {}
        }
    }
}

fn next_event<'i>(reader: &mut Reader<&'i [u8]>) -> Result<Event<'i>, ParseError> {
    reader
        .read_event()
        .map_err(|e| ParseError::Xml(e.to_string()))
}

fn qname(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn keep_first(slot: &mut Option<String>, value: String) {
    if slot.is_none() {
        *slot = Some(value);
    }
}

fn missing_channel() -> ParseError {
    ParseError::Structure("missing <channel>".into())
}

fn truncated() -> ParseError {
    ParseError::Xml("unexpected end of document".into())
}

fn decode_text(t: &BytesText<'_>) -> String {
    unescape_lossy(&String::from_utf8_lossy(t))
}

/// XML entities plus the HTML ones that commonly leak into feed text. An
/// unknown entity leaves the text as written.
fn unescape_lossy(raw: &str) -> String {
    match unescape_with(raw, resolve_entity) {
        Ok(s) => s.into_owned(),
        Err(_) => raw.to_string(),
    }
}

fn resolve_entity(name: &str) -> Option<&'static str> {
    Some(match name {
        "lt" => "<",
        "gt" => ">",
        "amp" => "&",
        "apos" => "'",
        "quot" => "\"",
        "nbsp" => "\u{00A0}",
        "ndash" => "\u{2013}",
        "mdash" => "\u{2014}",
        "ldquo" => "\u{201C}",
        "rdquo" => "\u{201D}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "hellip" => "\u{2026}",
        _ => return None,
    })
}

/// RFC 2822 first (the RSS 2.0 format), then RFC 3339, then chrono's more
/// lenient RFC 2822 reader for feeds with odd zone names.
pub(crate) fn parse_pub_date(raw: &str) -> Option<OffsetDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    OffsetDateTime::parse(s, &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(s, &Rfc3339))
        .ok()
        .or_else(|| {
            chrono::DateTime::parse_from_rfc2822(s)
                .ok()
                .and_then(|dt| OffsetDateTime::from_unix_timestamp(dt.timestamp()).ok())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Show A</title>
    <link>https://a.example/</link>
    <item>
      <title>Ep1</title>
      <link>https://a.example/ep1</link>
      <pubDate>Tue, 10 Jun 2003 04:00:00 GMT</pubDate>
      <description>First&nbsp;one</description>
    </item>
    <item>
      <link>https://a.example/ep2</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn reads_channel_title_and_items_in_order() {
        let feed = parse_feed(MINIMAL).expect("parse ok");
        assert_eq!(feed.channel_title, "Show A");
        assert_eq!(feed.items.len(), 2);
        assert_eq!(feed.items[0].title, "Ep1");
        assert_eq!(feed.items[0].id.as_deref(), Some("https://a.example/ep1"));
        assert_eq!(
            feed.items[0].description.as_deref(),
            Some("First\u{00A0}one")
        );
        assert!(feed.items[0].published.is_some());
    }

    #[test]
    fn missing_fields_pass_through_as_absent() {
        let feed = parse_feed(MINIMAL).unwrap();
        let second = &feed.items[1];
        assert_eq!(second.title, "");
        assert_eq!(second.published, None);
        assert_eq!(second.description, None);
        assert_eq!(second.author, None);
        assert_eq!(second.enclosure, None);
    }

    #[test]
    fn rejects_non_rss_root() {
        let atom = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>x</title></feed>"#;
        assert_eq!(parse_feed(atom), Err(ParseError::NotRss("feed".into())));
    }

    #[test]
    fn rejects_missing_channel() {
        let err = parse_feed(r#"<rss version="2.0"><foo/></rss>"#).unwrap_err();
        assert!(matches!(err, ParseError::Structure(_)), "{err:?}");
    }

    #[test]
    fn rejects_malformed_xml() {
        let err = parse_feed("<rss><channel><title>x</channel></rss>").unwrap_err();
        assert!(
            matches!(err, ParseError::Xml(_) | ParseError::Structure(_)),
            "{err:?}"
        );
        assert_eq!(parse_feed("   "), Err(ParseError::Empty));
    }

    #[test]
    fn channel_without_items_is_empty_not_an_error() {
        let feed = parse_feed(r#"<rss><channel><title>Quiet</title></channel></rss>"#).unwrap();
        assert_eq!(feed.channel_title, "Quiet");
        assert!(feed.items.is_empty());
    }

    #[test]
    fn namespaced_siblings_do_not_shadow_plain_fields() {
        let doc = r#"<rss xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd"
                          xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <title>Show</title>
    <itunes:title>Show (iTunes)</itunes:title>
    <item>
      <itunes:title>Ignored</itunes:title>
      <title>E</title>
      <media:title>Also ignored</media:title>
      <author>plain@example.com (Plain)</author>
      <itunes:author>NVP</itunes:author>
    </item>
  </channel>
</rss>"#;
        let feed = parse_feed(doc).expect("namespaced rss parses");
        assert_eq!(feed.channel_title, "Show");
        assert_eq!(feed.items.len(), 1);
        assert_eq!(feed.items[0].title, "E");
        assert_eq!(feed.items[0].author.as_deref(), Some("NVP"));
    }

    #[test]
    fn plain_author_is_the_fallback() {
        let doc = r#"<rss><channel><title>S</title>
  <item><title>E</title><author>a@example.com</author></item>
</channel></rss>"#;
        let feed = parse_feed(doc).unwrap();
        assert_eq!(feed.items[0].author.as_deref(), Some("a@example.com"));
    }

    #[test]
    fn first_complete_enclosure_wins() {
        let doc = r#"<rss><channel><title>S</title>
  <item>
    <title>E</title>
    <enclosure url="https://cdn.example/broken.mp3" type="audio/mpeg"/>
    <enclosure url="https://cdn.example/e.mp3?a=1&amp;b=2" type="audio/mpeg" length="10"/>
    <enclosure url="https://cdn.example/e.m4a" type="audio/mp4" length="20"/>
  </item>
</channel></rss>"#;
        let feed = parse_feed(doc).unwrap();
        assert_eq!(
            feed.items[0].enclosure,
            Some(Enclosure {
                url: "https://cdn.example/e.mp3?a=1&b=2".into(),
                mime_type: "audio/mpeg".into(),
                length: "10".into(),
            })
        );
    }

    #[test]
    fn cdata_is_passed_through_verbatim() {
        let doc = r#"<rss><channel><title>S</title>
  <item><title>E</title><description><![CDATA[<p>a&nbsp;b &mdash; c</p>]]></description></item>
</channel></rss>"#;
        let feed = parse_feed(doc).unwrap();
        assert_eq!(
            feed.items[0].description.as_deref(),
            Some("<p>a&nbsp;b &mdash; c</p>")
        );
    }

    #[test]
    fn pub_date_accepts_rfc2822_and_rfc3339() {
        let a = parse_pub_date("Tue, 10 Jun 2003 04:00:00 +0000").unwrap();
        let b = parse_pub_date("2003-06-10T04:00:00Z").unwrap();
        assert_eq!(a, b);
        assert_eq!(parse_pub_date("not a date"), None);
        assert_eq!(parse_pub_date(""), None);
    }
}
