// src/feed/serializer.rs
//! AggregateFeed -> RSS 2.0 XML text.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use time::format_description::well_known::Rfc2822;
use time::{OffsetDateTime, UtcOffset};

use super::{AggregateFeed, NormalizedItem};

pub const GENERATOR: &str = concat!("rss-aggregator/", env!("CARGO_PKG_VERSION"));

/// Render the merged feed. Never fails: dates RFC 2822 cannot express are
/// clamped into its year range.
pub fn serialize_feed(feed: &AggregateFeed) -> String {
    let mut w = Writer::new_with_indent(Vec::new(), b' ', 2);

    emit(&mut w, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)));
    emit(
        &mut w,
        Event::Start(BytesStart::new("rss").with_attributes([("version", "2.0")])),
    );
    emit(&mut w, Event::Start(BytesStart::new("channel")));

    text_element(&mut w, "title", &feed.title);
    text_element(&mut w, "link", &feed.link);
    text_element(
        &mut w,
        "description",
        &format!("{} merged from {} source feeds", feed.title, feed.source_count),
    );
    text_element(&mut w, "generator", GENERATOR);

    for item in &feed.items {
        write_item(&mut w, item);
    }

    emit(&mut w, Event::End(BytesEnd::new("channel")));
    emit(&mut w, Event::End(BytesEnd::new("rss")));

    String::from_utf8_lossy(&w.into_inner()).into_owned()
}

fn write_item(w: &mut Writer<Vec<u8>>, item: &NormalizedItem) {
    emit(w, Event::Start(BytesStart::new("item")));

    text_element(w, "title", &item.title);
    if let Some(id) = &item.id {
        text_element(w, "link", id);
        emit(
            w,
            Event::Start(BytesStart::new("guid").with_attributes([("isPermaLink", "false")])),
        );
        emit(w, Event::Text(BytesText::new(id)));
        emit(w, Event::End(BytesEnd::new("guid")));
    }
    if let Some(date) = item.published.and_then(format_rfc2822) {
        text_element(w, "pubDate", &date);
    }
    if let Some(desc) = &item.description {
        text_element(w, "description", desc);
    }
    if let Some(author) = &item.author {
        text_element(w, "author", author);
    }
    if let Some(enc) = &item.enclosure {
        emit(
            w,
            Event::Empty(BytesStart::new("enclosure").with_attributes([
                ("url", enc.url.as_str()),
                ("type", enc.mime_type.as_str()),
                ("length", enc.length.as_str()),
            ])),
        );
    }

    emit(w, Event::End(BytesEnd::new("item")));
}

fn text_element(w: &mut Writer<Vec<u8>>, name: &str, value: &str) {
    emit(w, Event::Start(BytesStart::new(name)));
    emit(w, Event::Text(BytesText::new(value)));
    emit(w, Event::End(BytesEnd::new(name)));
}

// Writing into a Vec<u8> has no io failure mode.
fn emit(w: &mut Writer<Vec<u8>>, ev: Event<'_>) {
    let res = w.write_event(ev);
    debug_assert!(res.is_ok(), "xml write into Vec failed");
}

/// RFC 2822 needs a year in 1900..=9999 and a whole-minute offset; anything
/// else is moved to UTC and clamped.
pub(crate) fn format_rfc2822(dt: OffsetDateTime) -> Option<String> {
    if let Ok(s) = dt.format(&Rfc2822) {
        return Some(s);
    }
    let utc = dt.to_offset(UtcOffset::UTC);
    let year = utc.year().clamp(1900, 9999);
    let clamped = utc
        .replace_year(year)
        .or_else(|_| utc.replace_day(28).and_then(|d| d.replace_year(year)))
        .ok()?;
    clamped.format(&Rfc2822).ok()
}
