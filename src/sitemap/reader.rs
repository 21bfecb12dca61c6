//! Sitemap reader
//!
//! Parses sitemaps.org XML back into [`SitemapEntry`] values, the input
//! side of sitemap diffing. Handles both plain `<urlset>` documents and
//! `<sitemapindex>` documents whose parts sit next to the index file.

use crate::sitemap::SitemapEntry;
use crate::{Result, SitemapperError};
use chrono::NaiveDate;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::path::Path;
use url::Url;

/// Index recursion limit; an index of indexes of indexes is nothing we emit
const MAX_INDEX_DEPTH: u32 = 3;

/// Priority the protocol assigns entries that omit `<priority>`
const DEFAULT_PRIORITY: f32 = 0.5;

/// Reads all entries of a sitemap file
///
/// For a sitemap index the referenced part files are read in order, with
/// relative `<loc>` values resolved against the index's directory. Entries
/// keep document order.
pub fn read_sitemap(path: &Path) -> Result<Vec<SitemapEntry>> {
    read_with_depth(path, 0)
}

fn read_with_depth(path: &Path, depth: u32) -> Result<Vec<SitemapEntry>> {
    if depth > MAX_INDEX_DEPTH {
        return Err(SitemapperError::SitemapParse(format!(
            "sitemap index nesting exceeds {} levels at {:?}",
            MAX_INDEX_DEPTH, path
        )));
    }

    let content = std::fs::read_to_string(path)?;
    let document = parse_document(&content)
        .map_err(|e| SitemapperError::SitemapParse(format!("{:?}: {}", path, e)))?;

    match document {
        Document::UrlSet(entries) => Ok(entries),
        Document::Index(part_locs) => {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            let mut entries = Vec::new();
            for loc in part_locs {
                let part_path = resolve_part_path(&loc, dir);
                entries.extend(read_with_depth(&part_path, depth + 1)?);
            }
            Ok(entries)
        }
    }
}

/// A part `<loc>` may be a bare file name or a full URL; either way only
/// the file name matters because parts are deployed next to their index.
fn resolve_part_path(loc: &str, dir: &Path) -> std::path::PathBuf {
    let name = loc.rsplit('/').next().unwrap_or(loc);
    dir.join(name)
}

enum Document {
    UrlSet(Vec<SitemapEntry>),
    Index(Vec<String>),
}

fn parse_document(content: &str) -> std::result::Result<Document, String> {
    let mut reader = Reader::from_str(content);
    reader.trim_text(true);

    let mut is_index = false;
    let mut entries: Vec<SitemapEntry> = Vec::new();
    let mut part_locs: Vec<String> = Vec::new();

    // Fields of the <url>/<sitemap> element being assembled
    let mut loc: Option<String> = None;
    let mut lastmod: Option<NaiveDate> = None;
    let mut priority: Option<f32> = None;
    let mut current_tag: Option<Vec<u8>> = None;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"sitemapindex" => is_index = true,
                b"url" | b"sitemap" => {
                    loc = None;
                    lastmod = None;
                    priority = None;
                }
                tag @ (b"loc" | b"lastmod" | b"priority") => {
                    current_tag = Some(tag.to_vec());
                }
                _ => current_tag = None,
            },
            Event::Text(t) => {
                let text = t.unescape().map_err(|e| e.to_string())?.into_owned();
                match current_tag.as_deref() {
                    Some(b"loc") => loc = Some(text),
                    Some(b"lastmod") => lastmod = parse_lastmod(&text),
                    Some(b"priority") => priority = text.trim().parse::<f32>().ok(),
                    _ => {}
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"url" => {
                    if let Some(loc) = loc.take() {
                        if let Ok(url) = Url::parse(loc.trim()) {
                            entries.push(SitemapEntry {
                                url,
                                priority: priority.take().unwrap_or(DEFAULT_PRIORITY),
                                lastmod: lastmod.take(),
                            });
                        }
                    }
                }
                b"sitemap" => {
                    if let Some(loc) = loc.take() {
                        part_locs.push(loc.trim().to_string());
                    }
                }
                b"loc" | b"lastmod" | b"priority" => current_tag = None,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if is_index {
        Ok(Document::Index(part_locs))
    } else {
        Ok(Document::UrlSet(entries))
    }
}

/// Accepts both plain dates and full datetimes in `<lastmod>`
fn parse_lastmod(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    // get() rather than a slice: byte 10 of arbitrary input may fall
    // inside a multi-byte character
    let date_part = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sitemap::{same_priority, write_sitemap};

    fn write_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_read_urlset() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "sitemap.xml",
            r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url>
    <loc>https://example.com/</loc>
    <lastmod>2024-03-09</lastmod>
    <priority>1.0</priority>
  </url>
  <url>
    <loc>https://example.com/about</loc>
    <priority>0.9</priority>
  </url>
</urlset>
"#,
        );

        let entries = read_sitemap(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].url.as_str(), "https://example.com/");
        assert_eq!(
            entries[0].lastmod,
            NaiveDate::from_ymd_opt(2024, 3, 9)
        );
        assert!(same_priority(entries[0].priority, 1.0));
        assert_eq!(entries[1].lastmod, None);
        assert!(same_priority(entries[1].priority, 0.9));
    }

    #[test]
    fn test_read_entry_without_priority_gets_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "sitemap.xml",
            r#"<urlset><url><loc>https://example.com/x</loc></url></urlset>"#,
        );

        let entries = read_sitemap(&path).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(same_priority(entries[0].priority, DEFAULT_PRIORITY));
    }

    #[test]
    fn test_read_datetime_lastmod() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "sitemap.xml",
            r#"<urlset><url><loc>https://example.com/</loc><lastmod>2024-03-09T12:30:00+00:00</lastmod></url></urlset>"#,
        );

        let entries = read_sitemap(&path).unwrap();
        assert_eq!(entries[0].lastmod, NaiveDate::from_ymd_opt(2024, 3, 9));
    }

    #[test]
    fn test_garbage_lastmod_dropped() {
        // Multi-byte values must not trip the 10-byte date prefix
        for raw in ["日本語の日付です", "2024-03-0ä", "not a date", ""] {
            assert_eq!(parse_lastmod(raw), None, "accepted '{}'", raw);
        }
        assert_eq!(
            parse_lastmod("2024-03-09T12:30:00+00:00"),
            NaiveDate::from_ymd_opt(2024, 3, 9)
        );

        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "sitemap.xml",
            r#"<urlset><url><loc>https://example.com/</loc><lastmod>日本語の日付です</lastmod></url></urlset>"#,
        );
        let entries = read_sitemap(&path).unwrap();
        assert_eq!(entries[0].lastmod, None);
    }

    #[test]
    fn test_read_index_follows_parts() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "sitemap-1.xml",
            r#"<urlset><url><loc>https://example.com/a</loc></url></urlset>"#,
        );
        write_file(
            dir.path(),
            "sitemap-2.xml",
            r#"<urlset><url><loc>https://example.com/b</loc></url></urlset>"#,
        );
        let index = write_file(
            dir.path(),
            "sitemap.xml",
            r#"<sitemapindex>
  <sitemap><loc>sitemap-1.xml</loc></sitemap>
  <sitemap><loc>https://example.com/sitemap-2.xml</loc></sitemap>
</sitemapindex>"#,
        );

        let entries = read_sitemap(&index).unwrap();
        let urls: Vec<&str> = entries.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(urls, vec!["https://example.com/a", "https://example.com/b"]);
    }

    #[test]
    fn test_round_trip_with_writer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sitemap.xml");
        let original = vec![
            SitemapEntry {
                url: Url::parse("https://example.com/").unwrap(),
                priority: 1.0,
                lastmod: NaiveDate::from_ymd_opt(2024, 1, 15),
            },
            SitemapEntry {
                url: Url::parse("https://example.com/search?q=a&b=2").unwrap(),
                priority: 0.9,
                lastmod: None,
            },
        ];

        write_sitemap(&original, &path).unwrap();
        let read_back = read_sitemap(&path).unwrap();
        assert_eq!(read_back, original);
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "sitemap.xml", "<urlset><url></urlset>");
        assert!(read_sitemap(&path).is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(read_sitemap(Path::new("/nonexistent/sitemap.xml")).is_err());
    }
}
