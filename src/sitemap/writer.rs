//! Sitemap writer
//!
//! Serializes entries to sitemaps.org XML. At most 50 000 URLs go in one
//! file; past that the writer emits numbered part files plus a sitemap
//! index at the requested path. Every file is written to a temporary in
//! the target directory and renamed into place, so a crash mid-write never
//! leaves a truncated sitemap behind.

use crate::sitemap::{SitemapEntry, MAX_URLS_PER_SITEMAP, SITEMAP_NS};
use crate::{Result, SitemapperError};
use chrono::Local;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes a sitemap for the given entries
///
/// # Arguments
///
/// * `entries` - Eligible pages in the order they should appear
/// * `output_path` - Destination; also the index path when splitting
///
/// # Returns
///
/// The list of files written. Empty when there were no entries; a single
/// urlset file for small crawls; the index followed by its parts when the
/// entry count exceeds the per-file limit. Any failure leaves previously
/// existing files at these paths untouched.
pub fn write_sitemap(entries: &[SitemapEntry], output_path: &Path) -> Result<Vec<PathBuf>> {
    if entries.is_empty() {
        tracing::warn!("No eligible URLs; not writing a sitemap");
        return Ok(Vec::new());
    }

    if entries.len() <= MAX_URLS_PER_SITEMAP {
        write_atomic(&render_urlset(entries), output_path)?;
        return Ok(vec![output_path.to_path_buf()]);
    }

    // Oversized crawl: part files next to the index, named base-N.ext
    let mut part_paths = Vec::new();
    for (index, chunk) in entries.chunks(MAX_URLS_PER_SITEMAP).enumerate() {
        let part_path = part_path_for(output_path, index + 1);
        write_atomic(&render_urlset(chunk), &part_path)?;
        part_paths.push(part_path);
    }

    write_atomic(&render_index(&part_paths)?, output_path)?;

    let mut written = vec![output_path.to_path_buf()];
    written.extend(part_paths);
    Ok(written)
}

/// Derives the path of part `n` from the index path
fn part_path_for(output_path: &Path, n: usize) -> PathBuf {
    let stem = output_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sitemap".to_string());
    let extension = output_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    output_path.with_file_name(format!("{}-{}{}", stem, n, extension))
}

fn render_urlset(entries: &[SitemapEntry]) -> String {
    let mut xml = String::with_capacity(entries.len() * 96 + 128);
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str(&format!("<urlset xmlns=\"{}\">\n", SITEMAP_NS));
    for entry in entries {
        xml.push_str("  <url>\n");
        xml.push_str(&format!("    <loc>{}</loc>\n", xml_escape(entry.url.as_str())));
        if let Some(lastmod) = entry.lastmod {
            xml.push_str(&format!("    <lastmod>{}</lastmod>\n", lastmod.format("%Y-%m-%d")));
        }
        xml.push_str(&format!("    <priority>{:.1}</priority>\n", entry.priority));
        xml.push_str("  </url>\n");
    }
    xml.push_str("</urlset>\n");
    xml
}

/// Renders the sitemap index referencing the part files by name
///
/// Parts sit next to the index, so bare file names are the right `<loc>`
/// values regardless of where the set gets deployed.
fn render_index(part_paths: &[PathBuf]) -> Result<String> {
    let lastmod = Local::now().format("%Y-%m-%dT%H:%M:%S%:z");
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str(&format!("<sitemapindex xmlns=\"{}\">\n", SITEMAP_NS));
    for path in part_paths {
        let name = path
            .file_name()
            .ok_or_else(|| SitemapperError::Crawl(format!("invalid part path {:?}", path)))?
            .to_string_lossy();
        xml.push_str("  <sitemap>\n");
        xml.push_str(&format!("    <loc>{}</loc>\n", xml_escape(&name)));
        xml.push_str(&format!("    <lastmod>{}</lastmod>\n", lastmod));
        xml.push_str("  </sitemap>\n");
    }
    xml.push_str("</sitemapindex>\n");
    Ok(xml)
}

/// Writes content to a temporary file in the target directory, then renames
fn write_atomic(content: &str, path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(content.as_bytes())?;
    temp.persist(path).map_err(|e| SitemapperError::Io(e.error))?;
    Ok(())
}

fn xml_escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use url::Url;

    fn entry(url: &str, priority: f32) -> SitemapEntry {
        SitemapEntry {
            url: Url::parse(url).unwrap(),
            priority,
            lastmod: None,
        }
    }

    #[test]
    fn test_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sitemap.xml");
        let entries = vec![
            entry("https://example.com/", 1.0),
            entry("https://example.com/about", 0.9),
        ];

        let written = write_sitemap(&entries, &path).unwrap();
        assert_eq!(written, vec![path.clone()]);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("<urlset"));
        assert!(content.contains("<loc>https://example.com/</loc>"));
        assert!(content.contains("<priority>1.0</priority>"));
        assert!(content.contains("<priority>0.9</priority>"));
        assert!(!content.contains("<lastmod>"));
    }

    #[test]
    fn test_lastmod_rendered_as_date() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sitemap.xml");
        let mut e = entry("https://example.com/", 1.0);
        e.lastmod = NaiveDate::from_ymd_opt(2024, 3, 9);

        write_sitemap(&[e], &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("<lastmod>2024-03-09</lastmod>"));
    }

    #[test]
    fn test_empty_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sitemap.xml");
        let written = write_sitemap(&[], &path).unwrap();
        assert!(written.is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn test_split_past_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sitemap.xml");
        let entries: Vec<SitemapEntry> = (0..MAX_URLS_PER_SITEMAP + 1)
            .map(|i| entry(&format!("https://example.com/p/{}", i), 0.5))
            .collect();

        let written = write_sitemap(&entries, &path).unwrap();
        assert_eq!(written.len(), 3);
        assert_eq!(written[0], path);
        assert_eq!(written[1], dir.path().join("sitemap-1.xml"));
        assert_eq!(written[2], dir.path().join("sitemap-2.xml"));

        let index = std::fs::read_to_string(&path).unwrap();
        assert!(index.contains("<sitemapindex"));
        assert!(index.contains("<loc>sitemap-1.xml</loc>"));
        assert!(index.contains("<loc>sitemap-2.xml</loc>"));
        assert!(index.contains("<lastmod>"));

        let part1 = std::fs::read_to_string(&written[1]).unwrap();
        assert_eq!(part1.matches("<url>").count(), MAX_URLS_PER_SITEMAP);
        let part2 = std::fs::read_to_string(&written[2]).unwrap();
        assert_eq!(part2.matches("<url>").count(), 1);
    }

    #[test]
    fn test_escapes_special_characters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sitemap.xml");
        let entries = vec![entry("https://example.com/search?q=a&b=<c>", 0.8)];

        write_sitemap(&entries, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("q=a&amp;b=%3Cc%3E") || content.contains("&amp;"));
        assert!(!content.contains("?q=a&b="));
    }

    #[test]
    fn test_existing_file_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sitemap.xml");
        std::fs::write(&path, "stale").unwrap();

        write_sitemap(&[entry("https://example.com/", 1.0)], &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("<urlset"));
    }
}
