//! HAR capture to request timeline
//!
//! Only the first page of a capture is kept. Entries are scoped to that
//! page, abbreviated, typed, timed against the navigation start, tagged,
//! and finally cut off at the page's onLoad milestone:
//!
//! ```text
//! https://www.example.com/a/b?x=1#y   ->   example.com/a/b
//!                                          domain: example.com  path: /a/b
//! ```

use crate::data::{RequestRecord, ResourceType, Timeline};
use crate::error::{Error, Result};
use crate::har::{HarDocument, HarEntry, HarPage};
use crate::tags::TagSet;
use chrono::{DateTime, FixedOffset};
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

fn scheme_regex() -> &'static Regex {
    static SCHEME: OnceLock<Regex> = OnceLock::new();
    SCHEME.get_or_init(|| {
        Regex::new(r"(?i)^https?://(www\.)?").expect("scheme pattern is a valid regex")
    })
}

/// Strip the scheme, a leading `www.`, the query string and the fragment
pub fn abbreviate_url(url: &str) -> String {
    let without_scheme = scheme_regex().replace(url, "");
    let end = without_scheme
        .find(|c: char| c == '?' || c == '#')
        .unwrap_or(without_scheme.len());
    without_scheme[..end].to_string()
}

/// Split an abbreviated URL at its first `/` into `(domain, path)`
pub fn split_url(url: &str) -> (String, String) {
    match url.split_once('/') {
        Some((domain, _)) => (domain.to_string(), url[domain.len()..].to_string()),
        None => (url.to_string(), String::new()),
    }
}

/// Domain of the first request made for the first page, without `www.`.
/// This is what `first_party` tag rules compare against.
pub fn primary_domain(doc: &HarDocument) -> Option<String> {
    let page = doc.first_page()?;
    doc.log
        .entries
        .iter()
        .find(|e| belongs_to(e, page, doc.log.pages.len()))
        .map(|e| split_url(&abbreviate_url(&e.request.url)).0)
        .filter(|d| !d.is_empty())
}

fn belongs_to(entry: &HarEntry, page: &HarPage, page_count: usize) -> bool {
    page_count <= 1 || entry.pageref.as_deref() == Some(page.id.as_str())
}

fn parse_timestamp(value: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value).map_err(|e| Error::InvalidTimestamp {
        value: value.to_string(),
        source: e,
    })
}

/// Milliseconds from `origin` to `at`, with sub-millisecond precision
fn offset_ms(origin: &DateTime<FixedOffset>, at: &DateTime<FixedOffset>) -> f64 {
    let delta = at.signed_duration_since(*origin);
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1000.0,
        None => delta.num_milliseconds() as f64,
    }
}

/// Round to the nearest millisecond, halves toward positive infinity
/// (`-1.5` becomes `-1`), matching browser `Math.round`
pub fn round_ms(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Builds timelines from HAR documents with a fixed set of tag rules
#[derive(Debug, Default)]
pub struct Normalizer {
    tags: TagSet,
}

impl Normalizer {
    pub fn new(tags: TagSet) -> Self {
        Self { tags }
    }

    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    /// Normalize the first page of `doc` into a timeline
    pub fn normalize(&self, doc: &HarDocument) -> Result<Timeline> {
        let page = doc.first_page().ok_or(Error::MissingPages)?;
        let navigation_start = parse_timestamp(
            page.started_date_time
                .as_deref()
                .ok_or(Error::MissingField("log.pages[0].startedDateTime"))?,
        )?;
        let timings = page.page_timings.as_ref();
        let on_load = timings
            .and_then(|t| t.on_load)
            .filter(|v| *v >= 0.0)
            .ok_or(Error::MissingField("log.pages[0].pageTimings.onLoad"))?;
        let on_content_load = timings
            .and_then(|t| t.on_content_load)
            .filter(|v| *v >= 0.0);

        if doc.log.pages.len() > 1 {
            debug!(
                "Capture has {} pages, keeping entries of '{}' only",
                doc.log.pages.len(),
                page.id
            );
        }

        let mut records = Vec::new();
        let mut after_load = 0usize;

        for entry in doc
            .log
            .entries
            .iter()
            .filter(|e| belongs_to(e, page, doc.log.pages.len()))
        {
            let record = self.build_record(entry, &navigation_start)?;
            if record.start > on_load {
                after_load += 1;
                continue;
            }
            records.push(record);
        }

        debug!(
            "Normalized {} requests ({} started after onLoad at {} ms)",
            records.len(),
            after_load,
            on_load
        );

        Ok(Timeline {
            page_id: page.id.clone(),
            page_title: page.title.clone(),
            on_load,
            on_content_load,
            records,
        })
    }

    fn build_record(
        &self,
        entry: &HarEntry,
        navigation_start: &DateTime<FixedOffset>,
    ) -> Result<RequestRecord> {
        let url = abbreviate_url(&entry.request.url);
        let (domain, path) = split_url(&url);
        let started = parse_timestamp(&entry.started_date_time)?;
        let start = offset_ms(navigation_start, &started);
        let duration = entry.time;

        let mut record = RequestRecord {
            url,
            full_url: entry.request.url.clone(),
            domain,
            path,
            kind: ResourceType::from_mime(entry.mime_type()),
            mime_type: entry.mime_type().to_string(),
            start,
            duration,
            end: round_ms(start + duration),
            tags: Default::default(),
        };
        record.tags = self.tags.evaluate(&record);

        Ok(record)
    }
}

/// Normalize a HAR document given as a JSON string
pub fn normalize_from_str(content: &str, tags: TagSet) -> Result<Timeline> {
    let doc = HarDocument::from_json(content)?;
    Normalizer::new(tags).normalize(&doc)
}

/// Normalize a HAR document read from a file
pub fn normalize_from_file(path: &std::path::Path, tags: TagSet) -> Result<Timeline> {
    let doc = HarDocument::load_from_file(path)?;
    Normalizer::new(tags).normalize(&doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SINGLE_PAGE: &str = r#"{
        "log": {
            "pages": [{
                "id": "page_1",
                "title": "Example",
                "startedDateTime": "2024-03-01T10:00:00.000Z",
                "pageTimings": { "onContentLoad": 400, "onLoad": 900 }
            }],
            "entries": [
                {
                    "pageref": "page_1",
                    "startedDateTime": "2024-03-01T10:00:00.000Z",
                    "time": 120.4,
                    "request": { "url": "https://www.example.com/" },
                    "response": { "content": { "mimeType": "text/html" } }
                },
                {
                    "pageref": "page_1",
                    "startedDateTime": "2024-03-01T10:00:00.500Z",
                    "time": 200,
                    "request": { "url": "https://www.example.com/a/b?x=1#y" },
                    "response": { "content": { "mimeType": "image/png" } }
                },
                {
                    "pageref": "page_1",
                    "startedDateTime": "2024-03-01T10:00:00.650Z",
                    "time": 80.6,
                    "request": { "url": "http://cdn.other.net/lib.js" },
                    "response": { "content": { "mimeType": "application/javascript" } }
                },
                {
                    "pageref": "page_1",
                    "startedDateTime": "2024-03-01T10:00:01.500Z",
                    "time": 30,
                    "request": { "url": "https://www.example.com/late.gif" },
                    "response": { "content": { "mimeType": "image/gif" } }
                },
                {
                    "pageref": "page_1",
                    "startedDateTime": "2024-03-01T10:00:00.700Z",
                    "time": 15,
                    "request": { "url": "https://www.example.com/beacon" },
                    "response": { "content": {} }
                }
            ]
        }
    }"#;

    fn tag_set() -> TagSet {
        TagSet::new()
            .with_pattern("third_party", r"^cdn\.")
            .unwrap()
            .with_predicate("stats", |r| {
                r.domain == "example.com" && r.path.starts_with("/stats/")
            })
    }

    #[test]
    fn test_abbreviate_url() {
        assert_eq!(
            abbreviate_url("https://www.example.com/a/b?x=1#y"),
            "example.com/a/b"
        );
        assert_eq!(abbreviate_url("http://example.com"), "example.com");
        assert_eq!(abbreviate_url("HTTPS://WWW.Example.com/x"), "Example.com/x");
        assert_eq!(abbreviate_url("https://a.com/p#frag?not"), "a.com/p");
        assert_eq!(abbreviate_url("data:image/png;base64,AAA"), "data:image/png;base64,AAA");
    }

    #[test]
    fn test_split_url() {
        assert_eq!(
            split_url("example.com/a/b"),
            ("example.com".to_string(), "/a/b".to_string())
        );
        assert_eq!(split_url("example.com"), ("example.com".to_string(), String::new()));
        assert_eq!(
            split_url("a.com//double"),
            ("a.com".to_string(), "//double".to_string())
        );
    }

    #[test]
    fn test_normalize_single_page() {
        let timeline = normalize_from_str(SINGLE_PAGE, tag_set()).unwrap();

        assert_eq!(timeline.page_id, "page_1");
        assert_eq!(timeline.page_title.as_deref(), Some("Example"));
        assert_eq!(timeline.on_load, 900.0);
        assert_eq!(timeline.on_content_load, Some(400.0));

        // late.gif starts at 1500 ms, after onLoad
        let urls: Vec<_> = timeline.records.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "example.com/",
                "example.com/a/b",
                "cdn.other.net/lib.js",
                "example.com/beacon"
            ]
        );
    }

    #[test]
    fn test_record_fields() {
        let timeline = normalize_from_str(SINGLE_PAGE, tag_set()).unwrap();
        let image = &timeline.records[1];

        assert_eq!(image.full_url, "https://www.example.com/a/b?x=1#y");
        assert_eq!(image.domain, "example.com");
        assert_eq!(image.path, "/a/b");
        assert_eq!(image.kind, ResourceType::Image);
        assert_eq!(image.start, 500.0);
        assert_eq!(image.end, 700.0);

        let script = &timeline.records[2];
        assert_eq!(script.kind, ResourceType::Script);
        // 650 + 80.6 rounds up
        assert_eq!(script.end, 731.0);

        let beacon = &timeline.records[3];
        assert_eq!(beacon.kind, ResourceType::Other);
        assert_eq!(beacon.mime_type, "");
    }

    #[test]
    fn test_invariants_hold_for_every_record() {
        let timeline = normalize_from_str(SINGLE_PAGE, tag_set()).unwrap();

        for record in &timeline.records {
            assert_eq!(record.end, round_ms(record.start + record.duration));
            assert_eq!(format!("{}{}", record.domain, record.path), record.url);
            assert!(record.start <= timeline.on_load);

            let names: Vec<_> = record.tags.keys().map(String::as_str).collect();
            assert_eq!(names, vec!["stats", "third_party"]);
        }

        assert!(timeline.records[2].has_tag("third_party"));
        assert!(!timeline.records[0].has_tag("third_party"));
    }

    #[test]
    fn test_multi_page_keeps_first_page() {
        let json = r#"{"log": {
            "pages": [
                { "id": "p1", "startedDateTime": "2024-03-01T10:00:00Z", "pageTimings": { "onLoad": 5000 } },
                { "id": "p2", "startedDateTime": "2024-03-01T10:00:03Z", "pageTimings": { "onLoad": 500 } }
            ],
            "entries": [
                { "pageref": "p1", "startedDateTime": "2024-03-01T10:00:00Z", "time": 10, "request": { "url": "https://a.com/1" } },
                { "pageref": "p2", "startedDateTime": "2024-03-01T10:00:03Z", "time": 10, "request": { "url": "https://a.com/2" } },
                { "startedDateTime": "2024-03-01T10:00:01Z", "time": 10, "request": { "url": "https://a.com/orphan" } },
                { "pageref": "p1", "startedDateTime": "2024-03-01T10:00:02Z", "time": 10, "request": { "url": "https://a.com/3" } }
            ]
        }}"#;

        let timeline = normalize_from_str(json, TagSet::new()).unwrap();
        let urls: Vec<_> = timeline.records.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["a.com/1", "a.com/3"]);
    }

    #[test]
    fn test_single_page_ignores_pageref() {
        let json = r#"{"log": {
            "pages": [{ "id": "p1", "startedDateTime": "2024-03-01T10:00:00Z", "pageTimings": { "onLoad": 100 } }],
            "entries": [
                { "pageref": "other", "startedDateTime": "2024-03-01T10:00:00Z", "time": 1, "request": { "url": "https://a.com/" } }
            ]
        }}"#;

        let timeline = normalize_from_str(json, TagSet::new()).unwrap();
        assert_eq!(timeline.len(), 1);
        assert!(timeline.records[0].tags.is_empty());
    }

    #[test]
    fn test_entry_exactly_at_on_load_is_kept() {
        let json = r#"{"log": {
            "pages": [{ "id": "p1", "startedDateTime": "2024-03-01T10:00:00Z", "pageTimings": { "onLoad": 250 } }],
            "entries": [
                { "startedDateTime": "2024-03-01T10:00:00.250Z", "time": 5, "request": { "url": "https://a.com/edge" } },
                { "startedDateTime": "2024-03-01T10:00:00.251Z", "time": 5, "request": { "url": "https://a.com/past" } }
            ]
        }}"#;

        let timeline = normalize_from_str(json, TagSet::new()).unwrap();
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline.records[0].url, "a.com/edge");
    }

    #[test]
    fn test_timezone_offsets() {
        let json = r#"{"log": {
            "pages": [{ "id": "p1", "startedDateTime": "2024-03-01T12:00:00.000+02:00", "pageTimings": { "onLoad": 1000 } }],
            "entries": [
                { "startedDateTime": "2024-03-01T10:00:00.300Z", "time": 10, "request": { "url": "https://a.com/" } }
            ]
        }}"#;

        let timeline = normalize_from_str(json, TagSet::new()).unwrap();
        assert_eq!(timeline.records[0].start, 300.0);
    }

    #[test]
    fn test_missing_pages() {
        let json = r#"{"log": {"entries": []}}"#;
        assert!(matches!(
            normalize_from_str(json, TagSet::new()),
            Err(Error::MissingPages)
        ));
    }

    #[test]
    fn test_missing_on_load() {
        let json = r#"{"log": {"pages": [{ "id": "p1", "startedDateTime": "2024-03-01T10:00:00Z",
            "pageTimings": { "onLoad": -1 } }], "entries": []}}"#;
        assert!(matches!(
            normalize_from_str(json, TagSet::new()),
            Err(Error::MissingField(_))
        ));

        let json = r#"{"log": {"pages": [{ "id": "p1", "pageTimings": { "onLoad": 10 } }], "entries": []}}"#;
        assert!(matches!(
            normalize_from_str(json, TagSet::new()),
            Err(Error::MissingField(_))
        ));
    }

    #[test]
    fn test_bad_timestamp_fails_whole_document() {
        let json = r#"{"log": {
            "pages": [{ "id": "p1", "startedDateTime": "2024-03-01T10:00:00Z", "pageTimings": { "onLoad": 100 } }],
            "entries": [
                { "startedDateTime": "2024-03-01T10:00:00Z", "time": 1, "request": { "url": "https://a.com/" } },
                { "startedDateTime": "yesterday", "time": 1, "request": { "url": "https://a.com/x" } }
            ]
        }}"#;

        assert!(matches!(
            normalize_from_str(json, TagSet::new()),
            Err(Error::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn test_primary_domain() {
        let doc = HarDocument::from_json(SINGLE_PAGE).unwrap();
        assert_eq!(primary_domain(&doc).as_deref(), Some("example.com"));
    }

    #[test]
    fn test_normalize_from_file() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(SINGLE_PAGE.as_bytes()).unwrap();
        f.flush().unwrap();

        let timeline = normalize_from_file(f.path(), TagSet::new()).unwrap();
        assert_eq!(timeline.len(), 4);
    }

    #[test]
    fn test_round_ms() {
        assert_eq!(round_ms(730.6), 731.0);
        assert_eq!(round_ms(2.5), 3.0);
        assert_eq!(round_ms(-1.5), -1.0);
        assert_eq!(round_ms(-1.6), -2.0);
    }

    #[test]
    fn test_entry_before_navigation_start() {
        let har = r#"{"log": {
            "pages": [{ "id": "p1", "startedDateTime": "2024-03-01T10:00:00.000Z", "pageTimings": { "onLoad": 500 } }],
            "entries": [
                { "startedDateTime": "2024-03-01T09:59:59.998Z", "time": 0.5,
                  "request": { "url": "https://example.com/sw.js" },
                  "response": { "content": { "mimeType": "application/javascript" } } }
            ]
        }}"#;

        let timeline = normalize_from_str(har, TagSet::new()).unwrap();
        let record = &timeline.records[0];
        assert_eq!(record.start, -2.0);
        assert_eq!(record.end, -1.0);
    }
}
