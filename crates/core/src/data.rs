//! Data structures for normalized request records

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Resource category derived from the response MIME type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Image,
    Script,
    Style,
    Font,
    Other,
}

impl ResourceType {
    /// Classification table, checked in order. First substring hit wins.
    const MIME_MARKERS: [(&'static str, ResourceType); 4] = [
        ("image", ResourceType::Image),
        ("script", ResourceType::Script),
        ("css", ResourceType::Style),
        ("font", ResourceType::Font),
    ];

    /// Classify a MIME type such as `image/png` or `text/css; charset=utf-8`
    pub fn from_mime(mime_type: &str) -> Self {
        let mime_type = mime_type.to_ascii_lowercase();
        Self::MIME_MARKERS
            .iter()
            .find(|(marker, _)| mime_type.contains(*marker))
            .map(|(_, kind)| *kind)
            .unwrap_or(ResourceType::Other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Image => "image",
            ResourceType::Script => "script",
            ResourceType::Style => "style",
            ResourceType::Font => "font",
            ResourceType::Other => "other",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" => Ok(ResourceType::Image),
            "script" => Ok(ResourceType::Script),
            "style" => Ok(ResourceType::Style),
            "font" => Ok(ResourceType::Font),
            "other" => Ok(ResourceType::Other),
            other => Err(format!("Unknown resource type: {}", other)),
        }
    }
}

/// A single network request, placed on the page timeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestRecord {
    /// Abbreviated URL: no scheme, `www.`, query or fragment
    pub url: String,
    /// The request URL as captured
    pub full_url: String,
    /// Part of `url` before the first `/`
    pub domain: String,
    /// Part of `url` from the first `/` on (empty when there is none)
    pub path: String,
    /// Resource category
    #[serde(rename = "type")]
    pub kind: ResourceType,
    /// Raw response MIME type
    pub mime_type: String,
    /// Start offset from navigation start, in ms
    pub start: f64,
    /// Elapsed time, in ms
    pub duration: f64,
    /// `round(start + duration)`
    pub end: f64,
    /// Result of every configured tag rule
    pub tags: BTreeMap<String, bool>,
}

impl RequestRecord {
    /// Whether the named tag evaluated to true. Unknown tags are false.
    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.get(name).copied().unwrap_or(false)
    }

    /// Names of the tags that are set on this record, in name order
    pub fn active_tags(&self) -> impl Iterator<Item = &str> {
        self.tags
            .iter()
            .filter(|(_, set)| **set)
            .map(|(name, _)| name.as_str())
    }

    /// Whether `domain` is `base` or one of its subdomains
    pub fn is_under_domain(&self, base: &str) -> bool {
        domain_matches(&self.domain, base)
    }
}

/// `domain == base` or `domain` ends with `.base`, ignoring ASCII case
pub fn domain_matches(domain: &str, base: &str) -> bool {
    let domain = domain.to_ascii_lowercase();
    let base = base.to_ascii_lowercase();
    let base = base.trim_start_matches("www.");
    domain == base || domain.ends_with(&format!(".{}", base))
}

/// Normalized records of one page load, plus the page milestones
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Timeline {
    /// Identifier of the page the records belong to
    pub page_id: String,
    /// Page title, when the capture has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_title: Option<String>,
    /// onLoad offset in ms; records starting after it are excluded
    pub on_load: f64,
    /// DOMContentLoaded offset in ms
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_content_load: Option<f64>,
    /// Records in capture order
    pub records: Vec<RequestRecord>,
}

impl Timeline {
    pub fn records(&self) -> &[RequestRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rightmost `end` of all records, 0 for an empty timeline
    pub fn span(&self) -> f64 {
        self.records.iter().map(|r| r.end).fold(0.0, f64::max)
    }

    /// Number of records per resource type
    pub fn count_by_kind(&self) -> BTreeMap<ResourceType, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Records carrying the named tag
    pub fn tagged<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a RequestRecord> + 'a {
        self.records.iter().filter(move |r| r.has_tag(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record(url: &str, kind: ResourceType, end: f64, tags: &[(&str, bool)]) -> RequestRecord {
        let (domain, path) = match url.find('/') {
            Some(i) => (url[..i].to_string(), url[i..].to_string()),
            None => (url.to_string(), String::new()),
        };
        RequestRecord {
            url: url.to_string(),
            full_url: format!("https://{}", url),
            domain,
            path,
            kind,
            mime_type: String::new(),
            start: 0.0,
            duration: end,
            end,
            tags: tags.iter().map(|(n, v)| (n.to_string(), *v)).collect(),
        }
    }

    #[test]
    fn test_resource_type_from_mime() {
        assert_eq!(ResourceType::from_mime("image/png"), ResourceType::Image);
        assert_eq!(
            ResourceType::from_mime("application/javascript"),
            ResourceType::Script
        );
        assert_eq!(
            ResourceType::from_mime("text/css; charset=utf-8"),
            ResourceType::Style
        );
        assert_eq!(ResourceType::from_mime("font/woff2"), ResourceType::Font);
        assert_eq!(ResourceType::from_mime("text/html"), ResourceType::Other);
        assert_eq!(ResourceType::from_mime(""), ResourceType::Other);
        assert_eq!(ResourceType::from_mime("Image/JPEG"), ResourceType::Image);
    }

    #[test]
    fn test_resource_type_precedence() {
        // image wins over script, script wins over font
        assert_eq!(ResourceType::from_mime("image/x-script"), ResourceType::Image);
        assert_eq!(
            ResourceType::from_mime("application/x-font-script"),
            ResourceType::Script
        );
    }

    #[test]
    fn test_resource_type_parse() {
        assert_eq!("style".parse::<ResourceType>().unwrap(), ResourceType::Style);
        assert_eq!(" Font ".parse::<ResourceType>().unwrap(), ResourceType::Font);
        assert!("video".parse::<ResourceType>().is_err());
    }

    #[test]
    fn test_domain_matches() {
        assert!(domain_matches("example.com", "example.com"));
        assert!(domain_matches("cdn.example.com", "example.com"));
        assert!(domain_matches("example.com", "www.example.com"));
        assert!(domain_matches("cdn.example.com", "WWW.Example.com"));
        assert!(!domain_matches("badexample.com", "example.com"));
        assert!(!domain_matches("example.org", "example.com"));
    }

    #[test]
    fn test_timeline_summaries() {
        let timeline = Timeline {
            page_id: "page_1".to_string(),
            page_title: None,
            on_load: 900.0,
            on_content_load: None,
            records: vec![
                make_record("a.com/", ResourceType::Other, 120.0, &[("ours", true)]),
                make_record("a.com/app.js", ResourceType::Script, 450.0, &[("ours", true)]),
                make_record("cdn.b.com/x.png", ResourceType::Image, 300.0, &[("ours", false)]),
            ],
        };

        assert_eq!(timeline.len(), 3);
        assert_eq!(timeline.span(), 450.0);
        assert_eq!(timeline.tagged("ours").count(), 2);
        assert_eq!(timeline.tagged("missing").count(), 0);

        let counts = timeline.count_by_kind();
        assert_eq!(counts.get(&ResourceType::Script), Some(&1));
        assert_eq!(counts.get(&ResourceType::Font), None);
    }

    #[test]
    fn test_record_serializes_kind_as_type() {
        let record = make_record("a.com/s.css", ResourceType::Style, 10.0, &[]);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "style");
        assert_eq!(json["domain"], "a.com");
    }
}
