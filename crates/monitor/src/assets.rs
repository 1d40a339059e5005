//! Asset Resolution Table: maps the creative's declared relative paths to
//! local content handles so nothing it references needs the network.
//!
//! Built once per load from the injection payload. Lookups try the exact
//! spelling first, then a case-insensitive fallback. References that do
//! not resolve (absolute URLs, `data:`, `javascript:`, anchors) are left
//! untouched by every rewriting path.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::MonitorError;

/// Wire shape handed to the monitored context at injection time.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssetPayload {
    pub primary_path: String,
    pub entries: BTreeMap<String, String>,
    pub sizes: BTreeMap<String, u64>,
}

impl AssetPayload {
    pub fn from_json(text: &str) -> Result<Self, MonitorError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Payload for a declared file set. Each file gets the handle
    /// `{handle_prefix}{path}`.
    pub fn from_files<I>(primary_path: &str, files: I, handle_prefix: &str) -> Self
    where
        I: IntoIterator<Item = (String, u64)>,
    {
        let mut entries = BTreeMap::new();
        let mut sizes = BTreeMap::new();
        for (path, len) in files {
            let path = clean_declared(&path);
            let handle = format!("{handle_prefix}{path}");
            sizes.insert(handle.clone(), len);
            entries.insert(path, handle);
        }
        Self {
            primary_path: clean_declared(primary_path),
            entries,
            sizes,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct AssetTable {
    base_dir: String,
    exact: HashMap<String, String>,
    folded: HashMap<String, String>,
    sizes: HashMap<String, u64>,
}

impl AssetTable {
    pub fn new(payload: &AssetPayload) -> Self {
        let primary = clean_declared(&payload.primary_path);
        let base_dir = match primary.rfind('/') {
            Some(i) => primary[..i].to_string(),
            None => String::new(),
        };

        let mut exact = HashMap::new();
        let mut folded = HashMap::new();
        for (declared, handle) in &payload.entries {
            let key = normalize_segments(&clean_declared(declared));
            folded
                .entry(key.to_lowercase())
                .or_insert_with(|| handle.clone());
            exact.insert(key, handle.clone());
        }

        Self {
            base_dir,
            exact,
            folded,
            sizes: payload.sizes.clone().into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }

    pub fn len(&self) -> usize {
        self.exact.len()
    }

    /// Local handle for a reference written by the creative, if the
    /// reference names a declared file.
    pub fn resolve(&self, reference: &str) -> Option<&str> {
        let path = self.bundle_path(reference)?;
        if let Some(handle) = self.exact.get(&path) {
            return Some(handle.as_str());
        }
        let lower = path.to_lowercase();
        if let Some(handle) = self.folded.get(&lower) {
            return Some(handle.as_str());
        }
        // "my%20file.png" declared as "my file.png"
        if path.contains("%20") {
            let spaced = path.replace("%20", " ");
            return self
                .exact
                .get(&spaced)
                .or_else(|| self.folded.get(&spaced.to_lowercase()))
                .map(String::as_str);
        }
        None
    }

    pub fn size_of_handle(&self, handle: &str) -> Option<u64> {
        self.sizes.get(handle).copied()
    }

    /// Every local handle, for revocation at teardown.
    pub fn handles(&self) -> Vec<String> {
        let mut handles: Vec<String> = self.exact.values().cloned().collect();
        handles.sort();
        handles.dedup();
        handles
    }

    /// Rewrite every resolvable `url(...)` token in style-sheet text.
    pub fn rewrite_css<'a>(&self, css: &'a str) -> Cow<'a, str> {
        css::rewrite_urls(css, |arg| self.resolve(arg).map(str::to_string))
    }

    /// Rewrite `src`/`href`/`poster` attribute values and `url(...)`
    /// tokens in markup written into the document.
    pub fn rewrite_markup<'a>(&self, html: &'a str) -> Cow<'a, str> {
        let attrs = self.rewrite_attributes(html);
        let both = match self.rewrite_css(&attrs) {
            Cow::Owned(both) => Some(both),
            Cow::Borrowed(_) => None,
        };
        match both {
            Some(both) => Cow::Owned(both),
            None => attrs,
        }
    }

    fn rewrite_attributes<'a>(&self, html: &'a str) -> Cow<'a, str> {
        let mut out = String::new();
        let mut copied = 0usize;
        let mut from = 0usize;

        while let Some(value) = next_reference_attribute(html, from) {
            from = value.end;
            let Some(handle) = self.resolve(&html[value.start..value.stop]) else {
                continue;
            };
            out.push_str(&html[copied..value.start]);
            out.push_str(handle);
            copied = value.stop;
        }

        if copied == 0 {
            return Cow::Borrowed(html);
        }
        out.push_str(&html[copied..]);
        Cow::Owned(out)
    }

    // Map a reference to its path inside the bundle, or None when it
    // points somewhere else entirely.
    fn bundle_path(&self, reference: &str) -> Option<String> {
        let r = reference.trim();
        if r.is_empty() || r.starts_with('#') || r.starts_with("//") {
            return None;
        }
        if url::Url::parse(r).is_ok() {
            // has a scheme: http:, data:, javascript:, blob:, or a handle
            return None;
        }
        let r = r.split(['?', '#']).next().unwrap_or("");
        if r.is_empty() {
            return None;
        }
        let r = r.replace('\\', "/");
        let joined = if r.starts_with('/') || self.base_dir.is_empty() {
            r
        } else {
            format!("{}/{}", self.base_dir, r)
        };
        let path = normalize_segments(&joined);
        (!path.is_empty()).then_some(path)
    }
}

fn clean_declared(path: &str) -> String {
    let p = path.trim().replace('\\', "/");
    p.trim_start_matches("./").trim_start_matches('/').to_string()
}

/// Collapse `.` and `..` segments; `..` above the bundle root is dropped.
fn normalize_segments(path: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            s => out.push(s),
        }
    }
    out.join("/")
}

const REFERENCE_ATTRIBUTES: &[&str] = &["src", "href", "poster"];

struct AttrValue {
    start: usize,
    stop: usize,
    // resume scanning here
    end: usize,
}

fn next_reference_attribute(html: &str, from: usize) -> Option<AttrValue> {
    let bytes = html.as_bytes();
    let mut i = from.max(1);
    while i < bytes.len() {
        if !bytes[i - 1].is_ascii_whitespace() {
            i += 1;
            continue;
        }
        let Some(name) = REFERENCE_ATTRIBUTES.iter().find(|name| {
            bytes.len() >= i + name.len()
                && bytes[i..i + name.len()].eq_ignore_ascii_case(name.as_bytes())
        }) else {
            i += 1;
            continue;
        };

        let mut j = i + name.len();
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if j >= bytes.len() || bytes[j] != b'=' {
            i += 1;
            continue;
        }
        j += 1;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if j >= bytes.len() {
            return None;
        }

        let quote = bytes[j];
        if quote == b'"' || quote == b'\'' {
            let start = j + 1;
            let stop = start + html[start..].find(quote as char)?;
            return Some(AttrValue {
                start,
                stop,
                end: stop + 1,
            });
        }
        let start = j;
        let stop = html[start..]
            .find(|c: char| c.is_ascii_whitespace() || c == '>')
            .map(|n| start + n)
            .unwrap_or(html.len());
        return Some(AttrValue {
            start,
            stop,
            end: stop,
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> AssetTable {
        let payload = AssetPayload::from_files(
            "creative/index.html",
            vec![
                ("creative/index.html".to_string(), 900),
                ("creative/img/Logo.PNG".to_string(), 1200),
                ("creative/css/main.css".to_string(), 300),
                ("shared/font.woff".to_string(), 5000),
                ("creative/my file.png".to_string(), 10),
            ],
            "local://bundle/",
        );
        AssetTable::new(&payload)
    }

    #[test]
    fn resolves_relative_to_primary_document() {
        let t = table();
        assert_eq!(t.resolve("img/Logo.PNG"), Some("local://bundle/creative/img/Logo.PNG"));
        assert_eq!(t.resolve("./css/main.css?v=3"), Some("local://bundle/creative/css/main.css"));
        assert_eq!(t.resolve("../shared/font.woff"), Some("local://bundle/shared/font.woff"));
        assert_eq!(t.resolve("/shared/font.woff"), Some("local://bundle/shared/font.woff"));
    }

    #[test]
    fn falls_back_to_case_insensitive_lookup() {
        let t = table();
        assert_eq!(t.resolve("IMG/logo.png"), Some("local://bundle/creative/img/Logo.PNG"));
        assert_eq!(t.resolve("my%20file.png"), Some("local://bundle/creative/my file.png"));
    }

    #[test]
    fn external_references_pass_through() {
        let t = table();
        assert_eq!(t.resolve("https://cdn.example.com/img/Logo.PNG"), None);
        assert_eq!(t.resolve("//cdn.example.com/x.js"), None);
        assert_eq!(t.resolve("data:image/png;base64,AAAA"), None);
        assert_eq!(t.resolve("javascript:void(0)"), None);
        assert_eq!(t.resolve("#top"), None);
        assert_eq!(t.resolve("missing.png"), None);
    }

    #[test]
    fn sizes_follow_handles() {
        let t = table();
        assert_eq!(t.size_of_handle("local://bundle/creative/img/Logo.PNG"), Some(1200));
        assert_eq!(t.handles().len(), 5);
    }

    #[test]
    fn rewrites_markup_attributes_and_inline_urls() {
        let t = table();
        let html = r#"<img src="img/logo.png" data-src="img/logo.png"><a href=https://x.com>x</a><div style="background:url(css/main.css)"></div>"#;
        let out = t.rewrite_markup(html);
        assert!(out.contains(r#"<img src="local://bundle/creative/img/Logo.PNG""#));
        assert!(out.contains(r#"data-src="img/logo.png""#));
        assert!(out.contains("href=https://x.com>"));
        assert!(out.contains("url(local://bundle/creative/css/main.css)"));
    }

    #[test]
    fn payload_round_trips_wire_names() {
        let json = r#"{"primaryPath":"index.html","entries":{"a.png":"blob:1"},"sizes":{"blob:1":42}}"#;
        let payload = AssetPayload::from_json(json).unwrap();
        let t = AssetTable::new(&payload);
        assert_eq!(t.resolve("a.png"), Some("blob:1"));
        assert_eq!(t.size_of_handle("blob:1"), Some(42));
        assert!(AssetPayload::from_json("{").is_err());
    }
}
