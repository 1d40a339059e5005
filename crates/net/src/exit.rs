use serde::{Deserialize, Serialize};

use crate::ProbeTransport;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExitStatus {
    Ok,
    HttpError,
    Unknown,
}

impl ExitStatus {
    pub fn from_http(status: u16) -> Self {
        match status {
            200..=399 => ExitStatus::Ok,
            400..=599 => ExitStatus::HttpError,
            _ => ExitStatus::Unknown,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitResolution {
    pub requested: String,
    pub normalized: Option<String>,
    pub final_url: Option<String>,
    pub http_status: Option<u16>,
    pub status: ExitStatus,
}

const NON_NAVIGABLE: &[&str] = &["javascript:", "mailto:", "tel:", "data:", "about:", "blob:"];

// "landing.html" is a file, not a host
const FILE_SUFFIXES: &[&str] = &["html", "htm", "php", "asp", "aspx", "jsp", "js", "css", "png", "jpg", "gif"];

/// Turn whatever the creative handed us into an absolute http(s) URL.
///
/// - protocol-relative `//host/x` gets `https:`
/// - relative references resolve against `base` when there is one
/// - otherwise bare hosts (`www.example.com/x`, `example.com`) get `https://`
pub fn normalize_destination(destination: &str, base: Option<&str>) -> Option<String> {
    let trimmed = destination.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if NON_NAVIGABLE.iter().any(|scheme| lower.starts_with(scheme)) {
        return None;
    }

    if trimmed.starts_with("//") {
        return http_only(&format!("https:{trimmed}"));
    }

    match url::Url::parse(trimmed) {
        Ok(parsed) => {
            if matches!(parsed.scheme(), "http" | "https") {
                return Some(parsed.to_string());
            }
            // "example.com:8080/x" parses with scheme "example.com"
            if looks_like_host(trimmed) {
                return http_only(&format!("https://{trimmed}"));
            }
            None
        }
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let www = lower.starts_with("www.");
            match base {
                Some(base) if !www => {
                    let base = url::Url::parse(base).ok()?;
                    let joined = base.join(trimmed).ok()?;
                    matches!(joined.scheme(), "http" | "https").then(|| joined.to_string())
                }
                _ if www || looks_like_host(trimmed) => {
                    http_only(&format!("https://{trimmed}"))
                }
                _ => None,
            }
        }
        Err(_) => None,
    }
}

fn http_only(candidate: &str) -> Option<String> {
    let parsed = url::Url::parse(candidate).ok()?;
    matches!(parsed.scheme(), "http" | "https").then(|| parsed.to_string())
}

fn looks_like_host(s: &str) -> bool {
    if s.starts_with('/') || s.starts_with('.') || s.contains(char::is_whitespace) {
        return false;
    }
    let host = s.split(['/', '?', '#']).next().unwrap_or("");
    let host = host.split(':').next().unwrap_or("");
    host.contains('.')
        && !host.ends_with('.')
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        && host
            .rsplit('.')
            .next()
            .is_some_and(|tld| {
                tld.len() >= 2
                    && tld.chars().all(|c| c.is_ascii_alphabetic())
                    && !FILE_SUFFIXES.iter().any(|f| tld.eq_ignore_ascii_case(f))
            })
}

/// Resolve one click-exit destination. Network faults never escape: they
/// come back as `ExitStatus::Unknown`.
pub fn resolve_exit(
    transport: &dyn ProbeTransport,
    destination: &str,
    base: Option<&str>,
) -> ExitResolution {
    let Some(normalized) = normalize_destination(destination, base) else {
        return ExitResolution {
            requested: destination.to_string(),
            normalized: None,
            final_url: None,
            http_status: None,
            status: ExitStatus::Unknown,
        };
    };

    match transport.probe(&normalized) {
        Ok(resp) => ExitResolution {
            requested: destination.to_string(),
            normalized: Some(normalized),
            final_url: Some(resp.final_url),
            http_status: Some(resp.status),
            status: ExitStatus::from_http(resp.status),
        },
        Err(err) => {
            log::debug!(target: "net", "exit probe for {normalized} failed: {err}");
            ExitResolution {
                requested: destination.to_string(),
                normalized: Some(normalized),
                final_url: None,
                http_status: None,
                status: ExitStatus::Unknown,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NetError, ProbeResponse};
    use std::cell::RefCell;

    struct FixedStatus {
        status: u16,
        seen: RefCell<Vec<String>>,
    }

    impl ProbeTransport for FixedStatus {
        fn probe(&self, url: &str) -> Result<ProbeResponse, NetError> {
            self.seen.borrow_mut().push(url.to_string());
            Ok(ProbeResponse {
                status: self.status,
                final_url: url.to_string(),
            })
        }
    }

    struct Offline;

    impl ProbeTransport for Offline {
        fn probe(&self, _url: &str) -> Result<ProbeResponse, NetError> {
            Err(NetError::Request("connection refused".into()))
        }
    }

    fn fixed(status: u16) -> FixedStatus {
        FixedStatus {
            status,
            seen: RefCell::new(Vec::new()),
        }
    }

    #[test]
    fn ok_on_200_and_http_error_on_404() {
        let dest = "https://example.com/x?utm=1";

        let t = fixed(200);
        let res = resolve_exit(&t, dest, None);
        assert_eq!(res.status, ExitStatus::Ok);
        assert_eq!(res.http_status, Some(200));
        assert_eq!(t.seen.borrow().as_slice(), ["https://example.com/x?utm=1"]);

        let res = resolve_exit(&fixed(404), dest, None);
        assert_eq!(res.status, ExitStatus::HttpError);
    }

    #[test]
    fn network_errors_collapse_to_unknown() {
        let res = resolve_exit(&Offline, "https://example.com", None);
        assert_eq!(res.status, ExitStatus::Unknown);
        assert_eq!(res.normalized.as_deref(), Some("https://example.com/"));
    }

    #[test]
    fn normalization_forms() {
        assert_eq!(
            normalize_destination("//cdn.example.com/a", None).as_deref(),
            Some("https://cdn.example.com/a")
        );
        assert_eq!(
            normalize_destination("www.example.com/landing", None).as_deref(),
            Some("https://www.example.com/landing")
        );
        assert_eq!(
            normalize_destination("landing.html", Some("https://ads.example.com/c/index.html"))
                .as_deref(),
            Some("https://ads.example.com/c/landing.html")
        );
        assert_eq!(normalize_destination("javascript:void(0)", None), None);
        assert_eq!(normalize_destination("landing.html", None), None);
        assert_eq!(normalize_destination("   ", None), None);
    }

    #[test]
    fn unresolvable_destination_is_unknown_without_probing() {
        let t = fixed(200);
        let res = resolve_exit(&t, "mailto:someone@example.com", None);
        assert_eq!(res.status, ExitStatus::Unknown);
        assert!(t.seen.borrow().is_empty());
    }

    #[test]
    fn status_classes() {
        assert_eq!(ExitStatus::from_http(301), ExitStatus::Ok);
        assert_eq!(ExitStatus::from_http(503), ExitStatus::HttpError);
        assert_eq!(ExitStatus::from_http(0), ExitStatus::Unknown);
    }
}
