//! # Endpoint Resolution
//!
//! Works out which URL the host should believe the request came from, and
//! derives the identity records a multisite install needs before the host is
//! able to provide them itself.

use crate::constants::{COOKIE_HASH_BYTES, LEGACY_URL_FILENAME};
use crate::core::config_resolver::MergedConfig;
use crate::models::FlagValue;
use crate::state::{BlogRecord, RequestTarget, SiteRecord};
use crate::system::host::scan_defines;
use std::fs;
use std::path::Path;
use url::Url;

/// A user-facing note produced while looking for an endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointNotice {
    /// `--url` was given without a value.
    BareUrl,
    /// `--blog` was used instead of `--url`.
    DeprecatedBlog,
    /// The legacy marker file supplied the endpoint.
    DeprecatedMarkerFile,
    /// A source yielded something that does not parse as a URL.
    InvalidUrl { url: String, reason: String },
}

impl EndpointNotice {
    pub fn message(&self) -> String {
        match self {
            Self::BareUrl => t!("url.warning.bare_url").to_string(),
            Self::DeprecatedBlog => t!("url.warning.deprecated_blog").to_string(),
            Self::DeprecatedMarkerFile => t!("url.warning.deprecated_marker").to_string(),
            Self::InvalidUrl { url, reason } => format!(t!("url.warning.invalid_url"), url = url, reason = reason),
        }
    }
}

/// Picks the endpoint, in priority order: `url`, `blog`, the legacy marker file
/// under `root`, then the network constants of the host config.
///
/// A source given without a value, or with one that does not parse, is
/// reported and skipped.
pub fn guess_url(
    config: &MergedConfig,
    root: &Path,
    host_config: Option<&Path>,
    notices: &mut Vec<EndpointNotice>,
) -> Option<RequestTarget> {
    if let Some(target) =
        explicit(config.url.as_ref(), EndpointNotice::BareUrl, notices).and_then(|url| accept(url, notices))
    {
        return Some(target);
    }
    if config.blog.is_some() {
        notices.push(EndpointNotice::DeprecatedBlog);
        if let Some(target) =
            explicit(config.blog.as_ref(), EndpointNotice::BareUrl, notices).and_then(|url| accept(url, notices))
        {
            return Some(target);
        }
    }

    let marker = root.join(LEGACY_URL_FILENAME);
    if let Ok(content) = fs::read_to_string(&marker) {
        notices.push(EndpointNotice::DeprecatedMarkerFile);
        let url = content.trim();
        if !url.is_empty()
            && let Some(target) = accept(url.to_string(), notices)
        {
            return Some(target);
        }
    }

    let code = fs::read_to_string(host_config?).ok()?;
    accept(network_url(&code)?, notices)
}

fn accept(url: String, notices: &mut Vec<EndpointNotice>) -> Option<RequestTarget> {
    match parse_endpoint(&url) {
        Ok(target) => Some(target),
        Err(e) => {
            log::debug!("Skipping unparsable endpoint '{}': {}", url, e);
            notices.push(EndpointNotice::InvalidUrl {
                url,
                reason: e.to_string(),
            });
            None
        }
    }
}

fn explicit(
    value: Option<&FlagValue>,
    bare: EndpointNotice,
    notices: &mut Vec<EndpointNotice>,
) -> Option<String> {
    match value? {
        FlagValue::Text(url) if !url.is_empty() => Some(url.clone()),
        _ => {
            notices.push(bare);
            None
        }
    }
}

/// `DOMAIN_CURRENT_SITE` followed by `PATH_CURRENT_SITE`, if the domain is
/// declared.
pub fn network_url(config_code: &str) -> Option<String> {
    let defines = scan_defines(config_code);
    let lookup = |name: &str| {
        defines
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    };
    let domain = lookup("DOMAIN_CURRENT_SITE")?;
    Some(format!("{}{}", domain, lookup("PATH_CURRENT_SITE").unwrap_or("")))
}

/// Parses an endpoint the way a browser would read it from the address bar:
/// a missing scheme means `http`.
pub fn parse_endpoint(raw: &str) -> Result<RequestTarget, url::ParseError> {
    let trimmed = raw.trim();
    let parsed = if trimmed.contains("://") {
        Url::parse(trimmed)?
    } else {
        Url::parse(&format!("http://{}", trimmed))?
    };
    let host = parsed.host_str().ok_or(url::ParseError::EmptyHost)?.to_string();

    Ok(RequestTarget {
        url: trimmed.to_string(),
        scheme: parsed.scheme().to_string(),
        host,
        port: parsed.port(),
        path: parsed.path().to_string(),
        query: parsed.query().map(str::to_string),
    })
}

/// The site and blog records a multisite install runs with before the network
/// tables exist.
pub fn network_records(target: &RequestTarget) -> (SiteRecord, BlogRecord) {
    let path = if target.path.is_empty() { "/" } else { target.path.as_str() };
    let site = SiteRecord {
        id: 1,
        blog_id: 1,
        domain: target.host.clone(),
        path: path.to_string(),
        cookie_domain: target.host.clone(),
        site_name: "Fake Site".to_string(),
    };
    let off = || "0".to_string();
    let blog = BlogRecord {
        blog_id: 1,
        site_id: 1,
        domain: target.host.clone(),
        path: path.to_string(),
        public: "1".to_string(),
        archived: off(),
        mature: off(),
        spam: off(),
        deleted: off(),
        lang_id: off(),
    };
    (site, blog)
}

/// Cookie hash derived from the host name.
pub fn cookie_hash(host: &str) -> String {
    let digest = blake3::hash(host.as_bytes());
    hex::encode(digest.as_bytes().get(..COOKIE_HASH_BYTES).unwrap_or_default())
}
