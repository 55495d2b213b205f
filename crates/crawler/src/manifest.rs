use crate::config::CrawlerConfig;
use crate::error::{CrawlError, Result};
use crate::fetcher::parse_http_date;
use crate::transport::{HttpResponse, HttpTransport};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

const SCRIPT_PATTERN: &str = r#"<script\ssrc="/assets/([0-9a-f]{20,30}\.js)""#;
const STYLESHEET_PATTERN: &str = r#"href="/assets/([.0-9a-f]{20,30}\.css)""#;
const RUNTIME_CONFIG_PATTERN: &str = r"(?s)\bwindow\.GLOBAL_ENV\b\s*=\s*(\{.+?\});";

/// Stands in for the only non-deterministic expression the config carries.
const TIMESTAMP_EXPRESSION: &str = "Date.now()";

struct Patterns {
    scripts: Regex,
    stylesheets: Regex,
    runtime_config: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        scripts: known_regex(SCRIPT_PATTERN),
        stylesheets: known_regex(STYLESHEET_PATTERN),
        runtime_config: known_regex(RUNTIME_CONFIG_PATTERN),
    })
}

fn known_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| unreachable!("invalid built-in pattern {pattern}: {e}"))
}

/// What the root document says about a build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootInfo {
    pub id: String,
    pub date: Option<DateTime<Utc>>,
    /// Scripts first, then stylesheets, each in document order.
    pub root_assets: Vec<String>,
    pub runtime_config: Value,
}

impl RootInfo {
    /// Read a root document already in hand. `id` falls back to the
    /// SHA-256 of the body.
    pub fn from_document(body: &str, id: Option<&str>, date: Option<DateTime<Utc>>) -> Self {
        let id = id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| content_hash(body));
        Self {
            id,
            date,
            root_assets: root_asset_names(body),
            runtime_config: runtime_config(body),
        }
    }

    fn from_response(response: &HttpResponse) -> Self {
        Self::from_document(
            &response.body,
            response.header("x-build-id"),
            response.header("last-modified").and_then(parse_http_date),
        )
    }
}

/// Locates the root document for the live build or for a given identifier.
pub struct ManifestResolver {
    transport: Arc<dyn HttpTransport>,
    app_url: String,
    lookup_url: Option<String>,
    lookup_auth: Option<String>,
}

impl ManifestResolver {
    pub fn new(config: &CrawlerConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            app_url: config.app_url(),
            lookup_url: config.lookup_url.clone(),
            lookup_auth: config.lookup_auth.clone(),
        }
    }

    /// `None` resolves the channel's live build; `Some(id)` goes through the
    /// authenticated lookup endpoint.
    pub async fn resolve(&self, selector: Option<&str>) -> Result<RootInfo> {
        let url = match selector {
            None => self.app_url.clone(),
            Some(id) => self.lookup_url_for(id)?,
        };
        log::info!("Resolving manifest {}", redact(&url));

        let response = self
            .transport
            .get(&url)
            .await
            .map_err(|e| CrawlError::ManifestFetch(e.to_string()))?;
        if !response.is_success() {
            return Err(CrawlError::ManifestFetch(format!(
                "HTTP error: status {}",
                response.status
            )));
        }

        let root = RootInfo::from_response(&response);
        log::info!(
            "Manifest {} lists {} root asset(s)",
            root.id,
            root.root_assets.len()
        );
        Ok(root)
    }

    fn lookup_url_for(&self, id: &str) -> Result<String> {
        let base = self.lookup_url.as_deref().ok_or_else(|| {
            CrawlError::Configuration("build lookup requires BUILDSCOPE_LOOKUP_URL".to_string())
        })?;
        let auth = self.lookup_auth.as_deref().ok_or_else(|| {
            CrawlError::Configuration("build lookup requires BUILDSCOPE_LOOKUP_AUTH".to_string())
        })?;
        let url = reqwest::Url::parse_with_params(base, &[("auth", auth), ("hash", id)])
            .map_err(|e| CrawlError::Configuration(format!("invalid lookup URL '{base}': {e}")))?;
        Ok(url.into())
    }
}

/// Script and stylesheet names referenced by the document, deduplicated.
pub fn root_asset_names(body: &str) -> Vec<String> {
    let patterns = patterns();
    let mut seen = HashSet::new();
    patterns
        .scripts
        .captures_iter(body)
        .chain(patterns.stylesheets.captures_iter(body))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// The embedded runtime configuration, or `{}` when absent or unreadable.
pub fn runtime_config(body: &str) -> Value {
    let Some(literal) = patterns()
        .runtime_config
        .captures(body)
        .and_then(|caps| caps.get(1))
    else {
        return empty_object();
    };

    let literal = literal
        .as_str()
        .replace(TIMESTAMP_EXPRESSION, &format!("\"{TIMESTAMP_EXPRESSION}\""));
    match buildscope_syntax::evaluate_literal(&literal) {
        Ok(value) => value,
        Err(err) => {
            log::warn!("Runtime configuration is not a plain literal, using {{}}: {err}");
            empty_object()
        }
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn content_hash(body: &str) -> String {
    let digest = Sha256::digest(body.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn redact(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(mut parsed) if parsed.query().is_some() => {
            parsed.set_query(Some("redacted"));
            parsed.to_string()
        }
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_transport::MemoryTransport;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const DOCUMENT: &str = r#"<!DOCTYPE html><html><head>
<link rel="stylesheet" href="/assets/40532.4edc73d7c44300b9ad0e.css" integrity="">
<script nonce="abc">window.GLOBAL_ENV = {
  API_ENDPOINT: '//discord.com/api',
  API_VERSION: 9,
  RELEASE_CHANNEL: 'canary',
  BUILT_AT: "1700000000000",
  SENTRY_TAGS: {"buildId":"abc","buildType":"normal"},
  HTML_TIMESTAMP: Date.now(),
};</script>
</head><body>
<script src="/assets/aaaa1111aaaa1111aaaa.js" defer></script>
<script src="/assets/aaaa1111aaaa1111aaaa.js" defer></script>
</body></html>"#;

    #[test]
    fn finds_scripts_then_stylesheets_once_each() {
        assert_eq!(
            root_asset_names(DOCUMENT),
            vec![
                "aaaa1111aaaa1111aaaa.js".to_string(),
                "40532.4edc73d7c44300b9ad0e.css".to_string(),
            ]
        );
        assert!(root_asset_names("<script src=\"/assets/short.js\">").is_empty());
    }

    #[test]
    fn runtime_config_is_evaluated_with_a_fixed_timestamp() {
        let config = runtime_config(DOCUMENT);
        assert_eq!(config["API_VERSION"], json!(9));
        assert_eq!(config["RELEASE_CHANNEL"], json!("canary"));
        assert_eq!(config["SENTRY_TAGS"]["buildType"], json!("normal"));
        assert_eq!(config["HTML_TIMESTAMP"], json!("Date.now()"));
    }

    #[test]
    fn runtime_config_defaults_to_empty_object() {
        assert_eq!(runtime_config("<html></html>"), json!({}));
        assert_eq!(
            runtime_config("window.GLOBAL_ENV = {a: fetch()};"),
            json!({})
        );
    }

    #[test]
    fn id_falls_back_to_content_hash() {
        let root = RootInfo::from_document("", None, None);
        assert_eq!(
            root.id,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        let root = RootInfo::from_document("", Some("  "), None);
        assert_eq!(root.id.len(), 64);
        assert_eq!(RootInfo::from_document("", Some("b1"), None).id, "b1");
    }

    #[tokio::test]
    async fn resolves_live_build_from_headers() {
        let transport = Arc::new(MemoryTransport::new());
        transport.route(
            "https://discord.com/app",
            HttpResponse::ok(DOCUMENT)
                .with_header("x-build-id", "f00dcafe")
                .with_header("last-modified", "Wed, 01 Nov 2023 10:00:00 GMT"),
        );
        let resolver = ManifestResolver::new(&CrawlerConfig::default(), transport);

        let root = resolver.resolve(None).await.unwrap();
        assert_eq!(root.id, "f00dcafe");
        assert_eq!(root.root_assets.len(), 2);
        assert_eq!(
            root.date.map(|d| d.to_rfc3339()),
            Some("2023-11-01T10:00:00+00:00".to_string())
        );
    }

    #[tokio::test]
    async fn selector_needs_lookup_configuration() {
        let transport = Arc::new(MemoryTransport::new());
        let resolver = ManifestResolver::new(&CrawlerConfig::default(), transport.clone());

        let err = resolver.resolve(Some("abc")).await.unwrap_err();
        assert!(matches!(err, CrawlError::Configuration(_)));
        assert_eq!(transport.total_calls(), 0);
    }

    #[tokio::test]
    async fn selector_goes_through_lookup_endpoint() {
        let transport = Arc::new(MemoryTransport::new());
        transport.route(
            "https://builds.example.test/lookup?auth=s3cret&hash=abc",
            HttpResponse::ok(DOCUMENT),
        );
        let config = CrawlerConfig {
            lookup_url: Some("https://builds.example.test/lookup".into()),
            lookup_auth: Some("s3cret".into()),
            ..CrawlerConfig::default()
        };
        let resolver = ManifestResolver::new(&config, transport);

        let root = resolver.resolve(Some("abc")).await.unwrap();
        assert_eq!(root.root_assets.len(), 2);
    }

    #[tokio::test]
    async fn unreachable_manifest_is_fatal() {
        let transport = Arc::new(MemoryTransport::new());
        let resolver = ManifestResolver::new(&CrawlerConfig::default(), transport);
        let err = resolver.resolve(None).await.unwrap_err();
        assert_eq!(
            err,
            CrawlError::ManifestFetch("HTTP error: status 404".to_string())
        );
    }
}
