use regex::Regex;

/// Module-id → chunk-hash table inside the bundler runtime, directly followed
/// by the `[x]+".js"` suffix expression.
const LOADER_MAP_PATTERN: &str = r#"(\{(?:[\de]+:"[0-9a-f]{20}",?\n?)+\})(?:\[\w\]\+"\.js")"#;

const BUILD_INFO_PATTERN: &str = r"Build Number: (\d{4,6}), Version Hash: ([a-f0-9]{40})";

/// Strings that only the vendor bundle carries.
const VENDOR_MARKERS: [&str; 3] = [
    "fa97a90475514c03a42f80cd36d147c4@sentry.io/140984",
    "Error invoking remote method 'DISCORD_NATIVE_MODULES_INSTALL'",
    "Failed to setup Krisp module",
];

/// Keys of the class-name mapping module.
const STYLE_MAPPER_KEYS: [&str; 8] = [
    "createAccountTemplateHeader:\"",
    "paymentRow:\"",
    "visible:\"",
    "minWidthLarge:\"",
    "uploadIcon:\"",
    "channelNameContainer:\"",
    "searchBar:\"",
    "emptyStateSubtext:\"",
];

/// Permissive on purpose: exactly one mapper is expected per build and a
/// missed one costs more than a stray tag.
const STYLE_MAPPER_THRESHOLD: usize = 5;

const APP_MAIN_MARKERS: [&str; 3] = ["Release Channel:", "Build Number:", "Version Hash:"];

const CHUNK_MARKERS: [&str; 1] =
    ["this.webpackChunkdiscord_app=this.webpackChunkdiscord_app||[]"];

/// Structural fingerprints of the bundler output.
#[derive(Debug, Clone)]
pub struct Signatures {
    pub stylesheet_extension: String,
    pub script_extension: String,
    pub loader_map: Regex,
    pub vendor_markers: Vec<String>,
    pub style_mapper_keys: Vec<String>,
    pub style_mapper_threshold: usize,
    pub app_main_markers: Vec<String>,
    pub chunk_markers: Vec<String>,
    pub build_info: Regex,
}

impl Default for Signatures {
    fn default() -> Self {
        Self {
            stylesheet_extension: ".css".to_string(),
            script_extension: ".js".to_string(),
            loader_map: known_regex(LOADER_MAP_PATTERN),
            vendor_markers: owned(&VENDOR_MARKERS),
            style_mapper_keys: owned(&STYLE_MAPPER_KEYS),
            style_mapper_threshold: STYLE_MAPPER_THRESHOLD,
            app_main_markers: owned(&APP_MAIN_MARKERS),
            chunk_markers: owned(&CHUNK_MARKERS),
            build_info: known_regex(BUILD_INFO_PATTERN),
        }
    }
}

impl Signatures {
    pub fn is_vendor(&self, text: &str) -> bool {
        contains_all(text, &self.vendor_markers)
    }

    pub fn is_app_main(&self, text: &str) -> bool {
        contains_all(text, &self.app_main_markers)
    }

    pub fn is_chunk(&self, text: &str) -> bool {
        contains_all(text, &self.chunk_markers)
    }

    /// Number of distinct mapper keys present in `text`.
    pub fn style_mapper_hits(&self, text: &str) -> usize {
        self.style_mapper_keys
            .iter()
            .filter(|key| text.contains(key.as_str()))
            .count()
    }

    pub fn is_style_mapper(&self, text: &str) -> bool {
        self.style_mapper_hits(text) >= self.style_mapper_threshold
    }

    /// Source of the loader's module map literal, if present.
    pub fn loader_map_literal<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.loader_map
            .captures(text)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str())
    }
}

fn contains_all(text: &str, markers: &[String]) -> bool {
    !markers.is_empty() && markers.iter().all(|marker| text.contains(marker.as_str()))
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn known_regex(pattern: &str) -> Regex {
    // Compile-time constants; a failure here is a programming error.
    Regex::new(pattern).unwrap_or_else(|e| unreachable!("invalid built-in pattern {pattern}: {e}"))
}
