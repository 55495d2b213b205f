use buildscope_crawler::CrawlReport;
use buildscope_protocol::AssetTag;
use std::collections::BTreeMap;

pub fn render_crawl_summary(report: &CrawlReport) -> String {
    let build = &report.build;

    let mut md = String::new();
    md.push_str(&format!("# Build `{}`\n\n", build.id));
    md.push_str(&format!(
        "- Channel: `{}` ({:?})\n",
        build.release_channel, build.build_env
    ));
    md.push_str(&format!(
        "- Date: `{}`\n",
        build
            .date
            .map_or("n/a".to_string(), |date| date.to_rfc3339())
    ));
    if let Some(info) = &build.build_info {
        md.push_str(&format!(
            "- Build number: `{}` (`{}`)\n",
            info.build_number, info.version_hash
        ));
    }
    md.push_str(&format!(
        "- Assets: `{}` from `{}` root(s), `{}` iteration(s)\n",
        build.assets.len(),
        build.root_assets.len(),
        report.stats.iterations
    ));
    md.push_str(&format!("- Experiments: `{}`\n\n", build.experiment_count()));

    let mut by_tag: BTreeMap<String, usize> = BTreeMap::new();
    for asset in &build.assets {
        if asset.tags.is_empty() {
            *by_tag.entry("untagged".to_string()).or_default() += 1;
        }
        for tag in &asset.tags {
            *by_tag.entry(tag_label(*tag).to_string()).or_default() += 1;
        }
    }
    md.push_str("## Tags\n\n| tag | assets |\n|---|---:|\n");
    for (tag, count) in &by_tag {
        md.push_str(&format!("| `{tag}` | `{count}` |\n"));
    }
    md.push('\n');

    if !report.failures.is_empty() {
        md.push_str("## Failures\n\n| asset | stage | attempts | message |\n|---|---|---:|---|\n");
        for failure in &report.failures {
            md.push_str(&format!(
                "| `{}` | `{:?}` | `{}` | {} |\n",
                failure.name,
                failure.stage,
                failure.attempts,
                escape_cell(&failure.message)
            ));
        }
        md.push('\n');
    }

    md
}

fn tag_label(tag: AssetTag) -> &'static str {
    match tag {
        AssetTag::StyleSheet => "StyleSheet",
        AssetTag::JavaScript => "JavaScript",
        AssetTag::WebpackChunk => "WebpackChunk",
        AssetTag::WebpackChunkLoader => "WebpackChunkLoader",
        AssetTag::WebpackVendor => "WebpackVendor",
        AssetTag::WebpackStyleMapper => "WebpackStyleMapper",
        AssetTag::AppMain => "AppMain",
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildscope_crawler::{AssetFailure, CrawlStats, FailureStage};
    use buildscope_protocol::{Asset, AssetMetadata, Build, BuildEnv, ReleaseChannel};

    #[test]
    fn summary_lists_tags_and_failures() {
        let asset = Asset {
            name: "a.js".into(),
            tags: vec![AssetTag::JavaScript, AssetTag::WebpackChunk],
            references: Vec::new(),
            experiments: Vec::new(),
            build_info: None,
            metadata: AssetMetadata::default(),
        };
        let report = CrawlReport {
            build: Build {
                id: "b1".into(),
                release_channel: ReleaseChannel::Canary,
                build_env: BuildEnv::Production,
                date: None,
                runtime_config: serde_json::json!({}),
                assets: vec![asset],
                root_assets: vec!["a.js".into()],
                build_info: None,
            },
            failures: vec![AssetFailure {
                name: "b.js".into(),
                stage: FailureStage::Fetch,
                attempts: 5,
                message: "HTTP error: status 503 | gateway".into(),
            }],
            stats: CrawlStats {
                iterations: 1,
                fetched: 1,
                classified: 1,
                failed: 1,
            },
        };

        let md = render_crawl_summary(&report);
        assert!(md.starts_with("# Build `b1`"));
        assert!(md.contains("- Channel: `canary` (Production)"));
        assert!(md.contains("| `WebpackChunk` | `1` |"));
        assert!(md.contains("| `b.js` | `Fetch` | `5` | HTTP error: status 503 \\| gateway |"));
    }
}
