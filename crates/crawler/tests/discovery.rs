use buildscope_crawler::{
    BuildCrawler, CrawlerConfig, FailureStage, FetchError, HttpResponse, MemoryTransport, RootInfo,
};
use buildscope_protocol::{AssetTag, BuildEnv, ReleaseChannel};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const ASSETS: &str = "https://discord.com/assets";

const ROOT: &str = "0123456789abcdef0123";
const A: &str = "aaaaaaaaaaaaaaaaaaaa";
const B: &str = "bbbbbbbbbbbbbbbbbbbb";
const C: &str = "cccccccccccccccccccc";

fn config() -> CrawlerConfig {
    CrawlerConfig {
        fetch_concurrency: 4,
        classify_workers: Some(2),
        retry_attempts: 2,
        retry_delay: Duration::from_millis(1),
        ..CrawlerConfig::default()
    }
}

fn js(name: &str) -> String {
    format!("{name}.js")
}

fn script(body: impl Into<String>) -> HttpResponse {
    HttpResponse::ok(body).with_header("content-type", "application/javascript")
}

/// Bundler runtime mapping module ids to the given chunk hashes.
fn loader(hashes: &[&str]) -> HttpResponse {
    let entries = hashes
        .iter()
        .enumerate()
        .map(|(i, hash)| format!("{}:\"{hash}\"", i + 1))
        .collect::<Vec<_>>()
        .join(",");
    script(format!(
        "r.u=function(e){{return\"\"+{{{entries}}}[e]+\".js\"}};"
    ))
}

fn chunk() -> HttpResponse {
    script("(this.webpackChunkdiscord_app=this.webpackChunkdiscord_app||[]).push([[1],{}]);")
}

fn serve(transport: &MemoryTransport, name: &str, response: HttpResponse) {
    transport.route(format!("{ASSETS}/{}", js(name)), response);
}

fn root_info(names: &[&str]) -> RootInfo {
    RootInfo {
        id: "test-build".to_string(),
        date: None,
        root_assets: names.iter().map(|name| js(name)).collect(),
        runtime_config: json!({}),
    }
}

fn crawler(transport: &Arc<MemoryTransport>) -> BuildCrawler {
    BuildCrawler::new(config(), transport.clone()).expect("valid config")
}

fn names(report: &buildscope_crawler::CrawlReport) -> HashSet<String> {
    report.build.assets.iter().map(|a| a.name.clone()).collect()
}

#[tokio::test]
async fn loader_root_with_two_chunks_yields_three_assets() {
    let transport = Arc::new(MemoryTransport::new());
    transport.route(
        "https://discord.com/app",
        HttpResponse::ok(format!(
            "<html><script src=\"/assets/{ROOT}.js\" defer></script></html>"
        ))
        .with_header("x-build-id", "b-1"),
    );
    serve(&transport, ROOT, loader(&[A, B]));
    serve(&transport, A, chunk());
    serve(&transport, B, chunk());

    let report = crawler(&transport).crawl(None).await.unwrap();

    assert!(report.is_complete());
    assert_eq!(report.build.id, "b-1");
    assert_eq!(report.build.release_channel, ReleaseChannel::Stable);
    assert_eq!(report.build.build_env, BuildEnv::Production);
    assert_eq!(report.build.root_assets, vec![js(ROOT)]);
    assert_eq!(report.build.assets.len(), 3);
    assert_eq!(
        names(&report),
        [js(ROOT), js(A), js(B)].into_iter().collect::<HashSet<_>>()
    );

    let root = report.build.asset(&js(ROOT)).unwrap();
    assert!(root.has_tag(AssetTag::WebpackChunkLoader));
    assert_eq!(root.references, vec![js(A), js(B)]);
    assert!(report
        .build
        .asset(&js(A))
        .unwrap()
        .has_tag(AssetTag::WebpackChunk));

    assert_eq!(report.stats.iterations, 2);
    assert_eq!(report.stats.fetched, 3);
    assert_eq!(report.stats.classified, 3);
}

#[tokio::test]
async fn self_and_mutual_references_terminate() {
    let transport = Arc::new(MemoryTransport::new());
    serve(&transport, A, loader(&[A, B]));
    serve(&transport, B, loader(&[A]));

    let report = crawler(&transport).crawl_from(root_info(&[A])).await.unwrap();

    assert!(report.is_complete());
    assert_eq!(report.build.assets.len(), 2);
    assert_eq!(transport.calls(&format!("{ASSETS}/{}", js(A))), 1);
    assert_eq!(transport.calls(&format!("{ASSETS}/{}", js(B))), 1);
}

#[tokio::test]
async fn shared_references_are_visited_once() {
    let transport = Arc::new(MemoryTransport::new());
    serve(&transport, A, loader(&[C]));
    serve(&transport, B, loader(&[C]));
    serve(&transport, C, chunk());

    let report = crawler(&transport)
        .crawl_from(root_info(&[A, B, A]))
        .await
        .unwrap();

    assert_eq!(report.build.assets.len(), 3);
    assert_eq!(names(&report).len(), 3);
    assert_eq!(transport.calls(&format!("{ASSETS}/{}", js(C))), 1);
    assert_eq!(transport.calls(&format!("{ASSETS}/{}", js(A))), 1);
}

#[tokio::test]
async fn failed_assets_are_omitted_and_recorded() {
    let transport = Arc::new(MemoryTransport::new());
    serve(&transport, ROOT, loader(&[A, B, C]));
    serve(&transport, A, chunk());
    serve(&transport, B, HttpResponse::status(503));
    serve(&transport, C, script("function ("));

    let report = crawler(&transport)
        .crawl_from(root_info(&[ROOT]))
        .await
        .unwrap();

    assert_eq!(
        names(&report),
        [js(ROOT), js(A)].into_iter().collect::<HashSet<_>>()
    );
    assert_eq!(report.failures.len(), 2);
    assert_eq!(report.stats.failed, 2);

    let fetch = report.failures.iter().find(|f| f.name == js(B)).unwrap();
    assert_eq!(fetch.stage, FailureStage::Fetch);
    assert_eq!(fetch.attempts, 2);
    assert_eq!(fetch.message, FetchError::Http { status: 503 }.to_string());
    assert_eq!(transport.calls(&format!("{ASSETS}/{}", js(B))), 2);

    let parse = report.failures.iter().find(|f| f.name == js(C)).unwrap();
    assert_eq!(parse.stage, FailureStage::Classify);

    // Every reference is accounted for.
    let root = report.build.asset(&js(ROOT)).unwrap();
    for reference in &root.references {
        assert!(
            report.build.asset(reference).is_some()
                || report.failures.iter().any(|f| &f.name == reference),
            "{reference} vanished"
        );
    }
}

#[tokio::test]
async fn unreachable_manifest_aborts_the_run() {
    let transport = Arc::new(MemoryTransport::new());
    let err = crawler(&transport).crawl(None).await.unwrap_err();
    assert!(matches!(err, buildscope_crawler::CrawlError::ManifestFetch(_)));
}

#[tokio::test]
async fn empty_manifest_assembles_an_empty_build() {
    let transport = Arc::new(MemoryTransport::new());
    let report = crawler(&transport).crawl_from(root_info(&[])).await.unwrap();
    assert!(report.build.assets.is_empty());
    assert_eq!(report.stats.iterations, 0);
    assert_eq!(transport.total_calls(), 0);
}
