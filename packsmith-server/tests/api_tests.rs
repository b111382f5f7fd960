use async_trait::async_trait;
use packsmith_server::{build_router, AppContext, ServerConfig};
use packsmith_store::{ArtifactStore, MemoryArtifactStore};
use packsmith_sync::{CommandOutput, SyncResult, VersionControlClient, WebhookAuthenticator};
use packsmith_types::Environment;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

const SECRET: &str = "webhook-secret";
const ROOT: &str = "https://dl.example.com/";

// ── Fixtures ─────────────────────────────────────────────────────

#[derive(Default)]
struct CountingVcs {
    calls: AtomicUsize,
}

impl CountingVcs {
    fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn ok(&self, stdout: &str) -> SyncResult<CommandOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(CommandOutput::new(stdout, ""))
    }
}

#[async_trait]
impl VersionControlClient for CountingVcs {
    async fn reset_hard(&self, _dir: &Path) -> SyncResult<CommandOutput> {
        self.ok("HEAD is now at abc1234")
    }

    async fn clean(&self, _dir: &Path) -> SyncResult<CommandOutput> {
        self.ok("")
    }

    async fn pull(&self, _dir: &Path) -> SyncResult<CommandOutput> {
        self.ok("Already up to date.")
    }
}

fn write(root: &Path, rel: &str, data: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, data).unwrap();
}

fn seed(data: &Path, config: &ServerConfig) {
    let je = data.join(&config.java_repo);
    write(&je, ".git/index", "DIRC");
    write(&je, "meme_resourcepack/pack.mcmeta", r#"{"pack":{"pack_format":4,"description":"memes"}}"#);
    write(&je, "meme_resourcepack/assets/minecraft/lang/zh_meme.json", r#"{"a":"1","b":"2"}"#);
    write(&je, "modules/choice/module_manifest.json", r#"{"name":"choice","type":"resource","description":"c","author":"me"}"#);
    write(&je, "modules/choice/assets/minecraft/lang/zh_meme.json", r#"{"a":"choice"}"#);
    write(&je, "modules/all/module_manifest.json", r#"{"name":"all","type":"collection","description":"everything","contains":["choice"]}"#);
    write(&je, "mods/extra.json", r#"{"b":"mod"}"#);
    write(&je, "en-mods/extra.json", r#"{"b":"en"}"#);

    let be = data.join(&config.bedrock_repo);
    write(&be, "meme_resourcepack/manifest.json", "{}");
    write(&be, "meme_resourcepack/texts/zh_ME.lang", "a=1\n");
    write(&be, "modules/bchoice/module_manifest.json", r#"{"name":"bchoice","type":"resource","description":"bc"}"#);
    write(&be, "modules/bchoice/texts/zh_ME.lang", "a=bchoice\n");
}

struct TestServer {
    base: String,
    store: Arc<MemoryArtifactStore>,
    vcs: Arc<CountingVcs>,
    _dir: TempDir,
}

/// Spin up the HTTP server on an OS-assigned port.
async fn spawn_test_server(environment: Environment) -> TestServer {
    let dir = TempDir::new().unwrap();
    let mut config = ServerConfig::local(dir.path());
    config.brand = "brand".to_string();
    config.webhook_secret = SECRET.to_string();
    config.environment = environment;
    seed(dir.path(), &config);

    let store = Arc::new(MemoryArtifactStore::new(ROOT));
    let vcs = Arc::new(CountingVcs::default());
    let context = AppContext::new(&config, store.clone(), vcs.clone());
    let app = build_router(Arc::new(context));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    TestServer {
        base: format!("http://127.0.0.1:{port}"),
        store,
        vcs,
        _dir: dir,
    }
}

async fn post(url: String, body: Value) -> (u16, Value) {
    let resp = reqwest::Client::new().post(url).json(&body).send().await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

fn is_artifact_name(name: &str, ext: &str) -> bool {
    let Some(hash) = name
        .strip_prefix("brand-")
        .and_then(|rest| rest.strip_suffix(&format!(".{ext}")))
    else {
        return false;
    };
    hash.len() == 6 && hash.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
}

// ── Modules ──────────────────────────────────────────────────────

#[tokio::test]
async fn modules_lists_both_platforms() {
    let server = spawn_test_server(Environment::Production).await;
    let resp = reqwest::get(format!("{}/v2/modules", server.base)).await.unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["mods"], json!(["mods/extra.json"]));
    assert_eq!(body["enmods"], json!(["en-mods/extra.json"]));
    assert_eq!(body["je_modules"]["resource"][0]["name"], "choice");
    assert_eq!(body["je_modules"]["resource"][0]["author"], json!(["me"]));
    assert_eq!(body["je_modules"]["collection"][0]["contains"], json!(["choice"]));
    assert_eq!(body["be_modules"]["resource"][0]["name"], "bchoice");
    assert!(body["je_modified"].as_i64().unwrap() > 0);
    assert_eq!(body["be_modified"], 0);
    assert!(body.get("deprecation").is_none());
}

#[tokio::test]
async fn v1_modules_carry_deprecation() {
    let server = spawn_test_server(Environment::Production).await;
    let body: Value = reqwest::get(format!("{}/", server.base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(body["deprecation"].is_string());
    assert_eq!(body["je_modules"]["resource"][0]["name"], "choice");
}

#[tokio::test]
async fn broken_tree_is_403() {
    let server = spawn_test_server(Environment::Production).await;
    std::fs::remove_dir_all(server._dir.path().join("mcwzh-meme-resourcepack-bedrock/modules")).unwrap();
    let resp = reqwest::get(format!("{}/v2/modules", server.base)).await.unwrap();
    assert_eq!(resp.status(), 403);
    let body: Value = resp.json().await.unwrap();
    assert!(body["message"].is_string());
}

// ── Builds ───────────────────────────────────────────────────────

#[tokio::test]
async fn java_build_end_to_end() {
    let server = spawn_test_server(Environment::Production).await;
    let request = json!({
        "type": "normal",
        "modules": { "resource": ["choice"], "collection": [] },
        "mods": ["mods/extra.json"]
    });

    let (status, first) = post(format!("{}/v2/build/java", server.base), request.clone()).await;
    assert_eq!(status, 200, "{first}");
    let filename = first["filename"].as_str().unwrap().to_string();
    assert!(is_artifact_name(&filename, "zip"), "{filename}");
    assert_eq!(first["checksum"].as_str().unwrap().len(), 64);
    assert!(first["checksum"].as_str().unwrap().starts_with(&filename[6..12]));
    assert_eq!(first["root"], ROOT);
    assert!(first["size"].as_u64().unwrap() > 0);
    assert!(first["logs"].as_str().unwrap().contains("Enabled modules: choice."));

    let (status, second) = post(format!("{}/v2/build/java", server.base), request).await;
    assert_eq!(status, 200);
    assert_eq!(second["filename"], filename.as_str());
    assert_eq!(server.store.put_calls(), vec![filename.clone()]);
    assert!(server.store.exists(&filename).await.unwrap());
}

#[tokio::test]
async fn collection_and_resource_orders_agree() {
    let server = spawn_test_server(Environment::Production).await;
    let (_, a) = post(
        format!("{}/v2/build/java", server.base),
        json!({ "type": "normal", "modules": { "resource": ["choice"], "collection": [] } }),
    )
    .await;
    let (_, b) = post(
        format!("{}/v2/build/java", server.base),
        json!({ "type": "normal", "modules": { "resource": [], "collection": ["all"] } }),
    )
    .await;
    assert_eq!(a["filename"], b["filename"]);
}

#[tokio::test]
async fn bedrock_build_defaults_to_mcpack() {
    let server = spawn_test_server(Environment::Production).await;
    let (status, body) = post(
        format!("{}/v2/build/bedrock", server.base),
        json!({ "type": "normal", "modules": { "resource": ["bchoice"], "collection": [] } }),
    )
    .await;
    assert_eq!(status, 200, "{body}");
    assert!(is_artifact_name(body["filename"].as_str().unwrap(), "mcpack"));

    let (status, body) = post(
        format!("{}/v2/build/bedrock", server.base),
        json!({ "type": "compatible", "modules": {}, "extension": "zip" }),
    )
    .await;
    assert_eq!(status, 200, "{body}");
    assert!(is_artifact_name(body["filename"].as_str().unwrap(), "zip"));
}

#[tokio::test]
async fn traversal_overlay_is_403() {
    let server = spawn_test_server(Environment::Production).await;
    let (status, body) = post(
        format!("{}/v2/build/java", server.base),
        json!({ "type": "normal", "modules": {}, "mods": ["../../etc/passwd"] }),
    )
    .await;
    assert_eq!(status, 403);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["logs"].as_str().unwrap().contains("Build failed"));
    assert!(server.store.put_calls().is_empty());
}

#[tokio::test]
async fn unknown_module_is_403() {
    let server = spawn_test_server(Environment::Production).await;
    let (status, body) = post(
        format!("{}/v2/build/java", server.base),
        json!({ "type": "normal", "modules": { "resource": ["nope"] } }),
    )
    .await;
    assert_eq!(status, 403);
    assert!(body["error"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn legacy_bedrock_is_403() {
    let server = spawn_test_server(Environment::Production).await;
    let (status, _) = post(
        format!("{}/v2/build/bedrock", server.base),
        json!({ "type": "legacy", "modules": {} }),
    )
    .await;
    assert_eq!(status, 403);
}

#[tokio::test]
async fn malformed_body_is_400() {
    let server = spawn_test_server(Environment::Production).await;
    let resp = reqwest::Client::new()
        .post(format!("{}/v2/build/java", server.base))
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn store_write_failure_is_502_with_identity() {
    let server = spawn_test_server(Environment::Production).await;
    server.store.fail_puts(true);
    let (status, body) = post(
        format!("{}/v2/build/java", server.base),
        json!({ "type": "normal", "modules": {} }),
    )
    .await;
    assert_eq!(status, 502);
    assert_eq!(body["published"], false);
    assert!(is_artifact_name(body["filename"].as_str().unwrap(), "zip"));
    assert_eq!(body["checksum"].as_str().unwrap().len(), 64);
}

#[tokio::test]
async fn v1_ajax_builds_with_deprecation() {
    let server = spawn_test_server(Environment::Production).await;
    let (status, body) = post(
        format!("{}/ajax", server.base),
        json!({
            "type": "normal",
            "compatible": true,
            "modules": { "resource": ["choice"], "collection": [] },
            "mod": ["en-mods/extra.json"]
        }),
    )
    .await;
    assert_eq!(status, 200, "{body}");
    assert!(body["deprecation"].is_string());
    assert!(is_artifact_name(body["filename"].as_str().unwrap(), "zip"));

    let (status, body) = post(
        format!("{}/ajax", server.base),
        json!({ "_be": true, "type": "mcpack", "modules": {}, "mod": [] }),
    )
    .await;
    assert_eq!(status, 200, "{body}");
    assert!(is_artifact_name(body["filename"].as_str().unwrap(), "mcpack"));
}

// ── Webhook ──────────────────────────────────────────────────────

fn webhook_body(repository: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({ "repository": { "name": repository } })).unwrap()
}

#[tokio::test]
async fn bad_signature_is_403_in_production() {
    let server = spawn_test_server(Environment::Production).await;
    let resp = reqwest::Client::new()
        .post(format!("{}/github/", server.base))
        .header("x-hub-signature-256", "sha256=0000")
        .body(webhook_body("mcwzh-meme-resourcepack"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    assert_eq!(server.vcs.count(), 0);
}

#[tokio::test]
async fn bad_signature_proceeds_in_development() {
    let server = spawn_test_server(Environment::Development).await;
    let resp = reqwest::Client::new()
        .post(format!("{}/github/", server.base))
        .body(webhook_body("mcwzh-meme-resourcepack"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(server.vcs.count(), 3);
}

#[tokio::test]
async fn signed_webhook_syncs_tree() {
    let server = spawn_test_server(Environment::Production).await;
    let body = webhook_body("mcwzh-meme-resourcepack-bedrock");
    let signature = WebhookAuthenticator::new(SECRET).sign(&body);
    let resp = reqwest::Client::new()
        .post(format!("{}/github/", server.base))
        .header("x-hub-signature-256", signature)
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["stdout"], "HEAD is now at abc1234\nAlready up to date.");
    assert!(body["dir"].as_str().unwrap().ends_with("mcwzh-meme-resourcepack-bedrock"));
}

#[tokio::test]
async fn unknown_repository_is_403() {
    let server = spawn_test_server(Environment::Production).await;
    let body = webhook_body("someone-else");
    let signature = WebhookAuthenticator::new(SECRET).sign(&body);
    let resp = reqwest::Client::new()
        .post(format!("{}/github/", server.base))
        .header("x-hub-signature-256", signature)
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    assert_eq!(server.vcs.count(), 0);
}

// ── Middleware ───────────────────────────────────────────────────

#[tokio::test]
async fn cors_allows_any_origin() {
    let server = spawn_test_server(Environment::Production).await;
    let resp = reqwest::Client::new()
        .get(format!("{}/v2/modules", server.base))
        .header("origin", "https://example.org")
        .send()
        .await
        .unwrap();
    assert_eq!(
        resp.headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let server = spawn_test_server(Environment::Production).await;
    let resp = reqwest::get(format!("{}/v3/nothing", server.base)).await.unwrap();
    assert_eq!(resp.status(), 404);
}
