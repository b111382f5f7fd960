use packsmith_modules::{
    aggregate, load_mapping, merge_mappings, ModulesError, SourceTree, MERGED_MAPPING_FILE,
};
use packsmith_types::{ModuleKind, Platform};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, data: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, data).unwrap();
}

fn fixture() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "modules/foo/module_manifest.json",
        r#"{"name":"foo","type":"resource","description":"Foo memes","author":"alice"}"#);
    write(root, "modules/bar/module_manifest.json",
        r#"{"name":"bar","type":"resource","author":["bob","carol"]}"#);
    write(root, "modules/all/module_manifest.json",
        r#"{"name":"all","type":"collection","contains":["foo","bar"]}"#);
    fs::create_dir_all(root.join("modules/no_manifest")).unwrap();
    write(root, "mods/b.json", "{}");
    write(root, "mods/a.json", "{}");
    write(root, "en-mods/c.json", "{}");
    temp
}

// ── aggregate ───────────────────────────────────────────────────

#[tokio::test]
async fn aggregate_classifies_modules() {
    let tree = fixture();
    let agg = aggregate(Platform::Java, tree.path()).await.unwrap();

    let resources: Vec<_> = agg.by_kind(ModuleKind::Resource).map(|m| m.name.as_str()).collect();
    let collections: Vec<_> = agg.by_kind(ModuleKind::Collection).map(|m| m.name.as_str()).collect();
    assert_eq!(resources, vec!["bar", "foo"]);
    assert_eq!(collections, vec!["all"]);

    let foo = agg.find("foo", ModuleKind::Resource).unwrap();
    assert_eq!(foo.author, vec!["alice"]);
    assert_eq!(foo.platform, Platform::Java);
    assert_eq!(agg.find("bar", ModuleKind::Resource).unwrap().author, vec!["bob", "carol"]);
    assert_eq!(agg.find("all", ModuleKind::Collection).unwrap().contains, vec!["foo", "bar"]);
    assert!(agg.find("foo", ModuleKind::Collection).is_none());
    assert!(agg.module_dir("foo", ModuleKind::Resource).unwrap().ends_with("modules/foo"));
}

#[tokio::test]
async fn aggregate_lists_overlays_sorted() {
    let tree = fixture();
    let agg = aggregate(Platform::Java, tree.path()).await.unwrap();
    assert_eq!(agg.overlays.mods, vec!["mods/a.json", "mods/b.json"]);
    assert_eq!(agg.overlays.en_mods, vec!["en-mods/c.json"]);
}

#[tokio::test]
async fn aggregate_without_overlay_dirs_is_empty() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "modules/foo/module_manifest.json", r#"{"type":"resource"}"#);
    let agg = aggregate(Platform::Bedrock, temp.path()).await.unwrap();
    assert!(agg.overlays.mods.is_empty());
    assert!(agg.overlays.en_mods.is_empty());
    // name falls back to the directory name
    assert_eq!(agg.modules[0].name, "foo");
}

#[tokio::test]
async fn aggregate_missing_tree_is_an_error() {
    let temp = TempDir::new().unwrap();
    let err = aggregate(Platform::Java, &temp.path().join("nope")).await.unwrap_err();
    assert!(matches!(err, ModulesError::Io { .. }));
}

#[tokio::test]
async fn aggregate_malformed_manifest_is_an_error() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "modules/bad/module_manifest.json", r#"{"type":"gadget"}"#);
    let err = aggregate(Platform::Java, temp.path()).await.unwrap_err();
    assert!(matches!(err, ModulesError::Manifest { .. }));
}

#[tokio::test]
async fn aggregate_rejects_duplicate_identifiers() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "modules/a/module_manifest.json", r#"{"name":"x","type":"resource"}"#);
    write(temp.path(), "modules/b/module_manifest.json", r#"{"name":"x","type":"resource"}"#);
    let err = aggregate(Platform::Java, temp.path()).await.unwrap_err();
    assert!(matches!(err, ModulesError::Duplicate { .. }));
}

// ── mappings ────────────────────────────────────────────────────

#[tokio::test]
async fn later_mapping_files_override_earlier_ones() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "mappings/01_base.json", r#"{"a":"old_a","b":"old_b"}"#);
    write(temp.path(), "mappings/02_fix.json", r#"{"a":"new_a"}"#);

    let merged = merge_mappings(temp.path()).await.unwrap();
    assert_eq!(merged["a"], "new_a");
    assert_eq!(merged["b"], "old_b");

    let persisted = temp.path().join("mappings").join(MERGED_MAPPING_FILE);
    assert!(persisted.exists());
    assert_eq!(load_mapping(temp.path()).await.unwrap(), merged);
}

#[tokio::test]
async fn merging_twice_is_stable() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "mappings/a.json", r#"{"k":"v"}"#);
    let first = merge_mappings(temp.path()).await.unwrap();
    let second = merge_mappings(temp.path()).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn load_mapping_merges_in_memory_when_not_persisted() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "mappings/a.json", r#"{"k":"v"}"#);
    let loaded = load_mapping(temp.path()).await.unwrap();
    assert_eq!(loaded["k"], "v");
    assert!(!temp.path().join("mappings").join(MERGED_MAPPING_FILE).exists());
}

#[tokio::test]
async fn tree_without_mappings_yields_empty_mapping() {
    let temp = TempDir::new().unwrap();
    assert!(merge_mappings(temp.path()).await.unwrap().is_empty());
    assert!(load_mapping(temp.path()).await.unwrap().is_empty());
}

#[tokio::test]
async fn invalid_mapping_file_is_an_error() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "mappings/a.json", r#"{"k":1}"#);
    assert!(matches!(
        merge_mappings(temp.path()).await,
        Err(ModulesError::Mapping { .. })
    ));
}

// ── SourceTree ──────────────────────────────────────────────────

#[tokio::test]
async fn resolve_inside_accepts_tree_files() {
    let tree = fixture();
    let source = SourceTree::new(tree.path());
    let resolved = source.resolve_inside("mods/a.json").await.unwrap();
    assert!(resolved.ends_with("mods/a.json"));
}

#[tokio::test]
async fn resolve_inside_rejects_escapes() {
    let tree = fixture();
    let source = SourceTree::new(tree.path());
    assert!(matches!(
        source.resolve_inside("../../etc/passwd").await,
        Err(ModulesError::PathEscape(_))
    ));
    assert!(matches!(
        source.resolve_inside("mods/missing.json").await,
        Err(ModulesError::PathNotFound(_))
    ));
    assert!(matches!(
        source.resolve_inside("mods").await,
        Err(ModulesError::PathNotFound(_))
    ));
}

#[cfg(unix)]
#[tokio::test]
async fn resolve_inside_rejects_symlinks_leaving_the_tree() {
    let tree = fixture();
    let outside = TempDir::new().unwrap();
    write(outside.path(), "secret.json", "{}");
    std::os::unix::fs::symlink(outside.path().join("secret.json"), tree.path().join("mods/link.json"))
        .unwrap();
    let source = SourceTree::new(tree.path());
    assert!(matches!(
        source.resolve_inside("mods/link.json").await,
        Err(ModulesError::PathEscape(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn writer_waits_for_readers() {
    let tree = fixture();
    let source = Arc::new(SourceTree::new(tree.path()));
    let read_guard = source.read().await;

    let writer = {
        let source = Arc::clone(&source);
        tokio::spawn(async move {
            let _guard = source.write().await;
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!writer.is_finished());

    drop(read_guard);
    writer.await.unwrap();
}
