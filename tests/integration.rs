//! Integration tests for hotswap-runtime.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use serde_json::json;
use tempfile::tempdir;

use hotswap_runtime::{
    compare_package_ids, compare_versions, renew, split_package_id, ArtifactHandle,
    ArtifactRegistry, BlobLoader, Descriptor, DescriptorState, DirectoryRepository, Error,
    LifecycleEvent, LoaderConfig, MaxAge, PackageLocator, Renewer, Repository, SemverLocator,
    SharedHandle, SwapConfig, VersionLocator,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

// Write `body` to `<root>/<version>/<file>` and return the path.
fn publish(root: &Path, version: &str, file: &str, body: &str) -> String {
    let path = root.join(version).join(file);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, body).unwrap();
    path.to_str().unwrap().to_string()
}

#[test]
fn test_descriptor_from_filesystem() {
    let dir = tempdir().unwrap();
    let path = publish(dir.path(), "1.0.0", "mo.toml", "x = 1\n");

    let before = SystemTime::now();
    let descriptor = Descriptor::from_filesystem(&path).unwrap();

    assert_eq!(descriptor.location(), path);
    assert_eq!(descriptor.state(), DescriptorState::Current);
    assert!(!descriptor.is_stale());
    assert!(descriptor.version_info().is_none());
    assert!(descriptor.created_at() >= before - Duration::from_secs(1));
    assert_eq!(descriptor.logical_name(), Some("mo"));

    let expected_mtime = fs::metadata(&path).unwrap().modified().unwrap();
    assert_eq!(descriptor.content_modified_at(), expected_mtime);

    assert!(Descriptor::from_filesystem(dir.path().to_str().unwrap()).is_none());
    assert!(Descriptor::from_filesystem(dir.path().join("nope").to_str().unwrap()).is_none());
}

#[test]
fn test_semver_renewal_scenario() {
    init_tracing();
    let dir = tempdir().unwrap();
    let path = publish(dir.path(), "1.0.0", "mo.toml", "");
    publish(dir.path(), "1.2.0", "mo.toml", "");
    publish(dir.path(), "1.10.0-rc", "mo.toml", "");

    let mut descriptor = Descriptor::from_filesystem(&path).unwrap();
    let renewed = renew(&mut descriptor, &SemverLocator::new(true), &MaxAge::always())
        .unwrap()
        .unwrap();

    assert!(descriptor.is_superseded());
    assert!(renewed.location().ends_with("1.2.0/mo.toml"));
    assert_eq!(renewed.state(), DescriptorState::Current);
}

#[test]
fn test_existence_check_skips_versions_without_the_file() {
    let dir = tempdir().unwrap();
    let path = publish(dir.path(), "1.0.0", "mo.toml", "");
    fs::create_dir_all(dir.path().join("2.0.0")).unwrap();

    let mut checked = Descriptor::from_filesystem(&path).unwrap();
    let renewed = renew(&mut checked, &SemverLocator::new(true), &MaxAge::always()).unwrap();
    assert!(renewed.is_none());
    assert_eq!(checked.state(), DescriptorState::Current);

    let mut unchecked = Descriptor::from_filesystem(&path).unwrap();
    let located = SemverLocator::new(false).search(&unchecked);
    assert!(located.unwrap().unwrap().ends_with("2.0.0/mo.toml"));

    // The candidate cannot be described, so the descriptor stays current.
    let renewed = renew(&mut unchecked, &SemverLocator::new(false), &MaxAge::always()).unwrap();
    assert!(renewed.is_none());
    assert!(!unchecked.is_stale());
}

#[test]
fn test_fresh_descriptor_is_not_renewed() {
    let dir = tempdir().unwrap();
    let path = publish(dir.path(), "1.0.0", "mo.toml", "");
    publish(dir.path(), "9.9.9", "mo.toml", "");

    let mut descriptor = Descriptor::from_filesystem(&path).unwrap();
    let renewed = renew(
        &mut descriptor,
        &SemverLocator::new(true),
        &MaxAge::new(Duration::from_secs(3600)),
    )
    .unwrap();

    assert!(renewed.is_none());
    assert_eq!(descriptor.state(), DescriptorState::Current);
}

#[test]
fn test_malformed_versions_compare_equal() {
    assert_eq!(compare_versions("1.0.0", "1.0.0"), Ordering::Equal);
    assert_eq!(compare_versions("1.0.10", "1.0.9"), Ordering::Greater);
    assert_eq!(compare_versions("latest", "0.0.0"), Ordering::Equal);
    assert_eq!(compare_versions("1.0", "0.0.0"), Ordering::Equal);
}

#[test]
fn test_always_due_handle_returns_same_symbols() {
    init_tracing();
    let dir = tempdir().unwrap();
    let path = publish(dir.path(), "1.0.0", "settings.toml", "level = 7\nname = \"base\"\n");

    let config = SwapConfig::new().always_check();
    let mut handle = ArtifactHandle::open_blob(&path, &config).unwrap();

    let checks = Arc::new(Mutex::new(0usize));
    let counter = checks.clone();
    handle.on_event(move |event| {
        if let LifecycleEvent::Checked { renewed, .. } = event {
            assert!(!renewed);
            *counter.lock() += 1;
        }
    });

    let first = handle.resolve(["level", "name"]).unwrap();
    for _ in 0..3 {
        assert_eq!(handle.resolve(["level", "name"]).unwrap(), first);
    }

    assert_eq!(first["level"], json!(7));
    assert_eq!(*checks.lock(), 4);
    assert_eq!(handle.swap_count(), 0);
    assert!(handle.descriptor().location().contains("1.0.0"));
}

#[test]
fn test_short_max_age_swaps_to_published_version() {
    init_tracing();
    let dir = tempdir().unwrap();
    let path = publish(dir.path(), "1.0.0", "settings.toml", "level = 1\n");

    let config = SwapConfig::new().with_max_age(Duration::from_secs(1));
    let mut handle = ArtifactHandle::open_blob(&path, &config).unwrap();
    let registry = handle.loader().registry().clone();

    assert_eq!(handle.resolve_one("level").unwrap(), Some(json!(1)));

    publish(dir.path(), "1.1.0", "settings.toml", "level = 2\n");
    // Not due yet: still served from the loaded version.
    assert_eq!(handle.resolve_one("level").unwrap(), Some(json!(1)));

    std::thread::sleep(Duration::from_millis(1200));
    assert_eq!(handle.resolve_one("level").unwrap(), Some(json!(2)));
    assert_eq!(handle.swap_count(), 1);

    let old_origin = dir.path().join("1.0.0");
    let names = registry.names();
    assert_eq!(names, vec!["settings".to_string()]);
    for name in names {
        let artifact = registry.get(&name).unwrap();
        assert_ne!(artifact.origin(), Some(old_origin.as_path()));
    }
}

#[test]
fn test_imports_are_unloaded_with_their_directory() {
    let dir = tempdir().unwrap();
    let path = publish(
        dir.path(),
        "1.0.0",
        "main.toml",
        "imports = [\"colors\"]\ntitle = \"v1\"\n",
    );
    publish(dir.path(), "1.0.0", "colors.json", r#"{"primary": "red"}"#);

    let config = SwapConfig::new().always_check();
    let mut handle = ArtifactHandle::open_blob(&path, &config).unwrap();
    let registry = handle.loader().registry().clone();

    let colors = handle.resolve_one("colors").unwrap().unwrap();
    assert_eq!(colors["primary"], json!("red"));
    assert_eq!(registry.len(), 2);

    publish(dir.path(), "1.0.1", "main.toml", "imports = [\"colors\"]\ntitle = \"v2\"\n");
    publish(dir.path(), "1.0.1", "colors.json", r#"{"primary": "blue"}"#);

    let values = handle.resolve(["title", "colors"]).unwrap();
    assert_eq!(values["title"], json!("v2"));
    assert_eq!(values["colors"]["primary"], json!("blue"));
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_handles_share_a_registry() {
    let dir = tempdir().unwrap();
    let first = publish(&dir.path().join("a"), "1.0.0", "alpha.toml", "v = 1\n");
    let second = publish(&dir.path().join("b"), "1.0.0", "beta.toml", "v = 2\n");

    let registry = Arc::new(ArtifactRegistry::new());
    let loader = || {
        BlobLoader::new(LoaderConfig::default())
            .unwrap()
            .with_registry(registry.clone())
    };

    let config = SwapConfig::default();
    let mut a = ArtifactHandle::open(&first, &config, loader()).unwrap();
    let mut b = ArtifactHandle::open(&second, &config, loader()).unwrap();

    assert_eq!(a.resolve_one("v").unwrap(), Some(json!(1)));
    assert_eq!(b.resolve_one("v").unwrap(), Some(json!(2)));
    assert_eq!(registry.len(), 2);

    drop(a);
    assert!(!registry.contains("alpha"));
    assert!(registry.contains("beta"));

    drop(b);
    assert!(registry.is_empty());
}

#[test]
fn test_unload_is_idempotent() {
    use hotswap_runtime::Loader;

    let dir = tempdir().unwrap();
    let path = publish(dir.path(), "1.0.0", "settings.toml", "level = 1\n");
    let descriptor = Descriptor::from_filesystem(&path).unwrap();
    let loader = BlobLoader::new(LoaderConfig::default()).unwrap();

    assert_eq!(loader.unload(&descriptor), 0);
    assert!(loader.load(&descriptor).is_some());
    assert_eq!(loader.unload(&descriptor), 1);
    assert_eq!(loader.unload(&descriptor), 0);
}

// In-memory package index over files laid out as `<root>/<id>/game.toml`.
struct ShelfRepository {
    root: PathBuf,
    published: Mutex<Vec<String>>,
}

impl ShelfRepository {
    fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            published: Mutex::new(Vec::new()),
        }
    }

    fn publish(&self, id: &str, body: &str) {
        publish(&self.root, id, "game.toml", body);
        self.published.lock().push(id.to_string());
    }
}

impl Repository for ShelfRepository {
    fn get_all(&self, base_name: &str) -> hotswap_runtime::Result<Vec<String>> {
        let prefix = format!("{}-", base_name);
        let mut ids: Vec<String> = self
            .published
            .lock()
            .iter()
            .filter(|id| id.starts_with(&prefix))
            .cloned()
            .collect();
        ids.sort_by(|a, b| compare_package_ids(a, b));
        Ok(ids)
    }

    fn resolve(&self, ids: &[String]) -> hotswap_runtime::Result<Vec<String>> {
        Ok(ids
            .iter()
            .map(|id| self.root.join(id).join("game.toml").to_string_lossy().into_owned())
            .collect())
    }

    fn split(&self, id: &str) -> hotswap_runtime::Result<(String, String)> {
        Ok(split_package_id(id))
    }

    fn compare_packages(&self, lhs: &str, rhs: &str) -> hotswap_runtime::Result<Ordering> {
        Ok(compare_package_ids(lhs, rhs))
    }
}

struct EmptyRepository;

impl Repository for EmptyRepository {}

#[test]
fn test_package_repository_flow() {
    init_tracing();
    let dir = tempdir().unwrap();
    let shelf = Arc::new(ShelfRepository::new(dir.path()));
    shelf.publish("doom-1.0", "level = 10\n");
    shelf.publish("doom-1.1", "level = 11\n");

    let descriptor = Descriptor::from_repository("doom-1.0", shelf.as_ref())
        .unwrap()
        .unwrap();
    let info = descriptor.version_info().unwrap();
    assert_eq!(info.base_name, "doom");
    assert_eq!(info.version, "1.0");
    assert_eq!(info.package_id, "doom-1.0");

    let repository: Arc<dyn Repository> = shelf.clone();
    let config = SwapConfig::new().always_check();
    let loader = BlobLoader::new(LoaderConfig::default()).unwrap();
    let mut handle =
        ArtifactHandle::from_package("doom-1.0", repository.clone(), &config, loader).unwrap();

    assert_eq!(handle.resolve_one("level").unwrap(), Some(json!(11)));
    assert_eq!(
        handle.descriptor().version_info().unwrap().package_id,
        "doom-1.1"
    );

    shelf.publish("doom-1.2", "level = 12\n");
    assert_eq!(handle.resolve_one("level").unwrap(), Some(json!(12)));
    assert_eq!(handle.swap_count(), 2);

    // Newest already held: nothing to do.
    let mut current = handle.descriptor().clone();
    let locator = PackageLocator::new(repository);
    assert!(renew(&mut current, &locator, &MaxAge::always()).unwrap().is_none());
}

#[test]
fn test_directory_repository_flow() {
    let dir = tempdir().unwrap();
    publish(&dir.path().join("doom"), "1.0", "game.toml", "level = 10\n");
    publish(&dir.path().join("doom"), "1.2", "game.toml", "level = 12\n");

    let repository: Arc<dyn Repository> =
        Arc::new(DirectoryRepository::new(dir.path(), "game.toml"));
    let loader = BlobLoader::new(LoaderConfig::default()).unwrap();
    let mut handle = ArtifactHandle::from_package(
        "doom-1.0",
        repository,
        &SwapConfig::new().always_check(),
        loader,
    )
    .unwrap();

    assert_eq!(handle.resolve_one("level").unwrap(), Some(json!(12)));
    assert!(handle.descriptor().location().ends_with("game.toml"));
}

#[test]
fn test_unimplemented_repository_fails_loudly() {
    let repository: Arc<dyn Repository> = Arc::new(EmptyRepository);

    let result = Descriptor::from_repository("doom-1.0", repository.as_ref());
    assert!(matches!(result, Err(Error::Unimplemented("resolve"))));

    let loader = BlobLoader::new(LoaderConfig::default()).unwrap();
    let result =
        ArtifactHandle::from_package("doom-1.0", repository, &SwapConfig::default(), loader);
    assert!(result.is_err());
}

#[test]
fn test_handle_with_package_locator_propagates_repository_errors() {
    let dir = tempdir().unwrap();
    let shelf = dir.path().join("doom");
    publish(&shelf, "1.0", "game.toml", "level = 10\n");

    let repository = DirectoryRepository::new(dir.path(), "game.toml");
    let descriptor = Descriptor::from_repository("doom-1.0", &repository)
        .unwrap()
        .unwrap();

    let renewer = Renewer::new(PackageLocator::new(Arc::new(EmptyRepository)), MaxAge::always());
    let loader = BlobLoader::new(LoaderConfig::default()).unwrap();
    let mut handle = ArtifactHandle::with_strategies(descriptor, renewer, loader);

    assert!(matches!(
        handle.resolve_one("level"),
        Err(Error::Unimplemented("get_all"))
    ));
    assert_eq!(handle.descriptor().state(), DescriptorState::Current);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shared_handle_across_threads() {
    init_tracing();
    let dir = tempdir().unwrap();
    let path = publish(dir.path(), "1.0.0", "settings.toml", "level = 1\n");

    let config = SwapConfig::new().always_check();
    let shared = SharedHandle::new(ArtifactHandle::open_blob(&path, &config).unwrap());

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let handle = shared.clone();
        tasks.push(tokio::task::spawn_blocking(move || {
            (0..10)
                .map(|_| handle.resolve_one("level").unwrap())
                .collect::<Vec<_>>()
        }));
    }

    for task in tasks {
        for value in task.await.unwrap() {
            assert_eq!(value, Some(json!(1)));
        }
    }

    publish(dir.path(), "1.3.0", "settings.toml", "level = 3\n");
    let handle = shared.clone();
    let value = tokio::task::spawn_blocking(move || handle.resolve_one("level").unwrap())
        .await
        .unwrap();

    assert_eq!(value, Some(json!(3)));
    assert_eq!(shared.swap_count(), 1);
}
