//! Hot-swap demo for hotswap-runtime.
//!
//! Publishes a settings file under a versioned directory, resolves values
//! from it, then publishes a newer version and shows the handle picking it
//! up once the current one is old enough to re-check.
//!
//! Run with: cargo run --example hot_swap

use std::fs;
use std::path::Path;
use std::time::Duration;

use hotswap_runtime::{ArtifactHandle, LifecycleEvent, SwapConfig};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

fn publish(root: &Path, version: &str, body: &str) -> std::io::Result<String> {
    let path = root.join(version).join("settings.toml");
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(&path, body)?;
    Ok(path.to_string_lossy().into_owned())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let root = tempfile::tempdir()?;
    let path = publish(
        root.path(),
        "1.0.0",
        "greeting = \"hello\"\nworkers = 4\n",
    )?;

    let config = SwapConfig::new().with_max_age(Duration::from_millis(500));
    let mut handle = ArtifactHandle::open_blob(&path, &config)?;

    handle.on_event(|event| {
        if let LifecycleEvent::Swapped { from, to, count, .. } = event {
            info!("Swap #{}: {} -> {}", count, from, to);
        }
    });

    let values = handle.resolve(["greeting", "workers"])?;
    info!("Serving {}: {:?}", handle.descriptor().location(), values);

    publish(
        root.path(),
        "1.1.0",
        "greeting = \"bonjour\"\nworkers = 8\n",
    )?;
    info!("Published 1.1.0");

    for _ in 0..4 {
        std::thread::sleep(Duration::from_millis(250));
        let values = handle.resolve(["greeting", "workers"])?;
        info!("Serving {}: {:?}", handle.descriptor().location(), values);
    }

    info!("Done after {} swap(s)", handle.swap_count());
    Ok(())
}
