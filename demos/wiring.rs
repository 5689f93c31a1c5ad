//! Wires a miniature editor: settings, a file manager, an editor and an
//! outline view that rebuilds asynchronously on text changes.
//!
//! Run with `RUST_LOG=debug cargo run --example wiring` to see the bus and
//! registry trace records.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tino_core::{
    BusConfig, Component, ComponentError, ComponentRegistry, ComponentSpec, Event, EventBus,
    HandlerError, LifecycleEvent, SubscribeAsync, SubscribeOptions, kinds,
};
use tracing_subscriber::EnvFilter;

struct Settings {
    autosave: bool,
}
impl Component for Settings {}

struct FileManager {
    bus: EventBus,
}

impl FileManager {
    fn open(&self, path: &str) {
        self.bus.emit(
            Event::new(kinds::FILE_OPENED)
                .with_source("file_manager")
                .with_payload(path.to_string()),
        );
    }
}

impl Component for FileManager {
    fn teardown(&self) -> Result<(), ComponentError> {
        tracing::info!("file manager closing open buffers");
        Ok(())
    }
}

struct Editor {
    bus: EventBus,
    settings: Arc<Settings>,
    files: Arc<FileManager>,
}

impl Editor {
    fn type_text(&self, text: &str) {
        self.bus.emit(
            Event::new(kinds::TEXT_CHANGED)
                .with_source("editor")
                .with_payload(text.to_string()),
        );
        if self.settings.autosave {
            self.bus.emit(Event::new(kinds::FILE_SAVED).with_source("editor"));
        }
    }
}

impl Component for Editor {}

/// Rebuilds the heading outline off the emitting thread.
struct Outline {
    rebuilds: AtomicUsize,
}

#[async_trait]
impl SubscribeAsync for Outline {
    async fn on_event(&self, event: &Event) -> Result<(), HandlerError> {
        let text = event
            .payload::<String>()
            .ok_or_else(|| HandlerError::fail("text change without text"))?;
        let headings = text.lines().filter(|l| l.starts_with('#')).count();
        self.rebuilds.fetch_add(1, Ordering::Relaxed);
        tracing::info!(headings, "outline rebuilt");
        Ok(())
    }

    fn name(&self) -> &str {
        "outline"
    }
}

impl Component for Outline {}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let bus = EventBus::new(BusConfig {
        debug: true,
        ..BusConfig::default()
    });
    tino_core::LogWriter::attach(&bus);

    let registry = ComponentRegistry::new(bus.clone());
    registry.add_listener(|e: &LifecycleEvent| {
        tracing::info!(component = %e.component, state = %e.state, "lifecycle");
    });

    registry.register(
        ComponentSpec::factory("editor", |deps| {
            Ok(Arc::new(Editor {
                bus: deps.bus().clone(),
                settings: deps.get::<Settings>("settings")?,
                files: deps.get::<FileManager>("files")?,
            }))
        })
        .depends_on(["settings", "files"]),
    )?;
    registry.register(
        ComponentSpec::factory("files", |deps| {
            Ok(Arc::new(FileManager {
                bus: deps.bus().clone(),
            }))
        })
        .depends_on(["settings"]),
    )?;
    registry.register_instance("settings", Arc::new(Settings { autosave: true }))?;

    let order = registry.resolve()?;
    tracing::info!(?order, "components ready");

    // Late registration builds immediately.
    let outline = Arc::new(Outline {
        rebuilds: AtomicUsize::new(0),
    });
    registry.register_instance("outline", Arc::clone(&outline))?;
    bus.subscribe_async(
        kinds::TEXT_CHANGED,
        outline.clone(),
        SubscribeOptions::default().owned_by("outline"),
    )?;

    let editor = registry.get::<Editor>("editor")?;
    editor.files.open("notes.md");
    editor.type_text("# Title\n\nSome text\n## Section");
    bus.emit(Event::new(kinds::TEXT_CHANGED).with_source("macro"));

    bus.flush().await;
    tracing::info!(
        rebuilds = outline.rebuilds.load(Ordering::Relaxed),
        failures = bus.failures().len(),
        history = bus.history(None).len(),
        "session summary"
    );

    let report = registry.shutdown();
    tracing::info!(torn_down = ?report.torn_down, clean = report.is_clean(), "shut down");
    bus.shutdown().await;
    Ok(())
}
