use crate::layer::RecordLayer;
use crate::logger::FileLogger;
use crate::queue::{QueueConfig, QueuedSink};
use crate::sink::LogSink;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::Registry;

/// How the layer hands records to the store.
#[derive(Clone, Debug, Default)]
pub enum DispatchMode {
    /// Write on the emitting thread; a full buffer is flushed before the
    /// event returns.
    #[default]
    Direct,
    /// Queue records for a background Tokio task; emitting never touches
    /// the disk and records are dropped when the queue is full.
    Queued(QueueConfig),
}

/// Configuration of the logging layer.
///
/// **Fields**
/// - `dispatch`: direct (synchronous) or queued delivery into the store.
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt` layer filtered
///   at the store's minimum level is added so events also reach the console.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub dispatch: DispatchMode,
    pub enable_stdout: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            dispatch: DispatchMode::Direct,
            enable_stdout: true,
        }
    }
}

/// Build the record layer for `logger` without installing it.
///
/// With [`DispatchMode::Queued`] this spawns the queue worker and must be
/// called from within a Tokio runtime; the worker's handle is returned.
pub fn build_layer(logger: FileLogger, config: &LayerConfig) -> (RecordLayer, Option<JoinHandle<()>>) {
    match &config.dispatch {
        DispatchMode::Direct => (RecordLayer::new(logger), None),
        DispatchMode::Queued(queue_config) => {
            let min_level = logger.min_level();
            let sink: Arc<dyn LogSink> = Arc::new(logger);
            let (queue, handle) = QueuedSink::spawn(sink, queue_config.clone());
            (RecordLayer::queued(queue, min_level), Some(handle))
        }
    }
}

/// Install a global `tracing` subscriber that records into `logger`.
///
/// **Effects**
///
/// Installs a [`Registry`] combined with [`RecordLayer`] (and optionally a
/// console `fmt` layer) as the global default subscriber, so all `tracing`
/// events in the process at or above the store's minimum level are stored.
///
/// **Returns**
/// - The queue worker's handle when [`DispatchMode::Queued`] is used.
/// - `Err(..)` if a global subscriber was already installed.
pub fn init_tracing_with_config(
    logger: FileLogger,
    config: LayerConfig,
) -> Result<Option<JoinHandle<()>>, SetGlobalDefaultError> {
    let level = LevelFilter::from_level(logger.min_level());
    let (layer, handle) = build_layer(logger, &config);

    let stdout = config
        .enable_stdout
        .then(|| tracing_subscriber::fmt::layer().with_filter(level));
    let subscriber = Registry::default().with(layer).with(stdout);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(handle)
}

/// Initialize tracing with [`LayerConfig::default`]: direct writes plus
/// console output.
pub fn init_tracing(logger: FileLogger) -> Result<(), SetGlobalDefaultError> {
    init_tracing_with_config(logger, LayerConfig::default()).map(|_| ())
}
