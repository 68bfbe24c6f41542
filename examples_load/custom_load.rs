use std::time::Instant;
use tokio::time::Duration;
use tracing::error;

use tracing_log_store::init::{init_tracing_with_config, DispatchMode, LayerConfig};
use tracing_log_store::queue::QueueConfig;
use tracing_log_store::{FileLogger, FlushMode, LogConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dir = std::env::temp_dir().join("tracing-log-store-load");
    let config = LogConfig::default()
        .with_dir(&dir)
        .with_level("error")
        .with_max_stack_size(500)
        .with_max_file_size(1_000_000)
        .with_flush_mode(FlushMode::AtomicReplace)
        .with_env_overlay()?;
    let logger = FileLogger::new("custom-load", &config)?;

    let layer_config = LayerConfig {
        dispatch: DispatchMode::Queued(QueueConfig {
            channel_buffer: 50_000,
            max_retries: 3,
            retry_backoff: Duration::from_millis(50),
        }),
        enable_stdout: false,
    };

    let _worker = init_tracing_with_config(logger.clone(), layer_config)?;

    let n: u64 = 20_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, "custom load test error");
    }

    let elapsed = start.elapsed();
    println!("custom config: queued {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    // The global subscriber lives for the whole process, so drain the
    // queue by waiting and then flush the remainder explicitly.
    tokio::time::sleep(Duration::from_secs(2)).await;
    logger.flush()?;

    let report = logger.get_logs(0, "");
    println!("today's report for {}: {} records under {}", logger.name(), report.record_count(), dir.display());
    Ok(())
}
