use std::time::Instant;
use tracing::error;

use tracing_log_store::init::init_tracing;
use tracing_log_store::{FileLogger, LogConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dir = std::env::temp_dir().join("tracing-log-store-load");
    let config = LogConfig::default().with_dir(&dir).with_level("error");
    let logger = FileLogger::new("default-load", &config)?;
    init_tracing(logger.clone())?;

    let n: u64 = 2_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, "default load test error");
    }

    let elapsed = start.elapsed();
    println!("default config: stored {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    let report = logger.get_logs(0, "error");
    println!("today's report for {}: {} records under {}", logger.name(), report.record_count(), dir.display());
    Ok(())
}
