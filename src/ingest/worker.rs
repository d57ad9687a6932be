//! Multi-worker ingestion loop

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use tracing::{error, info, info_span};

use super::{IngestError, IngestStats, IngestionCoordinator, ItemSource};
use crate::store::{SessionPool, WorkerId};

/// Run `workers` threads that drain the source through the coordinator
///
/// Each worker checks out its own context. Items are acknowledged only when
/// processing returned `Ok`; failures are logged and counted. An item that
/// cannot be read is skipped, while a failing source stops the worker. The pool is
/// shut down once every worker has exited.
pub fn run_workers(
    pool: &Arc<SessionPool>,
    coordinator: &IngestionCoordinator,
    source: &dyn ItemSource,
    workers: usize,
) -> Result<IngestStats, IngestError> {
    let start = Instant::now();

    let results: Vec<Result<IngestStats, IngestError>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..workers.max(1))
            .map(|i| {
                let pool = Arc::clone(pool);
                scope.spawn(move || worker_loop(&pool, coordinator, source, WorkerId(i)))
            })
            .collect();
        handles
            .into_iter()
            .enumerate()
            .map(|(i, handle)| {
                handle
                    .join()
                    .unwrap_or(Err(IngestError::WorkerPanicked(i)))
            })
            .collect()
    });

    pool.shutdown();

    let mut stats = IngestStats::new();
    for result in results {
        match result {
            Ok(worker_stats) => stats.merge(worker_stats),
            Err(e) => {
                error!(error = %e, "Worker failed");
                stats.add_error(e.to_string());
            }
        }
    }
    stats.duration = start.elapsed();

    info!(
        received = stats.received,
        persisted = stats.persisted,
        duplicates = stats.duplicates,
        errors = stats.errors_count,
        duration = %stats.duration_string(),
        "Workers finished"
    );
    Ok(stats)
}

fn worker_loop(
    pool: &Arc<SessionPool>,
    coordinator: &IngestionCoordinator,
    source: &dyn ItemSource,
    worker: WorkerId,
) -> Result<IngestStats, IngestError> {
    let _span = info_span!("worker", worker = worker.0).entered();

    let mut ctx = pool.checkout(worker)?;
    let mut stats = IngestStats::new();

    loop {
        let delivery = match source.fetch() {
            Ok(Some(delivery)) => delivery,
            Ok(None) => break,
            Err(e) if e.is_item_error() => {
                stats.received += 1;
                error!(error = %e, "Failed to read item");
                stats.add_error(e.to_string());
                continue;
            }
            Err(e) => {
                error!(error = %e, "Failed to fetch item");
                stats.add_error(e.to_string());
                break;
            }
        };
        stats.received += 1;

        match coordinator.process(&mut ctx, &delivery.rel_filepath, &delivery.bytes) {
            Ok(outcome) => {
                stats.record(&delivery.rel_filepath, &outcome);
                if let Err(e) = source.acknowledge(delivery.token) {
                    error!(rel_filepath = %delivery.rel_filepath, error = %e, "Failed to acknowledge item");
                    stats.add_error(format!("{}: {}", delivery.rel_filepath, e));
                }
            }
            Err(e) => {
                error!(rel_filepath = %delivery.rel_filepath, error = %e, "Failed to process item");
                stats.add_error(format!("{}: {}", delivery.rel_filepath, e));
            }
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{
        AnalysisFailure, AnalysisReport, ImageAnalyzer, IngestConfig, MemoryItemSource,
    };
    use crate::store::{RESULT_TABLE, StoreHandle};

    struct OkAnalyzer;

    impl ImageAnalyzer for OkAnalyzer {
        fn analyze(&self, _: &str, _: &[u8]) -> Result<AnalysisReport, AnalysisFailure> {
            Ok(AnalysisReport::default())
        }
    }

    #[test]
    fn test_workers_drain_source_and_ack() {
        let store = Arc::new(StoreHandle::memory().unwrap());
        store.ensure_tables(false).unwrap();
        let pool = SessionPool::new(Arc::clone(&store));
        let coordinator =
            IngestionCoordinator::new(Arc::clone(&store), Arc::new(OkAnalyzer), IngestConfig::default());

        let items = (0..20)
            .map(|i| (format!("2023_04_15/TC--20230415--{i:05}.bmp"), vec![i as u8]))
            .chain([("2023_04_15/readme.txt".to_string(), vec![])])
            .collect();
        let source = MemoryItemSource::new(items);

        let stats = run_workers(&pool, &coordinator, &source, 4).unwrap();
        assert_eq!(stats.received, 21);
        assert_eq!(stats.persisted, 20);
        assert_eq!(stats.ignored, 1);
        assert_eq!(stats.errors_count, 0);
        assert_eq!(source.acknowledged(), 21);
        assert!(pool.is_closed());
        assert!(pool.sessions_opened() <= 4);
        assert_eq!(store.row_count(RESULT_TABLE).unwrap(), 20);
    }

    #[test]
    fn test_failed_items_are_not_acknowledged() {
        // Tables are missing, so every persist fails
        let store = Arc::new(StoreHandle::memory().unwrap());
        let pool = SessionPool::new(Arc::clone(&store));
        let coordinator =
            IngestionCoordinator::new(Arc::clone(&store), Arc::new(OkAnalyzer), IngestConfig::default());
        let source = MemoryItemSource::new(vec![("a.bmp".to_string(), vec![1])]);

        let stats = run_workers(&pool, &coordinator, &source, 2).unwrap();
        assert_eq!(stats.received, 1);
        assert_eq!(stats.errors_count, 1);
        assert!(stats.errors[0].starts_with("a.bmp: "));
        assert_eq!(source.delivered(), 1);
        assert_eq!(source.acknowledged(), 0);
    }
}
