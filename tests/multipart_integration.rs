use s3_load_gen::bench::put::PutExecutor;
use s3_load_gen::bench::{BenchmarkEngine, UploadPath};
use s3_load_gen::config::{BenchmarkConfig, PayloadKind};
use s3_load_gen::storage::{FaultPlan, InMemoryStorage};
use std::sync::Arc;
use std::time::Duration;

fn put_config(object_size: u64, part_size: u64) -> BenchmarkConfig {
    BenchmarkConfig::put()
        .with_endpoint("http://localhost:9000")
        .with_bucket("bench")
        .with_prefix("mp/")
        .with_object_size(object_size)
        .with_part_size(part_size)
        .with_payload(PayloadKind::Pattern)
}

#[tokio::test]
async fn test_failure_on_part_k_uploads_k_parts_and_aborts_once() {
    let n = 5u64;
    for k in 1..n as i32 {
        let store = Arc::new(InMemoryStorage::new().with_faults(FaultPlan {
            fail_part: Some(k),
            ..FaultPlan::default()
        }));
        let mut executor = PutExecutor::new(&put_config(n * 1000, 1000), store.clone(), 0);

        let result = executor.execute().await;
        let calls = store.calls();

        assert!(!result.succeeded, "part {} failure must fail the PUT", k);
        assert_eq!(result.bytes_transferred, 0);
        assert_eq!(calls.initiate_multipart, 1);
        assert_eq!(calls.upload_part, k as u64);
        assert_eq!(calls.complete_multipart, 0);
        assert_eq!(calls.abort_multipart, 1);
        assert_eq!(store.pending_uploads(), 0);
        assert_eq!(store.object_count(), 0);
    }
}

#[tokio::test]
async fn test_single_put_path_makes_no_multipart_calls() {
    let cases = [
        put_config(1000, 1000),
        put_config(10, 1000),
        put_config(0, 1000),
        put_config(50_000, 1000).with_multipart(false),
    ];

    for config in cases {
        let store = Arc::new(InMemoryStorage::new());
        let mut executor = PutExecutor::new(&config, store.clone(), 0);
        assert_eq!(executor.upload_path(), UploadPath::Single);

        let result = executor.execute().await;
        assert!(result.succeeded);
        assert_eq!(result.bytes_transferred, config.object_size);
        assert_eq!(store.calls().put_object, 1);
        assert_eq!(store.calls().multipart_calls(), 0);
    }
}

#[tokio::test]
async fn test_completion_lists_every_part_in_order() {
    let store = Arc::new(InMemoryStorage::new());
    let mut executor = PutExecutor::new(&put_config(10_500, 1000), store.clone(), 4);

    assert!(executor.execute().await.succeeded);
    assert!(executor.execute().await.succeeded);

    let completions = store.completed_part_lists();
    assert_eq!(completions.len(), 2);
    for parts in completions {
        let numbers: Vec<i32> = parts.iter().map(|p| p.part_number).collect();
        assert_eq!(numbers, (1..=11).collect::<Vec<i32>>());
    }
    assert_eq!(store.object_size("mp/w0004-0000000000"), Some(10_500));
    assert_eq!(store.object_size("mp/w0004-0000000001"), Some(10_500));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_put_run_with_failing_parts_reports_errors_only() {
    let store = Arc::new(
        InMemoryStorage::new()
            .with_latency(Duration::from_millis(2))
            .with_faults(FaultPlan {
                fail_part: Some(2),
                ..FaultPlan::default()
            }),
    );
    let config = put_config(3000, 1000)
        .with_concurrency(3)
        .with_duration(Duration::from_millis(150));
    let engine = BenchmarkEngine::new(config, store.clone()).unwrap();

    let report = engine.run(None).await.unwrap();
    let calls = store.calls();

    assert!(report.total_operations >= 3);
    assert_eq!(report.successes, 0);
    assert_eq!(report.errors, report.total_operations);
    assert_eq!(report.total_bytes, 0);
    assert_eq!(calls.initiate_multipart, report.total_operations);
    assert_eq!(calls.abort_multipart, report.total_operations);
    assert_eq!(calls.complete_multipart, 0);
    assert_eq!(store.pending_uploads(), 0);
}
