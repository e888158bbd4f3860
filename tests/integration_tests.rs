//! Integration tests for hadaps-balancer
//!
//! These run full balancer passes against local directory trees built in a
//! temporary directory.

use clap::Parser;
use hadaps_balancer::config::{BalanceConfig, BalancePlan, CliArgs, NamespaceUri, PatternConfig};
use hadaps_balancer::discovery::{Discovery, WorkItem};
use hadaps_balancer::error::{BalancerError, OperationFailure, StorageError};
use hadaps_balancer::scheduler::{
    BalanceResult, Balancer, RecordingCollector, ReplicationPlanner, RunContext, WorkerPool,
};
use hadaps_balancer::storage::{self, LocalStorage, StorageClient};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::{tempdir, TempDir};

/// /data/a1, /data/a2, /data/a3/{x,y}, /data/b.log
fn example_tree() -> TempDir {
    let dir = tempdir().unwrap();
    let data = dir.path().join("data");
    fs::create_dir_all(data.join("a3")).unwrap();
    fs::write(data.join("a1"), b"a1").unwrap();
    fs::write(data.join("a2"), b"a2a2").unwrap();
    fs::write(data.join("a3/x"), b"x").unwrap();
    fs::write(data.join("a3/y"), b"yy").unwrap();
    fs::write(data.join("b.log"), b"log").unwrap();
    dir
}

fn local(root: &Path) -> Arc<dyn StorageClient> {
    Arc::new(LocalStorage::new(root).unwrap())
}

fn namespace(root: &Path) -> NamespaceUri {
    NamespaceUri::parse(&format!("file://{}", root.display())).unwrap()
}

fn example_patterns() -> Vec<PatternConfig> {
    vec![
        PatternConfig::new("/data/a*", Some(2)),
        PatternConfig::new("/data/b.log", None),
    ]
}

fn echo(item: &WorkItem) -> Result<BalanceResult, OperationFailure> {
    Ok(BalanceResult {
        path: item.path().to_string(),
        size: item.entry().size,
        from_replication: item.entry().replication,
        to_replication: item.entry().replication,
        duration: Duration::ZERO,
    })
}

fn config(workers: usize) -> BalanceConfig {
    BalanceConfig::default()
        .with_workers(workers)
        .with_poll_interval(Duration::from_millis(10))
}

#[test]
fn test_example_scenario_order() {
    let dir = example_tree();
    let items = Discovery::new(local(dir.path()))
        .discover(&example_patterns())
        .unwrap();

    let paths: Vec<&str> = items.iter().map(WorkItem::path).collect();
    assert_eq!(
        paths,
        vec!["/data/a1", "/data/a2", "/data/a3/x", "/data/a3/y", "/data/b.log"]
    );
    assert!(items.iter().all(|i| i.entry().is_file()));
}

#[test]
fn test_discovery_is_deterministic() {
    let dir = example_tree();
    let patterns = vec![
        PatternConfig::new("/data/{b.log,a?}", None),
        PatternConfig::new("/data/a3", None),
    ];

    let first: Vec<String> = Discovery::new(local(dir.path()))
        .discover(&patterns)
        .unwrap()
        .iter()
        .map(|i| i.path().to_string())
        .collect();
    let second: Vec<String> = Discovery::new(local(dir.path()))
        .discover(&patterns)
        .unwrap()
        .iter()
        .map(|i| i.path().to_string())
        .collect();

    assert_eq!(first, second);
    // The second pattern re-expands a3 for its own items
    assert_eq!(first.len(), 7);
}

#[test]
fn test_flattening_counts_transitive_files() {
    let dir = tempdir().unwrap();
    let mut expected = 0;
    for a in 0..3 {
        for b in 0..4 {
            let sub = dir.path().join(format!("tree/l{}/m{}", a, b));
            fs::create_dir_all(&sub).unwrap();
            for f in 0..5 {
                fs::write(sub.join(format!("f{}", f)), b"z").unwrap();
                expected += 1;
            }
        }
    }
    fs::create_dir_all(dir.path().join("tree/empty/deeper")).unwrap();

    let items = Discovery::new(local(dir.path()))
        .discover(&[PatternConfig::new("/tree", None)])
        .unwrap();
    assert_eq!(items.len(), expected);

    let mut sorted: Vec<&WorkItem> = items.iter().collect();
    sorted.sort();
    assert_eq!(
        sorted.iter().map(|i| i.path()).collect::<Vec<_>>(),
        items.iter().map(|i| i.path()).collect::<Vec<_>>()
    );
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_skipped() {
    let dir = example_tree();
    std::os::unix::fs::symlink(dir.path().join("data/a1"), dir.path().join("data/link")).unwrap();

    let items = Discovery::new(local(dir.path()))
        .discover(&[PatternConfig::new("/data", None)])
        .unwrap();
    assert!(items.iter().all(|i| i.path() != "/data/link"));
    assert_eq!(items.len(), 5);
}

#[test]
fn test_full_run_with_planner() {
    let dir = example_tree();
    let collector = Arc::new(RecordingCollector::new());

    Balancer::builder()
        .namespace(namespace(dir.path()))
        .generations(Vec::new())
        .patterns(example_patterns())
        .config(config(3))
        .storage(local(dir.path()))
        .operation(Arc::new(ReplicationPlanner::new()))
        .collector(collector.clone())
        .build()
        .unwrap()
        .run()
        .unwrap();

    let successes = collector.successes();
    assert_eq!(successes.len(), 5);
    assert!(collector.failures().is_empty());
    // Local files report replication 1; /data/a* targets 2, b.log keeps 1
    assert_eq!(successes.iter().filter(|r| r.changed()).count(), 4);
}

#[test]
fn test_failure_of_one_item_does_not_stop_run() {
    let dir = example_tree();
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let op = move |item: &WorkItem, _ctx: &RunContext| {
        counter.fetch_add(1, Ordering::SeqCst);
        if item.path() == "/data/a3/x" {
            return Err(OperationFailure::Failed {
                path: item.path().to_string(),
                reason: "no target nodes available".into(),
            });
        }
        echo(item)
    };
    let collector = Arc::new(RecordingCollector::new());

    Balancer::builder()
        .namespace(namespace(dir.path()))
        .generations(Vec::new())
        .patterns(example_patterns())
        .config(config(2))
        .storage(local(dir.path()))
        .operation(Arc::new(op))
        .collector(collector.clone())
        .build()
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(attempts.load(Ordering::SeqCst), 5);
    assert_eq!(collector.len(), 5);
    assert_eq!(collector.failures().len(), 1);
    assert_eq!(collector.failures()[0].path(), "/data/a3/x");
}

#[test]
fn test_admission_bound_holds_across_run() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("many")).unwrap();
    for i in 0..20 {
        fs::write(dir.path().join(format!("many/f{:02}", i)), b"1").unwrap();
    }

    let current = Arc::new(AtomicUsize::new(0));
    let max = Arc::new(AtomicUsize::new(0));
    let (cur, peak) = (Arc::clone(&current), Arc::clone(&max));
    let op = move |item: &WorkItem, _ctx: &RunContext| {
        let now = cur.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(10));
        cur.fetch_sub(1, Ordering::SeqCst);
        echo(item)
    };
    let collector = Arc::new(RecordingCollector::new());

    Balancer::builder()
        .namespace(namespace(dir.path()))
        .generations(Vec::new())
        .patterns(vec![PatternConfig::new("/many/*", None)])
        .config(config(3))
        .storage(local(dir.path()))
        .operation(Arc::new(op))
        .collector(collector.clone())
        .build()
        .unwrap()
        .run()
        .unwrap();

    assert!(max.load(Ordering::SeqCst) <= 3);
    // Drained: nothing still running and every item recorded
    assert_eq!(current.load(Ordering::SeqCst), 0);
    assert_eq!(collector.len(), 20);
}

#[test]
fn test_missing_directory_under_pattern_is_empty() {
    let dir = example_tree();
    let collector = Arc::new(RecordingCollector::new());

    Balancer::builder()
        .namespace(namespace(dir.path()))
        .generations(Vec::new())
        .patterns(vec![PatternConfig::new("/nowhere/*", None)])
        .config(config(1))
        .storage(local(dir.path()))
        .operation(Arc::new(ReplicationPlanner::new()))
        .collector(collector.clone())
        .build()
        .unwrap()
        .run()
        .unwrap();

    assert!(collector.is_empty());
}

#[test]
fn test_stuck_worker_shutdown_is_bounded() {
    let dir = example_tree();
    let items = Discovery::new(local(dir.path()))
        .discover(&[PatternConfig::new("/data/b.log", None)])
        .unwrap();

    let op = |item: &WorkItem, _ctx: &RunContext| {
        thread::sleep(Duration::from_secs(3));
        echo(item)
    };
    let context = Arc::new(RunContext {
        namespace: namespace(dir.path()),
        generations: Vec::new(),
    });
    let pool = WorkerPool::spawn(1, Arc::new(op), context, None).unwrap();
    for item in items {
        pool.submit(item).unwrap();
    }
    thread::sleep(Duration::from_millis(50));

    let started = Instant::now();
    let err = pool.shutdown(Duration::from_millis(200)).unwrap_err();
    assert!(matches!(err, BalancerError::PoolShutdown { .. }));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn test_plan_from_cli_and_open_storage() {
    let dir = example_tree();
    let uri = format!("file://{}", dir.path().display());
    let args = CliArgs::parse_from([
        "hadaps-balancer",
        uri.as_str(),
        "-P",
        "/data/a*=2",
        "-P",
        "/data/b.log",
        "-g",
        "old=n1,n2",
        "-g",
        "new=n3",
        "--grace-secs",
        "1",
        "-q",
    ]);

    let plan = BalancePlan::from_args(&args).unwrap();
    assert!(!plan.config.show_progress);
    assert_eq!(plan.generations[1].hosts, vec!["n3"]);

    let storage = storage::open(&plan.namespace).unwrap();
    let collector = Arc::new(RecordingCollector::new());
    Balancer::builder()
        .namespace(plan.namespace.clone())
        .generations(plan.generations.clone())
        .patterns(plan.patterns.clone())
        .config(plan.config.clone())
        .storage(storage)
        .operation(Arc::new(ReplicationPlanner::new()))
        .collector(collector.clone())
        .build()
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(collector.len(), 5);
}

#[test]
fn test_unsupported_scheme() {
    for raw in ["hdfs://namenode:8020/", "mem://"] {
        let uri = NamespaceUri::parse(raw).unwrap();
        assert!(matches!(
            storage::open(&uri),
            Err(StorageError::UnsupportedScheme { .. })
        ));
    }
}

#[test]
fn test_parent_component_pattern_is_rejected() {
    let dir = example_tree();
    fs::create_dir_all(dir.path().join("ns")).unwrap();
    let err = Discovery::new(local(&dir.path().join("ns")))
        .discover(&[PatternConfig::new("/../data/*", None)])
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidPattern { .. }));
}
