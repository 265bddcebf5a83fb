//! Contract Test: Concurrency Boundary
//!
//! Constraints verified:
//! - Concurrent generates against one Corefile path never overlap
//! - Each of them still takes its own pre-write snapshot, with distinct ids
//! - Generates against different paths are not serialised against each other
//!
//! If this test fails, two generates can interleave their backup and write
//! steps and the archive no longer reflects what was on disk.

mod common;

use common::*;
use corefile_core::render::is_well_formed;
use corefile_core::traits::DnsRecord;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_generates_on_one_path_are_serialised() {
    let fixture = Fixture::new();
    fixture.records.insert(DnsRecord::new("example.com", "www", "10.0.0.1")).await;
    fixture.write_corefile("seed {\n}\n");

    let slow = SlowRecordSource::new(fixture.records.clone(), Duration::from_millis(30));
    let (manager, _rx) = fixture.manager_with(fixture.config(20), Box::new(slow.clone()));
    let manager = Arc::new(manager);

    let mut handles = Vec::new();
    for _ in 0..5 {
        let manager = Arc::clone(&manager);
        handles.push(tokio::spawn(async move { manager.regenerate().await }));
    }

    let mut backup_ids = Vec::new();
    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        backup_ids.push(outcome.backup.expect("each generate found a file").id);
    }

    assert_eq!(slow.max_in_flight(), 1);

    backup_ids.sort();
    backup_ids.dedup();
    assert_eq!(backup_ids.len(), 5);
    assert_eq!(manager.list_backups(1, 100).await.unwrap().total, 5);
    assert!(is_well_formed(&fixture.read_corefile()));
    assert_eq!(fixture.reloader.reload_calls(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn different_paths_proceed_in_parallel() {
    let fixture = Fixture::new();
    let slow = SlowRecordSource::new(fixture.records.clone(), Duration::from_millis(200));
    let (manager, _rx) = fixture.manager_with(fixture.config(20), Box::new(slow.clone()));

    let a = fixture.dir.path().join("a").join("Corefile");
    let b = fixture.dir.path().join("b").join("Corefile");
    let (ra, rb) = tokio::join!(manager.generate(Some(&a), false), manager.generate(Some(&b), false));

    ra.unwrap();
    rb.unwrap();
    assert_eq!(slow.max_in_flight(), 2);
}
