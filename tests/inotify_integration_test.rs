//! Tests against the real inotify service on a temporary directory.

#![cfg(target_os = "linux")]

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

use tempfile::TempDir;
use wf::watcher::{ReadOutcome, StepOutcome};
use wf::{
    CommandTemplate, EventLoop, InotifyService, SpawnDispatcher, WatchRegistry, WatchService,
};

fn append(path: &Path, data: &[u8]) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(data).unwrap();
}

#[test]
fn test_modification_resolves_to_modified_file() {
    let temp = TempDir::new().unwrap();
    let a = temp.path().join("a.txt");
    let b = temp.path().join("b.txt");
    fs::write(&a, "a").unwrap();
    fs::write(&b, "b").unwrap();

    let mut service = InotifyService::new().unwrap();
    let registry = WatchRegistry::register_all(
        &mut service,
        [a.clone(), temp.path().join("missing.txt"), b.clone()],
    );
    assert_eq!(registry.requested_count(), 3);
    assert_eq!(registry.active_count(), 2);

    append(&b, b"more");

    let record = match service.read_record().unwrap() {
        ReadOutcome::Record(record) => record,
        other => panic!("expected a record, got {other:?}"),
    };
    assert!(record.is_modify());

    let hits: Vec<_> = registry.resolve(record.handle).map(|t| t.path.clone()).collect();
    assert_eq!(hits, vec![b]);
}

#[test]
fn test_event_loop_spawns_command_with_file_path() {
    let temp = TempDir::new().unwrap();
    let watched = temp.path().join("watched.txt");
    let copy = temp.path().join("watched.txt.copy");
    fs::write(&watched, "v1").unwrap();

    let mut service = InotifyService::new().unwrap();
    let registry = WatchRegistry::register_all(&mut service, [watched.clone()]);
    let template = CommandTemplate::new(["cp", "%F", "%F.copy"]).unwrap();
    let mut ev = EventLoop::new(service, registry, template, SpawnDispatcher::new());

    fs::write(&watched, "v2").unwrap();

    // Truncate and write may each produce a record; stop at the first dispatch.
    let mut dispatched = 0;
    while dispatched == 0 {
        if let StepOutcome::Dispatched(n) = ev.step().unwrap() {
            dispatched = n;
        }
    }
    assert_eq!(dispatched, 1);

    let deadline = Instant::now() + Duration::from_secs(10);
    while !copy.exists() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(20));
    }
    assert!(copy.exists(), "command did not run");
}
