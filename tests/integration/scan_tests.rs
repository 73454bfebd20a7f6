use copyfinder::duplicates::{
    CopySearchEngine, EngineConfig, IndexStats, ScanSummary, SearchError, SearchLevel,
    SearchProcessor,
};
use copyfinder::progress::{ProgressEvent, SilentProgress};
use copyfinder::scanner::HashAlgorithm;
use std::fs::{self, File};
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::tempdir;

fn processor_for(path: &std::path::Path, config: EngineConfig) -> SearchProcessor {
    SearchProcessor::new(CopySearchEngine::new(path, config))
}

fn names(group: &copyfinder::duplicates::DuplicateGroup) -> Vec<String> {
    group
        .files
        .iter()
        .map(|f| f.display_name.clone())
        .collect()
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let processor = processor_for(dir.path(), EngineConfig::default());

    let groups = processor.launch(&SilentProgress).unwrap();

    assert!(groups.is_empty());
    assert_eq!(processor.engine().stats(), IndexStats::default());
}

#[test]
fn test_scan_unique_files() {
    let dir = tempdir().unwrap();
    for (name, content) in [("a.txt", "content a"), ("b.txt", "content b"), ("c.txt", "content c")] {
        File::create(dir.path().join(name))
            .unwrap()
            .write_all(content.as_bytes())
            .unwrap();
    }

    let processor = processor_for(dir.path(), EngineConfig::default());
    let groups = processor.launch(&SilentProgress).unwrap();

    assert!(groups.is_empty());
    assert_eq!(processor.engine().stats().indexed, 3);
}

#[test]
fn test_scan_duplicate_files() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), "hi").unwrap();
    fs::write(dir.path().join("b"), "hi").unwrap();
    fs::write(dir.path().join("c"), "bye").unwrap();

    let processor = processor_for(dir.path(), EngineConfig::default());
    let groups = processor.launch(&SilentProgress).unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(names(&groups[0]), vec!["a", "b"]);
    assert_eq!(groups[0].level, SearchLevel::Full);

    let summary = ScanSummary::new(&groups, processor.engine().stats(), Duration::ZERO);
    assert_eq!(summary.indexed_files, 3);
    assert_eq!(summary.duplicate_groups, 1);
    assert_eq!(summary.duplicate_files, 1);
    assert_eq!(summary.reclaimable_space, 2);
}

#[test]
fn test_scan_same_prefix_different_size() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("short"), "prefix").unwrap();
    fs::write(dir.path().join("long"), "prefix and more").unwrap();

    let processor = processor_for(
        dir.path(),
        EngineConfig::default().with_prefix_threshold(6),
    );
    assert!(processor.launch(&SilentProgress).unwrap().is_empty());
}

#[test]
fn test_scan_nested_directories() {
    let dir = tempdir().unwrap();
    let sub = dir.path().join("subdir");
    let deeper = sub.join("deeper");
    fs::create_dir_all(&deeper).unwrap();

    fs::write(dir.path().join("top.txt"), "nested duplicate").unwrap();
    fs::write(sub.join("mid.txt"), "nested duplicate").unwrap();
    fs::write(deeper.join("bottom.txt"), "nested duplicate").unwrap();

    let processor = processor_for(dir.path(), EngineConfig::default());
    let groups = processor.launch(&SilentProgress).unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 3);
}

#[test]
fn test_scan_large_files_differing_after_prefix() {
    let dir = tempdir().unwrap();
    let base = vec![0x5Au8; 64 * 1024];
    let mut changed = base.clone();
    *changed.last_mut().unwrap() = 0;

    fs::write(dir.path().join("a.bin"), &base).unwrap();
    fs::write(dir.path().join("b.bin"), &base).unwrap();
    fs::write(dir.path().join("c.bin"), &changed).unwrap();

    let processor = processor_for(dir.path(), EngineConfig::default().with_block_size(4096));
    let coarse_sizes = Mutex::new(Vec::new());
    let callback = |event: &ProgressEvent| {
        if event.level == SearchLevel::Coarse {
            coarse_sizes.lock().unwrap().push(event.records.len());
        }
    };

    let groups = processor.launch(&callback).unwrap();

    assert_eq!(*coarse_sizes.lock().unwrap(), vec![3]);
    assert_eq!(groups.len(), 1);
    assert_eq!(names(&groups[0]), vec!["a.bin", "b.bin"]);
}

#[test]
fn test_scan_with_blake3() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), "same").unwrap();
    fs::write(dir.path().join("b"), "same").unwrap();

    let processor = processor_for(
        dir.path(),
        EngineConfig::default().with_algorithm(HashAlgorithm::Blake3),
    );
    let groups = processor.launch(&SilentProgress).unwrap();

    let fingerprint = groups[0].fingerprint.as_deref().unwrap();
    assert!(fingerprint.starts_with('4'));
    assert_eq!(fingerprint.len(), 1 + 64);
}

#[test]
fn test_scan_skips_hidden_by_default() {
    let dir = tempdir().unwrap();
    let hidden_dir = dir.path().join(".git");
    fs::create_dir(&hidden_dir).unwrap();
    fs::write(hidden_dir.join("objects"), "payload").unwrap();
    fs::write(dir.path().join(".env"), "payload").unwrap();
    fs::write(dir.path().join("visible"), "payload").unwrap();

    let processor = processor_for(dir.path(), EngineConfig::default());
    assert!(processor.launch(&SilentProgress).unwrap().is_empty());
    assert_eq!(processor.engine().stats().indexed, 1);

    let processor = processor_for(dir.path(), EngineConfig::default().with_skip_hidden(false));
    let groups = processor.launch(&SilentProgress).unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 3);
}

#[test]
fn test_scan_empty_files_are_duplicates() {
    let dir = tempdir().unwrap();
    File::create(dir.path().join("empty1")).unwrap();
    File::create(dir.path().join("empty2")).unwrap();

    let processor = processor_for(dir.path(), EngineConfig::default());
    let groups = processor.launch(&SilentProgress).unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].size(), 0);
    assert_eq!(groups[0].wasted_space(), 0);
}

#[test]
fn test_scan_non_existent_path() {
    let processor = processor_for(
        std::path::Path::new("/non/existent/path/12345"),
        EngineConfig::default(),
    );

    match processor.launch(&SilentProgress) {
        Err(SearchError::FolderNotFound(path)) => {
            assert!(path.to_string_lossy().contains("non/existent/path/12345"));
        }
        other => panic!("Expected FolderNotFound error, got {:?}", other),
    }
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_not_indexed() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("target");
    fs::write(&target, "linked content").unwrap();
    std::os::unix::fs::symlink(&target, dir.path().join("link")).unwrap();

    let processor = processor_for(dir.path(), EngineConfig::default());
    let groups = processor.launch(&SilentProgress).unwrap();

    assert!(groups.is_empty());
    assert_eq!(processor.engine().stats().indexed, 1);
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_is_skipped() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), "dup").unwrap();
    fs::write(dir.path().join("b"), "dup").unwrap();
    let locked = dir.path().join("locked");
    fs::write(&locked, "dup").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Root can read anything; nothing to test there.
    if File::open(&locked).is_ok() {
        return;
    }

    let processor = processor_for(dir.path(), EngineConfig::default());
    let groups = processor.launch(&SilentProgress).unwrap();

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 2);
    assert_eq!(
        processor.engine().stats(),
        IndexStats {
            indexed: 2,
            skipped: 1
        }
    );
}

#[test]
fn test_repeated_launch_is_stable() {
    let dir = tempdir().unwrap();
    for i in 0..4 {
        fs::write(dir.path().join(format!("x{i}")), "xx").unwrap();
        fs::write(dir.path().join(format!("y{i}")), "yyy").unwrap();
    }

    let processor = processor_for(dir.path(), EngineConfig::default());
    let first = processor.launch(&SilentProgress).unwrap();
    let second = processor.launch(&SilentProgress).unwrap();

    assert_eq!(first.len(), 2);
    let first: Vec<_> = first.iter().map(names).collect();
    let second: Vec<_> = second.iter().map(names).collect();
    assert_eq!(first, second);
    assert_eq!(first[0], vec!["x0", "x1", "x2", "x3"]);
}
