use copyfinder::duplicates::{
    CopySearchEngine, EngineConfig, SearchError, SearchEvent, SearchLevel, SearchPhase,
    SearchProcessor,
};
use copyfinder::duplicates::processor::EVENT_CHANNEL_CAPACITY;
use copyfinder::progress::{ProgressCallback, ProgressEvent, SilentProgress};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::tempdir;

fn write_pairs(dir: &Path, pairs: usize, len: usize) {
    for i in 0..pairs {
        let content: Vec<u8> = std::iter::repeat(u8::try_from(i % 256).unwrap())
            .take(len)
            .collect();
        fs::write(dir.join(format!("pair{i:03}_a")), &content).unwrap();
        fs::write(dir.join(format!("pair{i:03}_b")), &content).unwrap();
    }
}

/// Counts events per level.
#[derive(Default)]
struct Recorder {
    started: AtomicUsize,
    events: AtomicUsize,
    finished: AtomicUsize,
}

impl ProgressCallback for Recorder {
    fn on_level_start(&self, _level: SearchLevel, _total: usize) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn on_progress(&self, _event: &ProgressEvent) {
        self.events.fetch_add(1, Ordering::SeqCst);
    }

    fn on_level_end(&self, _level: SearchLevel) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_second_launch_while_indexing_is_rejected() {
    let dir = tempdir().unwrap();
    write_pairs(dir.path(), 2, 16);

    let processor = SearchProcessor::new(CopySearchEngine::new(dir.path(), EngineConfig::default()));
    let (started_tx, started_rx) = crossbeam_channel::unbounded::<()>();
    let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(0);

    let blocking = |event: &ProgressEvent| {
        if event.level == SearchLevel::Index {
            let _ = started_tx.send(());
            let _ = release_rx.recv();
        }
    };

    thread::scope(|scope| {
        let first = scope.spawn(|| processor.launch(&blocking));

        started_rx.recv().unwrap();
        assert_eq!(processor.engine().phase(), SearchPhase::Indexing);
        assert!(matches!(
            processor.launch(&SilentProgress),
            Err(SearchError::SearchInProgress)
        ));

        drop(release_tx);
        let groups = first.join().unwrap().unwrap();
        assert_eq!(groups.len(), 2);
    });

    assert_eq!(processor.engine().phase(), SearchPhase::Completed);
}

#[test]
fn test_abort_during_full_then_relaunch() {
    let dir = tempdir().unwrap();
    write_pairs(dir.path(), 3, 512);

    let processor = SearchProcessor::new(CopySearchEngine::new(
        dir.path(),
        EngineConfig::default().with_prefix_threshold(32),
    ));
    let aborting = |event: &ProgressEvent| {
        if event.level == SearchLevel::Full {
            processor.abort();
        }
    };

    assert!(matches!(
        processor.launch(&aborting),
        Err(SearchError::Aborted)
    ));
    assert_eq!(processor.engine().phase(), SearchPhase::Aborted);
    assert!(processor.engine().state().is_idle());

    let groups = processor.launch(&SilentProgress).unwrap();
    assert_eq!(groups.len(), 3);
    assert_eq!(processor.engine().phase(), SearchPhase::Completed);
}

#[test]
fn test_abort_between_levels_emits_no_events() {
    let dir = tempdir().unwrap();
    write_pairs(dir.path(), 2, 16);

    let engine = CopySearchEngine::new(dir.path(), EngineConfig::default());
    engine.search_copies(SearchLevel::Index, &SilentProgress).unwrap();
    engine.state().abort();

    let recorder = Recorder::default();
    for level in [SearchLevel::Coarse, SearchLevel::Full] {
        assert!(matches!(
            engine.search_copies(level, &recorder),
            Err(SearchError::Aborted)
        ));
    }

    assert_eq!(recorder.started.load(Ordering::SeqCst), 0);
    assert_eq!(recorder.events.load(Ordering::SeqCst), 0);
    assert_eq!(recorder.finished.load(Ordering::SeqCst), 0);
}

#[test]
fn test_level_callbacks_bracket_each_level() {
    let dir = tempdir().unwrap();
    write_pairs(dir.path(), 2, 16);

    let processor = SearchProcessor::new(CopySearchEngine::new(dir.path(), EngineConfig::default()));
    let recorder = Recorder::default();
    processor.launch(&recorder).unwrap();

    assert_eq!(recorder.started.load(Ordering::SeqCst), 3);
    assert_eq!(recorder.finished.load(Ordering::SeqCst), 3);
    // 4 index events, 2 coarse groups, 2 full groups
    assert_eq!(recorder.events.load(Ordering::SeqCst), 8);
}

#[test]
fn test_background_search_can_be_aborted() {
    let dir = tempdir().unwrap();
    // More index events than the channel holds, so the worker cannot finish
    // before the first event is read.
    let files = EVENT_CHANNEL_CAPACITY + 100;
    for i in 0..files {
        fs::write(dir.path().join(format!("f{i:05}")), i.to_string()).unwrap();
    }

    let processor = Arc::new(SearchProcessor::new(CopySearchEngine::new(
        dir.path(),
        EngineConfig::default(),
    )));
    let handle = Arc::clone(&processor).spawn().unwrap();

    let mut outcome = None;
    for event in handle.events().iter() {
        match event {
            SearchEvent::Progress(_) => handle.abort(),
            SearchEvent::Finished(result) => {
                outcome = Some(result);
                break;
            }
            SearchEvent::LevelStarted { .. } | SearchEvent::LevelFinished(_) => {}
        }
    }

    assert!(matches!(outcome, Some(Err(SearchError::Aborted))));
    assert!(processor.engine().stats().indexed < files);
    drop(handle);

    assert!(processor.launch(&SilentProgress).unwrap().is_empty());
    assert_eq!(processor.engine().stats().indexed, files);
}

#[test]
fn test_dropped_handle_leaves_engine_reusable() {
    let dir = tempdir().unwrap();
    write_pairs(dir.path(), 20, 64);

    let processor = Arc::new(SearchProcessor::new(CopySearchEngine::new(
        dir.path(),
        EngineConfig::default(),
    )));
    drop(Arc::clone(&processor).spawn().unwrap());

    // The worker either observed the abort or ran to completion; either way
    // it releases the flag.
    let mut groups = None;
    for _ in 0..500 {
        match processor.launch(&SilentProgress) {
            Err(SearchError::SearchInProgress) => {
                thread::sleep(Duration::from_millis(10));
            }
            other => {
                groups = Some(other.unwrap());
                break;
            }
        }
    }
    assert_eq!(groups.unwrap().len(), 20);
}
