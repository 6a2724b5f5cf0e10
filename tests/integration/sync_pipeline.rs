//! End-to-end sync runs against the in-process design API.

use crate::support::{component, design_document, settings, FailingLedgerStorage, FakeDesignApi};
use figma_sync::document::{Document, Node};
use figma_sync::error::{SyncError, TransportError};
use figma_sync::ledger::{LedgerStorage, MemoryLedgerStorage};
use figma_sync::sync::{CollectingEventSink, SyncEvent, SyncOptions, SyncReport, SyncRunner};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn home_and_arrow() -> Vec<Node> {
    vec![
        component("3:1", "Home"),
        component("3:2", "Arrow Left"),
        Node::new("3:3", "Home", "INSTANCE"),
    ]
}

fn serve_home_and_arrow(api: &FakeDesignApi) {
    api.serve("3:1", "https://cdn/home-v1", b"<svg home/>");
    api.serve("3:2", "https://cdn/arrow-v1", b"<svg arrow/>");
    api.serve("3:3", "https://cdn/home-instance", b"<svg home instance/>");
}

async fn run(
    api: &FakeDesignApi,
    workspace: &Path,
    storage: &Arc<MemoryLedgerStorage>,
    options: SyncOptions,
) -> Result<SyncReport, SyncError> {
    let sink = CollectingEventSink::new();
    let runner = SyncRunner::new(api, settings(workspace), &sink);
    runner.run(Box::new(storage.clone()), options).await
}

#[tokio::test]
async fn first_run_materializes_everything_and_second_run_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeDesignApi::new(design_document(home_and_arrow()));
    serve_home_and_arrow(&api);
    let storage = Arc::new(MemoryLedgerStorage::new());

    let report = run(&api, dir.path(), &storage, SyncOptions::default()).await.unwrap();
    assert_eq!(report.document_name, "Design System");

    let colors = report.colors.unwrap();
    assert_eq!(colors.total, 2);
    assert_eq!(colors.new, vec!["brandPrimary".to_string(), "surface".to_string()]);
    let colors_source = std::fs::read_to_string(dir.path().join("lib/generated/app_colors.dart")).unwrap();
    assert!(colors_source.contains("static const Color brandPrimary = Color(0xFFFF0000);"));
    assert!(colors_source.contains("static const Color surface = Color(0xFFFFFFFF);"));

    let icons = report.icons.unwrap();
    assert_eq!(icons.candidates, 2);
    assert_eq!(icons.downloaded, vec!["home.svg".to_string(), "arrow_left.svg".to_string()]);
    assert_eq!(icons.skipped_duplicates.len(), 1);
    assert_eq!(icons.skipped_duplicates[0].node_id, "3:3");
    assert_eq!(icons.skipped_duplicates[0].kept_node_id, "3:1");
    assert_eq!(
        std::fs::read(dir.path().join("assets/icons/home.svg")).unwrap(),
        b"<svg home/>"
    );
    let index = std::fs::read_to_string(dir.path().join("lib/generated/app_icons.dart")).unwrap();
    assert!(index.contains("static const String arrowLeft = 'assets/icons/arrow_left.svg';"));

    let record = storage.read().unwrap().unwrap();
    assert_eq!(record.source_document_key, "file-key");
    assert!(record.last_sync.is_some());
    assert_eq!(record.icons.len(), 2);
    assert!(record.icons["3:1"].local_content_hash.is_some());

    let report = run(&api, dir.path(), &storage, SyncOptions::default()).await.unwrap();
    let colors = report.colors.unwrap();
    assert_eq!(colors.unchanged, 2);
    assert!(colors.written.is_none());
    let icons = report.icons.unwrap();
    assert_eq!(icons.unchanged, 2);
    assert!(icons.downloaded.is_empty());
    assert!(icons.index_written.is_none());
    assert_eq!(api.byte_calls(), 2);
}

#[tokio::test]
async fn changed_locator_redownloads_only_that_icon() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeDesignApi::new(design_document(home_and_arrow()));
    serve_home_and_arrow(&api);
    let storage = Arc::new(MemoryLedgerStorage::new());
    run(&api, dir.path(), &storage, SyncOptions::default()).await.unwrap();

    api.serve("3:2", "https://cdn/arrow-v2", b"<svg arrow v2/>");
    let report = run(&api, dir.path(), &storage, SyncOptions::default()).await.unwrap();

    let icons = report.icons.unwrap();
    assert_eq!(icons.downloaded, vec!["arrow_left.svg".to_string()]);
    assert_eq!(icons.unchanged, 1);
    assert_eq!(
        std::fs::read(dir.path().join("assets/icons/arrow_left.svg")).unwrap(),
        b"<svg arrow v2/>"
    );
    let record = storage.read().unwrap().unwrap();
    assert_eq!(record.icons["3:2"].remote_locator, "https://cdn/arrow-v2");
}

#[tokio::test]
async fn locally_edited_icon_is_restored() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeDesignApi::new(design_document(home_and_arrow()));
    serve_home_and_arrow(&api);
    let storage = Arc::new(MemoryLedgerStorage::new());
    run(&api, dir.path(), &storage, SyncOptions::default()).await.unwrap();

    std::fs::write(dir.path().join("assets/icons/home.svg"), b"<svg tampered/>").unwrap();
    std::fs::remove_file(dir.path().join("assets/icons/arrow_left.svg")).unwrap();
    let report = run(&api, dir.path(), &storage, SyncOptions::default()).await.unwrap();

    let icons = report.icons.unwrap();
    assert_eq!(icons.downloaded.len(), 2);
    assert_eq!(
        std::fs::read(dir.path().join("assets/icons/home.svg")).unwrap(),
        b"<svg home/>"
    );
}

#[tokio::test]
async fn force_redownloads_and_rewrites_everything() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeDesignApi::new(design_document(home_and_arrow()));
    serve_home_and_arrow(&api);
    let storage = Arc::new(MemoryLedgerStorage::new());
    run(&api, dir.path(), &storage, SyncOptions::default()).await.unwrap();

    let options = SyncOptions {
        force: true,
        ..SyncOptions::default()
    };
    let report = run(&api, dir.path(), &storage, options).await.unwrap();
    assert!(report.colors.unwrap().written.is_some());
    let icons = report.icons.unwrap();
    assert_eq!(icons.downloaded.len(), 2);
    assert!(icons.index_written.is_some());
    assert_eq!(api.byte_calls(), 4);
}

#[tokio::test]
async fn consecutive_failures_abandon_queue_but_ledger_is_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let icons: Vec<Node> = ["A", "B", "C", "D", "E", "F"]
        .iter()
        .enumerate()
        .map(|(i, letter)| component(&format!("3:{}", i + 1), &format!("Icon {}", letter)))
        .collect();
    let api = FakeDesignApi::new(design_document(icons));
    for i in 1..=6 {
        let locator = format!("https://cdn/icon-{}", i);
        api.serve(&format!("3:{}", i), &locator, b"<svg/>");
        api.fail_download(&locator);
    }
    let storage = Arc::new(MemoryLedgerStorage::new());

    let sink = CollectingEventSink::new();
    let runner = SyncRunner::new(&api, settings(dir.path()), &sink);
    let report = runner
        .run(Box::new(storage.clone()), SyncOptions::default())
        .await
        .unwrap();

    assert!(report.is_partial());
    let icons = report.icons.unwrap();
    assert!(icons.abandoned);
    assert_eq!(icons.failed.len(), 4);
    assert_eq!(icons.not_attempted, 2);
    assert_eq!(api.byte_calls(), 4);
    assert_eq!(
        sink.count(|e| matches!(
            e,
            SyncEvent::IconQueueAbandoned {
                consecutive_failures: 4,
                remaining: 2
            }
        )),
        1
    );

    let record = storage.read().unwrap().unwrap();
    assert!(record.icons.is_empty());
    assert_eq!(record.colors.len(), 2);
    assert_eq!(sink.count(|e| matches!(e, SyncEvent::LedgerPersisted { .. })), 1);
}

#[tokio::test]
async fn success_resets_the_failure_streak() {
    let dir = tempfile::tempdir().unwrap();
    let icons: Vec<Node> = (1..=7)
        .map(|i| component(&format!("3:{}", i), &format!("Glyph {}", i)))
        .collect();
    let api = FakeDesignApi::new(design_document(icons));
    for i in 1..=7 {
        let locator = format!("https://cdn/glyph-{}", i);
        api.serve(&format!("3:{}", i), &locator, b"<svg/>");
        // 3 failures, 1 success, 3 failures
        if i != 4 {
            api.fail_download(&locator);
        }
    }
    let storage = Arc::new(MemoryLedgerStorage::new());

    let report = run(&api, dir.path(), &storage, SyncOptions::default()).await.unwrap();
    let icons = report.icons.unwrap();
    assert!(!icons.abandoned);
    assert_eq!(icons.failed.len(), 6);
    assert_eq!(icons.downloaded, vec!["glyph_4.svg".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn slow_download_times_out_and_counts_as_failure() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeDesignApi::new(design_document(home_and_arrow()));
    serve_home_and_arrow(&api);
    api.delay_download("https://cdn/home-v1", Duration::from_secs(120));
    let storage = Arc::new(MemoryLedgerStorage::new());

    let report = run(&api, dir.path(), &storage, SyncOptions::default()).await.unwrap();
    let icons = report.icons.unwrap();
    assert_eq!(icons.failed.len(), 1);
    assert_eq!(icons.failed[0].node_id, "3:1");
    assert!(icons.failed[0].error.contains("timed out after 30s"));
    assert_eq!(icons.downloaded, vec!["arrow_left.svg".to_string()]);

    let record = storage.read().unwrap().unwrap();
    assert!(!record.icons.contains_key("3:1"));
    assert!(record.icons.contains_key("3:2"));
}

#[tokio::test]
async fn locator_lookup_failure_fails_the_icon_phase() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeDesignApi::new(design_document(home_and_arrow()));
    serve_home_and_arrow(&api);
    api.fail_locators(TransportError::Status {
        status: 403,
        url: "fake://images".to_string(),
    });
    let storage = Arc::new(MemoryLedgerStorage::new());

    let err = run(&api, dir.path(), &storage, SyncOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Extraction(TransportError::Status { status: 403, .. })));
    assert_eq!(api.byte_calls(), 0);

    // Colors ran before the failure and the ledger was still written.
    let record = storage.read().unwrap().unwrap();
    assert_eq!(record.colors.len(), 2);
    assert!(record.icons.is_empty());
}

#[tokio::test]
async fn orphans_are_reported_and_only_cleaned_on_request() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeDesignApi::new(design_document(home_and_arrow()));
    serve_home_and_arrow(&api);
    let storage = Arc::new(MemoryLedgerStorage::new());
    run(&api, dir.path(), &storage, SyncOptions::default()).await.unwrap();

    api.set_document(design_document(vec![component("3:1", "Home")]));
    let arrow = dir.path().join("assets/icons/arrow_left.svg");

    let index_path = dir.path().join("lib/generated/app_icons.dart");

    let report = run(&api, dir.path(), &storage, SyncOptions::default()).await.unwrap();
    let icons = report.icons.unwrap();
    assert_eq!(icons.orphaned, vec!["3:2".to_string()]);
    assert!(icons.removed.is_empty());
    assert!(arrow.exists());
    assert!(storage.read().unwrap().unwrap().icons.contains_key("3:2"));
    // The index follows the document even while the orphan is kept.
    assert!(icons.index_written.is_some());
    let index = std::fs::read_to_string(&index_path).unwrap();
    assert!(!index.contains("arrowLeft"));
    assert!(index.contains("home"));

    let options = SyncOptions {
        clean_orphans: true,
        ..SyncOptions::default()
    };
    let report = run(&api, dir.path(), &storage, options).await.unwrap();
    let icons = report.icons.unwrap();
    assert_eq!(icons.removed, vec!["3:2".to_string()]);
    assert!(!arrow.exists());
    assert!(dir.path().join("assets/icons/home.svg").exists());
    assert!(icons.index_written.is_none());
    let record = storage.read().unwrap().unwrap();
    assert!(!record.icons.contains_key("3:2"));
}

#[tokio::test]
async fn ledger_from_another_document_is_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeDesignApi::new(design_document(home_and_arrow()));
    serve_home_and_arrow(&api);
    let storage = Arc::new(MemoryLedgerStorage::new());
    run(&api, dir.path(), &storage, SyncOptions::default()).await.unwrap();

    let mut other = settings(dir.path());
    other.file_key = "other-key".to_string();
    let sink = CollectingEventSink::new();
    let report = SyncRunner::new(&api, other, &sink)
        .run(Box::new(storage.clone()), SyncOptions::default())
        .await
        .unwrap();

    let colors = report.colors.unwrap();
    assert_eq!(colors.new.len(), 2);
    assert!(colors.orphaned.is_empty());
    let record = storage.read().unwrap().unwrap();
    assert_eq!(record.source_document_key, "other-key");
}

#[tokio::test]
async fn empty_document_syncs_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeDesignApi::new(Document::empty());
    let storage = Arc::new(MemoryLedgerStorage::new());

    let report = run(&api, dir.path(), &storage, SyncOptions::default()).await.unwrap();
    assert_eq!(report.colors.unwrap().total, 0);
    let icons = report.icons.unwrap();
    assert_eq!(icons.candidates, 0);
    assert!(icons.failed.is_empty());
    assert_eq!(api.locator_calls(), 0);
    assert_eq!(api.byte_calls(), 0);
    assert!(storage.read().unwrap().is_some());
}

#[tokio::test]
async fn colors_only_leaves_icons_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeDesignApi::new(design_document(home_and_arrow()));
    serve_home_and_arrow(&api);
    let storage = Arc::new(MemoryLedgerStorage::new());

    let options = SyncOptions {
        icons: false,
        ..SyncOptions::default()
    };
    let report = run(&api, dir.path(), &storage, options).await.unwrap();
    assert!(report.colors.is_some());
    assert!(report.icons.is_none());
    assert_eq!(api.locator_calls(), 0);
    assert!(!dir.path().join("assets/icons").exists());
}

fn without_surface_swatch(mut document: Document) -> Document {
    let palette = &mut document.root.children[0].children[0];
    palette.children.retain(|n| n.name != "Surface");
    document
}

#[tokio::test]
async fn removed_color_regenerates_once_while_orphan_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeDesignApi::new(design_document(home_and_arrow()));
    let storage = Arc::new(MemoryLedgerStorage::new());
    let colors_only = SyncOptions {
        icons: false,
        ..SyncOptions::default()
    };
    run(&api, dir.path(), &storage, colors_only).await.unwrap();

    api.set_document(without_surface_swatch(design_document(home_and_arrow())));
    let colors_path = dir.path().join("lib/generated/app_colors.dart");

    let mut written = Vec::new();
    for _ in 0..3 {
        let colors = run(&api, dir.path(), &storage, colors_only)
            .await
            .unwrap()
            .colors
            .unwrap();
        assert_eq!(colors.orphaned, vec!["surface".to_string()]);
        written.push(colors.written.is_some());
    }
    assert_eq!(written, vec![true, false, false]);

    let source = std::fs::read_to_string(&colors_path).unwrap();
    assert!(!source.contains("surface"));
    assert!(source.contains("brandPrimary"));
    assert!(storage.read().unwrap().unwrap().colors.contains_key("surface"));
}

fn numbered_icons(count: usize) -> Vec<Node> {
    (1..=count)
        .map(|i| component(&format!("3:{}", i), &format!("Glyph {}", i)))
        .collect()
}

async fn paced_run_elapsed(icon_count: usize) -> (Duration, usize) {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeDesignApi::new(design_document(numbered_icons(icon_count)));
    for i in 1..=icon_count {
        api.serve(&format!("3:{}", i), &format!("https://cdn/glyph-{}", i), b"<svg/>");
    }
    let mut paced = settings(dir.path());
    paced.download.pacing_ms = 100;
    let sink = CollectingEventSink::new();
    let runner = SyncRunner::new(&api, paced, &sink);

    let start = tokio::time::Instant::now();
    let report = runner
        .run(Box::new(MemoryLedgerStorage::new()), SyncOptions::default())
        .await
        .unwrap();
    (start.elapsed(), report.icons.unwrap().downloaded.len())
}

#[tokio::test(start_paused = true)]
async fn downloads_are_paced_between_items() {
    let (elapsed, downloaded) = paced_run_elapsed(3).await;
    assert_eq!(downloaded, 3);
    // Two gaps between three downloads; no delay before the first.
    assert!(elapsed >= Duration::from_millis(200), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(300), "elapsed {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn single_download_is_not_delayed() {
    let (elapsed, downloaded) = paced_run_elapsed(1).await;
    assert_eq!(downloaded, 1);
    assert!(elapsed < Duration::from_millis(100), "elapsed {:?}", elapsed);
}

#[tokio::test]
async fn ledger_write_failure_does_not_mask_sync_error() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeDesignApi::new(design_document(home_and_arrow()));
    serve_home_and_arrow(&api);
    api.fail_locators(TransportError::Network("connection reset".to_string()));

    let sink = CollectingEventSink::new();
    let err = SyncRunner::new(&api, settings(dir.path()), &sink)
        .run(Box::new(FailingLedgerStorage), SyncOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Extraction(TransportError::Network(_))));
    assert_eq!(sink.count(|e| matches!(e, SyncEvent::LedgerPersisted { .. })), 0);
}

#[tokio::test]
async fn ledger_write_failure_fails_an_otherwise_clean_run() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeDesignApi::new(design_document(home_and_arrow()));
    serve_home_and_arrow(&api);

    let sink = CollectingEventSink::new();
    let err = SyncRunner::new(&api, settings(dir.path()), &sink)
        .run(Box::new(FailingLedgerStorage), SyncOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Ledger(_)));
}
