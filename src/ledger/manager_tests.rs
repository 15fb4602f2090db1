//! Tests for Ledger

use super::*;
use crate::error::Error;
use crate::pagination::Cursor;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

fn cursor(max_tag_id: u32) -> Cursor {
    Cursor::parse(&format!(
        "https://api.instagram.com/v1/tags/sunset/media/recent?client_id=aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa&count=40&max_tag_id={max_tag_id}"
    ))
    .unwrap()
}

fn progress(records: u64, requests: u64) -> Progress {
    Progress {
        records_fetched: records,
        requests_issued: requests,
        elapsed_seconds: 1.5,
        end_of_results: false,
        target: Some(100),
    }
}

// ============================================================================
// Construction Tests
// ============================================================================

#[test]
fn test_paths_derived_from_output() {
    let ledger = Ledger::for_output("/data/runs/posts.csv").unwrap();
    assert!(!ledger.is_in_memory());
    assert_eq!(
        ledger.progress_path().unwrap().to_str().unwrap(),
        "/data/runs/posts.log"
    );
    assert_eq!(
        ledger.cursor_log_path().unwrap().to_str().unwrap(),
        "/data/runs/posts_url.log"
    );
}

#[test]
fn test_output_without_extension() {
    let ledger = Ledger::for_output("posts").unwrap();
    assert_eq!(ledger.progress_path().unwrap().to_str().unwrap(), "posts.log");
}

#[test]
fn test_output_colliding_with_ledger_rejected() {
    let err = Ledger::for_output("posts.log").unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
}

#[tokio::test]
async fn test_in_memory_ledger_is_inert() {
    let ledger = Ledger::in_memory();
    assert!(ledger.is_in_memory());
    ledger.commit(&progress(10, 1), Some(&cursor(1))).await.unwrap();
    ledger.log_cursor(&cursor(2)).await.unwrap();
    assert!(ledger.load().await.unwrap().is_none());
    ledger.reset().await.unwrap();
}

// ============================================================================
// Load / Commit Tests
// ============================================================================

#[tokio::test]
async fn test_load_missing_is_fresh_start() {
    let dir = tempdir().unwrap();
    let ledger = Ledger::for_output(dir.path().join("out.csv")).unwrap();
    assert!(ledger.load().await.unwrap().is_none());
}

#[tokio::test]
async fn test_commit_then_load() {
    let dir = tempdir().unwrap();
    let ledger = Ledger::for_output(dir.path().join("out.csv")).unwrap();

    ledger.commit(&progress(40, 1), Some(&cursor(1))).await.unwrap();
    ledger.commit(&progress(80, 2), Some(&cursor(2))).await.unwrap();

    let checkpoint = ledger.load().await.unwrap().unwrap();
    assert_eq!(checkpoint.progress, progress(80, 2));
    assert_eq!(checkpoint.cursor, Some(cursor(2)));

    // Cursor log keeps every cursor, one per line
    let log = std::fs::read_to_string(dir.path().join("out_url.log")).unwrap();
    let lines: Vec<_> = log.lines().collect();
    assert_eq!(lines, vec![cursor(1).to_string(), cursor(2).to_string()]);

    // No temp file left behind
    assert!(!dir.path().join("out.log.tmp").exists());
}

#[tokio::test]
async fn test_end_of_results_has_no_resume_cursor() {
    let dir = tempdir().unwrap();
    let ledger = Ledger::for_output(dir.path().join("out.csv")).unwrap();

    ledger.commit(&progress(40, 1), Some(&cursor(1))).await.unwrap();
    let mut done = progress(45, 2);
    done.end_of_results = true;
    ledger.commit(&done, None).await.unwrap();

    let checkpoint = ledger.load().await.unwrap().unwrap();
    assert!(checkpoint.progress.end_of_results);
    assert_eq!(checkpoint.cursor, None);

    // The log keeps the consumed cursor
    let log = std::fs::read_to_string(dir.path().join("out_url.log")).unwrap();
    assert_eq!(log.lines().collect::<Vec<_>>(), vec![cursor(1).to_string()]);
}

#[tokio::test]
async fn test_log_cursor_appends_without_touching_progress() {
    let dir = tempdir().unwrap();
    let ledger = Ledger::for_output(dir.path().join("out.csv")).unwrap();

    ledger.log_cursor(&cursor(0)).await.unwrap();
    assert!(!dir.path().join("out.log").exists());

    ledger.commit(&progress(40, 1), Some(&cursor(1))).await.unwrap();
    ledger.log_cursor(&cursor(1)).await.unwrap();

    let log = std::fs::read_to_string(dir.path().join("out_url.log")).unwrap();
    assert_eq!(
        log.lines().collect::<Vec<_>>(),
        vec![cursor(0).to_string(), cursor(1).to_string(), cursor(1).to_string()]
    );
    let checkpoint = ledger.load().await.unwrap().unwrap();
    assert_eq!(checkpoint.progress, progress(40, 1));
    assert_eq!(checkpoint.cursor, Some(cursor(1)));
}

#[tokio::test]
async fn test_load_falls_back_to_cursor_log() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("out.log"), "post count: 80\nnumber of requests: 2").unwrap();
    std::fs::write(
        dir.path().join("out_url.log"),
        format!("{}\n{}\n\n", cursor(1), cursor(2)),
    )
    .unwrap();

    let ledger = Ledger::for_output(dir.path().join("out.csv")).unwrap();
    let checkpoint = ledger.load().await.unwrap().unwrap();
    assert_eq!(checkpoint.progress.records_fetched, 80);
    assert_eq!(checkpoint.cursor, Some(cursor(2)));
}

#[tokio::test]
async fn test_load_corrupt_progress_fails_loudly() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("out.log"), "records_fetched: 4\nrequests_iss").unwrap();

    let ledger = Ledger::for_output(dir.path().join("out.csv")).unwrap();
    let err = ledger.load().await.unwrap_err();
    assert!(matches!(err, Error::LedgerCorruption { .. }));
}

#[tokio::test]
async fn test_load_corrupt_cursor_log_fails_loudly() {
    let dir = tempdir().unwrap();
    std::fs::write(
        dir.path().join("out.log"),
        "records_fetched: 4\nrequests_issued: 1\nelapsed_seconds: 0.5\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("out_url.log"), "not a url").unwrap();

    let ledger = Ledger::for_output(dir.path().join("out.csv")).unwrap();
    let err = ledger.load().await.unwrap_err();
    assert!(matches!(err, Error::LedgerCorruption { .. }));
}

#[tokio::test]
async fn test_stale_temp_file_is_ignored() {
    let dir = tempdir().unwrap();
    let ledger = Ledger::for_output(dir.path().join("out.csv")).unwrap();
    ledger.commit(&progress(40, 1), Some(&cursor(1))).await.unwrap();

    // A crash mid-write leaves a partial temp file; the record is untouched
    std::fs::write(dir.path().join("out.log.tmp"), "records_fetched: 9").unwrap();

    let checkpoint = ledger.load().await.unwrap().unwrap();
    assert_eq!(checkpoint.progress.records_fetched, 40);
}

// ============================================================================
// Finalize / Reset Tests
// ============================================================================

#[tokio::test]
async fn test_finalize_appends_summary() {
    let dir = tempdir().unwrap();
    let ledger = Ledger::for_output(dir.path().join("out.csv")).unwrap();
    ledger.commit(&progress(100, 3), Some(&cursor(3))).await.unwrap();

    let summary = RunSummary::new("quota_reached", Some(1_439_648_721));
    ledger
        .finalize(&progress(100, 3), Some(&cursor(3)), &summary)
        .await
        .unwrap();

    let text = std::fs::read_to_string(dir.path().join("out.log")).unwrap();
    assert!(text.contains("status: quota_reached"));
    assert!(text.contains("oldest_created_time: 1439648721"));
    assert!(text.contains("oldest_created_at: 2015-08-15T14:25:21Z"));

    let checkpoint = ledger.load().await.unwrap().unwrap();
    assert_eq!(checkpoint.progress, progress(100, 3));
    assert_eq!(checkpoint.cursor, Some(cursor(3)));
    assert_eq!(checkpoint.status.as_deref(), Some("quota_reached"));
}

#[tokio::test]
async fn test_reset_removes_files() {
    let dir = tempdir().unwrap();
    let ledger = Ledger::for_output(dir.path().join("out.csv")).unwrap();
    ledger.commit(&progress(40, 1), Some(&cursor(1))).await.unwrap();

    ledger.reset().await.unwrap();
    assert!(!dir.path().join("out.log").exists());
    assert!(!dir.path().join("out_url.log").exists());
    assert!(ledger.load().await.unwrap().is_none());

    // Resetting twice is fine
    ledger.reset().await.unwrap();
}
