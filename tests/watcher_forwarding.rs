// tests/watcher_forwarding.rs

use std::error::Error;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use trigger::engine::{CompletionBarrier, NotificationStream, channel};
use trigger::watch::reader::MAX_LINE_LEN;
use trigger::watch::{PatternSet, WatchError, watch};
use trigger_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

/// Acknowledge every notification and collect the texts.
fn collect(mut notes: NotificationStream) -> JoinHandle<Vec<String>> {
    tokio::spawn(async move {
        let mut seen = Vec::new();
        while let Some(note) = notes.recv().await {
            seen.push(note.acknowledge());
        }
        seen
    })
}

#[tokio::test]
async fn first_matching_pattern_wins_per_line() -> TestResult {
    init_tracing();
    let patterns = PatternSet::compile(&["/ERROR.*/", "WARN*"])?;
    let input = b"ok\nERROR: disk full\nWARNing\n".as_slice();

    let (notifier, notes) = channel(CancellationToken::new());
    let collector = collect(notes);
    let barrier = CompletionBarrier::new(1);
    let mut sink = Vec::new();

    let summary =
        with_timeout(watch(input, &mut sink, &notifier, &patterns, &barrier)).await?;
    drop(notifier);

    assert_eq!(collector.await?, vec!["ERROR: disk full", "WARNing"]);
    assert_eq!(sink, b"ok\nERROR: disk full\nWARNing\n");
    assert_eq!(summary.lines, 3);
    assert_eq!(summary.matches, 2);
    // One count per notification on top of the watcher's own; nobody
    // released them here.
    assert_eq!(barrier.count(), 3);
    Ok(())
}

#[tokio::test]
async fn regex_reports_only_the_matched_substring() -> TestResult {
    let patterns = PatternSet::compile(&["/ERROR/"])?;
    let (notifier, notes) = channel(CancellationToken::new());
    let collector = collect(notes);
    let barrier = CompletionBarrier::new(1);
    let mut sink = Vec::new();

    watch(
        b"ERROR: disk full\n".as_slice(),
        &mut sink,
        &notifier,
        &patterns,
        &barrier,
    )
    .await?;
    drop(notifier);

    assert_eq!(collector.await?, vec!["ERROR"]);
    Ok(())
}

#[tokio::test]
async fn forwards_bytes_exactly_with_and_without_matches() -> TestResult {
    let input: &[u8] = b"alpha\r\nbeta match\n\xff\xfe raw match\nno newline at end match";
    let patterns = PatternSet::compile(&["*match"])?;

    let (notifier, notes) = channel(CancellationToken::new());
    let collector = collect(notes);
    let barrier = CompletionBarrier::new(1);
    let mut sink = Vec::new();

    let summary = watch(input, &mut sink, &notifier, &patterns, &barrier).await?;
    drop(notifier);

    assert_eq!(sink, input);
    assert_eq!(summary.bytes, input.len() as u64);
    let seen = collector.await?;
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0], "beta match");
    assert_eq!(seen[2], "no newline at end match");
    Ok(())
}

#[tokio::test]
async fn no_patterns_is_a_plain_copy() -> TestResult {
    let patterns = PatternSet::default();
    let (notifier, notes) = channel(CancellationToken::new());
    let collector = collect(notes);
    let barrier = CompletionBarrier::new(1);
    let mut sink = Vec::new();
    let input: &[u8] = b"ERROR everywhere\nbut nobody is listening";

    let summary = watch(input, &mut sink, &notifier, &patterns, &barrier).await?;
    drop(notifier);

    assert_eq!(sink, input);
    assert_eq!(summary.matches, 0);
    assert!(collector.await?.is_empty());
    assert_eq!(barrier.count(), 1);
    Ok(())
}

#[tokio::test]
async fn gone_orchestrator_fails_and_rolls_back_the_barrier() -> TestResult {
    let patterns = PatternSet::compile(&["hit"])?;
    let (notifier, notes) = channel(CancellationToken::new());
    drop(notes);
    let barrier = CompletionBarrier::new(1);
    let mut sink = Vec::new();

    let err = watch(b"miss\nhit\nafter\n".as_slice(), &mut sink, &notifier, &patterns, &barrier)
        .await
        .unwrap_err();

    match err {
        WatchError::OrchestratorGone(text) => assert_eq!(text, "hit"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(barrier.count(), 1);
    // Lines before the match were already forwarded; the match itself was not.
    assert_eq!(sink, b"miss\n");
    Ok(())
}

#[tokio::test]
async fn overlong_lines_are_scanned_in_bounded_pieces() -> TestResult {
    let patterns = PatternSet::compile(&["/ERROR/"])?;
    let (notifier, notes) = channel(CancellationToken::new());
    let collector = collect(notes);
    let barrier = CompletionBarrier::new(1);
    let mut sink = Vec::new();

    // The match sits past the cap, so it is only seen in the second piece.
    let mut input = vec![b'a'; MAX_LINE_LEN];
    input.extend_from_slice(b"aaaERROR tail\n");

    let summary =
        with_timeout(watch(input.as_slice(), &mut sink, &notifier, &patterns, &barrier)).await?;
    drop(notifier);

    assert_eq!(collector.await?, vec!["ERROR"]);
    assert_eq!(sink, input);
    assert_eq!(summary.lines, 2);
    assert_eq!(summary.bytes, input.len() as u64);
    Ok(())
}

#[tokio::test]
async fn cancellation_releases_a_watcher_waiting_on_the_orchestrator() -> TestResult {
    let patterns = PatternSet::compile(&["hit"])?;
    let token = CancellationToken::new();
    // The receiver is kept alive but never read, so the watcher blocks.
    let (notifier, _notes) = channel(token.clone());
    let barrier = CompletionBarrier::new(1);
    let mut sink = Vec::new();

    let canceller = tokio::spawn({
        let token = token.clone();
        async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            token.cancel();
        }
    });

    let result = with_timeout(watch(
        b"hit\nhit\n".as_slice(),
        &mut sink,
        &notifier,
        &patterns,
        &barrier,
    ))
    .await;
    canceller.await?;

    assert!(matches!(result, Err(WatchError::Canceled)), "got {result:?}");
    assert_eq!(barrier.count(), 1);
    Ok(())
}
