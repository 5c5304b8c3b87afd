use crate::e2e::helpers;

use helpers::{fast_options, lesson, partial_files, read_audio, request, MockTtsRepository, TestContext};
use lesson_narrator::domain::narration::{
    BatchSummary, NarrationError, NarrationService, NarrationStatus,
};
use lesson_narrator::error::AppError;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::test]
async fn it_should_write_one_file_per_slide() {
    let ctx = TestContext::new(MockTtsRepository::new());

    let results = ctx
        .generate(lesson(5, &["Welcome.", "Second slide.", "Goodbye."]))
        .await;

    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.is_success()));
    for (slide, text) in [(1, "Welcome."), (2, "Second slide."), (3, "Goodbye.")] {
        assert_eq!(read_audio(&ctx.audio_path(5, slide)), format!("audio:{}", text));
    }
    assert_eq!(
        BatchSummary::from_results(&results).to_string(),
        "3 attempted, 3 succeeded"
    );
    assert_eq!(ctx.tts.calls(), 3);
}

#[tokio::test]
async fn it_should_report_bytes_written_and_attempts() {
    let ctx = TestContext::new(MockTtsRepository::new());

    let results = ctx.generate(vec![request(1, 1, "Hello.")]).await;

    assert_eq!(
        results[0].status,
        NarrationStatus::Success {
            bytes_written: "audio:Hello.".len() as u64,
            attempts: 1,
        }
    );
    assert_eq!(results[0].output_path, ctx.audio_path(1, 1));
}

#[tokio::test]
async fn it_should_isolate_failing_items() {
    let ctx = TestContext::new(MockTtsRepository::new().failing_on("BOOM"));

    let results = ctx
        .generate(lesson(4, &["First.", "BOOM goes this one.", "Third."]))
        .await;

    assert!(results[0].is_success());
    assert!(matches!(results[1].error(), Some(NarrationError::Backend(_))));
    assert!(results[2].is_success());

    assert!(ctx.audio_path(4, 1).exists());
    assert!(!ctx.audio_path(4, 2).exists());
    assert!(ctx.audio_path(4, 3).exists());
    assert_eq!(
        BatchSummary::from_results(&results).to_string(),
        "3 attempted, 2 succeeded"
    );
}

#[tokio::test]
async fn it_should_reject_blank_text_before_calling_the_backend() {
    let ctx = TestContext::new(MockTtsRepository::new());

    let results = ctx
        .generate(vec![request(1, 1, ""), request(1, 2, "   \n\t"), request(1, 3, "<p> </p>")])
        .await;

    for result in &results {
        assert!(matches!(result.error(), Some(NarrationError::Validation(_))));
    }
    assert_eq!(ctx.tts.calls(), 0);
    assert!(!ctx.audio_path(1, 1).exists());
}

#[tokio::test]
async fn it_should_send_cleaned_text_to_the_backend() {
    let ctx = TestContext::new(MockTtsRepository::new());

    ctx.generate(vec![request(
        2,
        1,
        "## Overview\n\n**Knowledge** is <em>abstract</em>.\nSee https://example.com/notes for more.",
    )])
    .await;

    assert_eq!(
        ctx.tts.received(),
        vec!["Overview Knowledge is abstract. See for more.".to_string()]
    );
}

#[tokio::test]
async fn it_should_create_one_directory_per_lesson() {
    let ctx = TestContext::new(MockTtsRepository::new());

    let mut requests = lesson(4, &["Four one."]);
    requests.extend(lesson(7, &["Seven one.", "Seven two."]));
    ctx.generate(requests).await;

    assert!(ctx.output_root().join("lesson4").is_dir());
    assert!(ctx.output_root().join("lesson7").is_dir());
    assert!(ctx.audio_path(7, 2).is_file());
}

#[tokio::test]
async fn it_should_overwrite_files_on_rerun() {
    let ctx = TestContext::new(MockTtsRepository::new());
    let requests = lesson(6, &["Alpha.", "Beta."]);

    let first = ctx.generate(requests.clone()).await;
    let second = ctx.generate(requests).await;

    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.output_path, b.output_path);
        assert!(b.is_success());
    }
    assert_eq!(read_audio(&ctx.audio_path(6, 2)), "audio:Beta.");
    assert!(partial_files(ctx.output_root()).is_empty());
}

#[tokio::test]
async fn it_should_let_the_later_duplicate_win() {
    let ctx = TestContext::new(MockTtsRepository::new());

    let results = ctx
        .generate(vec![request(3, 1, "Old text."), request(3, 1, "New text.")])
        .await;

    assert!(results.iter().all(|r| r.is_success()));
    assert_eq!(read_audio(&ctx.audio_path(3, 1)), "audio:New text.");
}

#[tokio::test]
async fn it_should_keep_concurrent_duplicates_apart() {
    let mut options = fast_options();
    options.concurrency = 2;
    let ctx = TestContext::with_options(
        MockTtsRepository::new()
            .streaming(vec![b"ID3".to_vec(), vec![0xFF; 64], vec![0xFB; 64]])
            .with_delay(Duration::from_millis(20)),
        options,
    );

    let results = ctx
        .generate(vec![request(3, 1, "Old text."), request(3, 1, "New text.")])
        .await;

    assert!(results.iter().all(|r| r.is_success()));
    assert_eq!(ctx.tts.peak_in_flight(), 2);
    assert_eq!(std::fs::read(ctx.audio_path(3, 1)).unwrap().len(), 131);
    assert!(partial_files(ctx.output_root()).is_empty());
}

#[tokio::test]
async fn it_should_keep_input_order_when_concurrent() {
    let mut options = fast_options();
    options.concurrency = 3;
    let ctx = TestContext::with_options(
        MockTtsRepository::new().slow_on("slow", Duration::from_millis(150)),
        options,
    );

    let results = ctx
        .generate(lesson(
            1,
            &["slow first.", "Two.", "Three.", "Four.", "slow fifth.", "Six."],
        ))
        .await;

    let slides: Vec<u32> = results.iter().map(|r| r.request.slide_id()).collect();
    assert_eq!(slides, vec![1, 2, 3, 4, 5, 6]);
    assert!(results.iter().all(|r| r.is_success()));
    assert!(ctx.tts.peak_in_flight() <= 3);
}

#[tokio::test]
async fn it_should_bound_concurrency() {
    let mut options = fast_options();
    options.concurrency = 2;
    let ctx = TestContext::with_options(
        MockTtsRepository::new().with_delay(Duration::from_millis(40)),
        options,
    );

    ctx.generate(lesson(1, &["a.", "b.", "c.", "d.", "e.", "f."])).await;

    assert_eq!(ctx.tts.peak_in_flight(), 2);
    assert_eq!(ctx.tts.calls(), 6);
}

#[tokio::test]
async fn it_should_run_one_item_at_a_time_by_default() {
    let ctx = TestContext::new(MockTtsRepository::new().with_delay(Duration::from_millis(5)));

    ctx.generate(lesson(1, &["a.", "b.", "c."])).await;

    assert_eq!(ctx.tts.peak_in_flight(), 1);
    assert_eq!(ctx.tts.received(), vec!["a.", "b.", "c."]);
}

#[tokio::test]
async fn it_should_space_out_requests() {
    let mut options = fast_options();
    options.request_delay = Duration::from_millis(40);
    let ctx = TestContext::with_options(MockTtsRepository::new(), options);

    let started = Instant::now();
    ctx.generate(lesson(1, &["a.", "b.", "c."])).await;

    assert!(started.elapsed() >= Duration::from_millis(80));
}

#[tokio::test]
async fn it_should_concatenate_streamed_chunks() {
    let ctx = TestContext::new(MockTtsRepository::new().streaming(vec![
        b"ID3".to_vec(),
        vec![0xFF, 0xFB],
        vec![0x90, 0x00],
    ]));

    let results = ctx.generate(vec![request(5, 1, "Streamed.")]).await;

    assert_eq!(
        std::fs::read(ctx.audio_path(5, 1)).unwrap(),
        vec![b'I', b'D', b'3', 0xFF, 0xFB, 0x90, 0x00]
    );
    assert!(matches!(
        results[0].status,
        NarrationStatus::Success { bytes_written: 7, .. }
    ));
}

#[tokio::test]
async fn it_should_remove_partial_file_when_stream_breaks() {
    let ctx = TestContext::new(
        MockTtsRepository::new()
            .streaming(vec![vec![1, 2], vec![3, 4], vec![5, 6]])
            .breaking_stream_after(1),
    );

    let results = ctx.generate(vec![request(5, 2, "Broken stream.")]).await;

    assert!(matches!(results[0].error(), Some(NarrationError::Backend(_))));
    assert!(!ctx.audio_path(5, 2).exists());
    assert!(partial_files(ctx.output_root()).is_empty());
}

#[tokio::test]
async fn it_should_treat_empty_audio_as_a_failure() {
    let ctx = TestContext::new(MockTtsRepository::new().streaming(vec![]));

    let results = ctx.generate(vec![request(5, 3, "Silence.")]).await;

    assert!(matches!(results[0].error(), Some(NarrationError::Backend(_))));
    assert!(!ctx.audio_path(5, 3).exists());
}

#[tokio::test]
async fn it_should_time_out_slow_items_and_continue() {
    let mut options = fast_options();
    options.item_timeout = Duration::from_millis(50);
    let ctx = TestContext::with_options(
        MockTtsRepository::new().slow_on("stuck", Duration::from_millis(500)),
        options,
    );

    let results = ctx
        .generate(lesson(8, &["stuck forever.", "Quick one."]))
        .await;

    assert_eq!(
        results[0].error(),
        Some(&NarrationError::Timeout(Duration::from_millis(50)))
    );
    assert!(results[1].is_success());
    assert!(partial_files(ctx.output_root()).is_empty());
}

#[tokio::test]
async fn it_should_fail_item_when_lesson_directory_cannot_be_created() {
    let ctx = TestContext::new(MockTtsRepository::new());
    ctx.service.prepare_output_root().await.unwrap();
    std::fs::write(ctx.output_root().join("lesson9"), b"not a directory").unwrap();

    let results = ctx
        .generate(vec![request(9, 1, "Blocked."), request(10, 1, "Fine.")])
        .await;

    assert!(matches!(
        results[0].error(),
        Some(NarrationError::Filesystem { .. })
    ));
    assert!(results[1].is_success());
    assert_eq!(ctx.tts.calls(), 1);
}

#[tokio::test]
async fn it_should_return_no_results_for_an_empty_batch() {
    let ctx = TestContext::new(MockTtsRepository::new());

    let results = ctx.generate(Vec::new()).await;

    assert!(results.is_empty());
    assert_eq!(
        BatchSummary::from_results(&results).to_string(),
        "0 attempted, 0 succeeded"
    );
}

#[tokio::test]
async fn it_should_fail_the_batch_when_output_root_cannot_be_created() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"file").unwrap();

    let service = NarrationService::new(
        Arc::new(MockTtsRepository::new()),
        blocker.join("audio"),
        fast_options(),
    );

    let err = service.prepare_output_root().await.unwrap_err();
    assert!(matches!(err, AppError::OutputRoot { .. }));
    assert_eq!(err.exit_code(), 4);
}
