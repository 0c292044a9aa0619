/*!
 * Integration tests for the full session engine: batching, prompting,
 * parsing, validation, retries, context threading and scheduling modes
 */

use std::sync::Arc;

use parking_lot::Mutex;

use linewise::app_config::{ConcurrencyMode, EngineConfig, FailurePolicy};
use linewise::context::SceneContext;
use linewise::errors::{AttemptError, ProviderError, SessionError};
use linewise::prompts::PromptFormatter;
use linewise::providers::Provider;
use linewise::providers::mock::MockProvider;
use linewise::session::{BatchStatus, TranslationSession};

use crate::common::mock_providers::{AbortingProvider, RecordingProvider, SlowThenEchoProvider};
use crate::common::make_track;

fn make_session(provider: Arc<dyn Provider>, config: EngineConfig) -> TranslationSession {
    TranslationSession::new(provider, PromptFormatter::new("English", "French"), config)
}

#[tokio::test]
async fn test_session_happyPath_shouldTranslateAllBatchesAndCarryContext() {
    let config = EngineConfig {
        max_batch_size: 2,
        ..Default::default()
    };
    let provider = MockProvider::echo().with_context_tags();
    let session = make_session(Arc::new(provider), config);

    let result = session
        .translate(&make_track(5), SceneContext::default(), |_, _| {})
        .await
        .unwrap();

    assert!(result.is_complete());
    assert_eq!(result.translated_count(), 5);
    assert_eq!(result.batches.len(), 3);
    assert!(result.batches.iter().all(|b| b.is_accepted()));
    assert_eq!(result.context.running_summary, "Mock synopsis of the batch.");
    assert_eq!(result.context.running_scene, "Mock scene description.");
}

#[tokio::test]
async fn test_session_misalignedThenCorrect_shouldAcceptOnSecondAttempt() {
    // First response drops line 2, second response is complete
    let provider = MockProvider::scripted(vec![
        Ok("#1\nTranslation>\nBonjour.".to_string()),
        Ok("#1\nTranslation>\nBonjour.\n\n#2\nTranslation>\nMerci.".to_string()),
    ]);
    let session = make_session(Arc::new(provider.clone()), EngineConfig::default());

    let result = session
        .translate(&make_track(2), SceneContext::default(), |_, _| {})
        .await
        .unwrap();

    assert!(result.is_complete());
    assert!(matches!(
        result.batches[0].status,
        BatchStatus::Accepted { attempts: 2 }
    ));
    assert_eq!(provider.calls(), 2);
    assert_eq!(result.lines[1].translation.as_deref(), Some("Merci."));
}

#[tokio::test]
async fn test_session_retryPrompt_shouldEscalateInstructions() {
    let recording = RecordingProvider::wrapping(MockProvider::scripted(vec![
        Ok("#1\nTranslation>\nBonjour.".to_string()),
        Ok("#1\nTranslation>\nBonjour.\n\n#2\nTranslation>\nMerci.".to_string()),
    ]));
    let session = make_session(Arc::new(recording.clone()), EngineConfig::default());

    session
        .translate(&make_track(2), SceneContext::default(), |_, _| {})
        .await
        .unwrap();

    let prompts = recording.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(!prompts[0].contains("Do not merge"));
    assert!(prompts[1].contains("Do not merge"));
    // The batch itself is re-sent unchanged
    assert!(prompts[1].contains("#1\nOriginal>\nLine 1"));
    assert!(prompts[1].contains("#2\nOriginal>\nLine 2"));
}

#[tokio::test]
async fn test_session_persistentMerging_shouldExhaustBatchAndSkip() {
    let config = EngineConfig {
        max_batch_size: 2,
        max_attempts_per_batch: 2,
        ..Default::default()
    };
    // Merges lines 1 and 2 on every attempt; the single-line batch is fine
    let provider = MockProvider::merging();
    let session = make_session(Arc::new(provider.clone()), config);

    let result = session
        .translate(&make_track(3), SceneContext::default(), |_, _| {})
        .await
        .unwrap();

    assert!(!result.aborted);
    assert_eq!(result.failed_ordinals(), std::collections::BTreeSet::from([0]));
    assert_eq!(result.translated_count(), 1);
    assert!(result.lines[0].translation.is_none());
    assert!(result.lines[2].translation.is_some());
    // Two attempts for the failing batch plus one for the accepted batch
    assert_eq!(provider.calls(), 3);

    match &result.batches[0].status {
        BatchStatus::Exhausted { attempts, last_error } => {
            assert_eq!(*attempts, 2);
            assert!(matches!(last_error, AttemptError::Alignment(_)));
        }
        other => panic!("expected Exhausted, got {:?}", other),
    }

    // The failed batch never touched the rolling context
    assert_eq!(result.context, SceneContext::default());
}

#[tokio::test(start_paused = true)]
async fn test_session_timeoutThenSuccess_shouldAcceptOnSecondAttempt() {
    let config = EngineConfig {
        attempt_timeout_secs: 1,
        max_attempts_per_batch: 3,
        ..Default::default()
    };
    let session = make_session(Arc::new(SlowThenEchoProvider::new(5_000)), config);

    let result = session
        .translate(&make_track(2), SceneContext::default(), |_, _| {})
        .await
        .unwrap();

    assert!(result.is_complete());
    assert!(matches!(
        result.batches[0].status,
        BatchStatus::Accepted { attempts: 2 }
    ));
}

#[tokio::test]
async fn test_session_abortPolicy_shouldStopAndReturnPartial() {
    let config = EngineConfig {
        max_batch_size: 2,
        max_attempts_per_batch: 1,
        on_batch_failure: FailurePolicy::AbortSession,
        ..Default::default()
    };
    let session = make_session(Arc::new(MockProvider::failing()), config);

    let error = session
        .translate(&make_track(4), SceneContext::default(), |_, _| {})
        .await
        .unwrap_err();

    match error {
        SessionError::Aborted { ordinal, cause, partial } => {
            assert_eq!(ordinal, 0);
            assert!(matches!(cause, AttemptError::Provider(_)));
            assert!(partial.aborted);
            assert_eq!(partial.lines.len(), 4);
            assert!(matches!(partial.batches[1].status, BatchStatus::NotAttempted));
        }
        other => panic!("expected Aborted, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_session_slowProvider_shouldTimeOutAttempt() {
    let config = EngineConfig {
        attempt_timeout_secs: 1,
        max_attempts_per_batch: 1,
        ..Default::default()
    };
    let session = make_session(Arc::new(MockProvider::slow(5_000)), config);

    let result = session
        .translate(&make_track(2), SceneContext::default(), |_, _| {})
        .await
        .unwrap();

    match &result.batches[0].status {
        BatchStatus::Exhausted { last_error, .. } => {
            assert!(matches!(
                last_error,
                AttemptError::Provider(ProviderError::Timeout(1))
            ));
        }
        other => panic!("expected Exhausted, got {:?}", other),
    }
}

#[tokio::test]
async fn test_session_unparseableResponse_shouldExhaustWithParseError() {
    let config = EngineConfig {
        max_attempts_per_batch: 2,
        ..Default::default()
    };
    let session = make_session(Arc::new(MockProvider::empty()), config);

    let result = session
        .translate(&make_track(2), SceneContext::default(), |_, _| {})
        .await
        .unwrap();

    match &result.batches[0].status {
        BatchStatus::Exhausted { attempts, last_error } => {
            assert_eq!(*attempts, 2);
            assert!(matches!(last_error, AttemptError::Parse(_)));
        }
        other => panic!("expected Exhausted, got {:?}", other),
    }
}

#[tokio::test]
async fn test_session_sequential_shouldFeedContextIntoNextPrompt() {
    let config = EngineConfig {
        max_batch_size: 1,
        ..Default::default()
    };
    let recording = RecordingProvider::wrapping(MockProvider::echo().with_context_tags());
    let session = make_session(Arc::new(recording.clone()), config);

    session
        .translate(&make_track(2), SceneContext::default(), |_, _| {})
        .await
        .unwrap();

    let prompts = recording.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(!prompts[0].contains("Synopsis of the story so far"));
    assert!(prompts[1].contains("Synopsis of the story so far:\nMock synopsis of the batch."));
    assert!(prompts[1].contains("Current scene:\nMock scene description."));
}

#[tokio::test]
async fn test_session_initialContext_shouldAppearInFirstPrompt() {
    let recording = RecordingProvider::wrapping(MockProvider::echo());
    let session = make_session(Arc::new(recording.clone()), EngineConfig::default());
    let initial = SceneContext::new("They are mid-heist.", "A bank vault.");

    session
        .translate(&make_track(1), initial, |_, _| {})
        .await
        .unwrap();

    let prompts = recording.prompts();
    assert!(prompts[0].contains("Synopsis of the story so far:\nThey are mid-heist."));
    assert!(prompts[0].contains("Current scene:\nA bank vault."));
}

#[tokio::test]
async fn test_session_pooledMode_shouldCompleteAndPreserveOrder() {
    let config = EngineConfig {
        max_batch_size: 2,
        concurrency: ConcurrencyMode::PooledSnapshot { pool_size: 3 },
        ..Default::default()
    };
    let session = make_session(Arc::new(MockProvider::echo().with_context_tags()), config);

    let result = session
        .translate(&make_track(6), SceneContext::default(), |_, _| {})
        .await
        .unwrap();

    assert!(result.is_complete());
    assert_eq!(result.translated_count(), 6);
    let indices: Vec<usize> = result.lines.iter().map(|l| l.line.index).collect();
    assert_eq!(indices, (1..=6).collect::<Vec<_>>());
    let ordinals: Vec<usize> = result.batches.iter().map(|b| b.ordinal).collect();
    assert_eq!(ordinals, vec![0, 1, 2]);
    // Context updates are folded in, even though batches ran concurrently
    assert_eq!(result.context.running_summary, "Mock synopsis of the batch.");
}

#[tokio::test]
async fn test_session_pooledAbortPolicy_shouldNotPoisonLaterTranslateCalls() {
    let config = EngineConfig {
        max_attempts_per_batch: 1,
        on_batch_failure: FailurePolicy::AbortSession,
        concurrency: ConcurrencyMode::PooledSnapshot { pool_size: 2 },
        ..Default::default()
    };
    // First call fails and aborts the run; every later call answers validly
    let provider = MockProvider::scripted(vec![
        Err(ProviderError::RequestFailed("transient outage".to_string())),
        Ok("#1\nTranslation>\nBonjour.".to_string()),
    ]);
    let session = make_session(Arc::new(provider), config);

    let first = session
        .translate(&make_track(1), SceneContext::default(), |_, _| {})
        .await;
    assert!(matches!(first, Err(SessionError::Aborted { .. })));

    // The session is reusable: the failed run must not leave it cancelled
    let second = session
        .translate(&make_track(1), SceneContext::default(), |_, _| {})
        .await
        .unwrap();

    assert!(!second.aborted);
    assert!(second.is_complete());
    assert_eq!(second.translated_count(), 1);
}

#[tokio::test]
async fn test_session_abortDuringRun_shouldKeepAcceptedAndMarkRestNotAttempted() {
    let config = EngineConfig {
        max_batch_size: 1,
        ..Default::default()
    };
    let provider = AbortingProvider::new();
    let session = make_session(Arc::new(provider.clone()), config);
    provider.set_handle(session.abort_handle());

    let result = session
        .translate(&make_track(3), SceneContext::default(), |_, _| {})
        .await
        .unwrap();

    assert!(result.aborted);
    // The in-flight batch completed; everything after it was abandoned
    assert_eq!(result.translated_count(), 1);
    assert!(result.batches[0].is_accepted());
    assert!(matches!(result.batches[1].status, BatchStatus::NotAttempted));
    assert!(matches!(result.batches[2].status, BatchStatus::NotAttempted));
}

#[tokio::test]
async fn test_session_progressCallback_shouldReportEveryBatch() {
    let config = EngineConfig {
        max_batch_size: 2,
        ..Default::default()
    };
    let session = make_session(Arc::new(MockProvider::echo()), config);
    let observed: Arc<Mutex<Vec<(usize, usize)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = observed.clone();

    session
        .translate(&make_track(4), SceneContext::default(), move |done, total| {
            sink.lock().push((done, total));
        })
        .await
        .unwrap();

    assert_eq!(observed.lock().clone(), vec![(1, 2), (2, 2)]);
}
