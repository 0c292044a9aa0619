/*!
 * File-to-file workflow tests: load an SRT, run a session, write the
 * translated track back out
 */

use std::sync::Arc;

use anyhow::Result;

use linewise::app_config::EngineConfig;
use linewise::context::SceneContext;
use linewise::prompts::PromptFormatter;
use linewise::providers::mock::MockProvider;
use linewise::session::TranslationSession;
use linewise::subtitle::SubtitleTrack;

use crate::common;

#[tokio::test]
async fn test_workflow_srtInSrtOut_shouldTranslateEveryLine() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "episode.srt")?;
    let output = temp_dir.path().join("episode.fr.srt");

    let track = SubtitleTrack::load_srt(&input)?;
    let session = TranslationSession::new(
        Arc::new(MockProvider::echo()),
        PromptFormatter::new("English", "French"),
        EngineConfig::default(),
    );

    let result = session
        .translate(&track, SceneContext::default(), |_, _| {})
        .await?;
    assert!(result.is_complete());

    let translated = SubtitleTrack::from_lines(
        result
            .lines
            .into_iter()
            .map(|line_result| {
                let mut line = line_result.line;
                if let Some(translation) = line_result.translation {
                    line.text = translation;
                }
                line
            })
            .collect(),
    );
    translated.save_srt(&output)?;

    let reloaded = SubtitleTrack::load_srt(&output)?;
    assert_eq!(reloaded.len(), track.len());
    for (original, translated) in track.lines.iter().zip(reloaded.lines.iter()) {
        assert_eq!(original.timing, translated.timing);
        assert!(translated.text.starts_with("[translated]"));
        assert!(translated.text.contains(&original.text));
    }
    Ok(())
}

#[tokio::test]
async fn test_workflow_failedBatch_shouldKeepOriginalTextOnDisk() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "episode.srt")?;
    let output = temp_dir.path().join("episode.fr.srt");

    let track = SubtitleTrack::load_srt(&input)?;
    let config = EngineConfig {
        max_attempts_per_batch: 1,
        ..Default::default()
    };
    let session = TranslationSession::new(
        Arc::new(MockProvider::failing()),
        PromptFormatter::new("English", "French"),
        config,
    );

    let result = session
        .translate(&track, SceneContext::default(), |_, _| {})
        .await?;
    assert_eq!(result.translated_count(), 0);

    let fallback = SubtitleTrack::from_lines(
        result
            .lines
            .into_iter()
            .map(|line_result| {
                let mut line = line_result.line;
                if let Some(translation) = line_result.translation {
                    line.text = translation;
                }
                line
            })
            .collect(),
    );
    fallback.save_srt(&output)?;

    let reloaded = SubtitleTrack::load_srt(&output)?;
    assert_eq!(reloaded.lines[0].text, "This is a test subtitle.");
    Ok(())
}
