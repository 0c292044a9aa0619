/*!
 * Unit tests for subtitle file loading and saving
 */

use anyhow::Result;
use linewise::subtitle::SubtitleTrack;

use crate::common;

#[test]
fn test_loadSrt_validFile_shouldParseAllEntries() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_subtitle(temp_dir.path(), "sample.srt")?;

    let track = SubtitleTrack::load_srt(&path)?;

    assert_eq!(track.len(), 3);
    assert_eq!(track.lines[0].text, "This is a test subtitle.");
    assert_eq!(track.lines[2].index, 3);
    Ok(())
}

#[test]
fn test_loadSrt_missingFile_shouldFail() {
    let result = SubtitleTrack::load_srt(std::path::Path::new("/nonexistent/missing.srt"));
    assert!(result.is_err());
}

#[test]
fn test_saveSrt_roundTrip_shouldPreserveTimingAndText() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_subtitle(temp_dir.path(), "in.srt")?;
    let destination = temp_dir.path().join("out.srt");

    let track = SubtitleTrack::load_srt(&source)?;
    track.save_srt(&destination)?;
    let reloaded = SubtitleTrack::load_srt(&destination)?;

    assert_eq!(reloaded.len(), track.len());
    for (original, copy) in track.lines.iter().zip(reloaded.lines.iter()) {
        assert_eq!(original.timing, copy.timing);
        assert_eq!(original.text, copy.text);
    }
    Ok(())
}

#[test]
fn test_loadSrt_malformedContent_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "bad.srt", "this is not\na subtitle file")?;

    assert!(SubtitleTrack::load_srt(&path).is_err());
    Ok(())
}
