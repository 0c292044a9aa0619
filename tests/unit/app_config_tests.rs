/*!
 * Unit tests for configuration loading and saving
 */

use anyhow::Result;
use linewise::app_config::{ConcurrencyMode, Config, FailurePolicy};

use crate::common;

#[test]
fn test_config_saveAndLoad_shouldRoundTrip() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");

    let mut config = Config::default();
    config.target_language = "German".to_string();
    config.engine.max_batch_size = 15;
    config.engine.on_batch_failure = FailurePolicy::AbortSession;
    config.save(&path)?;

    let loaded = Config::load(&path)?;

    assert_eq!(loaded.target_language, "German");
    assert_eq!(loaded.engine.max_batch_size, 15);
    assert_eq!(loaded.engine.on_batch_failure, FailurePolicy::AbortSession);
    Ok(())
}

#[test]
fn test_config_loadMissingFile_shouldFail() {
    let result = Config::load(std::path::Path::new("/nonexistent/conf.json"));
    assert!(result.is_err());
}

#[test]
fn test_config_loadInvalidSettings_shouldFailValidation() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "conf.json",
        r#"{"source_language": "en", "target_language": "fr", "engine": {"max_batch_size": 0}}"#,
    )?;

    assert!(Config::load(&path).is_err());
    Ok(())
}

#[test]
fn test_concurrencyMode_pooledJson_shouldDeserialize() -> Result<()> {
    let json = r#"{"pooled_snapshot": {"pool_size": 4}}"#;
    let mode: ConcurrencyMode = serde_json::from_str(json)?;

    assert_eq!(mode, ConcurrencyMode::PooledSnapshot { pool_size: 4 });
    Ok(())
}
