/*!
 * Rolling narrative context carried between batches.
 *
 * The model is asked to append a synopsis and a scene description to each
 * response; the latest accepted values are fed back into the next batch's
 * prompt as continuity hints. Only the latest values are retained.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

// Models like to echo "Scene 3:" or "Summary of the batch" back at us
static SCENE_PREFIX_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:(?:scene|batch)[\s\d:\-]*)+").expect("scene prefix regex is valid")
});

/// Rolling synopsis and scene state for a session.
///
/// Mutated only through [`ContextManager::update`], and only after a batch
/// is accepted. An initial value may be supplied to resume a prior session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneContext {
    /// Synopsis of everything translated so far
    #[serde(default)]
    pub running_summary: String,

    /// Latest authoritative scene description
    #[serde(default)]
    pub running_scene: String,
}

impl SceneContext {
    /// Create a context from explicit values
    pub fn new(running_summary: impl Into<String>, running_scene: impl Into<String>) -> Self {
        Self {
            running_summary: running_summary.into(),
            running_scene: running_scene.into(),
        }
    }

    /// Whether neither field carries any information
    pub fn is_empty(&self) -> bool {
        self.running_summary.is_empty() && self.running_scene.is_empty()
    }
}

/// Applies parsed summary/scene tags to the rolling context
#[derive(Debug, Default)]
pub struct ContextManager;

impl ContextManager {
    /// Produce the context for the next batch from the previous context and
    /// the tags parsed out of an accepted response.
    ///
    /// The scene is replaced only when the parsed scene is non-empty; the
    /// summary likewise. An empty tag means the model omitted it, which is
    /// not an error, and the previous value stands.
    pub fn update(previous: &SceneContext, parsed_summary: &str, parsed_scene: &str) -> SceneContext {
        let summary = Self::sanitise(parsed_summary);
        let scene = Self::sanitise(parsed_scene);

        SceneContext {
            running_summary: if summary.is_empty() {
                previous.running_summary.clone()
            } else {
                summary
            },
            running_scene: if scene.is_empty() {
                previous.running_scene.clone()
            } else {
                scene
            },
        }
    }

    /// Strip boilerplate the model tends to prepend to summaries
    fn sanitise(text: &str) -> String {
        let stripped = SCENE_PREFIX_REGEX.replace(text.trim(), "");
        stripped
            .replace("Summary of the batch", "")
            .replace("Summary of the scene", "")
            .trim()
            .to_string()
    }
}
