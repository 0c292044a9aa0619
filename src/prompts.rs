/*!
 * Prompt formatting for batch translation requests.
 *
 * Each line is rendered under a stable numbered marker that the model is
 * asked to echo back, followed by the original text and an empty
 * translation slot. Rendering is deterministic for identical inputs: same
 * batch, same context, same glossary, byte-identical prompt.
 */

use std::collections::BTreeMap;

use crate::batching::Batch;
use crate::context::SceneContext;

/// Base instructions sent with every batch.
///
/// Placeholders: {source_language}, {target_language}
const BASE_INSTRUCTIONS: &str = r#"You are translating subtitles from {source_language} to {target_language}.

Translate every numbered line below. For each line, fill in the text after its Translation> label. Keep each translation on the line it belongs to: never merge lines, never split one line into several, never skip a line, and never change the line numbers.

After the last line, append a one-or-two sentence synopsis of the dialogue inside a <summary></summary> tag and a short description of the current scene inside a <scene></scene> tag."#;

/// Escalated instructions for retry attempts.
///
/// Restates the one-line-per-line, no-merge invariant explicitly; the
/// previous attempt violated it.
const RETRY_INSTRUCTIONS: &str = r#"The previous response did not translate every line correctly. Translate the lines again, paying close attention to the numbering: every numbered line must receive exactly one translation under its own number. Do not merge consecutive lines into one translation, do not leave any line untranslated, and do not add lines that were not requested."#;

/// Optional mapping of source terms to fixed target renderings.
///
/// Backed by a BTreeMap so glossary rendering is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Glossary(BTreeMap<String, String>);

impl Glossary {
    /// Create an empty glossary
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source-term to target-term mapping
    pub fn insert(&mut self, source_term: impl Into<String>, target_term: impl Into<String>) {
        self.0.insert(source_term.into(), target_term.into());
    }

    /// Whether the glossary has no entries
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over mappings in deterministic order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }
}

impl FromIterator<(String, String)> for Glossary {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Renders batches into request payloads for the provider
#[derive(Debug, Clone)]
pub struct PromptFormatter {
    source_language: String,
    target_language: String,
    glossary: Glossary,
}

impl PromptFormatter {
    /// Create a formatter for a language pair
    pub fn new(source_language: &str, target_language: &str) -> Self {
        Self {
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            glossary: Glossary::new(),
        }
    }

    /// Attach a glossary, passed through unmodified into every prompt
    pub fn with_glossary(mut self, glossary: Glossary) -> Self {
        self.glossary = glossary;
        self
    }

    /// Render the full request payload for one batch attempt.
    ///
    /// `escalated` is set by the retry controller on non-first attempts and
    /// prepends the stricter line-parity instructions.
    pub fn format_batch(&self, batch: &Batch, context: &SceneContext, escalated: bool) -> String {
        let mut prompt = String::new();

        prompt.push_str(&self.render_instructions());
        prompt.push_str("\n\n");

        if escalated {
            prompt.push_str(RETRY_INSTRUCTIONS);
            prompt.push_str("\n\n");
        }

        if !context.running_summary.is_empty() {
            prompt.push_str("Synopsis of the story so far:\n");
            prompt.push_str(&context.running_summary);
            prompt.push_str("\n\n");
        }

        if !context.running_scene.is_empty() {
            prompt.push_str("Current scene:\n");
            prompt.push_str(&context.running_scene);
            prompt.push_str("\n\n");
        }

        if !self.glossary.is_empty() {
            prompt.push_str("Use these fixed renderings for names and terms:\n");
            for (source_term, target_term) in self.glossary.iter() {
                prompt.push_str(&format!("{} -> {}\n", source_term, target_term));
            }
            prompt.push('\n');
        }

        for line in &batch.lines {
            prompt.push_str(&format!("#{}\nOriginal>\n{}\nTranslation>\n\n", line.index, line.text));
        }

        prompt.trim_end().to_string()
    }

    fn render_instructions(&self) -> String {
        BASE_INSTRUCTIONS
            .replace("{source_language}", &self.source_language)
            .replace("{target_language}", &self.target_language)
    }
}
