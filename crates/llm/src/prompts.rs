//! Prompt templates for summarization

use std::collections::BTreeSet;
use std::fmt;

use summarist_common::{Result, SummaristError};

/// System prompt used by the plain single-pass summary
pub const SPEECH_SYSTEM_PROMPT: &str =
    "You are an expert assistant with expertise in summarizing speeches";

/// Single-pass prompt over the entire input
pub const SINGLE_PASS_PROMPT: &str =
    "Please provide a short and concise summary of the following speech:\n TEXT: {text}";

/// Single-pass prompt that also translates the summary
pub const TRANSLATE_PROMPT: &str = "Write a summary of the following speech:
Speech : `{text}`
Translate the precise summary to {language}.";

/// Single-pass "stuff" prompt used for extracted documents
pub const STUFF_PROMPT: &str = "Write a concise and short summary of the following speech.
Speech: `{text}`";

/// Default per-chunk (map) prompt; also seeds the refine strategy
pub const MAP_PROMPT: &str = "Write a concise summary of the following:


\"{text}\"


CONCISE SUMMARY:";

/// Default combine (reduce) prompt
pub const COMBINE_PROMPT: &str = MAP_PROMPT;

/// Default refine prompt
pub const REFINE_PROMPT: &str = "Your job is to produce a final summary
We have provided an existing summary up to a certain point: {existing_answer}
We have the opportunity to refine the existing summary (only if needed) with some more context below.
------------
{text}
------------
Given the new context, refine the original summary
If the context isn't useful, return the original summary.";

/// Custom map prompt for speeches
pub const SPEECH_CHUNK_PROMPT: &str = "Please summarize the below speech:
Speech:`{text}`
Summary:";

/// Custom combine prompt: motivational title, introduction and numbered points
pub const SPEECH_COMBINE_PROMPT: &str =
    "Provide a final summary of the entire speech with these important points.
Add a Generic Motivational Title,
Start the precise summary with an introduction and provide the
summary in number points for the speech.
Speech: `{text}`";

/// How values that the template never references are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatMode {
    /// Extra values are ignored
    #[default]
    Permissive,
    /// Extra values fail with `UnusedValue`
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// Template with `{name}` placeholders
///
/// `{{` and `}}` render literal braces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl PromptTemplate {
    /// Parse a template
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let source = template.into();
        let segments = parse(&source)?;
        Ok(Self { source, segments })
    }

    /// Original template text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Distinct placeholder names, sorted
    pub fn placeholders(&self) -> BTreeSet<&str> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Placeholder(name) => Some(name.as_str()),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Whether the template references `name`
    pub fn uses(&self, name: &str) -> bool {
        self.placeholders().contains(name)
    }

    /// Substitute every placeholder, ignoring extra values
    pub fn format(&self, values: &[(&str, &str)]) -> Result<String> {
        self.instantiate(values, FormatMode::Permissive)
    }

    /// Substitute every placeholder
    ///
    /// Fails with `MissingPlaceholder` when a referenced name has no value, and
    /// in strict mode with `UnusedValue` when a value is never referenced.
    pub fn instantiate(&self, values: &[(&str, &str)], mode: FormatMode) -> Result<String> {
        let lookup = |name: &str| {
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| *value)
        };

        if mode == FormatMode::Strict {
            let used = self.placeholders();
            if let Some((name, _)) = values.iter().find(|(key, _)| !used.contains(key)) {
                return Err(SummaristError::unused_value(*name));
            }
        }

        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let value =
                        lookup(name.as_str()).ok_or_else(|| SummaristError::missing_placeholder(name))?;
                    out.push_str(value);
                }
            }
        }

        Ok(out)
    }
}

impl fmt::Display for PromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn parse(template: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        match c {
            '{' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                literal.push('{');
            }
            '}' if matches!(chars.peek(), Some((_, '}'))) => {
                chars.next();
                literal.push('}');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }

                if !closed {
                    return Err(SummaristError::template(format!(
                        "unclosed '{{' at byte {}",
                        pos
                    )));
                }
                if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                {
                    return Err(SummaristError::template(format!(
                        "invalid placeholder name '{}' at byte {}",
                        name, pos
                    )));
                }

                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Placeholder(name));
            }
            '}' => {
                return Err(SummaristError::template(format!(
                    "unmatched '}}' at byte {}",
                    pos
                )));
            }
            c => literal.push(c),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    Ok(segments)
}

/// Templates used by each summarizer stage
///
/// Any stage can be overridden independently; the rest keep their defaults.
#[derive(Debug, Clone)]
pub struct PromptSet {
    /// Optional system message sent with every call
    pub system: Option<String>,

    /// Single-pass prompt (`{text}`)
    pub single: PromptTemplate,

    /// Single-pass prompt used when a target language is set (`{text}`, `{language}`)
    ///
    /// `None` means `single` is used for every language; overriding `single`
    /// clears it so a caller's template is never silently replaced.
    pub translate: Option<PromptTemplate>,

    /// Map prompt (`{text}` = one chunk)
    pub map: PromptTemplate,

    /// Combine prompt (`{text}` = joined partial summaries)
    pub combine: PromptTemplate,

    /// Refine seed prompt (`{text}` = first chunk)
    pub question: PromptTemplate,

    /// Refine prompt (`{existing_answer}`, `{text}`)
    pub refine: PromptTemplate,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            system: None,
            single: builtin(STUFF_PROMPT),
            translate: Some(builtin(TRANSLATE_PROMPT)),
            map: builtin(MAP_PROMPT),
            combine: builtin(COMBINE_PROMPT),
            question: builtin(MAP_PROMPT),
            refine: builtin(REFINE_PROMPT),
        }
    }
}

impl PromptSet {
    /// Plain speech summary with an expert system prompt
    pub fn speech() -> Self {
        Self {
            system: Some(SPEECH_SYSTEM_PROMPT.to_string()),
            single: builtin(SINGLE_PASS_PROMPT),
            ..Self::default()
        }
    }

    /// Map-reduce prompts that end in a titled, numbered summary
    pub fn speech_outline() -> Self {
        Self {
            map: builtin(SPEECH_CHUNK_PROMPT),
            combine: builtin(SPEECH_COMBINE_PROMPT),
            ..Self::default()
        }
    }

    /// Override the system message
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Override the single-pass prompt, also for translated summaries
    pub fn with_single(mut self, template: PromptTemplate) -> Self {
        self.single = template;
        self.translate = None;
        self
    }

    /// Override the single-pass prompt used when a target language is set
    pub fn with_translate(mut self, template: PromptTemplate) -> Self {
        self.translate = Some(template);
        self
    }

    /// Single-pass template for an optional target language
    pub fn single_for(&self, language: Option<&str>) -> &PromptTemplate {
        match (language, &self.translate) {
            (Some(_), Some(translate)) => translate,
            _ => &self.single,
        }
    }

    /// Override the map prompt
    pub fn with_map(mut self, template: PromptTemplate) -> Self {
        self.map = template;
        self
    }

    /// Override the combine prompt
    pub fn with_combine(mut self, template: PromptTemplate) -> Self {
        self.combine = template;
        self
    }

    /// Override the refine seed prompt
    pub fn with_question(mut self, template: PromptTemplate) -> Self {
        self.question = template;
        self
    }

    /// Override the refine prompt
    pub fn with_refine(mut self, template: PromptTemplate) -> Self {
        self.refine = template;
        self
    }
}

// Built-in templates are constants covered by tests below
fn builtin(template: &str) -> PromptTemplate {
    PromptTemplate::new(template).unwrap_or_else(|e| panic!("invalid built-in prompt: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_substitutes_placeholders() {
        let template = PromptTemplate::new("Summarize `{text}` in {language}.").unwrap();
        let out = template
            .format(&[("text", "the speech"), ("language", "Hindi")])
            .unwrap();
        assert_eq!(out, "Summarize `the speech` in Hindi.");
    }

    #[test]
    fn test_repeated_placeholder() {
        let template = PromptTemplate::new("{a}-{a}").unwrap();
        assert_eq!(template.format(&[("a", "x")]).unwrap(), "x-x");
        assert_eq!(template.placeholders().len(), 1);
    }

    #[test]
    fn test_missing_placeholder() {
        let template = PromptTemplate::new("{text} to {language}").unwrap();
        let err = template.format(&[("text", "hi")]).unwrap_err();
        assert!(matches!(err, SummaristError::MissingPlaceholder { ref name } if name == "language"));
    }

    #[test]
    fn test_extra_values_permissive_and_strict() {
        let template = PromptTemplate::new("{text}").unwrap();
        let values = [("text", "hi"), ("language", "Hindi")];
        assert_eq!(template.format(&values).unwrap(), "hi");

        let err = template.instantiate(&values, FormatMode::Strict).unwrap_err();
        assert!(matches!(err, SummaristError::UnusedValue { ref name } if name == "language"));
    }

    #[test]
    fn test_values_are_not_reinterpreted() {
        let template = PromptTemplate::new("<{text}>").unwrap();
        assert_eq!(template.format(&[("text", "{language}")]).unwrap(), "<{language}>");
    }

    #[test]
    fn test_escaped_braces() {
        let template = PromptTemplate::new("{{\"summary\": \"{text}\"}}").unwrap();
        assert_eq!(
            template.format(&[("text", "ok")]).unwrap(),
            "{\"summary\": \"ok\"}"
        );
        assert!(template.placeholders().contains("text"));
    }

    #[test]
    fn test_invalid_templates() {
        for bad in ["{text", "text}", "{}", "{bad name}"] {
            assert!(
                matches!(PromptTemplate::new(bad), Err(SummaristError::InvalidTemplate(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_builtin_prompts() {
        let set = PromptSet::default();
        assert!(set.map.uses("text"));
        assert!(set.combine.uses("text"));
        assert!(set.single_for(Some("Hindi")).uses("language"));
        let refine: Vec<_> = set.refine.placeholders().into_iter().collect();
        assert_eq!(refine, vec!["existing_answer", "text"]);

        for template in [SINGLE_PASS_PROMPT, SPEECH_CHUNK_PROMPT, SPEECH_COMBINE_PROMPT] {
            assert!(PromptTemplate::new(template).unwrap().uses("text"));
        }
        assert_eq!(PromptSet::speech().system.as_deref(), Some(SPEECH_SYSTEM_PROMPT));
    }

    #[test]
    fn test_single_override_applies_to_every_language() {
        let custom = PromptTemplate::new("Mine: {text} ({language})").unwrap();
        let set = PromptSet::default().with_single(custom.clone());
        assert_eq!(set.single_for(None), &custom);
        assert_eq!(set.single_for(Some("Hindi")), &custom);

        let translate = PromptTemplate::new("{text} -> {language}").unwrap();
        let set = set.with_translate(translate.clone());
        assert_eq!(set.single_for(None), &custom);
        assert_eq!(set.single_for(Some("Hindi")), &translate);

        // Presets keep the built-in translating prompt
        let speech = PromptSet::speech();
        assert!(speech.single_for(Some("Hindi")).uses("language"));
        assert!(!speech.single_for(None).uses("language"));
    }
}
