use futures::{StreamExt, TryStreamExt};
use std::sync::Arc;
use summarist_common::{Document, Result, SummaristError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chunking::{TextChunk, TextSplitter};
use crate::llm_trait::CompletionClient;
use crate::prompts::{PromptSet, PromptTemplate};
use crate::types::{CompletionRequest, GenerateOptions, Strategy, Summary, TokenBudget};

/// Summarizer settings
#[derive(Debug, Clone)]
pub struct SummarizerConfig {
    /// Which pipeline to run
    pub strategy: Strategy,

    /// Maximum chunk length in characters
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,

    /// Target language; bound as `{language}` and selects the translating single-pass prompt
    pub language: Option<String>,

    /// Concurrent map-phase calls (1 = sequential)
    pub concurrency: usize,

    /// Delimiter between partial summaries in the combine prompt
    pub separator: String,

    /// Model input budget in tokens
    pub context_window: usize,

    /// Generation options for every call
    pub options: GenerateOptions,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::MapReduce,
            chunk_size: 10_000,
            chunk_overlap: 20,
            language: None,
            concurrency: 1,
            separator: "\n".to_string(),
            context_window: 4096,
            options: GenerateOptions {
                temperature: Some(0.0),
                ..Default::default()
            },
        }
    }
}

/// Summarizer for long text: single pass, map-reduce or refine
pub struct Summarizer {
    client: Arc<dyn CompletionClient>,
    config: SummarizerConfig,
    splitter: TextSplitter,
    prompts: PromptSet,
    cancel: CancellationToken,
}

impl Summarizer {
    /// Create new summarizer with the default prompts
    pub fn new(client: Arc<dyn CompletionClient>, config: SummarizerConfig) -> Result<Self> {
        let splitter = TextSplitter::new(config.chunk_size, config.chunk_overlap)?;
        if config.concurrency == 0 {
            return Err(SummaristError::config("Map concurrency must be at least 1"));
        }

        Ok(Self {
            client,
            config,
            splitter,
            prompts: PromptSet::default(),
            cancel: CancellationToken::new(),
        })
    }

    /// Replace the prompt templates
    pub fn with_prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = prompts;
        self
    }

    /// Share a cancellation token with other work
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Settings in use
    pub fn config(&self) -> &SummarizerConfig {
        &self.config
    }

    /// Prompts in use
    pub fn prompts(&self) -> &PromptSet {
        &self.prompts
    }

    /// Token that aborts in-flight and future completion calls when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Count the document's tokens against the model's input budget
    ///
    /// Informational only; an oversized single-pass input fails at the service.
    pub fn preflight(&self, document: &Document) -> TokenBudget {
        TokenBudget {
            tokens: self.client.count_tokens(document.content()),
            limit: self.config.context_window,
        }
    }

    /// Split a document with the configured chunk size and overlap
    pub fn chunks(&self, document: &Document) -> Vec<TextChunk> {
        self.splitter.split(document.content())
    }

    /// Summarize with the configured strategy
    pub async fn summarize(&self, document: &Document) -> Result<Summary> {
        info!(
            "Starting {} summarization - Text length: {} chars, source: {}",
            self.config.strategy,
            document.char_len(),
            document.source().unwrap_or("<literal>")
        );

        match self.config.strategy {
            Strategy::SinglePass => self.single_pass(document).await,
            Strategy::MapReduce => self.map_reduce(document).await,
            Strategy::Refine => self.refine(document).await,
        }
    }

    /// One prompt over the entire document
    pub async fn single_pass(&self, document: &Document) -> Result<Summary> {
        if document.is_blank() {
            return Err(SummaristError::empty_input("document contains no text"));
        }

        let budget = self.preflight(document);
        if !budget.fits() {
            warn!(
                "Input is {} tokens, over the {} token budget; the service may reject it",
                budget.tokens, budget.limit
            );
        } else {
            debug!("Input is {} tokens (budget {})", budget.tokens, budget.limit);
        }

        let template = self.prompts.single_for(self.config.language.as_deref());
        let prompt = self.render(template, &[("text", document.content())])?;
        let text = self.call(prompt).await?;

        Ok(self.finish(text, Strategy::SinglePass, 1, 1))
    }

    /// Summarize each chunk independently, then combine the partial summaries
    pub async fn map_reduce(&self, document: &Document) -> Result<Summary> {
        let chunks = self.summarizable_chunks(document)?;
        self.ensure_bound(&self.prompts.map, &["text"])?;
        self.ensure_bound(&self.prompts.combine, &["text"])?;

        info!("Split text into {} chunks", chunks.len());

        let prompts = chunks
            .iter()
            .map(|chunk| self.render(&self.prompts.map, &[("text", chunk.text.as_str())]))
            .collect::<Result<Vec<_>>>()?;

        let total = prompts.len();
        // buffered() yields results in issue order, whatever order calls finish in
        let partials: Vec<String> = futures::stream::iter(prompts.into_iter().enumerate())
            .map(|(i, prompt)| async move {
                debug!("Summarizing chunk {}/{}", i + 1, total);
                self.call(prompt).await
            })
            .buffered(self.config.concurrency)
            .try_collect()
            .await?;

        let mut calls = total;
        let partials = self.collapse(partials, &mut calls).await?;

        let prompt = self.combine_prompt(&partials)?;
        info!(
            "Combining {} partial summaries - Length: {} chars",
            partials.len(),
            prompt.chars().count()
        );
        if !self.fits(&prompt) {
            warn!(
                "Combine prompt is over the {} token budget; the service may reject it",
                self.config.context_window
            );
        }
        let text = self.call(prompt).await?;
        calls += 1;

        Ok(self.finish(text, Strategy::MapReduce, total, calls))
    }

    /// Combine neighbouring partial summaries until the combine prompt fits the context window
    ///
    /// Groups keep chunk order; a group of one is carried over without a call.
    async fn collapse(&self, mut partials: Vec<String>, calls: &mut usize) -> Result<Vec<String>> {
        let mut round = 0;

        while partials.len() > 1 && !self.fits(&self.combine_prompt(&partials)?) {
            let groups = self.group_to_fit(&partials)?;
            if groups.len() == partials.len() {
                warn!(
                    "Partial summaries cannot be grouped under the {} token budget",
                    self.config.context_window
                );
                break;
            }

            round += 1;
            *calls += groups.iter().filter(|group| group.len() > 1).count();
            info!(
                "Collapse round {}: {} partial summaries into {}",
                round,
                partials.len(),
                groups.len()
            );

            let collapsed: Vec<String> = futures::stream::iter(groups)
                .map(|group| async move {
                    match group {
                        [only] => Ok::<_, SummaristError>(only.clone()),
                        _ => self.call(self.combine_prompt(group)?).await,
                    }
                })
                .buffered(self.config.concurrency)
                .try_collect()
                .await?;
            partials = collapsed;
        }

        Ok(partials)
    }

    /// Split partial summaries into consecutive groups whose combine prompt fits
    fn group_to_fit<'a>(&self, partials: &'a [String]) -> Result<Vec<&'a [String]>> {
        let mut groups = Vec::new();
        let mut start = 0;

        while start < partials.len() {
            let mut end = start + 1;
            while end < partials.len() && self.fits(&self.combine_prompt(&partials[start..=end])?) {
                end += 1;
            }
            groups.push(&partials[start..end]);
            start = end;
        }

        Ok(groups)
    }

    fn combine_prompt(&self, partials: &[String]) -> Result<String> {
        let combined = partials.join(&self.config.separator);
        self.render(&self.prompts.combine, &[("text", combined.as_str())])
    }

    fn fits(&self, prompt: &str) -> bool {
        self.client.count_tokens(prompt) <= self.config.context_window
    }

    /// Fold chunks into a running summary, strictly in order
    pub async fn refine(&self, document: &Document) -> Result<Summary> {
        let chunks = self.summarizable_chunks(document)?;
        self.ensure_bound(&self.prompts.question, &["text"])?;
        self.ensure_bound(&self.prompts.refine, &["existing_answer", "text"])?;

        info!("Split text into {} chunks", chunks.len());

        let (first, rest) = chunks
            .split_first()
            .ok_or_else(|| SummaristError::empty_input("no chunks to refine"))?;

        debug!("Seeding running summary from chunk 1/{}", chunks.len());
        let prompt = self.render(&self.prompts.question, &[("text", first.text.as_str())])?;
        let mut running = self.call(prompt).await?;

        for (i, chunk) in rest.iter().enumerate() {
            debug!("Refining with chunk {}/{}", i + 2, chunks.len());
            let prompt = self.render(
                &self.prompts.refine,
                &[("existing_answer", running.as_str()), ("text", chunk.text.as_str())],
            )?;
            running = self.call(prompt).await?;
        }

        Ok(self.finish(running, Strategy::Refine, chunks.len(), chunks.len()))
    }

    /// Non-blank chunks of the document, or `EmptyInput`
    fn summarizable_chunks(&self, document: &Document) -> Result<Vec<TextChunk>> {
        let chunks: Vec<TextChunk> = self
            .chunks(document)
            .into_iter()
            .filter(|chunk| !chunk.is_blank())
            .collect();

        if chunks.is_empty() {
            return Err(SummaristError::empty_input("document contains no text"));
        }
        Ok(chunks)
    }

    /// Fail before any call if a template needs a value that will never be bound
    fn ensure_bound(&self, template: &PromptTemplate, names: &[&str]) -> Result<()> {
        let language_bound = self.config.language.is_some();
        match template
            .placeholders()
            .into_iter()
            .find(|p| !names.contains(p) && !(language_bound && *p == "language"))
        {
            Some(missing) => Err(SummaristError::missing_placeholder(missing)),
            None => Ok(()),
        }
    }

    /// Instantiate a template, binding `language` when configured
    fn render(&self, template: &PromptTemplate, values: &[(&str, &str)]) -> Result<String> {
        let mut bindings = values.to_vec();
        if let Some(language) = &self.config.language {
            bindings.push(("language", language.as_str()));
        }
        template.format(&bindings)
    }

    /// Issue one completion call, aborting on cancellation
    async fn call(&self, prompt: String) -> Result<String> {
        let request = CompletionRequest {
            model: self.client.model().to_string(),
            system: self.prompts.system.clone(),
            prompt,
            options: self.config.options,
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(SummaristError::Cancelled),
            result = self.client.complete(&request) => result,
        }
    }

    fn finish(&self, text: String, strategy: Strategy, chunks: usize, calls: usize) -> Summary {
        info!("{} summarization done - {} calls", strategy, calls);
        Summary::new(text, self.client.model().to_string(), strategy, chunks, calls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    type DelayFn = Box<dyn Fn(&str) -> Duration + Send + Sync>;
    type ReplyFn = Box<dyn Fn(&str) -> String + Send + Sync>;

    /// Returns each prompt verbatim and records requests in completion order
    struct EchoClient {
        requests: Mutex<Vec<CompletionRequest>>,
        delay: Option<DelayFn>,
        reply: Option<ReplyFn>,
        fail_at: Option<usize>,
        issued: Mutex<usize>,
    }

    impl EchoClient {
        fn new() -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                delay: None,
                reply: None,
                fail_at: None,
                issued: Mutex::new(0),
            }
        }

        fn with_delay(mut self, delay: impl Fn(&str) -> Duration + Send + Sync + 'static) -> Self {
            self.delay = Some(Box::new(delay));
            self
        }

        fn with_reply(mut self, reply: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
            self.reply = Some(Box::new(reply));
            self
        }

        fn failing_at(mut self, call: usize) -> Self {
            self.fail_at = Some(call);
            self
        }

        fn prompts(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.prompt.clone())
                .collect()
        }
    }

    #[async_trait]
    impl CompletionClient for EchoClient {
        async fn complete(&self, request: &CompletionRequest) -> Result<String> {
            let call = {
                let mut issued = self.issued.lock().unwrap();
                *issued += 1;
                *issued
            };
            if self.fail_at == Some(call) {
                return Err(SummaristError::completion("429 Too Many Requests: quota exceeded"));
            }
            if let Some(delay) = &self.delay {
                tokio::time::sleep(delay(&request.prompt)).await;
            }
            self.requests.lock().unwrap().push(request.clone());
            Ok(match &self.reply {
                Some(reply) => reply(&request.prompt),
                None => request.prompt.clone(),
            })
        }

        fn count_tokens(&self, text: &str) -> usize {
            text.split_whitespace().count()
        }

        fn model(&self) -> &str {
            "echo"
        }
    }

    fn passthrough_prompts() -> PromptSet {
        let echo = PromptTemplate::new("{text}").unwrap();
        PromptSet::default()
            .with_single(echo.clone())
            .with_map(echo.clone())
            .with_combine(echo.clone())
            .with_question(echo)
            .with_refine(PromptTemplate::new("{existing_answer}|{text}").unwrap())
    }

    fn summarizer(client: Arc<EchoClient>, config: SummarizerConfig) -> Summarizer {
        Summarizer::new(client, config)
            .unwrap()
            .with_prompts(passthrough_prompts())
    }

    fn small_chunks(strategy: Strategy) -> SummarizerConfig {
        SummarizerConfig {
            strategy,
            chunk_size: 4,
            chunk_overlap: 0,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_map_reduce_concatenates_in_chunk_order() {
        let client = Arc::new(EchoClient::new());
        let summary = summarizer(client.clone(), small_chunks(Strategy::MapReduce))
            .summarize(&Document::new("A. B. C."))
            .await
            .unwrap();

        assert_eq!(summary.text, "A.\nB.\nC.");
        assert_eq!(summary.chunks, 3);
        assert_eq!(summary.calls, 4);
        assert_eq!(client.prompts(), vec!["A.", "B.", "C.", "A.\nB.\nC."]);
    }

    #[tokio::test]
    async fn test_map_reduce_order_survives_shuffled_completion() {
        let text = "A. B. C. D. E. F.";

        let baseline = Arc::new(EchoClient::new());
        let expected = summarizer(baseline.clone(), small_chunks(Strategy::MapReduce))
            .summarize(&Document::new(text))
            .await
            .unwrap();

        // Earlier chunks take longer, so they finish last
        let shuffled = Arc::new(EchoClient::new().with_delay(|prompt| {
            let first = prompt.bytes().next().unwrap_or(b'F');
            Duration::from_millis(u64::from(b'F'.saturating_sub(first)) * 15)
        }));
        let config = SummarizerConfig {
            concurrency: 6,
            ..small_chunks(Strategy::MapReduce)
        };
        let summary = summarizer(shuffled.clone(), config)
            .summarize(&Document::new(text))
            .await
            .unwrap();

        let completion_order = shuffled.prompts();
        assert_ne!(&completion_order[..6], &baseline.prompts()[..6]);
        assert_eq!(completion_order.last(), baseline.prompts().last());
        assert_eq!(summary.text, expected.text);
        assert_eq!(summary.text, "A.\nB.\nC.\nD.\nE.\nF.");
    }

    #[tokio::test]
    async fn test_map_reduce_collapses_to_fit_context_window() {
        // Combining glues partial summaries into one word, so each round shrinks the prompt
        let client = Arc::new(
            EchoClient::new()
                .with_reply(|prompt| match prompt.strip_prefix("COMBINE ") {
                    Some(partials) => partials.replace('\n', "+"),
                    None => prompt.to_string(),
                })
                .with_delay(|prompt| {
                    Duration::from_millis(if prompt.starts_with("COMBINE A.") { 30 } else { 0 })
                }),
        );
        let config = SummarizerConfig {
            context_window: 3,
            concurrency: 3,
            ..small_chunks(Strategy::MapReduce)
        };
        let prompts =
            passthrough_prompts().with_combine(PromptTemplate::new("COMBINE {text}").unwrap());
        let summary = Summarizer::new(client.clone(), config)
            .unwrap()
            .with_prompts(prompts)
            .summarize(&Document::new("A. B. C. D. E. F."))
            .await
            .unwrap();

        assert_eq!(summary.text, "A.+B.+C.+D.+E.+F.");
        assert_eq!(summary.chunks, 6);
        // 6 map calls, 3 groups in round one, 1 in round two, then the final combine
        assert_eq!(summary.calls, 11);

        let final_prompt = client.prompts().pop().unwrap();
        assert_eq!(final_prompt, "COMBINE A.+B.+C.+D.\nE.+F.");
        assert!(client.count_tokens(&final_prompt) <= 3);
    }

    #[tokio::test]
    async fn test_single_pass_uses_custom_prompt_with_language() {
        let client = Arc::new(EchoClient::new());
        let config = SummarizerConfig {
            strategy: Strategy::SinglePass,
            language: Some("Hindi".to_string()),
            ..Default::default()
        };
        let prompts = PromptSet::default()
            .with_single(PromptTemplate::new("MY CUSTOM {text} in {language}").unwrap());
        let summary = Summarizer::new(client.clone(), config)
            .unwrap()
            .with_prompts(prompts)
            .summarize(&Document::new("hello"))
            .await
            .unwrap();

        assert_eq!(summary.text, "MY CUSTOM hello in Hindi");
        assert_eq!(client.prompts(), vec!["MY CUSTOM hello in Hindi"]);
    }

    #[tokio::test]
    async fn test_refine_is_sequential() {
        let client = Arc::new(EchoClient::new());
        let summary = summarizer(client.clone(), small_chunks(Strategy::Refine))
            .summarize(&Document::new("A. B. C."))
            .await
            .unwrap();

        assert_eq!(summary.text, "A.|B.|C.");
        assert_eq!(summary.calls, 3);
        // Each step sees only the previous running summary and its own chunk
        assert_eq!(client.prompts(), vec!["A.", "A.|B.", "A.|B.|C."]);
    }

    #[tokio::test]
    async fn test_single_chunk_input() {
        let config = SummarizerConfig {
            chunk_size: 100,
            ..Default::default()
        };
        let document = Document::new("Just one sentence.");

        let client = Arc::new(EchoClient::new());
        let summary = summarizer(client.clone(), config.clone())
            .map_reduce(&document)
            .await
            .unwrap();
        assert_eq!(summary.text, "Just one sentence.");
        assert_eq!(summary.calls, 2);

        let client = Arc::new(EchoClient::new());
        let summary = summarizer(client.clone(), config).refine(&document).await.unwrap();
        assert_eq!(summary.text, "Just one sentence.");
        assert_eq!(summary.calls, 1);
    }

    #[tokio::test]
    async fn test_empty_input_issues_no_calls() {
        for strategy in [Strategy::SinglePass, Strategy::MapReduce, Strategy::Refine] {
            let client = Arc::new(EchoClient::new());
            let err = summarizer(client.clone(), small_chunks(strategy))
                .summarize(&Document::new(" \n\n "))
                .await
                .unwrap_err();
            assert!(matches!(err, SummaristError::EmptyInput(_)), "{strategy}");
            assert!(client.prompts().is_empty());
        }
    }

    #[tokio::test]
    async fn test_blank_chunks_are_skipped() {
        let client = Arc::new(EchoClient::new());
        let summary = summarizer(client.clone(), small_chunks(Strategy::MapReduce))
            .summarize(&Document::new("abc          def"))
            .await
            .unwrap();
        assert_eq!(summary.text, "abc\ndef");
        assert_eq!(summary.chunks, 2);
    }

    #[tokio::test]
    async fn test_missing_placeholder_fails_before_calls() {
        let client = Arc::new(EchoClient::new());
        let prompts = passthrough_prompts()
            .with_combine(PromptTemplate::new("{text} in {language}").unwrap());
        let err = Summarizer::new(client.clone(), small_chunks(Strategy::MapReduce))
            .unwrap()
            .with_prompts(prompts)
            .summarize(&Document::new("A. B. C."))
            .await
            .unwrap_err();

        assert!(matches!(err, SummaristError::MissingPlaceholder { ref name } if name == "language"));
        assert!(client.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_language_is_bound() {
        let client = Arc::new(EchoClient::new());
        let config = SummarizerConfig {
            language: Some("Hindi".to_string()),
            ..small_chunks(Strategy::MapReduce)
        };
        let prompts = passthrough_prompts()
            .with_combine(PromptTemplate::new("[{language}] {text}").unwrap());
        let summary = Summarizer::new(client, config)
            .unwrap()
            .with_prompts(prompts)
            .summarize(&Document::new("A. B."))
            .await
            .unwrap();
        assert_eq!(summary.text, "[Hindi] A.\nB.");
    }

    #[tokio::test]
    async fn test_single_pass_translates_with_default_prompts() {
        let client = Arc::new(EchoClient::new());
        let config = SummarizerConfig {
            strategy: Strategy::SinglePass,
            language: Some("Hindi".to_string()),
            ..Default::default()
        };
        let summary = Summarizer::new(client.clone(), config)
            .unwrap()
            .with_prompts(PromptSet::speech())
            .summarize(&Document::new("We will build houses."))
            .await
            .unwrap();

        assert_eq!(summary.calls, 1);
        assert!(summary.text.contains("`We will build houses.`"));
        assert!(summary.text.ends_with("Translate the precise summary to Hindi."));
        let requests = client.requests.lock().unwrap();
        assert_eq!(
            requests[0].system.as_deref(),
            Some(crate::prompts::SPEECH_SYSTEM_PROMPT)
        );
    }

    #[tokio::test]
    async fn test_service_error_passes_through() {
        let client = Arc::new(EchoClient::new().failing_at(2));
        let err = summarizer(client, small_chunks(Strategy::MapReduce))
            .summarize(&Document::new("A. B. C."))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Completion service error: 429 Too Many Requests: quota exceeded"
        );
    }

    #[tokio::test]
    async fn test_cancelled_before_call() {
        let client = Arc::new(EchoClient::new().with_delay(|_| Duration::from_secs(30)));
        let summarizer = summarizer(client.clone(), small_chunks(Strategy::Refine));
        summarizer.cancellation_token().cancel();

        let err = summarizer.summarize(&Document::new("A. B.")).await.unwrap_err();
        assert!(matches!(err, SummaristError::Cancelled));
        assert!(client.prompts().is_empty());
    }

    #[test]
    fn test_preflight_and_invalid_config() {
        let client = Arc::new(EchoClient::new());
        let config = SummarizerConfig {
            context_window: 3,
            ..Default::default()
        };
        let summarizer = Summarizer::new(client.clone(), config).unwrap();
        assert!(summarizer.preflight(&Document::new("one two three")).fits());
        assert!(!summarizer.preflight(&Document::new("one two three four")).fits());

        let bad = SummarizerConfig {
            chunk_size: 20,
            chunk_overlap: 20,
            ..Default::default()
        };
        assert!(matches!(
            Summarizer::new(client, bad),
            Err(SummaristError::InvalidConfiguration(_))
        ));
    }
}
