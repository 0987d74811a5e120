mod demo;

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use summarist_common::{logger, AppConfig, Document, LlmProvider, Result, SummaristError};
use summarist_llm::{
    CompletionClient, GenerateOptions, OllamaClient, OpenAiClient, PromptSet, PromptTemplate,
    RetryPolicy, Strategy, Summarizer, SummarizerConfig, TextSplitter, TokenCounter,
};
use summarist_source::TextSource;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

/// Find project root by looking for .git directory
fn find_project_root() -> Option<PathBuf> {
    let mut current_dir = std::env::current_dir().ok()?;

    loop {
        if current_dir.join(".git").exists() {
            return Some(current_dir);
        }

        if !current_dir.pop() {
            break;
        }
    }

    None
}

/// Load .env file from project root
fn load_dotenv_from_project_root() {
    if let Some(root) = find_project_root() {
        let env_path = root.join(".env");
        if env_path.exists() {
            dotenv::from_path(&env_path).ok();
        }
    } else {
        dotenv::dotenv().ok();
    }
}

#[derive(Parser)]
#[command(name = "summarist")]
#[command(about = "Summarist - summarize long speeches and documents with a language model", long_about = None)]
struct Cli {
    /// Completion service (openai or ollama)
    #[arg(long, global = true)]
    provider: Option<LlmProvider>,

    /// Model name
    #[arg(long, global = true)]
    model: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a text, a text file or a PDF
    Summarize {
        #[command(flatten)]
        input: InputArgs,

        /// single-pass, map-reduce or refine
        #[arg(long, short, default_value = "map-reduce")]
        strategy: Strategy,

        /// Translate the summary to this language
        #[arg(long)]
        language: Option<String>,

        #[command(flatten)]
        chunking: ChunkArgs,

        /// Concurrent map-phase calls
        #[arg(long)]
        concurrency: Option<usize>,

        #[command(flatten)]
        prompts: PromptArgs,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Count input tokens against the model's context window
    Tokens {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Show how the input would be chunked
    Chunks {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        chunking: ChunkArgs,
    },

    /// Run every summarization variant over a speech and a PDF
    Demo {
        /// Speech transcript (plain text)
        #[arg(long)]
        speech: PathBuf,

        /// PDF document
        #[arg(long)]
        pdf: PathBuf,

        /// Language for the translated summary
        #[arg(long, default_value = "Hindi")]
        language: String,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Input file (.pdf is extracted, anything else is read as UTF-8); stdin when omitted
    input: Option<PathBuf>,

    /// Summarize this text instead of a file
    #[arg(long, conflicts_with = "input")]
    text: Option<String>,
}

#[derive(Args)]
struct ChunkArgs {
    /// Maximum chunk length in characters
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Characters shared by consecutive chunks
    #[arg(long)]
    chunk_overlap: Option<usize>,
}

#[derive(Args)]
struct PromptArgs {
    /// System message file
    #[arg(long)]
    system: Option<PathBuf>,

    /// Single-pass prompt template file ({text}, optionally {language}); used for every language
    #[arg(long)]
    prompt: Option<PathBuf>,

    /// Single-pass prompt template file used with --language ({text}, {language})
    #[arg(long)]
    translate_prompt: Option<PathBuf>,

    /// Map prompt template file ({text})
    #[arg(long)]
    map_prompt: Option<PathBuf>,

    /// Combine prompt template file ({text})
    #[arg(long)]
    combine_prompt: Option<PathBuf>,

    /// Refine seed prompt template file ({text})
    #[arg(long)]
    question_prompt: Option<PathBuf>,

    /// Refine prompt template file ({existing_answer}, {text})
    #[arg(long)]
    refine_prompt: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    load_dotenv_from_project_root();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::from_env()?;

    // Override with CLI arguments
    if let Some(provider) = cli.provider {
        config.provider = provider;
    }
    if let Some(model) = cli.model {
        config.llm_model = model;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    logger::init(&config)?;

    match cli.command {
        Commands::Summarize {
            input,
            strategy,
            language,
            chunking,
            concurrency,
            prompts,
            json,
        } => {
            chunking.apply(&mut config);
            if let Some(concurrency) = concurrency {
                config.map_concurrency = concurrency;
            }
            config.validate()?;

            let document = input.load().await?;
            let client = build_client(&config)?;
            let cancel = cancel_on_ctrl_c();

            let summarizer_config = SummarizerConfig {
                strategy,
                language,
                ..summarizer_config(&config)
            };
            let summarizer = Summarizer::new(client, summarizer_config)?
                .with_prompts(prompts.load().await?)
                .with_cancellation(cancel);

            let summary = summarizer.summarize(&document).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{}", summary.text);
            }
        }
        Commands::Tokens { input } => {
            let document = input.load().await?;
            let counter = token_counter(&config);
            let tokens = counter.count(document.content());

            println!("Number of tokens: {}", tokens);
            println!("Context window:   {}", config.context_window);
            if tokens > config.context_window {
                println!("Input does not fit in a single pass; use map-reduce or refine");
            }
        }
        Commands::Chunks { input, chunking } => {
            chunking.apply(&mut config);
            let document = input.load().await?;
            let splitter = TextSplitter::new(config.chunk_size, config.chunk_overlap)?;

            let chunks = splitter.split(document.content());
            println!(
                "{} chunks (size {}, overlap {} characters)",
                chunks.len(),
                config.chunk_size,
                config.chunk_overlap
            );
            for (i, chunk) in chunks.iter().enumerate() {
                let preview: String = chunk.text.chars().take(60).collect();
                println!(
                    "{:>4}  [{}..{})  {:>6} chars  {:?}",
                    i + 1,
                    chunk.start,
                    chunk.end,
                    chunk.char_len(),
                    preview
                );
            }
        }
        Commands::Demo {
            speech,
            pdf,
            language,
        } => {
            config.validate()?;
            let client = build_client(&config)?;
            let cancel = cancel_on_ctrl_c();
            demo::run(client, &config, &speech, &pdf, &language, cancel).await?;
        }
    }

    Ok(())
}

impl InputArgs {
    /// Load the document from `--text`, a file, or stdin
    async fn load(&self) -> Result<Document> {
        if let Some(text) = &self.text {
            return TextSource::Literal(text.clone()).load().await;
        }
        if let Some(path) = &self.input {
            return TextSource::from_path(path).load().await;
        }

        let mut text = String::new();
        tokio::io::stdin().read_to_string(&mut text).await?;
        Ok(Document::new(text).with_source("stdin"))
    }
}

impl ChunkArgs {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(size) = self.chunk_size {
            config.chunk_size = size;
        }
        if let Some(overlap) = self.chunk_overlap {
            config.chunk_overlap = overlap;
        }
    }
}

impl PromptArgs {
    /// Default prompts with any file overrides applied
    async fn load(&self) -> Result<PromptSet> {
        let mut prompts = PromptSet::default();

        if let Some(path) = &self.system {
            prompts = prompts.with_system(tokio::fs::read_to_string(path).await?);
        }
        if let Some(path) = &self.prompt {
            prompts = prompts.with_single(read_template(path).await?);
        }
        if let Some(path) = &self.translate_prompt {
            prompts = prompts.with_translate(read_template(path).await?);
        }
        if let Some(path) = &self.map_prompt {
            prompts = prompts.with_map(read_template(path).await?);
        }
        if let Some(path) = &self.combine_prompt {
            prompts = prompts.with_combine(read_template(path).await?);
        }
        if let Some(path) = &self.question_prompt {
            prompts = prompts.with_question(read_template(path).await?);
        }
        if let Some(path) = &self.refine_prompt {
            prompts = prompts.with_refine(read_template(path).await?);
        }

        Ok(prompts)
    }
}

async fn read_template(path: &Path) -> Result<PromptTemplate> {
    let text = tokio::fs::read_to_string(path).await?;
    PromptTemplate::new(text.trim_end())
        .map_err(|e| SummaristError::template(format!("{}: {}", path.display(), e)))
}

/// Create the completion client for the configured provider
fn build_client(config: &AppConfig) -> Result<Arc<dyn CompletionClient>> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let retry = RetryPolicy::with_attempts(config.max_attempts);

    let client: Arc<dyn CompletionClient> = match config.provider {
        LlmProvider::OpenAi => {
            let api_key = config
                .openai_api_key
                .clone()
                .ok_or_else(|| SummaristError::config("OPENAI_API_KEY is not set"))?;
            Arc::new(
                OpenAiClient::new(&config.openai_base_url, api_key, &config.llm_model, timeout)?
                    .with_retry(retry),
            )
        }
        LlmProvider::Ollama => Arc::new(
            OllamaClient::new(&config.ollama_base_url, &config.llm_model, timeout)?.with_retry(retry),
        ),
    };

    tracing::info!(
        "Using {} at {} (model: {})",
        config.provider,
        config.base_url(),
        config.llm_model
    );
    Ok(client)
}

fn token_counter(config: &AppConfig) -> TokenCounter {
    match config.provider {
        LlmProvider::OpenAi => TokenCounter::for_openai_model(&config.llm_model),
        LlmProvider::Ollama => TokenCounter::approximate(),
    }
}

fn summarizer_config(config: &AppConfig) -> SummarizerConfig {
    SummarizerConfig {
        chunk_size: config.chunk_size,
        chunk_overlap: config.chunk_overlap,
        concurrency: config.map_concurrency,
        context_window: config.context_window,
        options: GenerateOptions {
            temperature: Some(config.temperature),
            max_tokens: config.max_tokens,
            ..Default::default()
        },
        ..SummarizerConfig::default()
    }
}

/// Cancel in-flight completion calls on Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling summarization");
            cancel.cancel();
        }
    });
    token
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_prompt_flag() {
        let cli = Cli::try_parse_from([
            "summarist",
            "summarize",
            "--text",
            "hello",
            "--strategy",
            "single-pass",
            "--language",
            "Hindi",
            "--prompt",
            "single.txt",
            "--translate-prompt",
            "translate.txt",
        ])
        .unwrap();

        match cli.command {
            Commands::Summarize {
                language, prompts, ..
            } => {
                assert_eq!(language.as_deref(), Some("Hindi"));
                assert_eq!(prompts.prompt, Some(PathBuf::from("single.txt")));
                assert_eq!(prompts.translate_prompt, Some(PathBuf::from("translate.txt")));
            }
            _ => panic!("expected summarize"),
        }
    }
}
