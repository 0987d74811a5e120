//! Runs every summarization variant in turn

use std::path::Path;
use std::sync::Arc;
use summarist_common::{AppConfig, Document, Result};
use summarist_llm::{CompletionClient, PromptSet, Strategy, Summarizer, SummarizerConfig};
use summarist_source::TextSource;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// One demonstration run
struct Variant {
    title: String,
    strategy: Strategy,
    prompts: PromptSet,
    language: Option<String>,
    speech: bool,
}

fn variants(language: &str) -> Vec<Variant> {
    vec![
        Variant {
            title: "Single-pass summary".to_string(),
            strategy: Strategy::SinglePass,
            prompts: PromptSet::speech(),
            language: None,
            speech: true,
        },
        Variant {
            title: format!("Single-pass summary translated to {}", language),
            strategy: Strategy::SinglePass,
            prompts: PromptSet::default(),
            language: Some(language.to_string()),
            speech: true,
        },
        Variant {
            title: "Stuffed document summary".to_string(),
            strategy: Strategy::SinglePass,
            prompts: PromptSet::default(),
            language: None,
            speech: false,
        },
        Variant {
            title: "Map-reduce summary".to_string(),
            strategy: Strategy::MapReduce,
            prompts: PromptSet::default(),
            language: None,
            speech: false,
        },
        Variant {
            title: "Map-reduce summary with custom prompts".to_string(),
            strategy: Strategy::MapReduce,
            prompts: PromptSet::speech_outline(),
            language: None,
            speech: false,
        },
        Variant {
            title: "Refine summary".to_string(),
            strategy: Strategy::Refine,
            prompts: PromptSet::default(),
            language: None,
            speech: false,
        },
    ]
}

/// Summarize `speech` and `pdf` with every variant, printing each result
pub async fn run(
    client: Arc<dyn CompletionClient>,
    config: &AppConfig,
    speech: &Path,
    pdf: &Path,
    language: &str,
    cancel: CancellationToken,
) -> Result<()> {
    let speech_doc = TextSource::File(speech.to_path_buf()).load().await?;
    let pdf_doc = TextSource::Pdf(pdf.to_path_buf()).load().await?;

    println!(
        "Number of tokens in speech: {}",
        client.count_tokens(speech_doc.content())
    );

    for variant in variants(language) {
        let document: &Document = if variant.speech { &speech_doc } else { &pdf_doc };
        info!("Running variant: {}", variant.title);

        let summarizer_config = SummarizerConfig {
            strategy: variant.strategy,
            language: variant.language,
            ..super::summarizer_config(config)
        };
        let summarizer = Summarizer::new(client.clone(), summarizer_config)?
            .with_prompts(variant.prompts)
            .with_cancellation(cancel.clone());

        let summary = summarizer.summarize(document).await?;
        println!("{}:\n{}\n", variant.title, summary.text);
    }

    Ok(())
}
