//! End-to-End Document Pipeline
//!
//! Extract pages from a text file, structure them, chunk, and persist.
//!
//! ```bash
//! cargo run --example pipeline -- report.txt report
//! RUST_LOG=pageslab=debug cargo run --example pipeline -- report.txt report pageslab.toml
//! ```
//!
//! Without an input path a built-in two-page sample is used. A real
//! deployment plugs a hosted language model in as the collaborator; this demo
//! uses a local one that puts each sentence on its own line and fails on any
//! page mentioning "CORRUPT", to show the raw-text fallback.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use pageslab::{
    split_sentences, CancelToken, Pipeline, PipelineConfig, StructuringCollaborator,
    StructuringError,
};

const SAMPLE: &str = "\
Quarterly Report Page 1
Revenue grew twelve percent. Costs were flat. 売上は前年比で増加しました。
Page 2
CORRUPT scan residue follows. Appendix tables were not recoverable.";

struct SentencePerLine;

#[async_trait]
impl StructuringCollaborator for SentencePerLine {
    async fn structure(
        &self,
        user_prompt: &str,
        _system_prompt: &str,
    ) -> Result<String, StructuringError> {
        let page = user_prompt.split_once("\n\n").map_or(user_prompt, |(_, page)| page);
        if page.contains("CORRUPT") {
            return Err(StructuringError::Backend("unreadable page".into()));
        }
        Ok(split_sentences(page).join("\n\n"))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let file_id = args.get(1).map_or("sample", String::as_str);

    let config = match args.get(2) {
        Some(path) => PipelineConfig::load(Path::new(path))?,
        None => PipelineConfig {
            storage_root: std::env::temp_dir().join("pageslab-demo"),
            max_tokens: 20,
            ..PipelineConfig::default()
        },
    };

    let pipeline = Pipeline::new(config, Arc::new(SentencePerLine))?;
    let cancel = CancelToken::never();
    let report = match args.first() {
        Some(path) => {
            let file = tokio::fs::File::open(path).await?;
            pipeline.run(file, file_id, &cancel).await?
        }
        None => pipeline.run(SAMPLE.as_bytes(), file_id, &cancel).await?,
    };

    println!("Pages: {}", report.pages.len());
    println!("Degraded pages: {:?}", report.degraded_pages());
    println!("Chunks: {} -> {}\n", report.chunks.len(), report.chunks_path.display());

    for chunk in &report.chunks {
        println!(
            "[{}] page {:?}, {} tokens: {:?}",
            chunk.chunk_number(),
            chunk.page_number(),
            chunk.token_count(),
            chunk.content()
        );
    }

    Ok(())
}
