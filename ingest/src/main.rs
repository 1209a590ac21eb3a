use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use fulltext_core::{DocId, Index, InvertedIndex, Querier, QueryEngine};
use reqwest::{header, Client};
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "ingest")]
#[command(about = "Feed corpus directories to the full-text index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// POST every file under the given directories to a running server
    Push {
        /// Corpus directories (or single files)
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Base URL of the server
        #[arg(long, default_value = "http://localhost:5001")]
        server: String,
        /// Per-request timeout in seconds
        #[arg(long, default_value_t = 10)]
        timeout_secs: u64,
    },
    /// Build an in-process index from the files and run one query against it
    Local {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Comma-separated tokens that must all occur
        #[arg(long, value_delimiter = ',')]
        tokens: Vec<String>,
        /// Exact phrase to look for
        #[arg(long, conflicts_with = "tokens")]
        phrase: Option<String>,
    },
}

#[derive(Serialize)]
struct LocalHit<'a> {
    doc_id: DocId,
    path: &'a Path,
    frequency: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    positions: Vec<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Push { paths, server, timeout_secs } => push(&paths, &server, timeout_secs).await,
        Commands::Local { paths, tokens, phrase } => local(&paths, &tokens, phrase.as_deref()),
    }
}

/// Regular files under each path, in walk order.
fn corpus_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for root in paths {
        for entry in WalkDir::new(root).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
    }
    files
}

async fn push(paths: &[PathBuf], server: &str, timeout_secs: u64) -> Result<()> {
    let client = Client::builder().timeout(Duration::from_secs(timeout_secs)).build()?;
    let url = format!("{}/doc", server.trim_end_matches('/'));

    let files = corpus_files(paths);
    let total = files.len();
    let mut ingested = 0usize;
    for (i, file) in files.iter().enumerate() {
        match push_file(&client, &url, file).await {
            Ok(doc_id) => {
                ingested += 1;
                tracing::info!(doc_id, path = %file.display(), "{}/{}", i + 1, total);
            }
            Err(e) => tracing::warn!(path = %file.display(), error = ?e, "skipping file"),
        }
    }
    tracing::info!(ingested, failed = total - ingested, "ingest complete");
    Ok(())
}

async fn push_file(client: &Client, url: &str, file: &Path) -> Result<DocId> {
    let bytes = fs::read(file).with_context(|| format!("read {}", file.display()))?;
    let res = client
        .post(url)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .body(bytes)
        .send()
        .await
        .context("send request")?;
    let status = res.status();
    if !status.is_success() {
        bail!("server answered {status}");
    }
    let body: serde_json::Value = res.json().await.context("decode response")?;
    body["doc_id"].as_u64().context("response carries no doc_id")
}

fn local(paths: &[PathBuf], tokens: &[String], phrase: Option<&str>) -> Result<()> {
    let files = corpus_files(paths);
    let (idx, ids) = build_local(&files)?;
    tracing::info!(num_docs = idx.num_docs(), num_tokens = idx.num_tokens(), "built local index");

    let q = QueryEngine::new(&idx);
    let hits = match phrase {
        Some(p) => q.phrase(p)?,
        None => {
            let refs: Vec<&str> = tokens.iter().map(String::as_str).collect();
            q.intersection(&refs)?
        }
    };

    let out: Vec<LocalHit> = hits
        .into_iter()
        .filter_map(|p| {
            let path = path_of(&ids, p.doc_id)?;
            Some(LocalHit { doc_id: p.doc_id, path, frequency: p.frequency, positions: p.positions })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

/// Indexes each file in order; returns the index and the doc id of every file.
fn build_local(files: &[PathBuf]) -> Result<(InvertedIndex, Vec<(DocId, PathBuf)>)> {
    let mut idx = InvertedIndex::new();
    let mut ids = Vec::with_capacity(files.len());
    for file in files {
        let mut f = File::open(file).with_context(|| format!("open {}", file.display()))?;
        let doc_id = idx.index_document(&mut f).with_context(|| format!("index {}", file.display()))?;
        ids.push((doc_id, file.clone()));
    }
    Ok((idx, ids))
}

fn path_of(ids: &[(DocId, PathBuf)], doc_id: DocId) -> Option<&Path> {
    ids.iter().find(|(id, _)| *id == doc_id).map(|(_, path)| path.as_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn local_index_over_directory() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("a.txt"), "new home sales top forecasts").unwrap();
        fs::write(dir.path().join("b.txt"), "home sales rise in july").unwrap();
        fs::write(dir.path().join("nested/c.txt"), "july new home sales rise").unwrap();

        let files = corpus_files(&[dir.path().to_path_buf()]);
        assert_eq!(files.len(), 3);

        let (idx, ids) = build_local(&files).unwrap();
        let hits = QueryEngine::new(&idx).phrase("sales rise").unwrap();
        let names: Vec<_> = hits
            .iter()
            .map(|p| path_of(&ids, p.doc_id).unwrap().file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["b.txt", "c.txt"]);
    }
}
