use anyhow::Context;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::app::ports::DocumentOutputPort;
use crate::pipeline::processing::assemble::Sachstand;

/// Writes each Sachstand as pretty-printed JSON to a fixed file path
pub struct FileDocumentOutputAdapter {
    file_path: PathBuf,
}

impl FileDocumentOutputAdapter {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

#[async_trait]
impl DocumentOutputPort for FileDocumentOutputAdapter {
    async fn write_document(&self, document: &Sachstand) -> anyhow::Result<()> {
        if let Some(dir) = self.file_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }

        let mut json = document.to_json_pretty()?;
        json.push('\n');
        tokio::fs::write(&self.file_path, json)
            .await
            .with_context(|| format!("Failed to write {}", self.file_path.display()))?;

        info!(
            path = %self.file_path.display(),
            entities = document.has_part.len(),
            "Wrote Sachstand"
        );
        Ok(())
    }
}

/// Prints each Sachstand to stdout
pub struct StdoutDocumentOutputAdapter;

#[async_trait]
impl DocumentOutputPort for StdoutDocumentOutputAdapter {
    async fn write_document(&self, document: &Sachstand) -> anyhow::Result<()> {
        println!("{}", document.to_json_pretty()?);
        Ok(())
    }
}
