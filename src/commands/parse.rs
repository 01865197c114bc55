//! Parse command: print one file's structural parse as JSON.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;

use crate::language::Language;
use crate::parser::ParserRegistry;

pub async fn run(file: PathBuf, language: Option<String>) -> Result<()> {
    let language = match language {
        Some(tag) => tag,
        None => match Language::detect(&file) {
            Some(lang) => lang.as_str().to_string(),
            None => bail!(
                "Cannot detect the language of {}; pass --language",
                file.display()
            ),
        },
    };

    let source = tokio::fs::read_to_string(&file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let registry = ParserRegistry::new();
    let result = registry.parse(&source, &file, &language);
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
