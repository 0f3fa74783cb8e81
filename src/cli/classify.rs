//! `classify` command: dry-run the type classifier on relative paths.

use anyhow::Result;
use asset_overlay::classify::TypeClassifier;
use asset_overlay::utils::path::normalize_separators;
use owo_colors::OwoColorize;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ClassifyResult {
    pub input: String,
    /// `None` when the path is never loaded as an asset.
    pub path: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

pub fn classify_all(classifier: &TypeClassifier, inputs: &[String]) -> Vec<ClassifyResult> {
    inputs
        .iter()
        .map(|input| {
            let mut warning = None;
            let found = classifier.classify(&normalize_separators(input), &mut |d| {
                warning = Some(d.to_string());
            });
            ClassifyResult {
                input: input.clone(),
                path: found.as_ref().map(|c| c.path.clone()),
                kind: found.as_ref().map(|c| c.kind.to_string()),
                format: found.map(|c| c.format),
                warning,
            }
        })
        .collect()
}

pub fn run_classify(paths: &[String], json: bool) -> Result<()> {
    let results = classify_all(&TypeClassifier::new(), paths);

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    for result in &results {
        match (&result.path, &result.kind) {
            (Some(path), Some(kind)) => {
                let format = result.format.as_deref().unwrap_or_default();
                println!("{} -> {} {} {}", result.input, path.bold(), kind.cyan(), format.dimmed());
            }
            _ => println!("{} -> {}", result.input, "not an asset".dimmed()),
        }
        if let Some(warning) = &result.warning {
            println!("  {} {}", "warning:".yellow(), warning);
        }
    }
    Ok(())
}
