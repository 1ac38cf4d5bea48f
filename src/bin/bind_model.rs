//! Model binding utility for HealthPredict risk models.
//!
//! Writes `manifest.json` with SHA-256 digests of the model files in a
//! directory, so the dashboard refuses a model whose files were altered
//! after binding.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin bind_model -- <model_dir> [--check]
//! ```
//!
//! `--check` loads the directory the way the dashboard does and reports the
//! result without writing anything.

use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};

use healthpredict::adapters::model::{self, MANIFEST_FILE};
use healthpredict::adapters::JsonRiskModel;
use healthpredict::ports::RiskModel;

fn usage() -> anyhow::Error {
    anyhow!("Usage: bind_model <model_dir> [--check]")
}

fn parse_args() -> Result<(PathBuf, bool)> {
    let mut model_dir: Option<PathBuf> = None;
    let mut check = false;

    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--check" => check = true,
            "-h" | "--help" => return Err(usage()),
            _ if model_dir.is_none() => model_dir = Some(PathBuf::from(arg)),
            _ => return Err(usage()),
        }
    }

    let model_dir = model_dir.ok_or_else(usage)?;
    Ok((model_dir, check))
}

fn main() -> Result<()> {
    let (model_dir, check) = parse_args()?;

    let model_dir = if model_dir.is_file() {
        model_dir
            .parent()
            .ok_or_else(|| anyhow!("Model path has no parent directory"))?
            .to_path_buf()
    } else {
        model_dir
    };

    if check {
        let model = JsonRiskModel::load(&model_dir)
            .with_context(|| format!("Model in {model_dir:?} failed to load"))?;
        let names: Vec<&str> = model.features().iter().map(|f| f.name()).collect();
        println!("OK: {:?} model over [{}]", model.kind(), names.join(", "));
        return Ok(());
    }

    // Validates first; an existing manifest survives a failed bind.
    let manifest = model::bind(&model_dir)
        .with_context(|| format!("Refusing to bind invalid model in {model_dir:?}"))?;
    let manifest_path = model_dir.join(MANIFEST_FILE);

    println!("Bound {} file(s): {manifest_path:?}", manifest.files.len());
    for (rel, digest) in &manifest.files {
        println!("  {rel}  {digest}");
    }

    Ok(())
}
