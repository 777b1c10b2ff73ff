//! Runs JSON-Schema-Test-Suite style fixture files through the compiler.
//!
//! Each file holds an array of groups:
//! `{ "description", "schema", "tests": [{ "description", "data", "valid" }] }`.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use colored::Colorize;
use serde::Deserialize;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use json_schema_jit::{ReaderOptions, SchemaReader};

#[derive(Parser, Debug)]
struct Cli {
    /// suite files; literal paths or quoted glob patterns
    #[arg(num_args = 1.., required = true)]
    input: Vec<String>,

    /// only run groups whose description contains this text
    #[arg(long)]
    filter: Option<String>,

    /// `$schema` assumed for groups that declare none (e.g. when running a draft-04 suite)
    #[arg(long)]
    default_schema_version: Option<String>,

    /// print passing cases too
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Deserialize)]
struct Group {
    description: String,
    schema: Value,
    tests: Vec<Case>,
}

#[derive(Debug, Deserialize)]
struct Case {
    description: String,
    data: Value,
    valid: bool,
}

#[derive(Debug, Default)]
struct Tally {
    passed: usize,
    failed: usize,
    broken_groups: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let reader = SchemaReader::new(ReaderOptions { default_schema_version: cli.default_schema_version.clone() });
    let mut tally = Tally::default();
    for path in suite_files(&cli.input)? {
        run_file(&cli, &reader, &path, &mut tally)?;
    }

    let summary = format!(
        "{} passed, {} failed, {} groups failed to compile",
        tally.passed, tally.failed, tally.broken_groups
    );
    if tally.failed + tally.broken_groups == 0 {
        println!("{}", summary.green().bold());
        Ok(())
    } else {
        println!("{}", summary.red().bold());
        std::process::exit(1);
    }
}

fn run_file(cli: &Cli, reader: &SchemaReader, path: &Path, tally: &mut Tally) -> Result<()> {
    let source = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let groups: Vec<Group> = json_schema_jit::path_de::from_str_with_path(&source)
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("malformed suite file {}", path.display()))?;

    println!("{}", path.display().to_string().bold());
    for group in groups {
        if cli.filter.as_ref().is_some_and(|f| !group.description.contains(f.as_str())) {
            continue;
        }
        let compiled = reader
            .read(&group.schema)
            .map_err(anyhow::Error::from)
            .and_then(|schema| Ok(json_schema_jit::compile(&schema)?));
        let validator = match compiled {
            Ok(v) => v,
            Err(error) => {
                tally.broken_groups += 1;
                println!("  {} {}: {error:#}", "ERROR".red().bold(), group.description);
                continue;
            }
        };
        for case in &group.tests {
            let got = validator.is_valid(&case.data);
            if got == case.valid {
                tally.passed += 1;
                if cli.verbose > 0 {
                    println!("  {} {} / {}", "ok".green(), group.description, case.description);
                }
            } else {
                tally.failed += 1;
                println!(
                    "  {} {} / {} (expected {}, got {})",
                    "FAIL".red().bold(),
                    group.description,
                    case.description,
                    case.valid,
                    got
                );
            }
        }
    }
    Ok(())
}

fn suite_files(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for pattern in patterns {
        if pattern.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{')) {
            let before = out.len();
            for entry in glob::glob(pattern)? {
                out.push(entry?);
            }
            if out.len() == before {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }
    out.sort();
    Ok(out)
}
