//! CLI: read a schema once, validate many documents against it.
use std::io::Read as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use json_schema_jit::{Compiler, Config, Schema, SchemaReader, Validator};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// compile a JSON Schema once and validate JSON/NDJSON documents against it
#[derive(Parser, Debug)]
#[command(name = "json-schema-jit", version)]
pub struct CommandLineInterface {
    /// more logging (-v info, -vv debug, -vvv trace); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// JSON config file with `compile` and `reader` sections
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// validate documents; exits with 1 if any of them is invalid
    Validate(ValidateCmd),
    /// read and compile the schema only
    Check(CheckCmd),
}

#[derive(Args, Debug, Clone)]
struct SchemaSettings {
    /// schema document
    #[arg(long, short)]
    schema: PathBuf,

    /// `$schema` URI assumed when the schema declares none (overrides the config file)
    #[arg(long)]
    default_schema_version: Option<String>,
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select the subnode to validate in each document (e.g. /data/items/0)
    #[arg(long)]
    json_pointer: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns or '-' for stdin
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct ValidateCmd {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    #[command(flatten)]
    input_settings: InputSettings,

    /// only report invalid documents
    #[arg(long, short)]
    quiet: bool,
}

#[derive(clap::Parser, Debug)]
struct CheckCmd {
    #[command(flatten)]
    schema_settings: SchemaSettings,
}

/// One document to validate, labelled for output.
#[derive(Debug)]
struct Document {
    label: String,
    value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    AllValid,
    SomeInvalid,
}

impl Outcome {
    pub fn exit_code(self) -> i32 {
        match self {
            Outcome::AllValid => 0,
            Outcome::SomeInvalid => 1,
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl SchemaSettings {
    fn compile(&self, config: &Config) -> Result<Validator> {
        let mut reader_options = config.reader.clone();
        if let Some(version) = &self.default_schema_version {
            reader_options.default_schema_version = Some(version.clone());
        }
        let source = read_source(&self.schema)?;
        let document: Value = json_schema_jit::path_de::from_str_with_path(&source)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("failed to parse schema {}", self.schema.display()))?;
        let schema: Schema = SchemaReader::new(reader_options)
            .read(&document)
            .with_context(|| format!("failed to read schema {}", self.schema.display()))?;
        Compiler::new(config.compile.clone())
            .compile(&schema)
            .with_context(|| format!("failed to compile schema {}", self.schema.display()))
    }
}

impl InputSettings {
    fn load(&self) -> Result<Vec<Document>> {
        let source_paths = resolve_file_path_patterns(&self.input).context("failed to resolve input file paths")?;
        let mut documents = Vec::new();
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            let source = read_source(&source_path)?;
            if self.ndjson {
                for (index, line) in source.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let label = format!("{source_path_str}:{}", index + 1);
                    let value = serde_json::from_str::<Value>(line)
                        .with_context(|| format!("failed to parse NDJSON line ({label})"))?;
                    documents.push(self.select(label, value)?);
                }
            } else {
                let value = serde_json::from_str::<Value>(&source)
                    .with_context(|| format!("failed to parse JSON source file ({source_path_str})"))?;
                documents.push(self.select(source_path_str, value)?);
            }
        }
        Ok(documents)
    }

    fn select(&self, label: String, value: Value) -> Result<Document> {
        let Some(pointer) = self.json_pointer.as_deref() else {
            return Ok(Document { label, value });
        };
        match value.pointer(pointer) {
            Some(selected) => Ok(Document { value: selected.clone(), label: format!("{label}#{pointer}") }),
            None => bail!("JSON pointer {pointer} matches nothing in {label}"),
        }
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    /// Installs the stderr tracing subscriber for the chosen verbosity.
    pub fn init_logging(&self) {
        let level = match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
            .init();
    }

    fn config(&self) -> Result<Config> {
        match &self.config {
            Some(path) => Ok(Config::load(path)?),
            None => Ok(Config::default()),
        }
    }

    pub fn run(&self) -> Result<Outcome> {
        let config = self.config()?;
        match &self.cmd {
            Command::Check(target) => {
                let validator = target.schema_settings.compile(&config)?;
                let schema = validator.schema();
                println!(
                    "{} {} ({} nodes, {} recursive)",
                    "ok".green().bold(),
                    target.schema_settings.schema.display(),
                    schema.graph.len(),
                    validator.forward_slots(),
                );
                Ok(Outcome::AllValid)
            }
            Command::Validate(target) => {
                let validator = target.schema_settings.compile(&config)?;
                let documents = target.input_settings.load()?;
                tracing::info!(documents = documents.len(), "validating");

                let results: Vec<bool> = documents.par_iter().map(|doc| validator.is_valid(&doc.value)).collect();

                let mut invalid = 0usize;
                for (doc, valid) in documents.iter().zip(&results) {
                    if *valid {
                        if !target.quiet {
                            println!("{} {}", "valid".green(), doc.label);
                        }
                    } else {
                        invalid += 1;
                        println!("{} {}", "invalid".red().bold(), doc.label);
                    }
                }
                eprintln!(
                    "{} documents, {} valid, {} invalid",
                    documents.len(),
                    documents.len() - invalid,
                    invalid
                );
                Ok(if invalid == 0 { Outcome::AllValid } else { Outcome::SomeInvalid })
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// File contents, or all of stdin for `-`.
fn read_source(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut source = String::new();
        std::io::stdin().read_to_string(&mut source).context("failed to read stdin")?;
        return Ok(source);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                // an explicit glob that matches nothing is almost always a typo
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

// ------------------------------- Tests ------------------------------------ //
