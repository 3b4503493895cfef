//! Command line front-end: check | normalize | plan against a schema file.
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::codec::{Codec, Direction};
use crate::derive::Session;
use crate::schema::Schema;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// derive JSON codecs from a schema of product and sum types, then check or
/// normalize documents with them
#[derive(Parser, Debug)]
#[command(name = "shapecodec", version)]
pub struct CommandLineInterface {
    /// debug-level logging (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// decode every document and report all errors
    Check(CheckCmd),
    /// decode then re-encode: canonical field order, empty optionals dropped
    Normalize(NormalizeCmd),
    /// print how each field of the type resolves to a codec
    Plan(PlanCmd),
}

#[derive(Args, Debug, Clone)]
struct TypeSelection {
    /// schema file (JSON)
    #[arg(long, short)]
    schema: PathBuf,

    /// root type name in the schema
    #[arg(long = "type", short = 't')]
    type_name: String,
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document.
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns or '-' for stdin
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct CheckCmd {
    #[command(flatten)]
    target: TypeSelection,

    #[command(flatten)]
    input_settings: InputSettings,

    /// only print failures
    #[arg(long, short)]
    quiet: bool,
}

#[derive(clap::Parser, Debug)]
struct NormalizeCmd {
    #[command(flatten)]
    target: TypeSelection,

    #[command(flatten)]
    input_settings: InputSettings,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct PlanCmd {
    #[command(flatten)]
    target: TypeSelection,

    #[arg(long, value_enum, default_value_t = DirectionArg::ReadWrite)]
    direction: DirectionArg,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum DirectionArg {
    Read,
    Write,
    ReadWrite,
}

/// One input document and where it came from (`file`, `file:line`, `file#n`).
#[derive(Debug, Clone)]
struct Document {
    origin: String,
    json: serde_json::Value,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn run(&self) -> Result<ExitCode> {
        match &self.cmd {
            Command::Check(cmd) => cmd.run(),
            Command::Normalize(cmd) => cmd.run(),
            Command::Plan(cmd) => cmd.run(),
        }
    }
}

impl CheckCmd {
    fn run(&self) -> Result<ExitCode> {
        let codec = self.target.derive(Direction::Read)?;
        let reader = codec.reader().ok_or_else(|| anyhow!("derived codec cannot read"))?;
        let docs = self.input_settings.load_documents()?;
        info!(documents = docs.len(), type_name = %self.target.type_name, "checking");

        let results: Vec<_> = docs
            .par_iter()
            .map(|doc| (doc, reader.read(&doc.json)))
            .collect();

        let mut failed = 0usize;
        for (doc, result) in &results {
            match result {
                Ok(_) if self.quiet => {}
                Ok(_) => println!("{} {}", "ok".green().bold(), doc.origin),
                Err(errs) => {
                    failed += 1;
                    println!("{} {} ({} error(s))", "FAIL".red().bold(), doc.origin, errs.len());
                    for (path, reason) in errs.pairs() {
                        println!("    {} {reason}", path.yellow());
                    }
                }
            }
        }
        let summary = format!("{} of {} document(s) failed", failed, results.len());
        if failed > 0 {
            eprintln!("{}", summary.red());
            Ok(ExitCode::FAILURE)
        } else {
            if !self.quiet {
                eprintln!("{}", summary.green());
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

impl NormalizeCmd {
    fn run(&self) -> Result<ExitCode> {
        let format = self
            .target
            .derive(Direction::ReadWrite)?
            .into_format()
            .ok_or_else(|| anyhow!("derived codec is not read-write"))?;
        let docs = self.input_settings.load_documents()?;

        let mut lines = Vec::with_capacity(docs.len());
        for doc in &docs {
            let value = format
                .read(&doc.json)
                .map_err(|errs| anyhow!("{}: {errs}", doc.origin))?;
            let json = format
                .write(&value)
                .with_context(|| format!("{}: re-encoding failed", doc.origin))?;
            lines.push(json);
        }

        // a single document prints pretty; several print one per line
        let out = match lines.as_slice() {
            [one] => serde_json::to_string_pretty(one)?,
            many => many
                .iter()
                .map(serde_json::to_string)
                .collect::<Result<Vec<_>, _>>()?
                .join("\n"),
        };
        match self.out.as_ref() {
            Some(path) => write_output(path, &out)?,
            None => println!("{out}"),
        }
        Ok(ExitCode::SUCCESS)
    }
}

impl PlanCmd {
    fn run(&self) -> Result<ExitCode> {
        let schema = self.target.load_schema()?;
        let mut session = Session::new(&schema, self.direction.into());
        session
            .derive_named(&self.target.type_name)
            .with_context(|| self.target.failure_context(&schema))?;
        for plan in session.plans().values() {
            print!("{plan}");
        }
        Ok(ExitCode::SUCCESS)
    }
}

impl TypeSelection {
    fn load_schema(&self) -> Result<Schema> {
        Schema::load(&self.schema).with_context(|| format!("loading {}", self.schema.display()))
    }

    fn failure_context(&self, schema: &Schema) -> String {
        let known: Vec<_> = schema.names().collect();
        format!("cannot derive `{}` (schema defines: {})", self.type_name, known.join(", "))
    }

    fn derive(&self, direction: Direction) -> Result<Codec> {
        let schema = self.load_schema()?;
        let codec = Session::new(&schema, direction)
            .derive_named(&self.type_name)
            .with_context(|| self.failure_context(&schema))?;
        debug!(type_name = %self.type_name, %direction, "derived root codec");
        Ok(codec)
    }
}

impl InputSettings {
    fn load_documents(&self) -> Result<Vec<Document>> {
        let mut docs = Vec::new();
        for source in resolve_file_path_patterns(&self.input)? {
            let (label, text) = read_source(&source)?;
            for (origin, json) in self.split(&label, &text)? {
                for json in self.preprocess(&origin, json)? {
                    docs.push(Document { origin: origin.clone(), json });
                }
            }
        }
        Ok(docs)
    }

    fn split(&self, label: &str, text: &str) -> Result<Vec<(String, serde_json::Value)>> {
        if !self.ndjson {
            let json = serde_json::from_str(text).with_context(|| format!("failed to parse JSON ({label})"))?;
            return Ok(vec![(label.to_owned(), json)]);
        }
        text.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(ix, line)| {
                let origin = format!("{label}:{}", ix + 1);
                let json = serde_json::from_str(line).with_context(|| format!("failed to parse JSON ({origin})"))?;
                Ok((origin, json))
            })
            .collect()
    }

    /// Apply `--json-pointer`, then `--jq-expr`.
    fn preprocess(&self, origin: &str, json: serde_json::Value) -> Result<Vec<serde_json::Value>> {
        let json = match self.json_pointer.as_deref() {
            None => json,
            Some(ptr) => json
                .pointer(ptr)
                .cloned()
                .ok_or_else(|| anyhow!("{origin}: JSON pointer `{ptr}` selects nothing"))?,
        };
        match self.jq_expr.as_deref() {
            None => Ok(vec![json]),
            Some(expr) => crate::jq_exec::run_jaq(expr, &json)
                .with_context(|| format!("failed to apply jq expression ({origin})")),
        }
    }
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Read => Direction::Read,
            DirectionArg::Write => Direction::Write,
            DirectionArg::ReadWrite => Direction::ReadWrite,
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

enum Source {
    Stdin,
    File(PathBuf),
}

fn read_source(source: &Source) -> Result<(String, String)> {
    match source {
        Source::Stdin => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text).context("failed to read stdin")?;
            Ok(("<stdin>".to_owned(), text))
        }
        Source::File(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read source file {}", path.display()))?;
            Ok((path.display().to_string(), text))
        }
    }
}

fn write_output(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<Source>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::new();
    for raw in patterns {
        let pattern = raw.as_ref();
        if pattern == "-" {
            out.push(Source::Stdin);
        } else if has_glob_chars(pattern) {
            let before = out.len();
            for entry in glob::glob(pattern).with_context(|| format!("bad glob pattern: {pattern}"))? {
                out.push(Source::File(entry?));
            }
            if out.len() == before {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(Source::File(PathBuf::from(pattern)));
        }
    }
    Ok(out)
}
