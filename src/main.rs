//! inidoc: generate documentation from annotated `.ini` test configuration
//! and test module docstrings.
//!
//! - `inidoc items config_defaults/` lists every documented option
//! - `inidoc subtests --format html --summary` renders every subtest
//! - `inidoc check` verifies docstrings and option documentation

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use inidoc::check;
use inidoc::docs::{DefaultDoc, DocLayout, SubtestDoc, SubtestDocs, TestKind};
use inidoc::render::OutputFormat;
use inidoc::value;
use inidoc::{render, ConfigDocParser, DocItem};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(
    name = "inidoc",
    about = "Generate documentation from annotated .ini files and test docstrings"
)]
struct Cli {
    /// More logging on stderr (-v debug, -vv trace). INIDOC_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the documented options of .ini files
    Items {
        /// Input files (glob patterns and directories supported)
        #[arg(required = true)]
        files: Vec<String>,

        /// Output format: text (default), json
        #[arg(short = 'f', long, default_value = "text")]
        format: String,
    },
    /// Render the shared defaults.ini
    Defaults {
        #[command(flatten)]
        doc: DocArgs,
    },
    /// Render one test module
    Subtest {
        /// Test name, e.g. docker_cli/run
        name: String,

        /// Test kind: subtest (default), pretest, intratest, posttest
        #[arg(short, long, default_value = "subtest")]
        kind: TestKind,

        #[command(flatten)]
        doc: DocArgs,
    },
    /// Render every test module of one kind
    Subtests {
        /// Test kind: subtest (default), pretest, intratest, posttest
        #[arg(short, long, default_value = "subtest")]
        kind: TestKind,

        /// Test names to leave out; replaces the built-in example list
        #[arg(long)]
        exclude: Vec<String>,

        /// Omit the table of contents
        #[arg(long)]
        no_contents: bool,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        doc: DocArgs,
    },
    /// Check docstring sections and option documentation of every test
    Check {
        /// Base directory of the test tree
        #[arg(short, long, default_value = ".")]
        base: PathBuf,

        /// Rendered documentation to compare the tree against
        #[arg(long)]
        against: Option<PathBuf>,
    },
    /// Print one interpolated value from a stack of .ini files
    Value {
        section: String,
        key: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Args)]
struct DocArgs {
    /// Base directory of the test tree
    #[arg(short, long, default_value = ".")]
    base: PathBuf,

    /// Output format: rst (default), html, text
    #[arg(short = 'f', long, default_value = "rst")]
    format: String,

    /// Drop detail sections, keeping only the summary
    #[arg(long)]
    summary: bool,
}

impl DocArgs {
    fn layout(&self) -> Result<DocLayout> {
        DocLayout::new(&self.base)
            .with_context(|| format!("invalid base directory: {}", self.base.display()))
    }

    fn output_format(&self) -> Result<OutputFormat> {
        parse_format(&self.format)
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Items { files, format } => items(&files, &format),
        Command::Defaults { doc } => defaults(&doc),
        Command::Subtest { name, kind, doc } => subtest(&name, kind, &doc),
        Command::Subtests {
            kind,
            exclude,
            no_contents,
            output,
            doc,
        } => subtests(kind, &exclude, no_contents, output.as_deref(), &doc),
        Command::Check { base, against } => run_check(&base, against.as_deref()),
        Command::Value {
            section,
            key,
            files,
        } => {
            let found = value::lookup(&section, &key, &files)
                .with_context(|| format!("failed to look up [{section}] {key}"))?;
            println!("{found}");
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Log to stderr; `INIDOC_LOG` takes env-filter directives.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("INIDOC_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn parse_format(name: &str) -> Result<OutputFormat> {
    OutputFormat::from_name(name)
        .with_context(|| format!("unknown format: {}. Use rst, html, or text", name))
}

fn items(patterns: &[String], format: &str) -> Result<ExitCode> {
    let files = ini_inputs(patterns)?;
    let mut items: Vec<DocItem> = Vec::new();
    for path in &files {
        let parser = ConfigDocParser::from_path(path)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        items.extend(parser.items().iter().cloned());
    }

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&items)?),
        "text" => {
            for item in &items {
                println!("[{}] {} = {}", item.subthing(), item.option(), item.value());
                for line in item.desc().lines() {
                    println!("    {line}");
                }
            }
        }
        other => anyhow::bail!("unknown format: {}. Use text or json", other),
    }
    Ok(ExitCode::SUCCESS)
}

fn load_defaults(layout: &DocLayout) -> Result<DefaultDoc> {
    DefaultDoc::load(layout).with_context(|| {
        format!(
            "failed to load defaults from {}",
            layout.defaults_ini().display()
        )
    })
}

fn defaults(args: &DocArgs) -> Result<ExitCode> {
    let layout = args.layout()?;
    let format = args.output_format()?;
    let defaults = load_defaults(&layout)?;
    let composer = defaults.composer(format.conversion(args.summary))?;
    println!("{}", render(&composer)?);
    Ok(ExitCode::SUCCESS)
}

fn subtest(name: &str, kind: TestKind, args: &DocArgs) -> Result<ExitCode> {
    let layout = args.layout()?;
    let format = args.output_format()?;
    let defaults = load_defaults(&layout)?;
    let doc = SubtestDoc::new_by_name(kind, name, &layout)?;
    println!("{}", doc.render(&defaults, format.conversion(args.summary))?);
    Ok(ExitCode::SUCCESS)
}

fn subtests(
    kind: TestKind,
    exclude: &[String],
    no_contents: bool,
    output: Option<&Path>,
    args: &DocArgs,
) -> Result<ExitCode> {
    let layout = args.layout()?;
    let format = args.output_format()?;
    let defaults = load_defaults(&layout)?;
    let mut docs = SubtestDocs::new(kind, &layout).contents(!no_contents);
    if !exclude.is_empty() {
        docs = docs.exclude(exclude.iter().cloned());
    }
    let rendered = docs.render(&defaults, format.conversion(args.summary))?;

    match output {
        Some(path) => {
            fs::write(path, format!("{rendered}\n"))
                .with_context(|| format!("failed to write {}", path.display()))?;
            debug!(path = %path.display(), "wrote documentation");
        }
        None => println!("{rendered}"),
    }
    Ok(ExitCode::SUCCESS)
}

fn run_check(base: &Path, against: Option<&Path>) -> Result<ExitCode> {
    let layout = DocLayout::new(base)
        .with_context(|| format!("invalid base directory: {}", base.display()))?;
    let defaults = load_defaults(&layout)?;
    let rendered = against
        .map(|path| {
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
        })
        .transpose()?;

    let findings = check::check_tree(&layout, &defaults, rendered.as_deref())?;
    for (name, finding) in &findings {
        println!("{name}: {finding}");
    }
    if findings.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Every `.ini` file named by `patterns`, sorted and deduplicated.
///
/// A pattern may be a file (taken as is), a directory (walked recursively
/// for `.ini` files) or a glob.
fn ini_inputs(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = BTreeSet::new();
    for pattern in patterns {
        let path = Path::new(pattern);
        let found = if path.is_file() {
            vec![path.to_path_buf()]
        } else if path.is_dir() {
            ini_files_under(path)?
        } else {
            glob::glob(pattern)
                .with_context(|| format!("invalid glob pattern: {}", pattern))?
                .filter_map(|r| r.ok())
                .filter(|p| p.is_file())
                .collect()
        };
        if found.is_empty() {
            warn!(pattern = %pattern, "no .ini files matched");
        }
        files.extend(found);
    }
    Ok(files.into_iter().collect())
}

fn ini_files_under(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.with_context(|| format!("failed to read directory: {}", dir.display()))?;
        let is_ini = entry.path().extension().is_some_and(|ext| ext == "ini");
        if entry.file_type().is_file() && is_ini {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
