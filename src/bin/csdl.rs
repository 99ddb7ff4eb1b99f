//! CSDL CLI
//!
//! Command-line interface for reading, linting, and querying OData CSDL JSON
//! documents.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use odata_csdl::{
    is_url, lint, load_document_auto, ChainResolver, CsdlReader, FileResolver, FileStatus, Model,
    PathSegmentToken, SelectExpandBinder, SelectExpandClause, SelectExpandError, Severity,
    DEFAULT_MAX_DEPTH,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "csdl")]
#[command(about = "Read, lint, and query OData CSDL JSON documents")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a CSDL JSON document and print the model
    Read {
        /// Document source: file path or URL (http:// or https://)
        source: String,

        #[command(flatten)]
        references: ReferenceArgs,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Lint CSDL JSON files (syntax, structure, unknown members)
    Lint {
        /// File or directory to lint
        path: PathBuf,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Suppress progress output, only show errors
        #[arg(long, short)]
        quiet: bool,
    },

    /// Bind $expand and $select paths against a structured type
    Select {
        /// Document source: file path or URL (http:// or https://)
        source: String,

        /// Qualified name of the type the paths start from (e.g., Sales.Customer)
        #[arg(long = "type")]
        type_name: String,

        /// $expand path, `/`-separated (repeatable)
        #[arg(long)]
        expand: Vec<String>,

        /// $select path, `/`-separated (repeatable)
        #[arg(long)]
        select: Vec<String>,

        /// Maximum type-cast prefix and nesting depth
        #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: usize,

        #[command(flatten)]
        references: ReferenceArgs,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
}

#[derive(clap::Args)]
struct ReferenceArgs {
    /// Local directory containing referenced documents
    #[arg(long)]
    schema_local_base: Option<PathBuf>,

    /// URL prefix to strip when mapping references to local files
    #[arg(long, requires = "schema_local_base")]
    schema_remote_base: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Read {
            source,
            references,
            output,
            pretty,
        } => run_read(&source, &references, output, pretty),

        Commands::Lint {
            path,
            format,
            strict,
            quiet,
        } => run_lint(&path, &format, strict, quiet),

        Commands::Select {
            source,
            type_name,
            expand,
            select,
            max_depth,
            references,
            pretty,
        } => run_select(SelectArgs {
            source,
            type_name,
            expand,
            select,
            max_depth,
            references,
            pretty,
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

/// Log to stderr; `RUST_LOG` wins when no `-v` is given.
fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Load and read a document, resolving references next to it (or through the
/// URL mapping), over HTTP, then from the bundled vocabularies.
fn read_model(source: &str, references: &ReferenceArgs) -> Result<Model, u8> {
    let document = load_document_auto(source).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let base_dir = if is_url(source) {
        Path::new(".")
    } else {
        Path::new(source).parent().unwrap_or(Path::new("."))
    };
    let mut files = FileResolver::new(base_dir);
    if let (Some(local), Some(remote)) = (
        &references.schema_local_base,
        &references.schema_remote_base,
    ) {
        files = files.url_mapping(local, remote.as_str());
    }

    let resolver = ChainResolver::new().with(files);
    #[cfg(feature = "remote")]
    let resolver = resolver.with(odata_csdl::HttpResolver);

    CsdlReader::new()
        .resolver(resolver)
        .read(&document)
        .map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })
}

fn write_json<T: Serialize>(value: &T, pretty: bool, output: Option<PathBuf>) -> Result<(), u8> {
    let json_output = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}

fn run_read(
    source: &str,
    references: &ReferenceArgs,
    output: Option<PathBuf>,
    pretty: bool,
) -> Result<(), u8> {
    let model = read_model(source, references)?;
    write_json(&model, pretty, output)
}

struct SelectArgs {
    source: String,
    type_name: String,
    expand: Vec<String>,
    select: Vec<String>,
    max_depth: usize,
    references: ReferenceArgs,
    pretty: bool,
}

fn run_select(args: SelectArgs) -> Result<(), u8> {
    let SelectArgs {
        source,
        type_name,
        expand,
        select,
        max_depth,
        references,
        pretty,
    } = args;
    let model = read_model(&source, &references)?;
    let binder = SelectExpandBinder::new(&model).max_depth(max_depth);

    // Without $select every property is selected
    let mut clause = SelectExpandClause::new(select.is_empty());

    let bind = |path: &str,
                is_expand: bool,
                clause: &mut SelectExpandClause|
     -> Result<(), SelectExpandError> {
        let token = PathSegmentToken::from_path(path)?;
        if is_expand {
            binder.expand(&token, &type_name, clause)
        } else {
            binder.select(&token, &type_name, clause)
        }
    };

    let paths = expand
        .iter()
        .map(|p| (p.as_str(), true))
        .chain(select.iter().map(|p| (p.as_str(), false)));
    for (path, is_expand) in paths {
        bind(path, is_expand, &mut clause).map_err(|e| {
            eprintln!("Error in {}: {}", path, e);
            e.exit_code() as u8
        })?;
    }

    write_json(&clause, pretty, None)
}

fn run_lint(path: &Path, format: &str, strict: bool, quiet: bool) -> Result<(), u8> {
    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(2);
    }

    let result = lint(path, strict);

    if format == "json" {
        let json_output = serde_json::to_string_pretty(&result).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        println!("{}", json_output);
    } else {
        if !quiet {
            println!("Linting {} ...\n", path.display());
        }

        for file_result in &result.results {
            let status_icon = match file_result.status {
                FileStatus::Ok => "\x1b[32m✓\x1b[0m",
                FileStatus::Warning => "\x1b[33m⚠\x1b[0m",
                FileStatus::Error => "\x1b[31m✗\x1b[0m",
            };

            if !quiet || file_result.status != FileStatus::Ok {
                println!("  {} {}", status_icon, file_result.file.display());
            }

            for diag in &file_result.diagnostics {
                let (color, label) = match diag.severity {
                    Severity::Error => ("\x1b[31m", "error"),
                    Severity::Warning => ("\x1b[33m", "warning"),
                };
                if !quiet || diag.severity == Severity::Error {
                    println!(
                        "    {}{}[{}]\x1b[0m: {} - {}",
                        color, label, diag.code, diag.path, diag.message
                    );
                }
            }
        }

        println!();
        if result.is_ok() && (!strict || result.warnings == 0) {
            println!(
                "\x1b[32m✓ {} files checked, all passed\x1b[0m",
                result.files_checked
            );
        } else {
            println!(
                "\x1b[31m✗ {} files checked: {} passed, {} failed ({} errors, {} warnings)\x1b[0m",
                result.files_checked, result.passed, result.failed, result.errors, result.warnings
            );
        }
    }

    if result.is_ok() && (!strict || result.warnings == 0) {
        Ok(())
    } else {
        Err(1)
    }
}
