//! Schema Dereferencer CLI
//!
//! Command-line interface for expanding JSON-Schema `$ref` pointers in
//! RAML-style documents and standalone schema files.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use schema_deref::{
    expand_json_schemas, expand_schema, load_document, load_document_str, DerefError,
    StorageConfig,
};

#[derive(Parser)]
#[command(name = "schema-deref")]
#[command(about = "Expand JSON-Schema $ref pointers in API documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand every JSON-Schema in a RAML-style JSON document
    Expand {
        /// Document file, or "-" for stdin
        document: String,

        #[command(flatten)]
        storage: StorageArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Expand a single JSON-Schema file
    Schema {
        /// Schema file; its directory is searched first for relative refs
        schema: PathBuf,

        #[command(flatten)]
        storage: StorageArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args)]
struct StorageArgs {
    /// Local schema root, searched before SCHEMA_LOCAL_PATHS (repeatable)
    #[arg(long = "local-path", value_name = "DIR")]
    local_paths: Vec<PathBuf>,

    /// Never fetch schemas over HTTP
    #[arg(long)]
    no_remote: bool,

    /// HTTP fetch timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    timeout: u64,
}

#[derive(Args)]
struct OutputArgs {
    /// Output file (stdout if not specified)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    /// Report errors as JSON on stdout (for automation)
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct ErrorReport<'a> {
    error: String,
    kind: &'a str,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Expand {
            document,
            storage,
            output,
        } => run_expand(&document, &storage, &output),
        Commands::Schema {
            schema,
            storage,
            output,
        } => run_schema(&schema, &storage, &output),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn storage_config(args: &StorageArgs) -> StorageConfig {
    let mut config = StorageConfig::from_env()
        .remote(!args.no_remote)
        .http_timeout(Duration::from_secs(args.timeout));
    for root in args.local_paths.iter().rev() {
        config = config.prepend_local_root(root.clone());
    }
    config
}

fn run_expand(source: &str, storage: &StorageArgs, output: &OutputArgs) -> Result<(), u8> {
    let doc = read_document(source).map_err(|e| fail(output.json, &e))?;
    let storages = storage_config(storage)
        .build()
        .map_err(|e| fail(output.json, &e))?;

    info!(source, "expanding document");
    let expanded = expand_json_schemas(doc, &storages).map_err(|e| fail(output.json, &e))?;

    let text = if output.pretty {
        serde_json::to_string_pretty(&expanded)
    } else {
        serde_json::to_string(&expanded)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;
    write_output(output, &text)
}

fn run_schema(path: &Path, storage: &StorageArgs, output: &OutputArgs) -> Result<(), u8> {
    let text = std::fs::read_to_string(path).map_err(|source| {
        let err = if source.kind() == std::io::ErrorKind::NotFound {
            DerefError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            DerefError::ReadError {
                path: path.to_path_buf(),
                source,
            }
        };
        fail(output.json, &err)
    })?;

    let schema_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let storages = storage_config(storage)
        .prepend_local_root(schema_dir)
        .build()
        .map_err(|e| fail(output.json, &e))?;

    info!(schema = %path.display(), "expanding schema");
    let expanded = expand_schema(&text, &storages).map_err(|e| fail(output.json, &e))?;

    let text = if output.pretty {
        // Unexpanded text passes through verbatim; only reformat real JSON.
        match serde_json::from_str::<Value>(&expanded) {
            Ok(value) => serde_json::to_string_pretty(&value).unwrap_or(expanded),
            Err(_) => expanded,
        }
    } else {
        expanded
    };
    write_output(output, &text)
}

fn read_document(source: &str) -> Result<Value, DerefError> {
    if source == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .map_err(|source| DerefError::ReadError {
                path: PathBuf::from("<stdin>"),
                source,
            })?;
        debug!(bytes = content.len(), "read document from stdin");
        load_document_str(&content)
    } else {
        load_document(Path::new(source))
    }
}

fn write_output(output: &OutputArgs, text: &str) -> Result<(), u8> {
    match &output.output {
        Some(path) => {
            std::fs::write(path, text).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", text);
        }
    }
    Ok(())
}

/// Report an error in plain text or JSON and return its exit code.
fn fail(json_output: bool, err: &DerefError) -> u8 {
    if json_output {
        let report = ErrorReport {
            error: err.to_string(),
            kind: err.kind(),
        };
        match serde_json::to_string(&report) {
            Ok(line) => println!("{}", line),
            Err(_) => eprintln!("Error: {}", err),
        }
    } else {
        eprintln!("Error: {}", err);
    }
    err.exit_code() as u8
}
