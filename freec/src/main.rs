use clap::{Parser, Subcommand, ValueEnum};
use freec_core::ast::Module;
use freec_core::convert::ConvertOptions;
use freec_core::dependency::{DependencyComponent, DependencyNode};
use freec_core::diags::{format_sentences, Namespace};
use freec_core::env::Environment;
use freec_core::{Compiler, CompilerError};
use log::info;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Output format of the converted sentences
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum Format {
    /// Source-like text (default)
    #[default]
    Text,
    /// JSON
    Json,
}

/// Identifier namespace for text output
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum Names {
    /// Fresh names as `f@0`
    #[default]
    Source,
    /// Fresh names as `f_0`
    Target,
}

impl From<Names> for Namespace {
    fn from(names: Names) -> Self {
        match names {
            Names::Source => Namespace::Source,
            Names::Target => Namespace::Target,
        }
    }
}

/// Times the execution of a closure and prints the elapsed time if verbose.
fn time<T, F: FnOnce() -> T>(name: &str, verbose: bool, f: F) -> T {
    let start = Instant::now();
    let result = f();
    if verbose {
        let elapsed = start.elapsed().as_millis();
        eprintln!("{}: {}ms", name, elapsed);
    }
    result
}

#[derive(Parser)]
#[command(name = "freec")]
#[command(about = "Orders declarations and makes recursive functions structurally recursive", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a module (JSON) into dependency-ordered sentences
    Convert {
        /// Input module file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: Format,

        /// Identifier namespace for text output
        #[arg(long, default_value = "source")]
        names: Names,

        /// Continue after a component failed and report all errors
        #[arg(long)]
        keep_going: bool,

        /// Print verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the dependency components of a module
    Deps {
        /// Input module file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
}

#[derive(Debug, Error)]
enum DriverError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Compilation error: {0}")]
    CompilationError(#[from] CompilerError),

    #[error("{} component(s) failed to convert", .0.len())]
    ComponentErrors(Vec<CompilerError>),
}

/// Log level used when `RUST_LOG` is not set.
fn default_log_filter(verbose: bool) -> &'static str {
    if verbose {
        "info"
    } else {
        "warn"
    }
}

fn main() -> Result<(), DriverError> {
    let cli = Cli::parse();
    let verbose = matches!(cli.command, Commands::Convert { verbose: true, .. });
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_log_filter(verbose))).init();

    match cli.command {
        Commands::Convert {
            input,
            output,
            format,
            names,
            keep_going,
            verbose,
        } => {
            convert_file(&input, output.as_deref(), format, names, keep_going, verbose)?;
        }
        Commands::Deps { input } => {
            print_dependencies(&input)?;
        }
    }

    Ok(())
}

fn read_module(input: &Path) -> Result<Module, DriverError> {
    let source = fs::read_to_string(input)?;
    Ok(serde_json::from_str(&source)?)
}

fn convert_file(
    input: &Path,
    output: Option<&Path>,
    format: Format,
    names: Names,
    keep_going: bool,
    verbose: bool,
) -> Result<(), DriverError> {
    if verbose {
        info!("Converting {}...", input.display());
    }

    let module = time("load", verbose, || read_module(input))?;
    let mut env = Environment::new();
    let options = ConvertOptions { keep_going };

    let ordered = time("order", verbose, || Compiler::load(module).order());
    let registered = ordered.register(&mut env)?;
    let analyzed = time("partiality", verbose, || registered.analyze_partiality(&mut env));
    let conversion = time("convert", verbose, || analyzed.convert(&mut env, &options))?;

    let rendered = match format {
        Format::Text => format_sentences(&conversion.sentences, names.into()),
        Format::Json => serde_json::to_string_pretty(&conversion.sentences)? + "\n",
    };
    match output {
        Some(path) => {
            fs::write(path, rendered)?;
            if verbose {
                info!("Wrote {}", path.display());
            }
        }
        None => {
            std::io::stdout().write_all(rendered.as_bytes())?;
        }
    }

    if conversion.errors.is_empty() {
        return Ok(());
    }
    for err in &conversion.errors {
        eprintln!("error: {}", err);
    }
    Err(DriverError::ComponentErrors(conversion.errors))
}

fn print_dependencies(input: &Path) -> Result<(), DriverError> {
    let ordered = Compiler::load(read_module(input)?).order();
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "types:")?;
    for component in &ordered.type_components {
        writeln!(stdout, "  {}", describe(component))?;
    }
    writeln!(stdout, "functions:")?;
    for component in &ordered.func_components {
        writeln!(stdout, "  {}", describe(component))?;
    }
    Ok(())
}

fn describe<D: DependencyNode>(component: &DependencyComponent<D>) -> String {
    let kind = if component.is_recursive() { "recursive" } else { "non-recursive" };
    format!("{} [{}]", kind, component.keys().join(", "))
}
