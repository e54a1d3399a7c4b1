//! C6T IR Backend Driver
//!
//! Command-line entry point: translates an IR file to 8080 assembly, or
//! prints the template catalog in use.

use c6t_backend::{compile, ArenaLimits, BackendOptions};
use c6t_codegen::TemplateCatalog;
use c6t_common::{CompileResult, SourceLocation};
use clap::{Parser, Subcommand};
use log::info;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "c6tir")]
#[command(about = "C6T IR to Intel 8080 assembly backend")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate an IR file to assembly
    Compile {
        /// Input IR file (stdin when omitted)
        input: Option<PathBuf>,

        /// Output assembly file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Template catalog to use instead of the built-in 8080 one
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Node pool size per statement
        #[arg(long)]
        max_nodes: Option<usize>,

        /// Node stack depth
        #[arg(long)]
        max_stack: Option<usize>,

        /// Log each statement and placement decision
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the effective template catalog as JSON
    DumpCatalog {
        /// Template catalog file (built-in 8080 catalog when omitted)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let verbose = matches!(cli.command, Commands::Compile { verbose: true, .. });
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let result = match cli.command {
        Commands::Compile {
            input,
            output,
            catalog,
            max_nodes,
            max_stack,
            verbose: _,
        } => {
            let limits = arena_limits(max_nodes, max_stack);
            compile_command(input.as_deref(), output.as_deref(), catalog.as_deref(), limits)
        }
        Commands::DumpCatalog { catalog, output } => {
            dump_catalog_command(catalog.as_deref(), output.as_deref())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn arena_limits(max_nodes: Option<usize>, max_stack: Option<usize>) -> ArenaLimits {
    let defaults = ArenaLimits::default();
    ArenaLimits {
        nodes: max_nodes.unwrap_or(defaults.nodes),
        node_stack: max_stack.unwrap_or(defaults.node_stack),
        ..defaults
    }
}

fn load_catalog(path: Option<&Path>) -> CompileResult<TemplateCatalog> {
    let catalog = match path {
        Some(path) => TemplateCatalog::from_json(&fs::read_to_string(path)?)?,
        None => TemplateCatalog::i8080()?,
    };
    Ok(catalog)
}

/// Read the whole input, returning it with the name to use in diagnostics
fn read_input(path: Option<&Path>) -> CompileResult<(String, String)> {
    match path {
        Some(path) => Ok((fs::read_to_string(path)?, path.display().to_string())),
        None => {
            let mut source = String::new();
            io::stdin().read_to_string(&mut source)?;
            Ok((source, SourceLocation::stdin().filename))
        }
    }
}

fn write_output(path: Option<&Path>, text: &str) -> CompileResult<()> {
    match path {
        Some(path) => fs::write(path, text)?,
        None => io::stdout().write_all(text.as_bytes())?,
    }
    Ok(())
}

fn compile_command(
    input: Option<&Path>,
    output: Option<&Path>,
    catalog: Option<&Path>,
    limits: ArenaLimits,
) -> CompileResult<()> {
    let (source, filename) = read_input(input)?;
    let options = BackendOptions::new(load_catalog(catalog)?)
        .with_limits(limits)
        .with_filename(filename);

    // Nothing is written unless the whole input translates
    let asm = compile(&source, options)?;
    write_output(output, &asm)?;
    if let Some(path) = output {
        info!("assembly written to {}", path.display());
    }
    Ok(())
}

fn dump_catalog_command(catalog: Option<&Path>, output: Option<&Path>) -> CompileResult<()> {
    let catalog = load_catalog(catalog)?;
    let mut json = catalog.to_json()?;
    json.push('\n');
    write_output(output, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_compile_arguments() {
        let cli = Cli::try_parse_from([
            "c6tir",
            "compile",
            "prog.ir",
            "-o",
            "prog.s",
            "--max-nodes",
            "128",
            "-v",
        ])
        .unwrap();
        match cli.command {
            Commands::Compile {
                input,
                output,
                catalog,
                max_nodes,
                max_stack,
                verbose,
            } => {
                assert_eq!(input, Some(PathBuf::from("prog.ir")));
                assert_eq!(output, Some(PathBuf::from("prog.s")));
                assert_eq!(catalog, None);
                assert_eq!(max_nodes, Some(128));
                assert_eq!(max_stack, None);
                assert!(verbose);
            }
            Commands::DumpCatalog { .. } => panic!("parsed the wrong subcommand"),
        }
    }

    #[test]
    fn test_stdin_when_no_input() {
        let cli = Cli::try_parse_from(["c6tir", "compile"]).unwrap();
        assert!(matches!(cli.command, Commands::Compile { input: None, .. }));
    }

    #[test]
    fn test_limits_override_defaults() {
        let limits = arena_limits(Some(10), None);
        assert_eq!(limits.nodes, 10);
        assert_eq!(limits.node_stack, ArenaLimits::default().node_stack);
        assert_eq!(limits.arg_words, ArenaLimits::default().arg_words);
    }

    #[test]
    fn test_builtin_catalog_round_trips() {
        let catalog = load_catalog(None).unwrap();
        let json = catalog.to_json().unwrap();
        assert_eq!(TemplateCatalog::from_json(&json).unwrap(), catalog);
    }

    #[test]
    fn test_missing_catalog_file() {
        let err = load_catalog(Some(Path::new("/nonexistent/catalog.json"))).unwrap_err();
        assert!(err.to_string().starts_with("IO error"));
    }

    #[test]
    fn test_compile_to_file() {
        let dir = std::env::temp_dir().join(format!("c6tir-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let input = dir.join("in.ir");
        let output = dir.join("out.s");
        fs::write(&input, "CON _x\nCON 5\nASSIGN\nEVAL\n").unwrap();

        compile_command(Some(&input), Some(&output), None, ArenaLimits::default()).unwrap();
        assert_eq!(fs::read_to_string(&output).unwrap(), "lxi h,5\nshld _x\n");

        // A failing run leaves no output behind
        let failed = dir.join("failed.s");
        fs::write(&input, "CON 1\n").unwrap();
        let err = compile_command(Some(&input), Some(&failed), None, ArenaLimits::default()).unwrap_err();
        assert!(err.to_string().ends_with("1 node(s) left on the node stack"));
        assert!(!failed.exists());

        fs::remove_dir_all(&dir).unwrap();
    }
}
