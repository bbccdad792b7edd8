//! Compiler CLI
//!
//! Command-line interface for compiling source files to x86-64
//! assembly, interpreting them directly, or dumping their IR.

use clap::{CommandFactory, Parser as ClapParser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use std::process;

#[derive(ClapParser)]
#[command(name = "exprc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compile or interpret a small expression-oriented language", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a source file to x86-64 assembly
    Build {
        /// Input source file
        input: PathBuf,

        /// Output assembly path (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Interpret a source file with the reference tree-walking interpreter
    Run {
        /// Input source file
        input: PathBuf,
    },

    /// Type-check a source file and print its IR
    Ir {
        /// Input source file
        input: PathBuf,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output } => run_build(&input, output.as_deref()),
        Commands::Run { input } => run_interpret(&input),
        Commands::Ir { input } => run_ir(&input),
        Commands::Completions { shell } => run_completions(shell),
    }
}

fn run_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "exprc", &mut io::stdout());
}

fn read_source(input: &std::path::Path) -> String {
    match std::fs::read_to_string(input) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error reading {}: {}", input.display(), e);
            process::exit(1);
        }
    }
}

fn file_label(input: &std::path::Path) -> String {
    input.display().to_string()
}

fn run_build(input: &std::path::Path, output: Option<&std::path::Path>) {
    let source = read_source(input);
    match exprc::compile(&source, &file_label(input)) {
        Ok(assembly) => match output {
            Some(path) if path != std::path::Path::new("-") => {
                if let Err(e) = std::fs::write(path, assembly) {
                    eprintln!("Error writing {}: {}", path.display(), e);
                    process::exit(1);
                }
            }
            _ => print!("{assembly}"),
        },
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

fn run_interpret(input: &std::path::Path) {
    let source = read_source(input);
    let stdin = io::stdin();
    match exprc::interpret(&source, &file_label(input), stdin.lock()) {
        Ok(output) => print!("{output}"),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

fn run_ir(input: &std::path::Path) {
    let source = read_source(input);
    match exprc::emit_ir(&source, &file_label(input)) {
        Ok(ir) => print!("{ir}"),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
