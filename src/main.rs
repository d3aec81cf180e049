use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use rox::ast_printer::AstPrinter;
use rox::scanner::Scanner;
use rox::session::{read_source, Lox};
use rox::{ConsoleReporter, Stdout};

/// Exit status for lexical, syntax and resolution errors.
const EXIT_STATIC_ERROR: i32 = 65;

/// Exit status for runtime errors.
const EXIT_RUNTIME_ERROR: i32 = 70;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: Option<PathBuf>,

        /// Print one JSON object per token
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file as a single expression and prints its AST
    Parse { filename: Option<PathBuf> },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: Option<PathBuf> },

    /// Runs input from a file as a Lox program; starts a REPL without one
    Run { filename: Option<PathBuf> },

    /// Starts an interactive prompt
    Repl,
}

/// Reads a source file, attaching the path to any failure.
fn read_file(filename: &Path) -> Result<String> {
    read_source(filename).with_context(|| format!("Failed to read file {:?}", filename))
}

fn init_logger() -> Result<()> {
    // Create or open the log file
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // Write to file with module and source line; RUST_LOG overrides the level
    Builder::new()
        .format(|buf, record| {
            let module_path: &str = record.module_path().unwrap_or("<unnamed>");
            let module: &str = module_path.strip_prefix("rox::").unwrap_or(module_path);

            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn no_input() -> ! {
    println!("No input filepath was provided. Exiting...");
    std::process::exit(0);
}

fn tokenize(filename: &Path, json: bool) -> Result<()> {
    info!("Running Tokenize subcommand");

    let source: String = read_file(filename)?;
    let mut tokenized: bool = true;

    for token in Scanner::new(&source) {
        match token {
            Ok(token) => {
                debug!("Scanned token: {}", token);

                if json {
                    println!(
                        "{}",
                        serde_json::to_string(&token).context("Failed to serialize token")?
                    );
                } else {
                    println!("{}", token);
                }
            }

            Err(e) => {
                tokenized = false;
                eprintln!("{}", e);
            }
        }
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code 65");
        std::process::exit(EXIT_STATIC_ERROR);
    }

    info!("Tokenization completed successfully");
    Ok(())
}

fn parse(filename: &Path) -> Result<()> {
    info!("Running Parse subcommand");

    let source: String = read_file(filename)?;
    let mut lox = Lox::new(ConsoleReporter::new(), Stdout);

    match lox.parse_expression(&source) {
        Some(expr) => {
            let ast: String = AstPrinter::print(&expr);
            debug!("AST: {}", ast);
            println!("{}", ast);
        }

        None => std::process::exit(EXIT_STATIC_ERROR),
    }

    Ok(())
}

fn evaluate(filename: &Path) -> Result<()> {
    info!("Running Evaluate subcommand");

    let source: String = read_file(filename)?;
    let mut lox = Lox::new(ConsoleReporter::new(), Stdout);

    match lox.evaluate(&source) {
        Some(value) => println!("{}", value),

        None if lox.had_runtime_error() => std::process::exit(EXIT_RUNTIME_ERROR),

        None => std::process::exit(EXIT_STATIC_ERROR),
    }

    Ok(())
}

fn run_file(filename: &Path) -> Result<()> {
    info!("Running Run subcommand");

    let source: String = read_file(filename)?;
    debug!("Provided input:\n {}", source);

    let mut lox = Lox::new(ConsoleReporter::new(), Stdout);
    lox.run(&source);

    if lox.had_error() {
        std::process::exit(EXIT_STATIC_ERROR);
    }

    if lox.had_runtime_error() {
        std::process::exit(EXIT_RUNTIME_ERROR);
    }

    info!("Program executed successfully");
    Ok(())
}

fn run_prompt() -> Result<()> {
    info!("Starting REPL");

    let mut lox = Lox::new(ConsoleReporter::new(), Stdout);
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut line = String::new();

    loop {
        print!("> ");
        stdout.flush().context("Failed to flush prompt")?;

        line.clear();
        let read: usize = stdin
            .lock()
            .read_line(&mut line)
            .context("Failed to read from stdin")?;

        if read == 0 {
            println!();
            break;
        }

        lox.run(&line);
        lox.reset();
    }

    info!("REPL finished");
    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        Builder::new().filter_level(log::LevelFilter::Off).init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename, json } => match filename {
            Some(filename) => tokenize(&filename, json),
            None => no_input(),
        },

        Commands::Parse { filename } => match filename {
            Some(filename) => parse(&filename),
            None => no_input(),
        },

        Commands::Evaluate { filename } => match filename {
            Some(filename) => evaluate(&filename),
            None => no_input(),
        },

        Commands::Run { filename } => match filename {
            Some(filename) => run_file(&filename),
            None => run_prompt(),
        },

        Commands::Repl => run_prompt(),
    }
}
