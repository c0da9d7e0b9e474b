//! Risc-O Simulator - CLI Entry Point
//!
//! Commands:
//! - `risco` - Read a program image and its input from stdin and run it
//! - `risco run [program]` - Run an image or ASM file
//! - `risco asm <source>` - Assemble to a program image
//! - `risco disasm <image>` - Disassemble a program image
//!
//! The machine's console is stdout; logs go to stderr.

use clap::{Parser, Subcommand};
use risco::{Breakpoints, Cpu, Exit, ProgramImage, RunConfig, Scanner, StreamConsole};
use std::io::{self, BufRead, BufWriter};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "risco")]
#[command(version)]
#[command(about = "An instruction-set simulator for the 16-bit Risc-O architecture")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Program image or ASM file; the image and its input are read from
        /// stdin when omitted
        program: Option<PathBuf>,
        /// Extra breakpoint address in hex (repeatable)
        #[arg(short, long = "break", value_name = "HEX", value_parser = parse_hex)]
        breakpoints: Vec<u32>,
        /// Stop after this many instructions
        #[arg(short, long)]
        max_cycles: Option<u64>,
        /// Log every executed instruction to stderr
        #[arg(short, long)]
        trace: bool,
        /// Write the final machine state as JSON
        #[arg(long, value_name = "PATH")]
        snapshot: Option<PathBuf>,
    },
    /// Assemble source to a program image
    Asm {
        /// Path to the source file
        source: PathBuf,
        /// Output image file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Disassemble a program image to readable text
    Disasm {
        /// Path to the image file
        image: PathBuf,
    },
}

/// Options shared by every way of starting a run.
struct RunOptions {
    breakpoints: Vec<u32>,
    config: RunConfig,
    snapshot: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run {
            program,
            breakpoints,
            max_cycles,
            trace,
            snapshot,
        }) => {
            init_logging(trace);
            let options = RunOptions {
                breakpoints,
                config: RunConfig { max_cycles },
                snapshot,
            };
            match program {
                Some(path) => run_file(&path, &options),
                None => run_stdin(&options),
            }
        }
        Some(Commands::Asm { source, output }) => {
            init_logging(false);
            assemble_file(&source, output.as_deref());
        }
        Some(Commands::Disasm { image }) => {
            init_logging(false);
            disassemble_file(&image);
        }
        None => {
            init_logging(false);
            run_stdin(&RunOptions {
                breakpoints: Vec::new(),
                config: RunConfig::default(),
                snapshot: None,
            });
        }
    }
}

/// Send logs to stderr, filtered by `RISCO_LOG` (default `warn`).
fn init_logging(trace: bool) {
    let filter = if trace {
        EnvFilter::new("risco=trace")
    } else {
        EnvFilter::try_from_env("RISCO_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn parse_hex(s: &str) -> Result<u32, String> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u32::from_str_radix(digits, 16).map_err(|e| format!("invalid hex address '{}': {}", s, e))
}

/// The whole protocol on stdin: image first, then the program's input.
fn run_stdin(options: &RunOptions) {
    let stdin = io::stdin();
    let mut scanner = Scanner::new(stdin.lock());

    let image = match ProgramImage::read(&mut scanner) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("Failed to read program image: {}", e);
            std::process::exit(1);
        }
    };

    execute(&image, options, scanner);
}

/// A program from disk; the program's input comes from stdin.
fn run_file(path: &Path, options: &RunOptions) {
    let image = if path.extension().is_some_and(|ext| ext == "asm") {
        let words = assemble_source(path);
        tracing::info!(words = words.len(), "assembled {}", path.display());
        ProgramImage::from_words(&words)
    } else {
        match risco::load_image(path) {
            Ok(image) => image,
            Err(e) => {
                eprintln!("Failed to load image {}: {}", path.display(), e);
                std::process::exit(1);
            }
        }
    };

    let stdin = io::stdin();
    execute(&image, options, Scanner::new(stdin.lock()));
}

fn execute<R: BufRead>(image: &ProgramImage, options: &RunOptions, input: Scanner<R>) {
    let mut cpu = Cpu::new();
    image.apply(&mut cpu);

    let mut breakpoints: Breakpoints = image.breakpoint_set();
    breakpoints.extend(options.breakpoints.iter().copied());
    tracing::info!(
        words = image.len(),
        breakpoints = breakpoints.len(),
        "program loaded"
    );

    let stdout = io::stdout();
    let mut console = StreamConsole::new(input, BufWriter::new(stdout.lock()));

    let summary = match cpu.run(&breakpoints, &options.config, &mut console) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("CPU error at PC=0x{:04X}: {}", cpu.regs.pc(), e);
            std::process::exit(1);
        }
    };

    if let Err(e) = console.into_output() {
        eprintln!("Failed to write output: {}", e);
        std::process::exit(1);
    }

    match summary.exit {
        Exit::Halted => tracing::info!(cycles = summary.cycles, "halted"),
        Exit::OutOfBounds(pc) => {
            tracing::info!(cycles = summary.cycles, pc, "stopped at end of memory")
        }
        Exit::CycleLimit => tracing::warn!(
            cycles = summary.cycles,
            "reached max cycles limit; use --max-cycles to increase"
        ),
    }

    if let Some(path) = &options.snapshot {
        if let Err(e) = write_snapshot(path, &cpu) {
            eprintln!("Failed to write snapshot {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

fn write_snapshot(path: &Path, cpu: &Cpu) -> io::Result<()> {
    let file = std::fs::File::create(path)?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, cpu)?;
    io::Write::flush(&mut out)
}

fn assemble_source(path: &Path) -> Vec<risco::Word> {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to read {}: {}", path.display(), e);
            std::process::exit(1);
        }
    };

    match risco::assemble(&source) {
        Ok(words) => words,
        Err(e) => {
            eprintln!("Assembly error: {}", e);
            std::process::exit(1);
        }
    }
}

fn assemble_file(source_path: &Path, output: Option<&Path>) {
    let words = assemble_source(source_path);
    let image = ProgramImage::from_words(&words);

    let result = match output {
        Some(out_path) => {
            tracing::info!(words = words.len(), "saving to {}", out_path.display());
            risco::save_image(out_path, &image)
        }
        None => {
            let stdout = io::stdout();
            image.write(stdout.lock()).map_err(Into::into)
        }
    };

    if let Err(e) = result {
        eprintln!("Failed to write image: {}", e);
        std::process::exit(1);
    }
}

fn disassemble_file(image_path: &Path) {
    let image = match risco::load_image(image_path) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("Failed to load image {}: {}", image_path.display(), e);
            std::process::exit(1);
        }
    };

    for addr in image.breakpoint_set().iter() {
        println!("; break {:04X}", addr);
    }
    print!("{}", risco::disassemble(&image.words));
}
