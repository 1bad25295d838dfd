use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use rayon::prelude::*;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use yabfi::{Error, Input, Program, ReadInput, Vm, VmConfig, VmState, WriteOutput};

/// Exit status used when the watchdog stops a run.
const TIMEOUT_EXIT: i32 = 124;

#[derive(Parser)]
#[command(name = "yabfi", about = "Yet another Brainfuck interpreter")]
struct Cli {
    /// Program files to run. Several files run in parallel with empty input.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Value stored into the current cell when input is exhausted.
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    eof: i32,

    /// Treat the files as JSON instruction streams instead of source text.
    #[arg(long)]
    instructions: bool,

    /// Print the compiled instruction stream as JSON instead of running it.
    #[arg(long)]
    emit: bool,

    /// Print the final VM state of each run as JSON on stderr.
    #[arg(long)]
    state: bool,

    /// Kill the process if the programs have not finished after this many
    /// milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Initial tape length in cells.
    #[arg(long, default_value_t = yabfi::tape::INITIAL_TAPE_LEN)]
    tape_len: usize,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "yabfi=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    if let Some(ms) = cli.timeout_ms {
        spawn_watchdog(Duration::from_millis(ms));
    }

    let config = VmConfig {
        eof: cli.eof,
        initial_tape_len: cli.tape_len,
        ..Default::default()
    };

    let result = if cli.emit {
        emit(&cli)
    } else if cli.files.len() == 1 {
        run_interactive(&cli, &cli.files[0], config)
    } else {
        run_batch(&cli, config)
    };

    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

/// `execute` cannot be interrupted, so a bounded run ends the whole process.
fn spawn_watchdog(limit: Duration) {
    std::thread::spawn(move || {
        std::thread::sleep(limit);
        error!("timed out after {limit:?}");
        std::process::exit(TIMEOUT_EXIT);
    });
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{path}: {source}")]
    Read { path: String, source: io::Error },

    #[error("{path}: {source}")]
    Program { path: String, source: Error },

    #[error("{path}: cannot write output: {source}")]
    Write { path: String, source: io::Error },

    #[error("{failed} of {total} programs failed")]
    Batch { failed: usize, total: usize },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn load_program(cli: &Cli, path: &Path) -> Result<Program, CliError> {
    let name = path.display().to_string();
    let bytes = std::fs::read(path).map_err(|source| CliError::Read {
        path: name.clone(),
        source,
    })?;
    let program = if cli.instructions {
        let text = String::from_utf8_lossy(&bytes);
        Program::from_json(&text).map_err(Error::from)
    } else {
        yabfi::compile(&bytes).map_err(Error::from)
    };
    let program = program.map_err(|source| CliError::Program {
        path: name.clone(),
        source,
    })?;
    info!(path = %name, instructions = program.len(), "loaded program");
    Ok(program)
}

fn emit(cli: &Cli) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    for path in &cli.files {
        let program = load_program(cli, path)?;
        writeln!(stdout, "{}", program.to_json()?)?;
    }
    Ok(())
}

fn report_state(path: &Path, state: &VmState) {
    match serde_json::to_string(state) {
        Ok(json) => eprintln!("{}: {json}", path.display()),
        Err(e) => error!("cannot encode state: {e}"),
    }
}

/// One program wired to stdin and stdout.
fn run_interactive(cli: &Cli, path: &Path, config: VmConfig) -> Result<(), CliError> {
    let program = load_program(cli, path)?;
    let input = ReadInput::new(io::stdin().lock());
    run_single(path, program, input, io::stdout().lock(), config, cli.state)
}

/// Run one program and flush its output.
///
/// A VM fault wins over a failed flush; the flush error is still logged. The
/// state report is printed either way.
fn run_single<I: Input, W: Write>(
    path: &Path,
    program: Program,
    input: I,
    output: W,
    config: VmConfig,
    show_state: bool,
) -> Result<(), CliError> {
    let mut vm = Vm::with_config(input, WriteOutput::new(output), config);
    vm.load(program);
    let result = vm.execute();
    let flushed = vm.output_mut().flush();

    if show_state {
        report_state(path, &vm.state());
    }

    let name = path.display().to_string();
    match (result, flushed) {
        (Err(fault), flushed) => {
            if let Err(e) = flushed {
                error!("{name}: cannot write output: {e}");
            }
            Err(CliError::Program {
                path: name,
                source: fault.into(),
            })
        }
        (Ok(()), Err(source)) => Err(CliError::Write { path: name, source }),
        (Ok(()), Ok(())) => Ok(()),
    }
}

/// Several programs, each on its own VM, run in parallel. Outputs are
/// printed in argument order once every run has finished.
fn run_batch(cli: &Cli, config: VmConfig) -> Result<(), CliError> {
    let programs = cli
        .files
        .iter()
        .map(|path| load_program(cli, path))
        .collect::<Result<Vec<_>, _>>()?;

    let runs: Vec<(Vec<u8>, VmState, Result<(), yabfi::VmError>)> = programs
        .into_par_iter()
        .map(|program| {
            let mut vm = Vm::with_config(&b""[..], Vec::new(), config.clone());
            vm.load(program);
            let result = vm.execute();
            let state = vm.state();
            (vm.into_parts().1, state, result)
        })
        .collect();

    let mut stdout = io::stdout().lock();
    let mut failed = 0;
    for (path, (output, state, result)) in cli.files.iter().zip(runs) {
        stdout.write_all(&output)?;
        if cli.state {
            report_state(path, &state);
        }
        if let Err(e) = result {
            let e = CliError::Program {
                path: path.display().to_string(),
                source: e.into(),
            };
            error!("{e}");
            failed += 1;
        }
    }
    stdout.flush()?;

    if failed > 0 {
        return Err(CliError::Batch {
            failed,
            total: cli.files.len(),
        });
    }
    Ok(())
}
