use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use error_set::error_set;
use hunkmark::{DiffDocument, format_document};

error_set! {
    /// Errors from the command line front end
    CliError := {
        #[display("Failed to read {path}: {message}")]
        ReadInput { path: String, message: String },
        #[display("Failed to write output: {message}")]
        WriteOutput { message: String },
        #[display("Failed to serialize document: {message}")]
        Serialize { message: String },
    }
}

#[derive(Parser)]
#[command(name = "hunkmark", version)]
#[command(about = "Parse unified diffs and mark changed text inside modified lines")]
struct Cli {
    /// Level of diagnostics written to stderr
    #[arg(long, value_enum, global = true, default_value = "warn")]
    log_level: LogLevelArg,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a unified diff with inline highlights
    Render {
        /// Diff to read ("-" or omitted for stdin)
        file: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: Format,

        /// Print nothing instead of the raw input when no file section is found
        #[arg(long)]
        no_fallback: bool,
    },
    /// Report lines the parser had to skip; exits with 1 if there are any
    Check {
        /// Diff to read ("-" or omitted for stdin)
        file: Option<PathBuf>,
    },
    /// Print shell completions
    Completions {
        shell: clap_complete::Shell,
    },
    /// Print a man page
    Man,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevelArg {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevelArg {
    fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevelArg::Off => log::LevelFilter::Off,
            LogLevelArg::Error => log::LevelFilter::Error,
            LogLevelArg::Warn => log::LevelFilter::Warn,
            LogLevelArg::Info => log::LevelFilter::Info,
            LogLevelArg::Debug => log::LevelFilter::Debug,
            LogLevelArg::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Writes log records to stderr so they never mix with rendered output
struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:<5}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(level: LogLevelArg) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level.to_level_filter());
    }
}

fn read_input(file: Option<&PathBuf>) -> Result<String, CliError> {
    match file {
        Some(path) if path.as_os_str() != "-" => {
            std::fs::read_to_string(path).map_err(|e| CliError::ReadInput {
                path: path.display().to_string(),
                message: e.to_string(),
            })
        }
        _ => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .map_err(|e| CliError::ReadInput {
                    path: "stdin".to_string(),
                    message: e.to_string(),
                })?;
            Ok(text)
        }
    }
}

fn write_output(text: &str) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{text}").map_err(|e| CliError::WriteOutput {
        message: e.to_string(),
    })
}

fn render(text: &str, format: Format, fallback: bool) -> Result<(), CliError> {
    let parsed = DiffDocument::parse(text);

    if parsed.document.is_empty() {
        log::info!("no file sections found");
        if fallback {
            let mut stdout = io::stdout().lock();
            return stdout
                .write_all(text.as_bytes())
                .map_err(|e| CliError::WriteOutput {
                    message: e.to_string(),
                });
        }
        return Ok(());
    }

    let output = match format {
        Format::Text => format_document(&parsed.document),
        Format::Json => serde_json::to_string_pretty(&parsed.document).map_err(|e| {
            CliError::Serialize {
                message: e.to_string(),
            }
        })?,
    };
    write_output(&output)
}

fn check(text: &str) -> Result<ExitCode, CliError> {
    let parsed = DiffDocument::parse(text);
    for diagnostic in &parsed.diagnostics {
        write_output(&format!("line {}: {}", diagnostic.line, diagnostic.error))?;
    }

    if parsed.diagnostics.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    match cli.command {
        Commands::Render {
            file,
            format,
            no_fallback,
        } => render(&read_input(file.as_ref())?, format, !no_fallback)?,
        Commands::Check { file } => return Ok(check(&read_input(file.as_ref())?)?),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "hunkmark", &mut io::stdout());
        }
        Commands::Man => {
            clap_mangen::Man::new(Cli::command()).render(&mut io::stdout())?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
