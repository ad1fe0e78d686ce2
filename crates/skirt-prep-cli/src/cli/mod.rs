mod commands;
mod dispatch;
mod helpers;

use clap::Parser;
use skirt_prep_core::common::constants::DEFAULT_RUN_DIR;
use skirt_prep_core::domain::PrepError;
use std::path::PathBuf;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let prep_error = error.as_prep_error();
            eprintln!("{}", prep_error.diagnostic_line());
            if let Some(summary_line) = prep_error.fatal_exit_line() {
                eprintln!("{}", summary_line);
            }
            prep_error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("skirt-prep".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => {
            crate::init_tracing(cli.global.verbose);
            dispatch_parsed(&cli.global, cli.command)
        }
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(
    name = "skirt-prep",
    version,
    about = "Prepare and validate SKIRT inputs from a cosmological snapshot"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct GlobalArgs {
    /// JSON file with run parameters; command-line flags override its values
    #[arg(long, global = true, value_name = "FILE")]
    pub(crate) params: Option<PathBuf>,
    /// Directory holding every artifact of the run
    #[arg(long, global = true, default_value = DEFAULT_RUN_DIR)]
    pub(crate) run_dir: PathBuf,
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, short, global = true)]
    pub(crate) verbose: bool,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Convert snapshot particles into stellar and gas tables plus meta.json
    Ingest(commands::IngestCommand),
    /// Generate view directions on the unit sphere (views.json)
    Views(commands::ViewsCommand),
    /// Derive observer positions from views.json (camera_positions.txt)
    Cameras(commands::CamerasCommand),
    /// Assemble the SKIRT configuration document
    Assemble(commands::AssembleCommand),
    /// Check particle tables against meta.json before the simulator runs
    CheckInputs(commands::ReportArgs),
    /// Check that views, cameras and instruments agree on count and distance
    CheckConsistency(commands::ConsistencyCommand),
    /// Check that the simulator wrote an image for every instrument
    CheckOutputs(commands::OutputsCommand),
    /// Run ingest, views, cameras, assemble and both pre-run checks
    Prepare(commands::PrepareCommand),
}

fn dispatch_parsed(global: &GlobalArgs, command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Ingest(args) => commands::run_ingest_command(global, args),
        CliCommand::Views(args) => commands::run_views_command(global, args),
        CliCommand::Cameras(args) => commands::run_cameras_command(global, args),
        CliCommand::Assemble(args) => commands::run_assemble_command(global, args),
        CliCommand::CheckInputs(args) => commands::run_check_inputs_command(global, args),
        CliCommand::CheckConsistency(args) => {
            commands::run_check_consistency_command(global, args)
        }
        CliCommand::CheckOutputs(args) => commands::run_check_outputs_command(global, args),
        CliCommand::Prepare(args) => commands::run_prepare_command(global, args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Stage(PrepError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<PrepError> for CliError {
    fn from(error: PrepError) -> Self {
        Self::Stage(error)
    }
}

impl CliError {
    fn as_prep_error(&self) -> PrepError {
        match self {
            Self::Usage(message) => PrepError::schema("INPUT.CLI_USAGE", message.clone()),
            Self::Stage(error) => error.clone(),
            Self::Internal(error) => PrepError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
