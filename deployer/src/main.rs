use std::fs::canonicalize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use config::{File, FileFormat, FileSourceFile};
use deployer::commands::{
    chain_codec, code_ids, deploy, load_test, query, register_token, Context, SubCommand,
};
use deployer::report::LoggableError;
use deployer::settings::{self, Settings};
use deployer::Error;
use error_stack::ResultExt;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Network whose chains config is used, e.g. devnet-amplifier
    #[arg(short, long, env = "ENV")]
    pub env: String,

    /// Directory holding the `<env>.json` chains configs
    #[arg(long, env = "CHAINS_DIR", default_value_os_t = PathBuf::from("axelar-chains-config/info"))]
    pub chains_dir: PathBuf,

    /// Set the paths for config file lookup. Can be defined multiple times (configs get merged)
    #[arg(short, long, default_values_os_t = vec![PathBuf::from("~/.amplifier-deployer/config.toml"), PathBuf::from("config.toml")])]
    pub config: Vec<PathBuf>,

    #[arg(long, env = "MNEMONIC", hide_env_values = true)]
    pub mnemonic: Option<String>,

    /// Set the output style of the logs
    #[arg(short, long, value_enum, default_value_t = Output::Text)]
    pub output: Output,

    #[command(subcommand)]
    pub cmd: SubCommand,
}

#[derive(Debug, Clone, ValueEnum)]
enum Output {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args: Args = Args::parse();
    set_up_logger(&args.output);

    let ctx = Context {
        env: args.env,
        chains_dir: args.chains_dir,
        settings: init_settings(&args.config),
        mnemonic: args.mnemonic,
    };

    let result = match args.cmd {
        SubCommand::PrepareChainCodecMigration(args) => chain_codec::run(ctx, args).await,
        SubCommand::Deploy(command) => deploy::run(ctx, command).await,
        SubCommand::SyncCodeIds(args) => code_ids::run(ctx, args).await,
        SubCommand::Query(command) => query::run(ctx, command).await,
        SubCommand::RegisterToken(args) => register_token::run(ctx, args).await,
        SubCommand::LoadTest(command) => load_test::run(ctx, command).await,
    };

    match result {
        Ok(response) => {
            if let Some(resp) = response {
                println!("{resp}");
            }
            ExitCode::SUCCESS
        }
        Err(report) => {
            error!(err = %LoggableError::from(&report), "{report:#}");

            // print detailed error report as the last output if in text mode
            if matches!(args.output, Output::Text) {
                eprintln!("{report:?}");
            }

            ExitCode::FAILURE
        }
    }
}

fn set_up_logger(output: &Output) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match output {
        Output::Json => {
            builder.json().flatten_event(true).init();
        }
        Output::Text => {
            builder.compact().init();
        }
    };
}

fn init_settings(config_paths: &[PathBuf]) -> Settings {
    let files = find_config_files(config_paths);

    settings::load(files)
        .change_context(Error::LoadSettings)
        .inspect_err(|report| error!(err = %LoggableError::from(report), "{report}"))
        .unwrap_or_default()
}

fn find_config_files(config: &[PathBuf]) -> Vec<File<FileSourceFile, FileFormat>> {
    let files = config
        .iter()
        .map(expand_home_dir)
        .map(canonicalize)
        .filter_map(Result::ok)
        .inspect(|path| info!("found config file {}", path.to_string_lossy()))
        .map(File::from)
        .collect::<Vec<_>>();

    if files.is_empty() {
        info!("found no config files to load");
    }

    files
}

fn expand_home_dir(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let Ok(home_subfolder) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };

    dirs::home_dir().map_or(path.to_path_buf(), |home| home.join(home_subfolder))
}
