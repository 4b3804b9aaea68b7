use pioneer_core::actions::{self, ActionResponse};
use pioneer_core::config::PioneerConfig;
use pioneer_core::explorer::{ExplorationContext, TransitionExplorer};
use pioneer_core::progress::{NoDeadline, WriterProgress};
use pioneer_core::stop::StopCondition;
use pioneer_core::store::DirStateStore;
use pioneer_core::transactor::CommandTransactor;

use clap::{Args, Parser, Subcommand};
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(short, long, value_parser)]
    config_file: Option<PathBuf>,
    /// Overrides `[store] states-dir` from the config file.
    #[clap(long)]
    states_dir: Option<PathBuf>,
    /// Print the action response as JSON.
    #[clap(long)]
    json: bool,
    #[clap(subcommand)]
    command: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Walk every transition between the recorded states of a device.
    Explore {
        device: String,
        #[clap(flatten)]
        stop: StopArgs,
        /// Fixed seed for the exploration order.
        #[clap(long)]
        seed: Option<u64>,
    },
    /// Apply one recorded state to a device.
    TransitionToState { device: String, state: String },
    /// List the states recorded for a device.
    ListStates { device: String },
    /// Remove a recorded state.
    DeleteState { device: String, state: String },
    /// Record a configuration snapshot file as a named state.
    RecordState {
        device: String,
        state: String,
        #[clap(long)]
        from_file: PathBuf,
    },
}

#[derive(Args, Debug, Default)]
struct StopArgs {
    #[clap(long)]
    days: Option<u64>,
    #[clap(long)]
    hours: Option<u64>,
    #[clap(long)]
    minutes: Option<u64>,
    #[clap(long)]
    seconds: Option<u64>,
    /// Stop after this percentage of all transitions (rounded up).
    #[clap(long)]
    percent: Option<u64>,
    /// Stop after this many transitions. Ignored when --percent is given.
    #[clap(long)]
    cases: Option<u64>,
}

impl StopArgs {
    /// Command line values win over the `[stop]` table field by field.
    fn apply_to(&self, mut stop: StopCondition) -> StopCondition {
        let overrides = [
            (&mut stop.days, self.days),
            (&mut stop.hours, self.hours),
            (&mut stop.minutes, self.minutes),
            (&mut stop.seconds, self.seconds),
            (&mut stop.percent, self.percent),
            (&mut stop.cases, self.cases),
        ];
        for (field, value) in overrides {
            if let Some(value) = value {
                *field = value;
            }
        }
        stop
    }
}

fn load_config(config_file: Option<PathBuf>) -> Result<PioneerConfig, anyhow::Error> {
    match config_file {
        Some(config_path) => {
            info!("Loading configuration from specified path: {config_path:?}");
            PioneerConfig::load_from_file(&config_path)
        }
        None => {
            let default_config_path = PathBuf::from("pioneer.toml");
            if default_config_path.exists() {
                info!("No config file specified, loading default: {default_config_path:?}");
                PioneerConfig::load_from_file(&default_config_path)
            } else {
                info!(
                    "No config file specified and default 'pioneer.toml' not found, using built-in defaults."
                );
                Ok(PioneerConfig::default())
            }
        }
    }
}

fn command_transactor(
    config: &PioneerConfig,
    store: &DirStateStore,
) -> Result<CommandTransactor, anyhow::Error> {
    let settings = config.transactor.as_ref().ok_or_else(|| {
        anyhow::anyhow!("[transactor] apply-command and compare-command must be configured")
    })?;
    if settings.apply_command.is_empty() || settings.compare_command.is_empty() {
        anyhow::bail!("[transactor] apply-command and compare-command must not be empty");
    }
    Ok(CommandTransactor::new(store.clone(), settings))
}

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config_file)?;
    if let Some(states_dir) = cli.states_dir {
        config.store.states_dir = states_dir;
    }
    tracing::debug!("Effective configuration: {config:#?}");

    let mut store = DirStateStore::new(config.store.states_dir.clone())?;

    let response: ActionResponse = match cli.command {
        Action::Explore { device, stop, seed } => {
            let stop = stop.apply_to(config.stop);
            let mut transactor = command_transactor(&config, &store)?;
            let seed = seed.or(config.explorer.seed).unwrap_or_else(rand::random);
            info!(device = %device, seed, "exploration order seed");

            let mut explorer = TransitionExplorer::new(config.explorer.clone());
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut progress = WriterProgress::new(std::io::stdout());
            let mut deadline = NoDeadline;
            let mut ctx = ExplorationContext {
                transactor: &mut transactor,
                progress: &mut progress,
                deadline: &mut deadline,
                rng: &mut rng,
            };
            actions::explore_transitions(&store, &mut explorer, &device, &stop, &mut ctx)
        }
        Action::TransitionToState { device, state } => {
            let mut transactor = command_transactor(&config, &store)?;
            actions::transition_to_state(
                &store,
                &mut transactor,
                &mut NoDeadline,
                config.explorer.transition_timeout_secs,
                &device,
                &state,
            )
        }
        Action::ListStates { device } => actions::list_states(&store, &device),
        Action::DeleteState { device, state } => {
            actions::delete_state(&mut store, &device, &state)
        }
        Action::RecordState {
            device,
            state,
            from_file,
        } => {
            let snapshot = std::fs::read(&from_file).map_err(|e| {
                anyhow::anyhow!("Failed to read snapshot file {:?}: {}", from_file, e)
            })?;
            actions::record_state(&mut store, &device, &state, &snapshot)
        }
    };

    if cli.json {
        println!("{}", response.to_json()?);
    } else {
        println!("{}", response.to_lines());
    }
    if !response.is_success() {
        warn!("action did not succeed");
        std::process::exit(1);
    }
    Ok(())
}
