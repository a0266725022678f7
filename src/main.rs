//! Fuzzy Greenhouse
//!
//! Command-line interface for computing actuator commands, training the
//! rule-evolving agent and inspecting rule bases.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;

use fuzzy_greenhouse::{
    build_engine, open_store, sample_surface, EngineMode, GreenhouseConfig, GreenhouseEnv,
    InferenceEngine, LogLevel, MamdaniEngine, QLearningAgent, StoreBackend, TableStore,
};

#[derive(Parser)]
#[command(name = "greenhouse")]
#[command(author = "Fuzzy Greenhouse Authors")]
#[command(version)]
#[command(about = "Fuzzy greenhouse controller with Q-learning rule evolution", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the standard search paths)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Inference mode
    #[arg(short, long, global = true, value_enum)]
    mode: Option<Mode>,

    /// Table store backend
    #[arg(long, global = true, value_enum)]
    store: Option<Backend>,

    /// Table store path
    #[arg(long = "store-path", global = true, value_name = "PATH")]
    store_path: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compute fan and mist commands for a reading
    Compute {
        /// Temperature (°C, 0-50)
        temperature: f64,
        /// Relative humidity (%, 0-100)
        humidity: f64,
        /// Use rules evolved from the persisted table instead of the defaults
        #[arg(long)]
        evolved: bool,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Train the agent against the simulated greenhouse and persist its table
    Train {
        /// Number of episodes (overrides config)
        #[arg(short, long)]
        episodes: Option<usize>,
        /// Random seed (overrides config)
        #[arg(long)]
        seed: Option<u64>,
        /// Disable environment noise
        #[arg(long)]
        no_noise: bool,
        /// Start from a zero table instead of the persisted one
        #[arg(long)]
        fresh: bool,
        /// Print the evolved rule base after training
        #[arg(long)]
        evolve: bool,
    },
    /// List the active rule base
    Rules {
        /// Show rules evolved from the persisted table
        #[arg(long)]
        evolved: bool,
    },
    /// Print the control surface as CSV (temperature, humidity, fan, mist)
    Surface {
        /// Grid spacing in both inputs
        #[arg(long, default_value = "5.0")]
        step: f64,
        /// Use rules evolved from the persisted table
        #[arg(long)]
        evolved: bool,
    },
    /// Configuration file helpers
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a default configuration file
    Init {
        /// Destination
        #[arg(default_value = "greenhouse.toml")]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration
    Show,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Mode {
    Mamdani,
    Sugeno,
}

impl From<Mode> for EngineMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Mamdani => EngineMode::Mamdani,
            Mode::Sugeno => EngineMode::Sugeno,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Backend {
    File,
    Sqlite,
    Memory,
}

impl From<Backend> for StoreBackend {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::File => StoreBackend::File,
            Backend::Sqlite => StoreBackend::Sqlite,
            Backend::Memory => StoreBackend::Memory,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(&config);

    match &cli.command {
        Command::Compute {
            temperature,
            humidity,
            evolved,
            json,
        } => {
            let engine = controller(&config, *evolved)?;
            let out = engine.compute(*temperature, *humidity);
            if *json {
                println!("{}", serde_json::to_string(&out)?);
            } else {
                println!("fan  = {:.2}", out.fan);
                println!("mist = {:.2}", out.mist);
            }
        }
        Command::Train {
            episodes,
            seed,
            no_noise,
            fresh,
            evolve,
        } => {
            let mut config = config.clone();
            if let Some(episodes) = episodes {
                config.training.episodes = *episodes;
            }
            if seed.is_some() {
                config.training.seed = *seed;
            }
            if *no_noise {
                config.environment.noise_sigma = 0.0;
            }
            config.validate().context("invalid training configuration")?;
            train(&config, *fresh, *evolve)?;
        }
        Command::Rules { evolved } => {
            let engine = controller(&config, *evolved)?;
            let rules = engine.rules();
            println!("{} rules ({} mode)", rules.len(), engine.mode());
            print!("{}", rules);
        }
        Command::Surface { step, evolved } => {
            if !(*step > 0.0) {
                bail!("--step must be positive, got {}", step);
            }
            let engine = controller(&config, *evolved)?;
            let model = engine.model();
            let temperatures = model.temperature.universe_grid(*step);
            let humidities = model.humidity.universe_grid(*step);
            let surface = sample_surface(engine.as_ref(), &temperatures, &humidities);

            println!("temperature,humidity,fan,mist");
            for (t, row) in temperatures.iter().zip(&surface) {
                for (h, out) in humidities.iter().zip(row) {
                    println!("{},{},{:.4},{:.4}", t, h, out.fan, out.mist);
                }
            }
        }
        Command::Config { action } => match action {
            ConfigAction::Init { path, force } => {
                if path.exists() && !force {
                    bail!("{} already exists (use --force to overwrite)", path.display());
                }
                std::fs::write(path, GreenhouseConfig::default_config_content())
                    .with_context(|| format!("Failed to write config: {}", path.display()))?;
                eprintln!("Wrote {}", path.display());
            }
            ConfigAction::Show => {
                print!("{}", config.to_toml()?);
            }
        },
    }

    Ok(())
}

/// Config file (explicit or searched), env overrides, then command-line flags
fn load_config(cli: &Cli) -> Result<GreenhouseConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = GreenhouseConfig::load_from_file(path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?;
            config.apply_env_overrides();
            config
        }
        None => GreenhouseConfig::load().context("Failed to load configuration")?,
    };

    if let Some(mode) = cli.mode {
        config.controller.mode = mode.into();
    }
    if let Some(backend) = cli.store {
        config.store.backend = backend.into();
    }
    if let Some(path) = &cli.store_path {
        config.store.path = path.clone();
    }
    if cli.verbose {
        config.general.log_level = LogLevel::Verbose;
    }
    if cli.quiet {
        config.general.log_level = LogLevel::Quiet;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn init_logging(config: &GreenhouseConfig) {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.general.log_level.filter()),
    )
    .format_timestamp(None)
    .init();
}

fn open_table_store(config: &GreenhouseConfig) -> Result<Box<dyn TableStore>> {
    open_store(config.store.backend, &config.store.path).with_context(|| {
        format!(
            "Failed to open {} store at {}",
            config.store.backend,
            config.store.path.display()
        )
    })
}

/// Engine for the configured mode, optionally running the evolved rule base
fn controller(config: &GreenhouseConfig, evolved: bool) -> Result<Box<dyn InferenceEngine>> {
    let engine: Box<dyn InferenceEngine> = match config.controller.mode {
        EngineMode::Mamdani => {
            Box::new(MamdaniEngine::greenhouse().with_resolution(config.controller.centroid_step))
        }
        EngineMode::Sugeno => build_engine(EngineMode::Sugeno),
    };

    if evolved {
        if engine.mode() != EngineMode::Sugeno {
            bail!("evolved rules carry constant consequents; use --mode sugeno");
        }
        let store = open_table_store(config)?;
        let table = store.load_table().context("Failed to load action-value table")?;
        let agent = QLearningAgent::seeded(config.training.agent_config(), 0).with_table(table);
        engine.set_rules(agent.evolve_rules());
    }

    Ok(engine)
}

fn train(config: &GreenhouseConfig, fresh: bool, evolve: bool) -> Result<()> {
    let store = open_table_store(config)?;
    let (agent_rng, env_rng) = match config.training.seed {
        Some(seed) => (StdRng::seed_from_u64(seed), StdRng::seed_from_u64(seed.wrapping_add(1))),
        None => (StdRng::from_entropy(), StdRng::from_entropy()),
    };

    let mut agent = QLearningAgent::greenhouse(config.training.agent_config(), agent_rng);
    if !fresh {
        agent
            .load_from(store.as_ref())
            .context("Failed to load action-value table")?;
    }
    let mut env = GreenhouseEnv::new(config.environment.physics_params(), env_rng);

    let stats = agent.train(&mut env, config.training.episodes);
    agent
        .save_to(store.as_ref())
        .context("Failed to save action-value table")?;

    eprintln!(
        "Trained {} episodes ({} steps), final epsilon {:.4}, last episode mean reward {:.3}",
        stats.episodes, stats.total_steps, stats.final_epsilon, stats.last_episode_mean_reward
    );
    eprintln!("Saved table to {}", store.describe());

    if evolve {
        let rules = agent.evolve_rules();
        println!("{} evolved rules", rules.len());
        print!("{}", rules);
    }
    Ok(())
}
