use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tfdiscord::core::runner::parse_address;
use tfdiscord::schema::{Diagnostics, Severity};
use tfdiscord::shared::logging;
use tfdiscord::{config, Provider, Runner, StateFile};

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(
    name = "tfdiscord",
    about = "Manage Discord servers as declarative resources.",
    version = APP_VERSION,
    disable_version_flag(true)
)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(
        long,
        short = 'p',
        value_name = "PATH",
        help = "Path to the provider configuration file"
    )]
    pub provider_config: Option<PathBuf>,

    #[arg(
        long,
        short = 's',
        value_name = "PATH",
        default_value = "tfdiscord.tfstate.json",
        help = "Path to the local state file"
    )]
    pub state: PathBuf,

    #[arg(long, short = 'V', help = "Print version")]
    pub version: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(name = "schema", about = "Print resource schemas as JSON")]
    Schema {
        #[arg(long, value_name = "TYPE")]
        resource: Option<String>,
    },

    #[command(name = "validate", about = "Check a resource configuration offline")]
    Validate {
        #[arg(long, value_name = "TYPE")]
        resource: String,
        #[arg(long, value_name = "PATH")]
        config: PathBuf,
    },

    #[command(name = "plan", about = "Show the changes apply would make")]
    Plan {
        #[arg(long, value_name = "TYPE.NAME")]
        address: String,
        #[arg(long, value_name = "PATH")]
        config: PathBuf,
    },

    #[command(name = "apply", about = "Create or update a resource")]
    Apply {
        #[arg(long, value_name = "TYPE.NAME")]
        address: String,
        #[arg(long, value_name = "PATH")]
        config: PathBuf,
    },

    #[command(name = "refresh", about = "Reconcile every tracked resource with Discord")]
    Refresh,

    #[command(name = "destroy", about = "Destroy a tracked resource")]
    Destroy {
        #[arg(long, value_name = "TYPE.NAME")]
        address: String,
    },

    #[command(name = "import", about = "Start tracking an existing server")]
    Import {
        #[arg(long, value_name = "TYPE.NAME")]
        address: String,
        #[arg(long, value_name = "ID")]
        id: String,
    },
}

#[tokio::main]
async fn main() {
    logging::init();

    let cli = Cli::parse();

    if cli.version {
        println!("{}", APP_VERSION);
        std::process::exit(0);
    }

    let Some(command) = &cli.command else {
        println!("No command specified. Use --help for usage information.");
        return;
    };

    if let Err(err) = run(&cli, command).await {
        logging::error(&format!("{:#}", err));
        std::process::exit(1);
    }
}

async fn run(cli: &Cli, command: &Commands) -> anyhow::Result<()> {
    let provider = Provider::new();

    match command {
        Commands::Schema { resource } => match resource {
            Some(resource_type) => {
                let resource = provider.resource(resource_type)?;
                print_json(&resource.schema())
            }
            None => {
                let mut schemas = Map::new();
                schemas.insert("provider".to_string(), serde_json::to_value(Provider::schema())?);
                for resource_type in provider.resource_types() {
                    let resource = provider.resource(resource_type)?;
                    schemas.insert(
                        resource_type.to_string(),
                        serde_json::to_value(resource.schema())?,
                    );
                }
                print_json(&schemas)
            }
        },
        Commands::Validate { resource, config } => {
            let config = read_resource_config(config)?;
            let diags = provider.resource(resource)?.schema().validate(&config);
            check(&diags)?;
            logging::info(&format!("{}: configuration is valid", resource));
            Ok(())
        }
        Commands::Plan { address, config } => {
            let (resource_type, _) = parse_address(address).map_err(fail)?;
            let config = read_resource_config(config)?;
            let state = StateFile::load(&cli.state)?;
            let prior = state.get(address).map(|r| &r.instance);

            let runner = init_runner(cli, provider)?;
            let plan = runner.plan(resource_type, &config, prior).map_err(fail)?;
            report(&plan.diagnostics);
            print_json(&plan)
        }
        Commands::Apply { address, config } => {
            let (resource_type, _) = parse_address(address).map_err(fail)?;
            let config = read_resource_config(config)?;
            let mut state = StateFile::load(&cli.state)?;
            let prior = state.get(address).map(|r| r.instance.clone());

            let runner = init_runner(cli, provider)?;
            let result = runner
                .apply(resource_type, &config, prior)
                .await
                .map_err(fail)?;

            // Record whatever exists remotely, even when the apply failed halfway.
            match &result.state {
                Some(instance) => state.put(address, resource_type, instance.clone()),
                None => {
                    state.remove(address);
                }
            }
            state.save(&cli.state)?;

            check(&result.diagnostics)?;
            print_json(&result.state)
        }
        Commands::Refresh => {
            let mut state = StateFile::load(&cli.state)?;
            let runner = init_runner(cli, provider)?;
            let mut diags = Diagnostics::new();

            let tracked: Vec<(String, String)> = state
                .resources
                .iter()
                .map(|(address, r)| (address.clone(), r.resource_type.clone()))
                .collect();

            for (address, resource_type) in tracked {
                let Some(prior) = state.get(&address).map(|r| r.instance.clone()) else {
                    continue;
                };
                match runner.refresh(&resource_type, prior).await {
                    Ok(Some(instance)) => state.put(&address, &resource_type, instance),
                    Ok(None) => {
                        logging::warn(&format!("{} no longer exists, removing from state", address));
                        state.remove(&address);
                    }
                    Err(errors) => diags.extend(errors),
                }
            }

            state.save(&cli.state)?;
            check(&diags)?;
            print_json(&state.resources)
        }
        Commands::Destroy { address } => {
            let mut state = StateFile::load(&cli.state)?;
            let resource = state
                .get(address)
                .cloned()
                .with_context(|| format!("{} is not in the state file", address))?;

            let runner = init_runner(cli, provider)?;
            runner
                .destroy(&resource.resource_type, resource.instance)
                .await
                .map_err(fail)?;

            state.remove(address);
            state.save(&cli.state)?;
            Ok(())
        }
        Commands::Import { address, id } => {
            let (resource_type, _) = parse_address(address).map_err(fail)?;
            let mut state = StateFile::load(&cli.state)?;
            if state.get(address).is_some() {
                anyhow::bail!("Resource already managed: {}", address);
            }

            let runner = init_runner(cli, provider)?;
            let instance = runner.import(resource_type, id).await.map_err(fail)?;

            state.put(address, resource_type, instance.clone());
            state.save(&cli.state)?;
            print_json(&instance)
        }
    }
}

fn init_runner(cli: &Cli, provider: Provider) -> anyhow::Result<Runner> {
    let config = match &cli.provider_config {
        Some(path) => config::init_from_path(path)?,
        None => config::init_default()?,
    };
    let ctx = provider.configure(&config)?;
    Ok(Runner::new(provider, ctx))
}

fn read_resource_config(path: &Path) -> anyhow::Result<Map<String, Value>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read resource config {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Invalid resource config {}", path.display()))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => anyhow::bail!("Resource config {} must be a JSON object", path.display()),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report(diags: &Diagnostics) {
    for diag in diags.iter() {
        match diag.severity {
            Severity::Error => logging::error(&diag.to_string()),
            Severity::Warning => logging::warn(&diag.to_string()),
        }
    }
}

fn check(diags: &Diagnostics) -> anyhow::Result<()> {
    report(diags);
    if diags.has_error() {
        anyhow::bail!("{} error(s) reported", diags.errors().count());
    }
    Ok(())
}

fn fail(diags: Diagnostics) -> anyhow::Error {
    report(&diags);
    anyhow::anyhow!("{} error(s) reported", diags.errors().count())
}
