use clap::Parser;
use switchyard::cli::{
    agents, handle_completions, handle_config_init, handle_config_validate, load_config, modes,
    route, Cli, Commands, ConfigCommands,
};
use switchyard::logging::init_tracing;

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Agents(args) => load_config(&args.config)
            .map_err(anyhow::Error::from)
            .and_then(|config| {
                start_logging(&config);
                agents::handle_agents(&args, &config)
            }),
        Commands::Modes(args) => load_config(&args.config)
            .map_err(anyhow::Error::from)
            .and_then(|config| {
                start_logging(&config);
                modes::handle_modes(&args, &config)
            }),
        Commands::Route(args) => load_config(&args.config)
            .map_err(anyhow::Error::from)
            .and_then(|config| {
                start_logging(&config);
                route::handle_route(&args, config)
            }),
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Init(args) => handle_config_init(&args),
            ConfigCommands::Validate(args) => handle_config_validate(&args),
        },
        Commands::Completions(args) => {
            handle_completions(&args);
            return;
        }
    };

    match result {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Logs go to stderr so table and JSON output stay clean.
fn start_logging(config: &switchyard::config::SwitchyardConfig) {
    if let Err(e) = init_tracing(&config.logging) {
        eprintln!("Warning: failed to initialize logging: {}", e);
    }
}
