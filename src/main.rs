use clap::Parser;
use switchyard::cli::{
    handle_config_init, handle_policies, handle_route, load_config, Cli, Commands, ConfigCommands,
};
use switchyard::routing::ModelRouter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve(args) => switchyard::cli::serve::run_serve(args).await,
        Commands::Policies(args) => load_config(&args.config)
            .and_then(|config| {
                config.validate()?;
                handle_policies(&args, &config.admission.policy_table())
            })
            .map(|output| println!("{}", output)),
        Commands::Route(args) => load_config(&args.config)
            .and_then(|config| Ok(ModelRouter::from_config(&config.routing)?))
            .and_then(|router| handle_route(&args, &router))
            .map(|output| println!("{}", output)),
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Init(args) => handle_config_init(&args),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
