use clap::Parser;
use salespulse::cli::{
    fetch, handle_completions, handle_config_init, serve, Cli, Commands, ConfigCommands,
};
use salespulse::config::LoggingConfig;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve(args) => serve::run_serve(args).await,
        Commands::Fetch(args) => {
            let logging = LoggingConfig::for_command(&args.log_level);
            if let Err(e) = serve::init_tracing(&logging) {
                eprintln!("Warning: Failed to initialize logging: {}", e);
            }

            match fetch::handle_fetch(&args).await {
                Ok(output) => {
                    println!("{}", output);
                    Ok(())
                }
                Err(e) => Err(e),
            }
        }
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Init(args) => handle_config_init(&args),
        },
        Commands::Completions(args) => {
            handle_completions(&args);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
