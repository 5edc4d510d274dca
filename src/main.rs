mod app;
mod cli;

use clap::Parser;
use cli::{Cli, Command, ConfigArgs, RunArgs};
use loggate_core::config::Config;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let command = cli.command.unwrap_or(Command::Run(RunArgs::default()));

    match command {
        Command::Run(args) => cmd_run(args),
        Command::CheckConfig(args) => cmd_check_config(args),
    }
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let config = Config::load(&args.config);
    let (to_file, log_dir, config_level) = match &config {
        Ok(c) => (c.logging_to_file, c.log_dir.clone(), c.log_level.clone()),
        Err(_) => (false, None, Config::default().log_level),
    };
    let level = args.log_level.clone().unwrap_or(config_level);
    let _guard =
        loggate_core::lifecycle::logging::init_logging(&level, to_file, log_dir.as_deref());

    let config = config.unwrap_or_else(|e| {
        tracing::warn!(
            "Failed to load config from '{}': {e}, using defaults",
            args.config
        );
        Config::default()
    });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let application = app::Application::build(config, &args);
        application.serve().await
    })
}

fn cmd_check_config(args: ConfigArgs) -> anyhow::Result<()> {
    let config = Config::load(&args.config)?;
    let user_logging = config.user_logging();
    println!("ipKey:                {}", user_logging.ip_key);
    println!("userKey:              {}", user_logging.user_key);
    println!("userSessionAttribute: {}", user_logging.user_session_attribute);
    println!("usePrincipal:         {}", user_logging.use_principal);
    Ok(())
}
