use anyhow::Context;
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use typebridge::cli::Cli;
use typebridge::config::PROJECT_CONFIG;

/// Print the config file schema when the first argument is `--schema`.
fn handle_schema_flag() -> anyhow::Result<bool> {
    if std::env::args().nth(1).as_deref() != Some("--schema") {
        return Ok(false);
    }
    let response = serde_json::json!({
        "config_path": PROJECT_CONFIG,
        "format": "toml",
        "schema": schemars::schema_for!(typebridge::TypebridgeConfig)
    });
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(true)
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "typebridge=debug"
    } else {
        "typebridge=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run() -> anyhow::Result<()> {
    // Handled before clap so it works without the required settings.
    if handle_schema_flag()? {
        return Ok(());
    }

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let root = std::env::current_dir().context("cannot determine working directory")?;
    cli.run(&root)?;
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
