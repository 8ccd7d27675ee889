//! idsnap - Back up and restore identity, group and application state.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use idsnap::Result;
use idsnap::app::AppContext;
use idsnap::cli::Cli;
use idsnap::context::Context;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    let ctx = Context::new();
    install_interrupt_handler(&ctx);

    match run(&cli, ctx) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.robot {
                // Robot mode: JSON error output to stdout
                let error_json = serde_json::to_string(&e.to_structured()).unwrap_or_default();
                println!("{error_json}");
            } else {
                eprintln!("Error: {e}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, ctx: Context) -> Result<()> {
    let app = AppContext::from_cli(cli, ctx)?;
    idsnap::cli::commands::run(&app, &cli.command)
}

/// Cancel `ctx` on Ctrl-C so the open transaction rolls back.
fn install_interrupt_handler(ctx: &Context) {
    let ctx = ctx.clone();
    let spawned = std::thread::Builder::new()
        .name("idsnap-signal".to_string())
        .spawn(move || {
            let Ok(rt) = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            else {
                return;
            };
            if rt.block_on(tokio::signal::ctrl_c()).is_ok() {
                tracing::warn!("interrupt received, cancelling");
                ctx.cancel();
            }
        });
    if let Err(err) = spawned {
        tracing::debug!(error = %err, "interrupt handler not installed");
    }
}

fn init_tracing(cli: &Cli) {
    if cli.quiet {
        return;
    }

    let filter = match cli.verbose {
        0 => "warn,idsnap=info",
        1 => "info,idsnap=debug",
        2 => "debug,idsnap=trace",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if cli.robot {
        // JSON logging for robot mode
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
