//! opchain drives the Configure → Deploy → Genesis pipeline of an OP Stack chain.

mod cli;
mod config;
mod inspect;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::instrument::WithSubscriber;

use cli::{Cli, Command, ConfigureArgs, DeployArgs, GenesisArgs, InitArgs};
use config::Settings;
use opchain_deploy::{
    ChainIntent, ConfigureOpts, DeployOpts, DeploymentState, GenesisOpts, is_cancelled,
};

/// Conventional exit status of a process stopped by SIGINT.
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .finish();

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    match run(cli, &cancel).with_subscriber(subscriber).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if is_cancelled(&err) => {
            eprintln!("Interrupted: {err:#}");
            ExitCode::from(EXIT_INTERRUPTED)
        }
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, cancel: &CancellationToken) -> Result<()> {
    match cli.command {
        Command::Init(args) => init(args),
        Command::Inspect(args) => {
            let state = DeploymentState::read(&args.infile)?;
            println!("{}", inspect::stages_table(&state));
            if let Some(addresses) = &state.addresses {
                println!("{}", inspect::addresses_table(addresses));
            }
            Ok(())
        }
        Command::Configure(args) => {
            let settings = Settings::load(cli.config.as_deref())?;
            configure(args, &settings, cancel).await
        }
        Command::Deploy(args) => {
            let settings = Settings::load(cli.config.as_deref())?;
            deploy(args, settings, cancel).await
        }
        Command::Genesis(args) => {
            let settings = Settings::load(cli.config.as_deref())?;
            genesis(args, settings, cancel).await
        }
    }
}

fn init(args: InitArgs) -> Result<()> {
    if args.outfile.exists() && !args.force {
        anyhow::bail!(
            "{} already exists, pass --force to overwrite it",
            args.outfile.display()
        );
    }

    let overrides = args
        .overrides
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .context("--overrides must be a JSON object")?;

    let intent = ChainIntent {
        use_fault_proofs: args.fault_proofs,
        use_alt_da: args.alt_da,
        fund_dev_accounts: args.fund_dev_accounts,
        overrides,
        ..ChainIntent::new(args.l1_chain_id, args.l2_chain_id)
    };
    intent.check().context("Invalid chain intent")?;

    DeploymentState::new(intent).write(&args.outfile)?;
    tracing::info!(outfile = %args.outfile.display(), "State document initialized");
    Ok(())
}

async fn configure(
    args: ConfigureArgs,
    settings: &Settings,
    cancel: &CancellationToken,
) -> Result<()> {
    let opts = ConfigureOpts {
        l1_rpc_url: settings.l1_rpc_url(args.l1_rpc_url)?,
        outfile: args.files.outfile(),
        infile: args.files.infile,
        mnemonic: args.mnemonic,
    };

    let state = opchain_deploy::configure(&opts, tracing::info_span!("configure"), cancel).await?;
    if let Some(config) = &state.deploy_config {
        tracing::info!(
            l1_chain_id = config.l1_chain_id,
            l2_chain_id = config.l2_chain_id,
            l1_starting_block = %config.l1_starting_block_tag,
            "Configure complete"
        );
    }
    Ok(())
}

async fn deploy(args: DeployArgs, settings: Settings, cancel: &CancellationToken) -> Result<()> {
    let mut opts = DeployOpts::new(
        settings.l1_rpc_url(args.l1_rpc_url)?,
        args.files.infile.clone(),
        args.private_key,
    );
    opts.outfile = args.files.outfile();
    opts.backend = args.backend.resolve(settings.backend.clone())?;
    if let Some(interval) = settings.poll_interval() {
        opts.poll_interval = interval;
    }

    opchain_deploy::deploy(&opts, tracing::info_span!("deploy"), cancel).await?;
    tracing::info!("Deploy complete");
    Ok(())
}

async fn genesis(args: GenesisArgs, settings: Settings, cancel: &CancellationToken) -> Result<()> {
    let mut opts = GenesisOpts::new(
        settings.l1_rpc_url(args.l1_rpc_url)?,
        args.files.infile.clone(),
    );
    opts.outfile = args.files.outfile();
    opts.backend = args.backend.resolve(settings.backend)?;
    opts.check_l1_origin = args.check_l1_origin;

    let state = opchain_deploy::genesis(&opts, tracing::info_span!("genesis"), cancel).await?;
    tracing::info!(chain_id = state.intent.l2_chain_id, "Genesis complete");
    Ok(())
}
