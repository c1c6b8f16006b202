// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use policy_rs::config;
use policy_rs::logging::{LogFormatType, tracing_set};
use policy_rs::policy::vyos::commands;
use policy_rs::policy::{Args, CommandDevice, PolicyManager, PolicyStore, serve};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Arg {
    #[arg(short, long, help = "Policy document path")]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "terminal", help = "Log format")]
    log_format: LogFormatType,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, ValueEnum)]
enum ShowKind {
    PrefixList,
    CommunityList,
    RouteMap,
    Dangling,
}

impl ShowKind {
    fn path(&self) -> &'static str {
        match self {
            ShowKind::PrefixList => "/show/prefix-list",
            ShowKind::CommunityList => "/show/community-list",
            ShowKind::RouteMap => "/show/route-map",
            ShowKind::Dangling => "/show/dangling",
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Validate the policy document
    Check,
    /// Show policy objects
    Show {
        #[arg(value_enum)]
        kind: ShowKind,
        name: Option<String>,
        #[arg(short, long)]
        json: bool,
    },
    /// Print the configuration commands building the policy
    Commands,
    /// Convert device configuration into a policy document
    Import {
        path: PathBuf,
        #[arg(long, help = "Input is a list of configuration commands")]
        commands: bool,
        #[arg(short, long)]
        json: bool,
    },
}

fn document(arg: &Arg) -> Result<PathBuf> {
    config::policy_path(arg.config.as_deref()).context("can't find policy document")
}

#[tokio::main]
async fn main() -> Result<()> {
    let arg = Arg::parse();

    tracing_set(&arg.log_format);

    match &arg.command {
        Command::Check => {
            let path = document(&arg)?;
            let store = config::load_store(&path)?;
            println!(
                "{}: {} prefix-lists, {} community-lists, {} route-maps",
                path.display(),
                store.prefix_lists().count(),
                store.community_lists().count(),
                store.route_maps().count()
            );
        }
        Command::Show { kind, name, json } => {
            let snapshot = config::load_document(&document(&arg)?)?;
            let manager = PolicyManager::new(Box::new(CommandDevice::new()));
            let client = manager.client();
            serve(manager);
            client.load(snapshot).await?;

            let args = name.as_deref().map(Args::from_raw).unwrap_or_default();
            print!("{}", client.show(kind.path(), args, *json).await?);
        }
        Command::Commands => {
            let store = config::load_store(&document(&arg)?)?;
            for cmd in commands::snapshot(&store.snapshot()) {
                println!("{}", cmd);
            }
        }
        Command::Import {
            path,
            commands,
            json,
        } => {
            let snapshot = config::import_device(path, *commands)?;
            PolicyStore::load(snapshot.clone())
                .with_context(|| format!("invalid policy in {}", path.display()))?;
            print!("{}", config::to_document(&snapshot, *json)?);
        }
    }

    Ok(())
}
