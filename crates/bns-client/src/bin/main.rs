//! BNS lookup CLI
//!
//! Run with:
//! ```bash
//! cargo run -p bns-client --bin bns -- owner alice.btc
//! cargo run -p bns-client --bin bns -- --testnet names ST2QEZ06AGJ3RKJPBV14SY1V5BBFNAW33D9SZJQ0M
//! ```

use std::path::PathBuf;

use bns_client::BnsResolver;
use bns_core::{Network, SdkConfig};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bns")]
#[command(about = "Resolve BNS names through the indexing API with contract fallback")]
struct Args {
    /// Query testnet instead of mainnet
    #[arg(long)]
    testnet: bool,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Indexing API base URL
    #[arg(long)]
    api_url: Option<String>,

    /// Node URL for contract read-only calls
    #[arg(long)]
    node_url: Option<String>,

    /// Node tried when the primary node fails
    #[arg(long)]
    fallback_url: Option<String>,

    /// Skip the indexing API
    #[arg(long)]
    no_api: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Owner of a name
    Owner { name: String },
    /// Token id of a name
    Id { name: String },
    /// Registration record of a name
    Info { name: String },
    /// Zonefile of a name
    Zonefile { name: String },
    /// Primary name of an address
    Primary { address: String },
    /// Names held by an address
    Names { address: String },
    /// Registration price of a name, or of a namespace with --namespace
    Price {
        name: String,
        #[arg(long)]
        namespace: bool,
    },
    /// Highest minted token id
    LastId,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("bns_client=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let network = if args.testnet {
        Network::Testnet
    } else {
        Network::Mainnet
    };

    let mut config = match &args.config {
        Some(path) => SdkConfig::load(path)?,
        None => SdkConfig::default(),
    };
    if let Some(url) = args.api_url {
        config.api_url = url;
    }
    if let Some(url) = args.node_url {
        match network {
            Network::Mainnet => config.mainnet_url = url,
            Network::Testnet => config.testnet_url = url,
        }
    }
    if let Some(url) = args.fallback_url {
        config = config.with_fallback(network, url);
    }
    config.disable_api |= args.no_api;

    let resolver = BnsResolver::new(config)?;

    let output = match args.command {
        Command::Owner { name } => json!({ "name": name, "owner": resolver.get_owner(network, &name).await? }),
        Command::Id { name } => {
            json!({ "name": name, "id": resolver.get_id_from_name(network, &name).await?.to_string() })
        }
        Command::Info { name } => serde_json::to_value(resolver.get_name_info(network, &name).await?)?,
        Command::Zonefile { name } => {
            json!({ "name": name, "zonefile": resolver.resolve_zonefile(network, &name).await? })
        }
        Command::Primary { address } => {
            json!({ "address": address, "name": resolver.get_primary_name(network, &address).await? })
        }
        Command::Names { address } => {
            let names = resolver.list_owned_names(network, &address).await?;
            json!({ "address": address, "total": names.len(), "names": names })
        }
        Command::Price { name, namespace } => {
            let price = if namespace {
                resolver.get_namespace_price(network, &name).await?
            } else {
                resolver.get_name_price(network, &name).await?
            };
            json!({ "name": name, "price": price.to_string() })
        }
        Command::LastId => {
            json!({ "last_token_id": resolver.get_last_token_id(network).await?.to_string() })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
