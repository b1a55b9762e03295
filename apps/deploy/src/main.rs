use std::path::PathBuf;

use clap::Parser;
use common::{log::init_tracing, log_msg, networks::{Network, DEFAULT_INFURA_ID}};
use common_ethers::{artifact::Artifact, contracts::SmartKetubah, tx_sender::TxClient};
use ethers::types::Address;
use eyre::{bail, Context};

const TOKEN_URI: &str = "ipfs://QmekvVYjzXCiag8nZoLYY5BCSj3LsUsPXmMzdnpcPuzs5k/{id}.json";
const KETUBAH_URI: &str = "ipfs://QmamJSHKX6nGVVBqkbjKXKfcHYb23NNRuBuFgTheTn2M42";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "localhost")]
    network: String,

    #[arg(short, long, env = "KETUBAH_PROVIDER")]
    rpc_url: Option<String>,

    #[arg(long, env = "INFURA_ID", default_value = DEFAULT_INFURA_ID)]
    infura_id: String,

    #[arg(short, long, env = "KETUBAH_PRIVATE_KEY", hide_env_values = true)]
    private_key: String,

    #[arg(
        short,
        long,
        default_value = "artifacts/contracts/SmartKetubah.sol/SmartKetubah.json"
    )]
    artifact: PathBuf,

    #[arg(long, default_value = TOKEN_URI)]
    token_uri: String,

    #[arg(long, default_value = "Tronix")]
    token_name: String,

    #[arg(long, default_value = "TRONIX")]
    token_symbol: String,

    #[arg(long, default_value = "0x575E02eb62173333093a96f970714CA530E2e8cc")]
    partner1: String,

    #[arg(long, default_value = "0xBfbADbB5c838B316700b4eEe35Eb7dE0a221Aa8B")]
    partner2: String,

    #[arg(long, default_value = KETUBAH_URI)]
    ketubah_uri: String,

    #[arg(long, default_value = "0x7D08c4006447aBa181566Fa682F310B7eC781724")]
    owner: String,

    #[arg(long, default_value_t = 5)]
    confirmations: usize,
}

fn parse_address(label: &str, value: &str) -> eyre::Result<Address> {
    value
        .parse()
        .with_context(|| format!("Invalid {} address: {}", label, value))
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let partner1 = parse_address("partner1", &cli.partner1)?;
    let partner2 = parse_address("partner2", &cli.partner2)?;
    let owner = parse_address("owner", &cli.owner)?;

    let network = Network::lookup(&cli.network)?;
    let rpc_url = network.resolve_rpc_url(cli.rpc_url.as_deref(), &cli.infura_id);
    let get_private_key = || -> String { cli.private_key.clone() };
    let client = TxClient::try_new_from_url(&rpc_url, get_private_key).await?;
    if client.chain_id() != network.chain_id {
        bail!(
            "Node at {} is on chain {}, expected {} ({})",
            rpc_url,
            client.chain_id(),
            network.name,
            network.chain_id
        );
    }

    let artifact = Artifact::load(&cli.artifact)?;
    log_msg!(
        "Deploying {} to {} from {:?}...",
        artifact.contract_name.as_deref().unwrap_or("SmartKetubah"),
        network.name,
        client.address()
    );

    let (deployed, receipt) = artifact
        .factory(client.client())
        .deploy((cli.token_uri, cli.token_name, cli.token_symbol))
        .context("Failed to encode constructor arguments")?
        .confirmations(cli.confirmations)
        .send_with_receipt()
        .await
        .context("Failed to deploy contract")?;
    let address = deployed.address();
    log_msg!(
        "Deployed at {:?} in block {:?}, gas used {:?}",
        address,
        receipt.block_number,
        receipt.gas_used
    );
    if let Some(link) = network.address_url(&format!("{:?}", address)) {
        log_msg!("\t{}", link);
    }

    let ketubah = SmartKetubah::new(address, client.client());

    log_msg!("Initializing ketubah for {:?} and {:?}...", partner1, partner2);
    client
        .begin_tx()
        .add(ketubah.initialize(partner1, partner2, cli.ketubah_uri))
        .add(ketubah.transfer_ownership(owner))
        .confirmations(cli.confirmations)
        .send()
        .await?;

    log_msg!("Ownership transferred to {:?}", owner);
    log_msg!("Done.");
    Ok(())
}
