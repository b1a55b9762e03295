use std::{sync::Arc, time::Duration};

use common::{log_msg, networks::Network, warn_msg};
use common_ethers::{
    contracts::SmartKetubah,
    tx_sender::{read_provider, SignerClient, TxClient},
};
use ethers::{
    providers::{Http, Middleware, Provider},
    types::Address,
    utils::format_ether,
};
use eyre::{Context, OptionExt};
use ketubah::{
    binding::BlockSource, ChainState, SessionIdentity, SessionManager, SyncLoop, Transactor,
};

use crate::Cli;

pub type Reader = SmartKetubah<Provider<Http>>;
pub type Wallet = SmartKetubah<SignerClient>;

/// Everything a subcommand needs: the read side, and the wallet side if a key was given
pub struct Ceremony {
    pub network: &'static Network,
    pub provider: Arc<Provider<Http>>,
    pub reader: Arc<Reader>,
    pub sync: Arc<SyncLoop<Reader>>,
    pub session: Arc<SessionManager<Wallet>>,
    pub transactor: Transactor<Wallet>,
}

impl Ceremony {
    pub async fn connect(cli: &Cli) -> eyre::Result<Self> {
        let network = Network::lookup(&cli.network)?;
        let rpc_url = network.resolve_rpc_url(cli.rpc_url.as_deref(), &cli.infura_id);
        let contract: Address = cli
            .contract
            .parse()
            .with_context(|| format!("Invalid contract address: {}", cli.contract))?;

        log_msg!(network = network.name, %rpc_url, ?contract, "connecting");
        let provider = read_provider(&rpc_url, Duration::from_millis(cli.poll_interval_ms))?;
        let reader = Arc::new(SmartKetubah::new(contract, provider.clone()));

        let session = Arc::new(SessionManager::new(network.chain_id));
        session.on_change(move |identity| {
            if let Some(identity) = identity.filter(|id| id.chain_id != network.chain_id) {
                let actual = Network::by_chain_id(identity.chain_id)
                    .map_or_else(|| identity.chain_id.to_string(), |n| n.name.to_owned());
                warn_msg!(
                    "⚠️ Wrong network: the wallet signs for {}, the ketubah lives on {}",
                    actual,
                    network.name
                );
            }
        });

        if let Some(private_key) = &cli.private_key {
            let client = TxClient::try_new_from_url(&rpc_url, || private_key.clone()).await?;
            session.connect(
                SessionIdentity {
                    address: client.address(),
                    chain_id: client.chain_id(),
                },
                Arc::new(SmartKetubah::new(contract, client.client())),
            );
        }

        let sync = Arc::new(SyncLoop::new(reader.clone(), session.subscribe()));
        let transactor = Transactor::new(session.clone());

        Ok(Self {
            network,
            provider,
            reader,
            sync,
            session,
            transactor,
        })
    }

    /// Mirror the contract at the latest block and return the mirrored state.
    pub async fn snapshot(&self) -> eyre::Result<ChainState> {
        let block = self.provider.block_number().await?;
        self.sync.refresh(block).await;
        self.sync
            .state()
            .into_ready()
            .ok_or_eyre("Failed to read the contract state")
    }

    pub async fn balance(&self, address: Address) -> eyre::Result<String> {
        let balance = self
            .provider
            .get_balance(address, None)
            .await
            .context("Failed to fetch balance")?;
        Ok(format_ether(balance))
    }
}
