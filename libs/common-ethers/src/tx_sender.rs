use common::{debug_msg, log_msg};
use ethers::{
    abi::{Address, Detokenize},
    contract::FunctionCall,
    middleware::SignerMiddleware,
    providers::{Http, Middleware, PendingTransaction, Provider},
    signers::{LocalWallet, Signer},
    types::{Bytes, TransactionReceipt, U256, U64},
};
use eyre::{bail, Context, OptionExt};
use futures::future::join_all;
use itertools::Itertools;
use std::{borrow::Borrow, str::FromStr, sync::Arc, time::Duration};

pub type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Calls to be signed with consecutive nonces and broadcast in order.
///
/// Nothing touches the node until [`send`](Self::send): the nonce is fetched
/// once, every call is filled and signed locally, then the raw transactions go
/// out one after another and the batch waits for all of their receipts.
pub struct TxBatch<B, M, D>
where
    B: Borrow<M>,
    M: Middleware + 'static,
    D: Detokenize,
{
    client: Arc<SignerClient>,
    calls: Vec<FunctionCall<B, M, D>>,
    confirmations: usize,
}

impl<B, M, D> TxBatch<B, M, D>
where
    B: Borrow<M>,
    M: Middleware + 'static,
    D: Detokenize,
{
    pub fn new(client: Arc<SignerClient>) -> Self {
        Self {
            client,
            calls: Vec::new(),
            confirmations: 1,
        }
    }

    pub fn add(mut self, call: FunctionCall<B, M, D>) -> Self {
        self.calls.push(call);
        self
    }

    /// Blocks to wait on top of each receipt (default 1)
    pub fn confirmations(mut self, confirmations: usize) -> Self {
        self.confirmations = confirmations;
        self
    }

    pub async fn send(self) -> eyre::Result<Vec<TransactionReceipt>> {
        let from = self.client.address();
        let mut nonce = self
            .client
            .get_transaction_count(from, None)
            .await
            .context("Failed to fetch the current nonce")?;
        log_msg!(?from, %nonce, calls = self.calls.len(), "signing batch");

        let mut signed = Vec::with_capacity(self.calls.len());
        for call in self.calls {
            signed.push(sign_call(&self.client, call, nonce).await?);
            nonce += U256::one();
        }

        let mut pending = Vec::with_capacity(signed.len());
        for raw in signed {
            let tx = self
                .client
                .send_raw_transaction(raw)
                .await
                .context("Failed to broadcast tx")?;
            log_msg!(hash = ?tx.tx_hash(), "📡 sent");
            pending.push(tx.confirmations(self.confirmations));
        }

        await_receipts(pending).await
    }
}

async fn sign_call<B, M, D>(
    client: &SignerClient,
    mut call: FunctionCall<B, M, D>,
    nonce: U256,
) -> eyre::Result<Bytes>
where
    B: Borrow<M>,
    M: Middleware + 'static,
    D: Detokenize,
{
    call.tx.set_nonce(nonce);
    client
        .fill_transaction(&mut call.tx, call.block)
        .await
        .context("Failed to fill tx (would it revert?)")?;
    debug_msg!(
        nonce = ?call.tx.nonce(),
        gas = ?call.tx.gas(),
        chain_id = ?call.tx.chain_id(),
        "filled tx"
    );
    let signature = client
        .signer()
        .sign_transaction(&call.tx)
        .await
        .context("Failed to sign tx")?;
    Ok(call.tx.rlp_signed(&signature))
}

/// Wait for every transaction, failing if any of them was dropped or reverted.
pub async fn await_receipts(
    pending: Vec<PendingTransaction<'_, Http>>,
) -> eyre::Result<Vec<TransactionReceipt>> {
    let (receipts, errors): (Vec<_>, Vec<_>) =
        join_all(pending).await.into_iter().partition_result();
    if !errors.is_empty() {
        bail!("Lost track of transactions: {:?}", errors);
    }

    receipts
        .into_iter()
        .map(|receipt| -> eyre::Result<TransactionReceipt> {
            let receipt = receipt.ok_or_eyre("Transaction dropped from mempool")?;
            if receipt.status != Some(U64::one()) {
                bail!(
                    "Transaction {:?} reverted in block {:?}",
                    receipt.transaction_hash,
                    receipt.block_number
                );
            }
            log_msg!(
                hash = ?receipt.transaction_hash,
                gas_used = ?receipt.gas_used,
                block = ?receipt.block_number,
                "🍾 mined"
            );
            Ok(receipt)
        })
        .collect()
}

/// Read-only connection, polled at `interval`.
pub fn read_provider(rpc_url: &str, interval: Duration) -> eyre::Result<Arc<Provider<Http>>> {
    let provider = Provider::<Http>::try_from(rpc_url)
        .with_context(|| format!("Invalid RPC URL: {}", rpc_url))?
        .interval(interval);
    Ok(Arc::new(provider))
}

/// A local wallet signing through one node
pub struct TxClient {
    client: Arc<SignerClient>,
}

impl TxClient {
    /// Connects to `rpc_url` and binds the key to the chain the node reports.
    pub async fn try_new_from_url(
        rpc_url: &str,
        get_private_key: impl Fn() -> String,
    ) -> eyre::Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .with_context(|| format!("Invalid RPC URL: {}", rpc_url))?;
        let wallet = LocalWallet::from_str(get_private_key().trim_start_matches("0x"))
            .context("Invalid private key")?;
        let chain_id = provider
            .get_chainid()
            .await
            .context("Failed to fetch chain id")?
            .as_u64();
        let client = SignerMiddleware::new(provider, wallet.with_chain_id(chain_id));
        Ok(Self {
            client: Arc::new(client),
        })
    }

    pub fn client(&self) -> Arc<SignerClient> {
        self.client.clone()
    }

    pub fn address(&self) -> Address {
        self.client.address()
    }

    /// Chain the wallet is signing for, as reported by its node
    pub fn chain_id(&self) -> u64 {
        self.client.signer().chain_id()
    }

    pub fn begin_tx<B, M, D>(&self) -> TxBatch<B, M, D>
    where
        B: Borrow<M>,
        M: Middleware + 'static,
        D: Detokenize,
    {
        TxBatch::new(self.client())
    }
}
