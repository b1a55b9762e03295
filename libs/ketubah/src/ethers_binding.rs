use async_trait::async_trait;
use common_ethers::contracts::SmartKetubah;
use ethers::{
    abi::Detokenize,
    contract::{ContractError, FunctionCall},
    providers::{JsonRpcClient, Middleware, PendingTransaction, Provider},
    types::{BlockId, BlockNumber, TxHash, U64},
};
use std::borrow::Borrow;

use crate::{
    binding::{
        BlockSource, Broadcast, FieldValue, KetubahField, KetubahReader, KetubahWriter, Receipt,
        WriteAction,
    },
    chain_state::ContractState,
    error::{ReadError, WriteError},
};

fn pinned<B, M, D>(call: FunctionCall<B, M, D>, block: Option<u64>) -> FunctionCall<B, M, D>
where
    B: Borrow<M>,
    M: Middleware,
    D: Detokenize,
{
    match block {
        Some(number) => call.block(BlockId::Number(BlockNumber::Number(number.into()))),
        None => call,
    }
}

fn read_error<M: Middleware>(err: ContractError<M>) -> ReadError {
    ReadError::Call(err.to_string())
}

fn write_error<M: Middleware>(err: ContractError<M>) -> WriteError {
    if err.is_revert() {
        WriteError::Reverted(err.to_string())
    } else {
        WriteError::Rejected(err.to_string())
    }
}

#[async_trait]
impl<M: Middleware + 'static> KetubahReader for SmartKetubah<M> {
    async fn read(&self, field: KetubahField, block: Option<u64>) -> Result<FieldValue, ReadError> {
        let value = match field {
            KetubahField::Partner1 => FieldValue::Address(
                pinned(self.partner_1(), block).call().await.map_err(read_error)?,
            ),
            KetubahField::Partner2 => FieldValue::Address(
                pinned(self.partner_2(), block).call().await.map_err(read_error)?,
            ),
            KetubahField::ContractState => {
                let raw = pinned(self.contract_state(), block)
                    .call()
                    .await
                    .map_err(read_error)?;
                FieldValue::State(ContractState::from(raw))
            }
            KetubahField::Consent(address) => FieldValue::Flag(
                pinned(self.consent(address), block)
                    .call()
                    .await
                    .map_err(read_error)?,
            ),
        };
        Ok(value)
    }
}

#[async_trait]
impl<M: Middleware + 'static> KetubahWriter for SmartKetubah<M> {
    async fn broadcast(&self, action: &WriteAction) -> Result<Broadcast, WriteError> {
        let call = match action {
            WriteAction::RecordConsent => self.record_consent(),
            WriteAction::Witness { message } => self.witness(message.clone()),
        };
        // estimation runs the call against the latest state, so reverts surface here
        let gas = call.estimate_gas().await.map_err(write_error)?;
        let call = call.gas(gas);
        let hash = call.send().await.map_err(write_error)?.tx_hash();
        Ok(Broadcast {
            hash,
            gas_limit: Some(gas),
            gas_price: call.tx.gas_price(),
        })
    }

    async fn confirm(&self, hash: TxHash) -> Result<Option<Receipt>, WriteError> {
        let client = self.client();
        let receipt = PendingTransaction::new(hash, client.provider())
            .await
            .map_err(|err| WriteError::Provider(err.to_string()))?;
        Ok(receipt.map(|receipt| Receipt {
            success: receipt.status == Some(U64::one()),
            gas_used: receipt.gas_used,
            gas_price: receipt.effective_gas_price,
            block: receipt.block_number.map(|n| n.as_u64()),
        }))
    }
}

#[async_trait]
impl<P: JsonRpcClient + 'static> BlockSource for Provider<P> {
    async fn block_number(&self) -> Result<u64, ReadError> {
        self.get_block_number()
            .await
            .map(|n| n.as_u64())
            .map_err(|err| ReadError::Provider(err.to_string()))
    }
}
