use common::{log_msg, networks::Network, warn_msg};
use ethers::types::Address;
use ketubah::{
    select_action, witness_log::WitnessEntry, Action, ChainState, FieldValue, KetubahField,
    TxStatus,
};

use crate::connect::Ceremony;

fn mark(consented: bool) -> &'static str {
    if consented {
        "✅"
    } else {
        "⏳"
    }
}

pub fn snapshot(network: &Network, state: &ChainState, viewer: Option<Address>) {
    log_msg!("Block {}: contract is {}", state.block, state.contract_state);
    for (label, partner) in [("Partner 1", state.partner1), ("Partner 2", state.partner2)] {
        let link = network.address_url(&format!("{:?}", partner)).unwrap_or_default();
        log_msg!("\t{} {:?} {} {}", label, partner, mark(state.consent_of(partner)), link);
    }

    let Some(viewer) = viewer else {
        log_msg!("No wallet connected, read only.");
        return;
    };
    match select_action(Some(viewer), state) {
        Action::Consent => log_msg!("You may record your consent: `ceremony consent`"),
        Action::Witness => log_msg!("You may sign as a witness: `ceremony witness \"<message>\"`"),
        Action::None if state.is_partner(viewer) => {
            log_msg!("Nothing to do, your consent is {}", mark(state.consent_of(viewer)))
        }
        Action::None => log_msg!("Nothing to do while the contract is {}", state.contract_state),
    }
}

pub fn tx_status(network: &Network, status: &TxStatus) {
    match status {
        TxStatus::Submitted { hash } => {
            log_msg!("📡 Transaction sent: {:?}", hash);
            if let Some(link) = network.tx_url(&format!("{:?}", hash)) {
                log_msg!("\t{}", link);
            }
        }
        TxStatus::Confirmed { gas, .. } => {
            log_msg!(" 🍾 Transaction finished! ⛽️ {}", gas)
        }
        TxStatus::Failed { hash, reason } => {
            warn_msg!("Transaction {:?} failed: {}", hash, reason)
        }
    }
}

pub fn witness_entry(network: &Network, entry: &WitnessEntry) {
    log_msg!("#{} {:?}: {}", entry.block, entry.witness, entry.message);
    if let Some(link) = network.tx_url(&format!("{:?}", entry.tx)) {
        log_msg!("\t{}", link);
    }
}

pub fn field(field: KetubahField, value: FieldValue) {
    match value {
        FieldValue::Address(address) => log_msg!("{:?} = {:?}", field, address),
        FieldValue::State(state) => log_msg!("{:?} = {} ({})", field, state, state.to_u8()),
        FieldValue::Flag(flag) => log_msg!("{:?} = {}", field, flag),
    }
}

pub fn network_warning(ceremony: &Ceremony) {
    let actual = ceremony
        .session
        .identity()
        .map(|identity| identity.chain_id)
        .unwrap_or_default();
    warn_msg!(
        "⚠️ You have chain id {} selected and you need to be on {} ({}). Writes will be refused.",
        actual,
        ceremony.network.name,
        ceremony.network.chain_id
    );
}
