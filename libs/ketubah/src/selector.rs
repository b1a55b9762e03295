use ethers::types::Address;

use crate::chain_state::{ChainState, ContractState};

/// Ceremony action offered to the connected address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    Consent,
    Witness,
}

/// Decide what `session` may do given the contract `state`.
///
/// Partners only ever get to consent, and only while the contract is in
/// `Created` and their consent is not recorded yet. Everyone else may witness
/// once the union is proposed, until it is finalized.
pub fn select_action(session: Option<Address>, state: &ChainState) -> Action {
    let Some(address) = session else {
        return Action::None;
    };

    if state.is_partner(address) {
        if state.contract_state == ContractState::Created && !state.consent_of(address) {
            Action::Consent
        } else {
            Action::None
        }
    } else if state.contract_state.accepts_witnesses() {
        Action::Witness
    } else {
        Action::None
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeMap;

    use super::*;

    fn addr(n: u8) -> Address {
        Address::repeat_byte(n)
    }

    fn state(contract_state: u8, consent1: bool) -> ChainState {
        ChainState {
            block: 1,
            contract_state: ContractState::from(contract_state),
            partner1: addr(1),
            partner2: addr(2),
            consent: BTreeMap::from([(addr(1), consent1), (addr(2), false)]),
        }
    }

    #[test]
    fn test_partner_without_consent() {
        assert_eq!(select_action(Some(addr(1)), &state(0, false)), Action::Consent);
        assert_eq!(select_action(Some(addr(2)), &state(0, true)), Action::Consent);
    }

    #[test]
    fn test_partner_with_consent() {
        assert_eq!(select_action(Some(addr(1)), &state(0, true)), Action::None);
    }

    #[test]
    fn test_partner_after_created() {
        // consent button stays disabled once the ceremony moved on
        for raw in 1..=3 {
            assert_eq!(select_action(Some(addr(1)), &state(raw, false)), Action::None);
        }
    }

    #[test]
    fn test_guest() {
        let guest = Some(addr(7));
        assert_eq!(select_action(guest, &state(0, false)), Action::None);
        assert_eq!(select_action(guest, &state(1, false)), Action::Witness);
        assert_eq!(select_action(guest, &state(2, true)), Action::Witness);
        assert_eq!(select_action(guest, &state(3, true)), Action::None);
        assert_eq!(select_action(guest, &state(42, true)), Action::None);
    }

    #[test]
    fn test_no_session() {
        for raw in 0..=3 {
            assert_eq!(select_action(None, &state(raw, false)), Action::None);
        }
    }
}
