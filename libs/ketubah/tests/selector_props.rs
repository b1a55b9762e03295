use std::collections::BTreeMap;

use ethers::types::Address;
use ketubah::{select_action, Action, ChainState, ContractState};
use proptest::prelude::*;

fn address() -> impl Strategy<Value = Address> {
    (1u8..=6).prop_map(Address::repeat_byte)
}

fn chain_state() -> impl Strategy<Value = ChainState> {
    (
        any::<u8>(),
        address(),
        address(),
        prop::collection::btree_map(address(), any::<bool>(), 0..4),
        any::<u64>(),
    )
        .prop_map(|(state, partner1, partner2, consent, block)| ChainState {
            block,
            contract_state: ContractState::from(state % 6),
            partner1,
            partner2,
            consent: consent.into_iter().collect::<BTreeMap<_, _>>(),
        })
}

proptest! {
    #[test]
    fn non_partner_never_consents(state in chain_state(), viewer in address()) {
        prop_assume!(!state.is_partner(viewer));
        prop_assert_ne!(select_action(Some(viewer), &state), Action::Consent);
    }

    #[test]
    fn partner_never_witnesses(state in chain_state(), first in any::<bool>()) {
        let viewer = if first { state.partner1 } else { state.partner2 };
        prop_assert_ne!(select_action(Some(viewer), &state), Action::Witness);
    }

    #[test]
    fn witness_only_while_accepting(state in chain_state(), viewer in address()) {
        if select_action(Some(viewer), &state) == Action::Witness {
            prop_assert!(matches!(
                state.contract_state,
                ContractState::Proposed | ContractState::Witnessing
            ));
        }
    }

    #[test]
    fn consent_only_before_recorded(state in chain_state(), viewer in address()) {
        if select_action(Some(viewer), &state) == Action::Consent {
            prop_assert_eq!(state.contract_state, ContractState::Created);
            prop_assert!(!state.consent_of(viewer));
        }
    }

    #[test]
    fn nobody_connected_gets_nothing(state in chain_state()) {
        prop_assert_eq!(select_action(None, &state), Action::None);
    }
}
