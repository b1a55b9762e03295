use thiserror::Error;

/// Placeholder substituted with the Infura project id.
pub const INFURA_PLACEHOLDER: &str = "{INFURA_ID}";

/// Public project id shipped with the scaffold, good enough for light use.
pub const DEFAULT_INFURA_ID: &str = "460f40a260564ac4a4f4b3fffb032dad";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NetworkError {
    #[error("unknown network: '{0}' (known: {1})")]
    Unknown(String, String),
}

/// Static description of a chain the client can target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Network {
    pub name: &'static str,
    pub chain_id: u64,
    pub rpc_url: &'static str,
    pub block_explorer: &'static str,
}

pub const NETWORKS: &[Network] = &[
    Network {
        name: "localhost",
        chain_id: 31337,
        rpc_url: "http://localhost:8545",
        block_explorer: "",
    },
    Network {
        name: "mainnet",
        chain_id: 1,
        rpc_url: "https://mainnet.infura.io/v3/{INFURA_ID}",
        block_explorer: "https://etherscan.io/",
    },
    Network {
        name: "goerli",
        chain_id: 5,
        rpc_url: "https://goerli.infura.io/v3/{INFURA_ID}",
        block_explorer: "https://goerli.etherscan.io/",
    },
    Network {
        name: "sepolia",
        chain_id: 11155111,
        rpc_url: "https://sepolia.infura.io/v3/{INFURA_ID}",
        block_explorer: "https://sepolia.etherscan.io/",
    },
    Network {
        name: "rinkeby",
        chain_id: 4,
        rpc_url: "https://rinkeby.infura.io/v3/{INFURA_ID}",
        block_explorer: "https://rinkeby.etherscan.io/",
    },
    Network {
        name: "xdai",
        chain_id: 100,
        rpc_url: "https://rpc.gnosischain.com",
        block_explorer: "https://blockscout.com/poa/xdai/",
    },
    Network {
        name: "polygon",
        chain_id: 137,
        rpc_url: "https://polygon-rpc.com/",
        block_explorer: "https://polygonscan.com/",
    },
    Network {
        name: "mumbai",
        chain_id: 80001,
        rpc_url: "https://rpc-mumbai.maticvigil.com",
        block_explorer: "https://mumbai.polygonscan.com/",
    },
    Network {
        name: "optimism",
        chain_id: 10,
        rpc_url: "https://mainnet.optimism.io",
        block_explorer: "https://optimistic.etherscan.io/",
    },
    Network {
        name: "arbitrum",
        chain_id: 42161,
        rpc_url: "https://arb1.arbitrum.io/rpc",
        block_explorer: "https://arbiscan.io/",
    },
];

impl Network {
    /// Find network by its name, case-insensitive
    pub fn lookup(name: &str) -> Result<&'static Network, NetworkError> {
        NETWORKS
            .iter()
            .find(|n| n.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                let known = NETWORKS.iter().map(|n| n.name).collect::<Vec<_>>().join(", ");
                NetworkError::Unknown(name.to_owned(), known)
            })
    }

    pub fn by_chain_id(chain_id: u64) -> Option<&'static Network> {
        NETWORKS.iter().find(|n| n.chain_id == chain_id)
    }

    /// Endpoint to use for this network.
    ///
    /// An explicit override (e.g. from `KETUBAH_PROVIDER`) always wins, otherwise
    /// the table URL is used with the Infura id filled in.
    pub fn resolve_rpc_url(&self, rpc_override: Option<&str>, infura_id: &str) -> String {
        match rpc_override.map(str::trim).filter(|url| !url.is_empty()) {
            Some(url) => url.to_owned(),
            None => self.rpc_url.replace(INFURA_PLACEHOLDER, infura_id),
        }
    }

    /// Explorer link for a transaction, if the network has an explorer
    pub fn tx_url(&self, tx_hash: &str) -> Option<String> {
        (!self.block_explorer.is_empty()).then(|| format!("{}tx/{}", self.block_explorer, tx_hash))
    }

    pub fn address_url(&self, address: &str) -> Option<String> {
        (!self.block_explorer.is_empty())
            .then(|| format!("{}address/{}", self.block_explorer, address))
    }
}
