use alloy::primitives::{address, Address};

/// A single supported EVM chain.
#[derive(Debug, Clone, Copy)]
pub struct ChainDef {
    pub chain_id: u64,
    pub name: &'static str,
    /// Ankr multichain `blockchain` identifier.
    pub ankr_slug: &'static str,
    pub native_symbol: &'static str,
    pub rpc_url: &'static str,
    pub fallbacks: &'static [&'static str],
    pub wrapped_native: Address,
    pub quoter_v2: Address,
}

const DEFAULT_QUOTER_V2: Address = address!("61fFE014bA17989E743c5F6cB21bF9697530B21e");

/// Chains the service can build swaps on.
pub const CHAINS: &[ChainDef] = &[
    ChainDef {
        chain_id: 1,
        name: "ethereum",
        ankr_slug: "eth",
        native_symbol: "ETH",
        rpc_url: "https://eth.llamarpc.com",
        fallbacks: &[
            "https://ethereum-rpc.publicnode.com",
            "https://rpc.ankr.com/eth",
            "https://cloudflare-eth.com",
        ],
        wrapped_native: address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"),
        quoter_v2: DEFAULT_QUOTER_V2,
    },
    ChainDef {
        chain_id: 10,
        name: "optimism",
        ankr_slug: "optimism",
        native_symbol: "ETH",
        rpc_url: "https://optimism.llamarpc.com",
        fallbacks: &[
            "https://mainnet.optimism.io",
            "https://optimism-rpc.publicnode.com",
            "https://rpc.ankr.com/optimism",
        ],
        wrapped_native: address!("4200000000000000000000000000000000000006"),
        quoter_v2: DEFAULT_QUOTER_V2,
    },
    ChainDef {
        chain_id: 56,
        name: "bnb",
        ankr_slug: "bsc",
        native_symbol: "BNB",
        rpc_url: "https://bsc.llamarpc.com",
        fallbacks: &[
            "https://bsc-dataseed.binance.org",
            "https://bsc-rpc.publicnode.com",
            "https://rpc.ankr.com/bsc",
        ],
        wrapped_native: address!("bb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c"),
        quoter_v2: address!("78D78E420Da98ad378D7799bE8f4AF69033EB077"),
    },
    ChainDef {
        chain_id: 137,
        name: "polygon",
        ankr_slug: "polygon",
        native_symbol: "POL",
        rpc_url: "https://polygon.llamarpc.com",
        fallbacks: &[
            "https://polygon-rpc.com",
            "https://polygon-bor-rpc.publicnode.com",
            "https://rpc.ankr.com/polygon",
        ],
        wrapped_native: address!("0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270"),
        quoter_v2: DEFAULT_QUOTER_V2,
    },
    ChainDef {
        chain_id: 8453,
        name: "base",
        ankr_slug: "base",
        native_symbol: "ETH",
        rpc_url: "https://base.llamarpc.com",
        fallbacks: &[
            "https://mainnet.base.org",
            "https://base-rpc.publicnode.com",
            "https://rpc.ankr.com/base",
        ],
        wrapped_native: address!("4200000000000000000000000000000000000006"),
        quoter_v2: address!("3d4e44Eb1374240CE5F1B871ab261CD16335B76a"),
    },
    ChainDef {
        chain_id: 42161,
        name: "arbitrum",
        ankr_slug: "arbitrum",
        native_symbol: "ETH",
        rpc_url: "https://arbitrum.llamarpc.com",
        fallbacks: &[
            "https://arb1.arbitrum.io/rpc",
            "https://arbitrum-rpc.publicnode.com",
            "https://rpc.ankr.com/arbitrum",
        ],
        wrapped_native: address!("82aF49447D8a07e3bd95BD0d56f35241523fBab1"),
        quoter_v2: DEFAULT_QUOTER_V2,
    },
    ChainDef {
        chain_id: 42220,
        name: "celo",
        ankr_slug: "celo",
        native_symbol: "CELO",
        rpc_url: "https://forno.celo.org",
        fallbacks: &["https://celo-rpc.publicnode.com", "https://rpc.ankr.com/celo"],
        wrapped_native: address!("471EcE3750Da237f93B8E339c536989b8978a438"),
        quoter_v2: address!("82825d0554fA07f7FC52Ab63c961F330fdEFa8E8"),
    },
    ChainDef {
        chain_id: 43114,
        name: "avalanche",
        ankr_slug: "avalanche",
        native_symbol: "AVAX",
        rpc_url: "https://avalanche-c-chain.llamarpc.com",
        fallbacks: &[
            "https://api.avax.network/ext/bc/C/rpc",
            "https://avalanche-c-chain-rpc.publicnode.com",
            "https://rpc.ankr.com/avalanche",
        ],
        wrapped_native: address!("B31f66AA3C1e785363F0875A1B74E27b85FD66c7"),
        quoter_v2: address!("be0F5544EC67e9B3b2D979aaA43f18Fd87E6257F"),
    },
    ChainDef {
        chain_id: 81457,
        name: "blast",
        ankr_slug: "blast",
        native_symbol: "ETH",
        rpc_url: "https://rpc.blast.io",
        fallbacks: &["https://blast-rpc.publicnode.com", "https://rpc.ankr.com/blast"],
        wrapped_native: address!("4300000000000000000000000000000000000004"),
        quoter_v2: address!("6Cdcd65e03c1CEc3730AeeCd45bc140D57A25C77"),
    },
];

pub fn chain_def(chain_id: u64) -> Option<&'static ChainDef> {
    CHAINS.iter().find(|c| c.chain_id == chain_id)
}

pub const DEFAULT_SWAP_ROUTER: Address = address!("68b3465833fb72A70ecDF485E0e4C7bD8665Fc45");

/// SwapRouter02 deployments that differ from the canonical address.
const SWAP_ROUTER_OVERRIDES: &[(u64, Address)] = &[
    (8453, address!("2626664c2603336E57B271c5C0b26F421741e481")),
    (56, address!("B971eF87ede563556b2ED4b1C0b0019111Dd85d2")),
    (43114, address!("bb00FF08d01D300023C629E8fFfFcb65A5a578cE")),
    (42220, address!("5615CDAb10dc425a742d643d949a7F474C01abc4")),
    (81457, address!("549FEB8c9bd4c12Ad2AB27022dA12492aC452B66")),
];

/// Router (approval spender and swap target) for a chain. Unlisted chains get the default.
pub fn swap_router_address(chain_id: u64) -> Address {
    SWAP_ROUTER_OVERRIDES
        .iter()
        .find(|(id, _)| *id == chain_id)
        .map_or(DEFAULT_SWAP_ROUTER, |(_, a)| *a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn router_table_matches_deployments() {
        let cases = [
            (8453_u64, "0x2626664c2603336E57B271c5C0b26F421741e481"),
            (56, "0xB971eF87ede563556b2ED4b1C0b0019111Dd85d2"),
            (43114, "0xbb00FF08d01D300023C629E8fFfFcb65A5a578cE"),
            (42220, "0x5615CDAb10dc425a742d643d949a7F474C01abc4"),
            (81457, "0x549FEB8c9bd4c12Ad2AB27022dA12492aC452B66"),
            (1, "0x68b3465833fb72A70ecDF485E0e4C7bD8665Fc45"),
            (42161, "0x68b3465833fb72A70ecDF485E0e4C7bD8665Fc45"),
        ];
        for (id, want) in cases {
            assert_eq!(
                swap_router_address(id).to_checksum(None),
                want,
                "router for chain {id}"
            );
        }
    }

    #[test]
    fn unlisted_chain_falls_back_to_default_router() {
        assert_eq!(swap_router_address(999_999), DEFAULT_SWAP_ROUTER, "fallback");
        assert_eq!(swap_router_address(0), DEFAULT_SWAP_ROUTER, "zero id");
    }

    #[test]
    fn chain_table_is_consistent() {
        let ids: BTreeSet<u64> = CHAINS.iter().map(|c| c.chain_id).collect();
        assert_eq!(ids.len(), CHAINS.len(), "duplicate chain ids");
        for c in CHAINS {
            assert!(!c.rpc_url.is_empty(), "{} has no rpc", c.name);
            assert!(!c.wrapped_native.is_zero(), "{} has no wrapped native", c.name);
            assert!(c.rpc_url.starts_with("https://"), "{} rpc must be https", c.name);
        }
        assert!(chain_def(8453).is_some_and(|c| c.ankr_slug == "base"), "base slug");
        assert!(chain_def(56).is_some_and(|c| c.ankr_slug == "bsc"), "bnb slug");
        assert!(chain_def(5).is_none(), "goerli is not supported");
    }
}
