//! Agent platform plugin manifest (`/.well-known/ai-plugin.json`).

use crate::tokens::NATIVE_ASSET;
use serde_json::{json, Value};

const ASSISTANT_INSTRUCTIONS: &str = "Encodes transactions as signature requests on EVM networks. \
This assistant is only for EVM networks. Passes the transaction fields of the response to the \
generate-evm-tx tool for signing and displays the meta content of the response to the user after \
signing. For selling native assets, such as ETH, xDAI, POL, BNB it uses the native asset address \
as the sellToken. It does not infer the chainId. Do not infer the token decimals. Use Token Units \
for sellAmountBeforeFee. Uses token symbols for sellToken and buyToken unless addresses are \
provided. Always passes evmAddress as the safeAddress on any request requiring safeAddress.";

fn address_schema() -> Value {
    json!({
        "type": "string",
        "description": "20 byte Ethereum address encoded as a hex with `0x` prefix.",
        "example": "0x6810e776880c02933d47db1b9fc05908e5386b96"
    })
}

fn error_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Error"}}}
    })
}

fn paths() -> Value {
    json!({
        "/api/health": {
            "get": {
                "tags": ["health"],
                "summary": "Confirms server running",
                "operationId": "check-health",
                "responses": {
                    "200": {
                        "description": "Ok Message",
                        "content": {"application/json": {"schema": {
                            "type": "object",
                            "properties": {
                                "ok": {"type": "boolean"},
                                "message": {"type": "string", "description": "Ok Message"}
                            }
                        }}}
                    }
                }
            }
        },
        "/api/tools/uniswap": {
            "post": {
                "tags": ["uniswap"],
                "operationId": "swap",
                "summary": "Quote a Uniswap V3 swap and return a signable transaction bundle",
                "description": "Resolves sellToken and buyToken against the wallet's balances and the token directory, quotes the best single-pool route, and returns [wrap?, approve?, swap] as an eth_sendTransaction sign request.",
                "requestBody": {
                    "required": true,
                    "content": {"application/json": {"schema": {"$ref": "#/components/schemas/SwapRequest"}}}
                },
                "responses": {
                    "200": {"$ref": "#/components/responses/SignRequestResponse200"},
                    "400": error_response("Invalid request, unknown token, or no route."),
                    "502": error_response("An upstream provider failed."),
                    "503": error_response("The service is missing required configuration."),
                    "504": error_response("The request timed out.")
                }
            }
        },
        "/api/tools/balances": {
            "get": {
                "tags": ["balances"],
                "operationId": "get-balances",
                "summary": "Token balances of a wallet on one chain",
                "parameters": [
                    {"$ref": "#/components/parameters/chainId"},
                    {"$ref": "#/components/parameters/safeAddress"}
                ],
                "responses": {
                    "200": {
                        "description": "Wallet holdings",
                        "content": {"application/json": {"schema": {
                            "type": "array",
                            "items": {"$ref": "#/components/schemas/TokenBalance"}
                        }}}
                    },
                    "400": error_response("Invalid chain or address."),
                    "502": error_response("The balance provider failed.")
                }
            }
        }
    })
}

fn components() -> Value {
    json!({
        "parameters": {
            "chainId": {
                "name": "chainId",
                "in": "query",
                "description": "EVM Network (aka chain ID)",
                "required": true,
                "schema": {"type": "number"},
                "example": 8453
            },
            "safeAddress": {
                "name": "safeAddress",
                "in": "query",
                "required": true,
                "description": "The wallet address the transactions are sent from.",
                "schema": {"$ref": "#/components/schemas/Address"},
                "example": "0x7fa8e8264985C7525Fc50F98aC1A9b3765405489"
            }
        },
        "responses": {
            "SignRequestResponse200": {
                "description": "Uniswap order response including a transaction sign request and order meta data.",
                "content": {"application/json": {"schema": {
                    "type": "object",
                    "properties": {
                        "transaction": {"$ref": "#/components/schemas/SignRequest"},
                        "meta": {
                            "type": "object",
                            "properties": {"orderData": {"type": "string"}}
                        }
                    },
                    "required": ["transaction", "meta"]
                }}}
            }
        },
        "schemas": schemas(),
    })
}

fn schemas() -> Value {
    json!({
        "Address": address_schema(),
        "SwapRequest": {
            "type": "object",
            "properties": {
                "chainId": {"type": "number", "example": 8453},
                "sellToken": {"type": "string", "description": "Symbol or address of the token to sell."},
                "buyToken": {"type": "string", "description": "Symbol or address of the token to buy."},
                "sellAmountBeforeFee": {"type": "string", "description": "Decimal amount in token units. Not atoms."},
                "safeAddress": {"$ref": "#/components/schemas/Address"}
            },
            "required": ["chainId", "sellToken", "buyToken", "sellAmountBeforeFee", "safeAddress"]
        },
        "MetaTransaction": {
            "type": "object",
            "properties": {
                "from": {"$ref": "#/components/schemas/Address"},
                "to": {"$ref": "#/components/schemas/Address"},
                "data": {"type": "string", "description": "Hex calldata"},
                "value": {"type": "string", "description": "Hex wei amount"}
            },
            "required": ["to", "data", "value"]
        },
        "SignRequest": {
            "type": "object",
            "properties": {
                "method": {"type": "string", "enum": ["eth_sendTransaction"]},
                "chainId": {"type": "integer"},
                "params": {"type": "array", "items": {"$ref": "#/components/schemas/MetaTransaction"}}
            },
            "required": ["method", "chainId", "params"]
        },
        "TokenBalance": {
            "type": "object",
            "properties": {
                "tokenAddress": {"$ref": "#/components/schemas/Address"},
                "balance": {"type": "string"},
                "token": {
                    "type": "object",
                    "properties": {
                        "symbol": {"type": "string"},
                        "decimals": {"type": "integer"},
                        "name": {"type": "string"}
                    }
                },
                "value": {"type": "number", "description": "USD value"}
            }
        },
        "Error": {
            "type": "object",
            "properties": {
                "error": {"type": "string"},
                "code": {"type": "string"}
            },
            "required": ["error", "code"]
        }
    })
}

pub fn plugin_manifest(base_url: &str, account_id: Option<&str>) -> Value {
    let url = base_url.trim_end_matches('/');
    let assistant = json!({
        "name": "Uniswap Assistant",
        "description": "An assistant that generates transaction data for Uniswap V3 Interactions",
        "instructions": format!("{ASSISTANT_INSTRUCTIONS} Native asset address: {}.", NATIVE_ASSET.to_checksum(None)),
        "tools": [{"type": "generate-evm-tx"}],
        "image": format!("{url}/uniswap.svg"),
    });
    let mut x_mb = serde_json::Map::new();
    if let Some(id) = account_id {
        x_mb.insert("account-id".into(), json!(id));
    }
    x_mb.insert("assistant".into(), assistant);

    json!({
        "openapi": "3.0.0",
        "info": {
            "title": "Bitte Uniswap Agent",
            "description": "API for interactions with Uniswap V3",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "servers": [{"url": url}],
        "x-mb": x_mb,
        "paths": paths(),
        "components": components(),
    })
}
