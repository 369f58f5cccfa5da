use bitcoin::{Network as BitcoinNetwork, Txid};
use bitcoincore_rpc::{Auth, Client, RpcApi};
use serde::Deserialize;
use serde_json::json;

use crate::amount::value_to_amount;
use crate::chain::{AddressInfo, ChainInfo, ChainQuery, NodeSigner, SignResult, TxOutInfo};
use crate::config::RpcConfig;
use crate::error::{AppError, Result};
use crate::types::{AssembledTransaction, SigningInput};

#[derive(Debug, Deserialize)]
struct BlockchainInfoResponse {
    chain: String,
    blocks: u64,
}

impl TryFrom<BlockchainInfoResponse> for ChainInfo {
    type Error = AppError;

    fn try_from(r: BlockchainInfoResponse) -> Result<Self> {
        let network = BitcoinNetwork::from_core_arg(&r.chain)
            .map_err(|e| AppError::ChainQuery(format!("不明なチェーン {}: {}", r.chain, e)))?;
        Ok(ChainInfo { network, blocks: r.blocks })
    }
}

#[derive(Debug, Deserialize)]
struct ScriptPubKeyResponse {
    hex: String,
    // Bitcoin Core 22 以降は単数の address、それ以前は addresses 配列
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    addresses: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TxOutResponse {
    value: serde_json::Number,
    script_pub_key: ScriptPubKeyResponse,
}

impl TryFrom<TxOutResponse> for TxOutInfo {
    type Error = AppError;

    fn try_from(r: TxOutResponse) -> Result<Self> {
        let mut addresses = r.script_pub_key.addresses;
        if let Some(address) = r.script_pub_key.address {
            if !addresses.contains(&address) {
                addresses.push(address);
            }
        }
        Ok(TxOutInfo {
            value: value_to_amount(&r.value)?,
            script_pubkey_hex: r.script_pub_key.hex,
            addresses,
        })
    }
}

#[derive(Debug, Deserialize)]
struct AddressInfoResponse {
    #[serde(default, rename = "isscript")]
    is_script: bool,
    #[serde(default)]
    script: Option<String>,
    #[serde(default)]
    hex: Option<String>,
}

impl From<AddressInfoResponse> for AddressInfo {
    fn from(r: AddressInfoResponse) -> Self {
        AddressInfo { is_script: r.is_script, script: r.script, hex: r.hex }
    }
}

#[derive(Debug, Deserialize)]
struct SignResponse {
    #[serde(default)]
    hex: String,
    #[serde(default)]
    complete: bool,
}

/// Bitcoin Core RPC クライアント
pub struct BitcoinRpc {
    client: Client,
}

impl BitcoinRpc {
    pub fn new(url: &str, config: &RpcConfig) -> Result<Self> {
        let auth = Auth::UserPass(config.user.clone(), config.password.clone());
        let client =
            Client::new(url, auth).map_err(|e| AppError::ChainQuery(format!("{}: {}", url, e)))?;
        Ok(Self { client })
    }

    /// 候補のエンドポイントに順に接続し、最初に getblockchaininfo に応答したものを使う。
    pub fn connect(config: &RpcConfig) -> Result<Self> {
        let mut last_err = None;
        for url in config.candidate_urls() {
            log::debug!("RPC接続を試行します: {}", url);
            let rpc = Self::new(&url, config)?;
            match rpc.chain_info() {
                Ok(info) => {
                    log::info!("RPC接続成功: {} (chain={:?}, blocks={})", url, info.network, info.blocks);
                    return Ok(rpc);
                }
                Err(e) => {
                    log::warn!("RPC接続に失敗しました: {}: {}", url, e);
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| AppError::Config("RPCの接続先がありません".to_string())))
    }
}

impl ChainQuery for BitcoinRpc {
    fn chain_info(&self) -> Result<ChainInfo> {
        let info: BlockchainInfoResponse = self.client.call("getblockchaininfo", &[])?;
        ChainInfo::try_from(info)
    }

    fn tx_out(&self, txid: &Txid, index: u32) -> Result<Option<TxOutInfo>> {
        let out: Option<TxOutResponse> =
            self.client.call("gettxout", &[json!(txid.to_string()), json!(index)])?;
        out.map(TxOutInfo::try_from).transpose()
    }

    fn address_info(&self, address: &str) -> Result<AddressInfo> {
        let info: AddressInfoResponse = self.client.call("getaddressinfo", &[json!(address)])?;
        Ok(info.into())
    }

    fn block_txid(&self, height: u32, position: u32) -> Result<Txid> {
        let hash = self.client.get_block_hash(u64::from(height))?;
        let block = self.client.get_block_info(&hash)?;
        block.tx.get(position as usize).copied().ok_or_else(|| {
            AppError::Txref(format!(
                "ブロック {} ({}) に位置 {} のトランザクションはありません (tx数: {})",
                height,
                hash,
                position,
                block.tx.len()
            ))
        })
    }
}

impl NodeSigner for BitcoinRpc {
    fn create_raw_transaction(&self, tx: &AssembledTransaction) -> Result<String> {
        Ok(self
            .client
            .call("createrawtransaction", &[tx.inputs_json(), tx.outputs_json()])?)
    }

    fn sign_raw_transaction_with_key(
        &self,
        raw_hex: &str,
        inputs: &[SigningInput],
        private_keys_wif: &[String],
        sighash: &str,
    ) -> Result<SignResult> {
        let prevtxs = serde_json::to_value(inputs)?;
        let res: SignResponse = self.client.call(
            "signrawtransactionwithkey",
            &[json!(raw_hex), json!(private_keys_wif), prevtxs, json!(sighash)],
        )?;
        Ok(SignResult { hex: res.hex, complete: res.complete })
    }

    fn send_raw_transaction(&self, signed_hex: &str) -> Result<Txid> {
        self.client
            .call("sendrawtransaction", &[json!(signed_hex)])
            .map_err(|e| AppError::BroadcastRejected(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::Amount;

    #[test]
    fn test_tx_out_response_legacy_addresses() {
        let r: TxOutResponse = serde_json::from_str(
            r#"{
                "bestblock": "00000000000000000000000000000000000000000000000000000000000000ff",
                "confirmations": 12,
                "value": 0.01,
                "scriptPubKey": {
                    "asm": "OP_DUP OP_HASH160 ...",
                    "hex": "76a914000000000000000000000000000000000000000088ac",
                    "reqSigs": 1,
                    "type": "pubkeyhash",
                    "addresses": ["mipcBbFg9gMiCh81Kj8tqqdgoZub1ZJRfn"]
                },
                "coinbase": false
            }"#,
        )
        .unwrap();
        let info = TxOutInfo::try_from(r).unwrap();
        assert_eq!(info.value, Amount::from_sat(1_000_000));
        assert_eq!(info.addresses, vec!["mipcBbFg9gMiCh81Kj8tqqdgoZub1ZJRfn".to_string()]);
        assert_eq!(info.script_pubkey_hex, "76a914000000000000000000000000000000000000000088ac");
    }

    #[test]
    fn test_tx_out_response_single_address() {
        let r: TxOutResponse = serde_json::from_str(
            r#"{
                "value": 0.00000546,
                "scriptPubKey": {
                    "hex": "0014751e76e8199196d454941c45d1b3a323f1433bd6",
                    "type": "witness_v0_keyhash",
                    "address": "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx"
                }
            }"#,
        )
        .unwrap();
        let info = TxOutInfo::try_from(r).unwrap();
        assert_eq!(info.value, Amount::from_sat(546));
        assert_eq!(info.addresses.len(), 1);
    }

    #[test]
    fn test_address_info_response() {
        let r: AddressInfoResponse = serde_json::from_str(
            r#"{
                "address": "2N8hwP1WmJrFF5QWABn38y63uYLhnJYJYTF",
                "isscript": true,
                "iswitness": false,
                "script": "witness_v0_keyhash",
                "hex": "0014751e76e8199196d454941c45d1b3a323f1433bd6"
            }"#,
        )
        .unwrap();
        let info = AddressInfo::from(r);
        assert!(info.is_script);
        assert_eq!(info.script.as_deref(), Some("witness_v0_keyhash"));

        // 非スクリプトアドレスは script/hex を持たない
        let r: AddressInfoResponse =
            serde_json::from_str(r#"{"address": "mipcBbFg9gMiCh81Kj8tqqdgoZub1ZJRfn", "isscript": false}"#)
                .unwrap();
        assert_eq!(AddressInfo::from(r), AddressInfo::default());
    }

    #[test]
    fn test_blockchain_info_network() {
        let r: BlockchainInfoResponse =
            serde_json::from_str(r#"{"chain": "test", "blocks": 1500000}"#).unwrap();
        let info = ChainInfo::try_from(r).unwrap();
        assert_eq!(info.network, BitcoinNetwork::Testnet);
        assert_eq!(info.blocks, 1_500_000);

        let r: BlockchainInfoResponse =
            serde_json::from_str(r#"{"chain": "nonsense", "blocks": 1}"#).unwrap();
        assert!(matches!(ChainInfo::try_from(r), Err(AppError::ChainQuery(_))));
    }
}
