use bitcoin::{Amount, Network as BitcoinNetwork, Txid};

use crate::error::Result;
use crate::types::{AssembledTransaction, SigningInput};

/// getaddressinfo の script が witness_v0_keyhash のときだけ redeem script を使う
pub const WITNESS_V0_KEYHASH: &str = "witness_v0_keyhash";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainInfo {
    pub network: BitcoinNetwork,
    pub blocks: u64,
}

/// gettxout の結果のうち必要な部分
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutInfo {
    pub value: Amount,
    pub script_pubkey_hex: String,
    pub addresses: Vec<String>,
}

/// getaddressinfo の結果のうち必要な部分
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressInfo {
    pub is_script: bool,
    pub script: Option<String>,
    pub hex: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignResult {
    pub hex: String,
    pub complete: bool,
}

// 実装は rpc::BitcoinRpc。テストでは fake::FakeNode を使う。
pub trait ChainQuery {
    fn chain_info(&self) -> Result<ChainInfo>;

    /// 使用済み、または存在しない出力は `None`
    fn tx_out(&self, txid: &Txid, index: u32) -> Result<Option<TxOutInfo>>;

    fn address_info(&self, address: &str) -> Result<AddressInfo>;

    /// ブロック高 `height` のブロック内で `position` 番目のトランザクションID
    fn block_txid(&self, height: u32, position: u32) -> Result<Txid>;
}

pub trait NodeSigner {
    fn create_raw_transaction(&self, tx: &AssembledTransaction) -> Result<String>;

    fn sign_raw_transaction_with_key(
        &self,
        raw_hex: &str,
        inputs: &[SigningInput],
        private_keys_wif: &[String],
        sighash: &str,
    ) -> Result<SignResult>;

    fn send_raw_transaction(&self, signed_hex: &str) -> Result<Txid>;
}
