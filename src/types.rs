use std::collections::BTreeMap;

use bitcoin::{Amount, OutPoint, Txid};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::amount::amount_to_btc;

/// createrawtransaction の出力マップで OP_RETURN を表す予約キー
pub const DATA_OUTPUT_KEY: &str = "data";

/// 入力文字列の分類結果。それぞれ元の文字列 (前後の空白除去済み) を保持する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Address(String),
    Txid(String),
    Txref(String),
    TxrefExt(String),
}

impl Identifier {
    pub fn kind(&self) -> &'static str {
        match self {
            Identifier::Address(_) => "address",
            Identifier::Txid(_) => "txid",
            Identifier::Txref(_) => "txref",
            Identifier::TxrefExt(_) => "txrefext",
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Identifier::Address(s)
            | Identifier::Txid(s)
            | Identifier::Txref(s)
            | Identifier::TxrefExt(s) => s,
        }
    }
}

/// 解決済みのUTXO。署名に必要な情報をすべて含む。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInput {
    pub out_point: OutPoint,
    pub holding_address: String,
    /// witness_v0_keyhash のスクリプトアドレスの場合のみ
    pub redeem_script_hex: Option<String>,
    pub script_pubkey_hex: String,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputValue {
    /// おつり (BTC建て10進文字列としてノードに渡す)
    Amount(Amount),
    /// OP_RETURN のペイロード (16進文字列)
    Data(String),
}

/// 署名前のトランザクション要求。入力1つ、出力2つ (おつり + OP_RETURN)。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledTransaction {
    pub inputs: Vec<OutPoint>,
    pub outputs: BTreeMap<String, OutputValue>,
}

impl AssembledTransaction {
    /// createrawtransaction の第1引数
    pub fn inputs_json(&self) -> Value {
        Value::Array(
            self.inputs
                .iter()
                .map(|op| serde_json::json!({ "txid": op.txid.to_string(), "vout": op.vout }))
                .collect(),
        )
    }

    /// createrawtransaction の第2引数
    pub fn outputs_json(&self) -> Value {
        let mut map = Map::new();
        for (key, value) in &self.outputs {
            let v = match value {
                OutputValue::Amount(amount) => Value::String(amount_to_btc(*amount)),
                OutputValue::Data(hex) => Value::String(hex.clone()),
            };
            map.insert(key.clone(), v);
        }
        Value::Object(map)
    }
}

/// signrawtransactionwithkey の prevtxs 要素
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SigningInput {
    pub txid: Txid,
    pub vout: u32,
    pub script_pub_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redeem_script: Option<String>,
    pub amount: String,
}

impl From<&ResolvedInput> for SigningInput {
    fn from(input: &ResolvedInput) -> Self {
        SigningInput {
            txid: input.out_point.txid,
            vout: input.out_point.vout,
            script_pub_key: input.script_pubkey_hex.clone(),
            redeem_script: input.redeem_script_hex.clone(),
            amount: amount_to_btc(input.amount),
        }
    }
}

/// パイプライン全体の入力。CLI/設定層で解決済みの値だけを持つ。
#[derive(Debug, Clone)]
pub struct DidRequest {
    pub identifier: Identifier,
    pub txo_index: u32,
    pub output_address: String,
    pub private_key_wif: String,
    pub fee: Amount,
    pub ddo_ref: String,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DidOutcome {
    DryRun { signed_hex: String },
    Submitted { txid: Txid, txo_index: usize },
}

/// 送信成功時に標準出力へ書き出すレポート
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub txid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub txo_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubmissionReport {
    pub fn submitted(txid: Txid, txo_index: usize) -> Self {
        SubmissionReport {
            comment: Some("transaction submitted".to_string()),
            txid: Some(txid.to_string()),
            txo_index: Some(txo_index),
            error: None,
        }
    }

    pub fn rejected() -> Self {
        SubmissionReport {
            comment: None,
            txid: None,
            txo_index: None,
            error: Some("the network did not accept our transaction".to_string()),
        }
    }
}
