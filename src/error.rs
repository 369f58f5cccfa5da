use std::path::PathBuf;
use bitcoin::Txid;
use bitcoin::address::ParseError as BitcoinAddressError;
use bitcoin::consensus::encode::FromHexError as BitcoinHexTxError;
use bitcoin::key::FromWifError as BitcoinKeyError; // WIFデコードエラー用
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/Oエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("設定ファイルの読み込みに失敗しました: {file_path:?}: {source}")]
    ConfigFile {
        file_path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("設定エラー: {0}")]
    Config(String),

    #[error("JSONエラー: {0}")]
    Json(#[from] serde_json::Error),

    // --- 入力識別子の解決 ---
    #[error("BTCアドレスからのDID作成は現在サポートされていません: {0}")]
    UnsupportedIdentifierKind(String),

    #[error("識別子を分類できません (アドレス、txid、txrefのいずれでもありません): {0}")]
    UnrecognizedIdentifier(String),

    #[error("txrefエラー: {0}")]
    Txref(String),

    #[error("txid {txid} の txoIndex {index} に利用可能な残高がありません")]
    OutputNotFound { txid: Txid, index: u32 },

    #[error("txid {txid} の txoIndex {index} のアドレスが一意に定まりません (アドレス数: {count})")]
    AmbiguousOwnership { txid: Txid, index: u32, count: usize },

    #[error("ノードへの問い合わせに失敗しました: {0}")]
    ChainQuery(String),

    // --- トランザクション構築・署名・送信 ---
    #[error("無効な金額: {0}")]
    InvalidAmount(String),

    #[error("資金不足: 利用可能額 {available} sats, 手数料 {fee} sats")]
    InsufficientFunds { available: u64, fee: u64 },

    #[error("OP_RETURNデータが大きすぎます: {size} バイト (上限 {max} バイト)")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("トランザクションに署名できませんでした。秘密鍵を確認してください。")]
    SigningFailure,

    #[error("ネットワークがトランザクションを受け付けませんでした: {0}")]
    BroadcastRejected(String),

    #[error("Bitcoinトランザクションのデコードエラー: {0}")]
    BitcoinConsensus(#[from] BitcoinHexTxError),

    #[error("Bitcoinアドレスエラー: {0}")]
    BitcoinAddress(#[from] BitcoinAddressError),

    #[error("Bitcoin秘密鍵(WIF)処理エラー: {0}")]
    BitcoinKey(#[from] BitcoinKeyError),

    #[error("ネットワーク不整合: ノード ({node_network}) vs {subject} ({inferred_network})")]
    NetworkMismatch {
        node_network: String,
        subject: &'static str,
        inferred_network: String,
    },

    #[error("入力検証エラー: {0}")]
    InputValidation(String),

    #[error("内部エラー: {0}")]
    Internal(String),
}

impl From<bitcoincore_rpc::Error> for AppError {
    fn from(e: bitcoincore_rpc::Error) -> Self {
        AppError::ChainQuery(e.to_string())
    }
}
