use clap::Parser;
use std::path::PathBuf;

use crate::amount::btc_to_amount;
use crate::error::Result;
use crate::types::{DidRequest, Identifier};

/// BTCR DID を作成する: 入力のUTXOを使い、おつりを出力アドレスへ、DDO参照を OP_RETURN に書き込む。
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
pub struct CliArgs {
    /// RPCホスト (デフォルト: 127.0.0.1)
    #[clap(long)]
    pub rpchost: Option<String>,

    /// RPCユーザー
    #[clap(long)]
    pub rpcuser: Option<String>,

    /// RPCパスワード
    #[clap(long)]
    pub rpcpassword: Option<String>,

    /// RPCポート (デフォルト: 8332 と 18332 を順に試す)
    #[clap(long)]
    pub rpcport: Option<u16>,

    /// bitcoin.conf のフルパス (デフォルト: <homedir>/.bitcoin/bitcoin.conf)
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// 入力トランザクションのどのTXOを使うか
    #[clap(long = "txoIndex", visible_alias = "txo-index", default_value_t = 0)]
    pub txo_index: u32,

    /// トランザクションをブロックチェーンに送信する以外のすべてを行う
    #[clap(short = 'n', long)]
    pub dryrun: bool,

    /// 入力: BTCアドレス、txid、txref、txrefext。手数料より少し多い未使用残高が必要
    pub input: String,

    /// 出力BTCアドレス: おつりを受け取り、DIDの基礎になる
    pub output_address: String,

    /// 秘密鍵 (WIF形式)
    pub private_key: String,

    /// 支払う手数料 (BTC、目安: >0.001)
    pub fee: String,

    /// DIDに含めるDDOへの参照 (省略可)
    pub ddo_ref: Option<String>,
}

impl CliArgs {
    pub fn into_request(self, identifier: Identifier) -> Result<DidRequest> {
        Ok(DidRequest {
            identifier,
            txo_index: self.txo_index,
            output_address: self.output_address,
            private_key_wif: self.private_key,
            fee: btc_to_amount(&self.fee)?,
            ddo_ref: self.ddo_ref.unwrap_or_default(),
            dry_run: self.dryrun,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::Amount;

    #[test]
    fn test_parse_positional_and_flags() {
        let args = CliArgs::try_parse_from([
            "create-btcr-did",
            "-n",
            "--txoIndex",
            "2",
            "--rpcuser",
            "u",
            "tx1:rqqq-qqqq-qwtv-vjr",
            "mipcBbFg9gMiCh81Kj8tqqdgoZub1ZJRfn",
            "cVt4o7BGAig1UXywgGSmARhxMdzP5qvQsxKkSsc1XEkw3tDTQFpy",
            "0.001",
            "https://example.com/ddo.jsonld",
        ])
        .unwrap();
        assert!(args.dryrun);
        assert_eq!(args.txo_index, 2);
        assert_eq!(args.rpcuser.as_deref(), Some("u"));
        assert_eq!(args.ddo_ref.as_deref(), Some("https://example.com/ddo.jsonld"));

        let req = args
            .into_request(Identifier::Txref("tx1:rqqq-qqqq-qwtv-vjr".to_string()))
            .unwrap();
        assert_eq!(req.fee, Amount::from_sat(100_000));
        assert_eq!(req.txo_index, 2);
        assert!(req.dry_run);
    }

    #[test]
    fn test_ddo_ref_is_optional() {
        let args = CliArgs::try_parse_from([
            "create-btcr-did",
            "--txo-index",
            "1",
            "f8cdaff3ebd9e862ed5885f8975489090595abe1470397f79780ead1c7528107",
            "mipcBbFg9gMiCh81Kj8tqqdgoZub1ZJRfn",
            "cVt4o7BGAig1UXywgGSmARhxMdzP5qvQsxKkSsc1XEkw3tDTQFpy",
            "0.001",
        ])
        .unwrap();
        assert_eq!(args.txo_index, 1);
        let req = args
            .into_request(Identifier::Txid(
                "f8cdaff3ebd9e862ed5885f8975489090595abe1470397f79780ead1c7528107".to_string(),
            ))
            .unwrap();
        assert_eq!(req.ddo_ref, "");
        assert!(!req.dry_run);
    }

    #[test]
    fn test_missing_positionals_is_error() {
        assert!(CliArgs::try_parse_from(["create-btcr-did", "only-one"]).is_err());
    }

    #[test]
    fn test_bad_fee_is_error() {
        let args = CliArgs::try_parse_from([
            "create-btcr-did",
            "f8cdaff3ebd9e862ed5885f8975489090595abe1470397f79780ead1c7528107",
            "mipcBbFg9gMiCh81Kj8tqqdgoZub1ZJRfn",
            "cVt4o7BGAig1UXywgGSmARhxMdzP5qvQsxKkSsc1XEkw3tDTQFpy",
            "lots",
        ])
        .unwrap();
        assert!(args.into_request(Identifier::Txid(String::new())).is_err());
    }
}
