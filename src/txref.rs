use bitcoin::Network as BitcoinNetwork;
use bitcoin::bech32::primitives::decode::CheckedHrpstring;
use bitcoin::bech32::{Bech32, Bech32m, Fe32};

use crate::error::{AppError, Result};

const HRP_MAINNET: &str = "tx";
const HRP_TESTNET: &str = "txtest";

const MAGIC_MAINNET: u8 = 0x03;
const MAGIC_MAINNET_EXTENDED: u8 = 0x04;
const MAGIC_TESTNET: u8 = 0x06;
const MAGIC_TESTNET_EXTENDED: u8 = 0x07;

// データ部 (チェックサム除く) の記号数
//   tx1:rqqq-qqqq-qwtv-vjr        txref    : magic, version+height(24bit), position(15bit)
//   tx1:yqqq-qqqq-qqqq-rvum-0c    txrefext : 上記 + txoIndex(15bit)
pub const DATA_LEN: usize = 9;
pub const DATA_LEN_EXTENDED: usize = 12;
const CHECKSUM_LEN: usize = 6;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TxrefNetwork {
    Mainnet,
    Testnet,
}

impl TxrefNetwork {
    /// testnet 形式の txref は signet/regtest でも使われる
    pub fn matches(&self, network: BitcoinNetwork) -> bool {
        match self {
            TxrefNetwork::Mainnet => network == BitcoinNetwork::Bitcoin,
            TxrefNetwork::Testnet => network != BitcoinNetwork::Bitcoin,
        }
    }
}

/// txref が指すチェーン上の位置
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TxrefLocation {
    pub network: TxrefNetwork,
    pub height: u32,
    pub position: u32,
    /// 拡張形式 (txrefext) のときだけ Some
    pub txo_index: Option<u32>,
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, '-' | ':') && !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// txref らしい文字列ならデータ部の記号数 (チェックサム除く) を返す。
pub fn data_symbol_count(s: &str) -> Option<usize> {
    let normalized = normalize(s);
    let (hrp, rest) = normalized.rsplit_once('1')?;
    if hrp != HRP_MAINNET && hrp != HRP_TESTNET {
        return None;
    }
    rest.len().checked_sub(CHECKSUM_LEN)
}

pub fn decode(txref: &str) -> Result<TxrefLocation> {
    let normalized = normalize(txref);
    // 初期の txref は bech32、BIP-136 の改訂後は bech32m
    let checked = CheckedHrpstring::new::<Bech32m>(&normalized)
        .or_else(|_| CheckedHrpstring::new::<Bech32>(&normalized))
        .map_err(|e| AppError::Txref(format!("{}: {}", txref, e)))?;

    let hrp = checked.hrp().to_string();
    let data = checked
        .data_part_ascii_no_checksum()
        .iter()
        .map(|&c| Fe32::from_char(char::from(c)).map(|fe| fe.to_u8()))
        .collect::<std::result::Result<Vec<u8>, _>>()
        .map_err(|e| AppError::Txref(format!("{}: {}", txref, e)))?;

    if data.len() != DATA_LEN && data.len() != DATA_LEN_EXTENDED {
        return Err(AppError::Txref(format!(
            "{}: データ部の長さが不正です ({})",
            txref,
            data.len()
        )));
    }
    let extended = data.len() == DATA_LEN_EXTENDED;

    let network = match (hrp.as_str(), data[0], extended) {
        (HRP_MAINNET, MAGIC_MAINNET, false) | (HRP_MAINNET, MAGIC_MAINNET_EXTENDED, true) => {
            TxrefNetwork::Mainnet
        }
        (HRP_TESTNET, MAGIC_TESTNET, false) | (HRP_TESTNET, MAGIC_TESTNET_EXTENDED, true) => {
            TxrefNetwork::Testnet
        }
        (h, magic, _) => {
            return Err(AppError::Txref(format!(
                "{}: HRP {} とマジックコード {} の組み合わせが不正です",
                txref, h, magic
            )));
        }
    };

    if data[1] & 0x01 != 0 {
        return Err(AppError::Txref(format!("{}: 未対応のバージョンです", txref)));
    }

    let d: Vec<u32> = data.iter().map(|&b| u32::from(b)).collect();
    let height = (d[1] >> 1) | (d[2] << 4) | (d[3] << 9) | (d[4] << 14) | (d[5] << 19);
    let position = d[6] | (d[7] << 5) | (d[8] << 10);
    let txo_index = extended.then(|| d[9] | (d[10] << 5) | (d[11] << 10));

    log::debug!(
        "txrefデコード: {} -> height={}, position={}, txoIndex={:?}",
        txref, height, position, txo_index
    );

    Ok(TxrefLocation { network, height, position, txo_index })
}

// テストで txref を組み立てるためのエンコーダ
#[cfg(test)]
pub use encoding::encode;

#[cfg(test)]
pub mod encoding {
    use bitcoin::bech32::primitives::iter::Fe32IterExt;
    use bitcoin::bech32::{Bech32m, Fe32, Hrp};

    use super::*;

    pub const MAX_HEIGHT: u32 = (1 << 24) - 1;
    pub const MAX_POSITION: u32 = (1 << 15) - 1;
    pub const MAX_TXO_INDEX: u32 = (1 << 15) - 1;

    fn hrp_for(network: TxrefNetwork) -> &'static str {
        match network {
            TxrefNetwork::Mainnet => HRP_MAINNET,
            TxrefNetwork::Testnet => HRP_TESTNET,
        }
    }

    pub fn encode(location: &TxrefLocation) -> Result<String> {
        let TxrefLocation { network, height, position, txo_index } = *location;
        if height > MAX_HEIGHT || position > MAX_POSITION || txo_index.is_some_and(|i| i > MAX_TXO_INDEX) {
            return Err(AppError::Txref(format!("範囲外の値です: {:?}", location)));
        }

        let magic = match (network, txo_index.is_some()) {
            (TxrefNetwork::Mainnet, false) => MAGIC_MAINNET,
            (TxrefNetwork::Mainnet, true) => MAGIC_MAINNET_EXTENDED,
            (TxrefNetwork::Testnet, false) => MAGIC_TESTNET,
            (TxrefNetwork::Testnet, true) => MAGIC_TESTNET_EXTENDED,
        };

        let mut data = vec![
            u32::from(magic),
            (height & 0x0F) << 1,
            (height >> 4) & 0x1F,
            (height >> 9) & 0x1F,
            (height >> 14) & 0x1F,
            (height >> 19) & 0x1F,
            position & 0x1F,
            (position >> 5) & 0x1F,
            (position >> 10) & 0x1F,
        ];
        if let Some(index) = txo_index {
            data.extend([index & 0x1F, (index >> 5) & 0x1F, (index >> 10) & 0x1F]);
        }

        let hrp = Hrp::parse(hrp_for(network)).map_err(|e| AppError::Txref(e.to_string()))?;
        let fes = data
            .into_iter()
            .map(|v| Fe32::try_from(v as u8))
            .collect::<std::result::Result<Vec<Fe32>, _>>()
            .map_err(|e| AppError::Txref(e.to_string()))?;
        let plain: String = fes.into_iter().with_checksum::<Bech32m>(&hrp).chars().collect();

        // "tx1rqqq..." -> "tx1:rqqq-qqqq-..."
        let body = &plain[hrp_for(network).len() + 1..];
        let groups: Vec<String> = body
            .as_bytes()
            .chunks(4)
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect();
        Ok(format!("{}1:{}", hrp_for(network), groups.join("-")))
    }
}
