use std::str::FromStr;
use bitcoin::Address;
use bitcoin::address::NetworkUnchecked;

use crate::error::{AppError, Result};
use crate::txref;
use crate::types::Identifier;

const TXID_HEX_LEN: usize = 64;

/// 入力文字列がアドレス、txid、txref、txrefext のどれかを判定する。
pub fn classify(input: &str) -> Result<Identifier> {
    let s = input.trim();

    if s.len() == TXID_HEX_LEN && s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Ok(Identifier::Txid(s.to_string()));
    }

    if let Some(count) = txref::data_symbol_count(s) {
        return match count {
            txref::DATA_LEN => Ok(Identifier::Txref(s.to_string())),
            txref::DATA_LEN_EXTENDED => Ok(Identifier::TxrefExt(s.to_string())),
            n => Err(AppError::Txref(format!(
                "{}: データ部の長さが txref/txrefext のどちらにも一致しません ({})",
                s, n
            ))),
        };
    }

    if Address::<NetworkUnchecked>::from_str(s).is_ok() {
        return Ok(Identifier::Address(s.to_string()));
    }

    Err(AppError::UnrecognizedIdentifier(s.to_string()))
}
