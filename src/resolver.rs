use std::str::FromStr;

use bitcoin::{Amount, Network as BitcoinNetwork, OutPoint, Txid};

use crate::chain::{ChainQuery, WITNESS_V0_KEYHASH};
use crate::error::{AppError, Result};
use crate::txref::{self, TxrefLocation};
use crate::types::{Identifier, ResolvedInput};

/// アドレスからのDID作成は意図的に無効にしている。ノードに問い合わせる前に弾く。
pub fn ensure_supported(identifier: &Identifier) -> Result<()> {
    match identifier {
        Identifier::Address(address) => Err(AppError::UnsupportedIdentifierKind(address.clone())),
        _ => Ok(()),
    }
}

pub fn resolve<C: ChainQuery + ?Sized>(
    identifier: &Identifier,
    explicit_index: u32,
    network: BitcoinNetwork,
    chain: &C,
) -> Result<ResolvedInput> {
    let out_point = match identifier {
        Identifier::Address(address) => {
            return Err(AppError::UnsupportedIdentifierKind(address.clone()));
        }
        Identifier::Txid(s) => {
            let txid = Txid::from_str(s)
                .map_err(|e| AppError::InputValidation(format!("無効なTXID形式 ({}): {}", s, e)))?;
            OutPoint::new(txid, explicit_index)
        }
        // 短い txref は出力インデックスを持たないのでコマンドラインの値を使う
        Identifier::Txref(s) => {
            let location = decode_for_network(s, network)?;
            let txid = chain.block_txid(location.height, location.position)?;
            OutPoint::new(txid, explicit_index)
        }
        // txrefext に埋め込まれたインデックスはコマンドラインの値より優先
        Identifier::TxrefExt(s) => {
            let location = decode_for_network(s, network)?;
            let index = location
                .txo_index
                .ok_or_else(|| AppError::Txref(format!("{}: 出力インデックスを含んでいません", s)))?;
            if index != explicit_index && explicit_index != 0 {
                log::warn!(
                    "txrefext の txoIndex {} を使用します (指定された {} は無視されます)",
                    index, explicit_index
                );
            }
            let txid = chain.block_txid(location.height, location.position)?;
            OutPoint::new(txid, index)
        }
    };

    log::debug!("{} {} -> {}", identifier.kind(), identifier.as_str(), out_point);
    resolve_out_point(out_point, chain)
}

fn decode_for_network(s: &str, network: BitcoinNetwork) -> Result<TxrefLocation> {
    let location = txref::decode(s)?;
    if !location.network.matches(network) {
        return Err(AppError::NetworkMismatch {
            node_network: format!("{:?}", network),
            subject: "txref",
            inferred_network: format!("{:?}", location.network),
        });
    }
    Ok(location)
}

/// すべての識別子に共通の検証
fn resolve_out_point<C: ChainQuery + ?Sized>(out_point: OutPoint, chain: &C) -> Result<ResolvedInput> {
    let OutPoint { txid, vout: index } = out_point;

    let tx_out = chain
        .tx_out(&txid, index)?
        .filter(|out| out.value > Amount::ZERO)
        .ok_or(AppError::OutputNotFound { txid, index })?;

    // 署名者を一意に決めるため、ちょうど1つのアドレスが必要
    let [holding_address] = <[String; 1]>::try_from(tx_out.addresses).map_err(|addresses| {
        AppError::AmbiguousOwnership { txid, index, count: addresses.len() }
    })?;

    let address_info = chain.address_info(&holding_address)?;
    let redeem_script_hex =
        if address_info.is_script && address_info.script.as_deref() == Some(WITNESS_V0_KEYHASH) {
            let hex = address_info.hex.ok_or_else(|| {
                AppError::ChainQuery(format!(
                    "getaddressinfo {} が redeem script の hex を返しませんでした",
                    holding_address
                ))
            })?;
            Some(hex)
        } else {
            None
        };

    log::info!(
        "UTXOを特定しました: txid={}, txoIndex={}, address={}, value={} sats",
        txid,
        index,
        holding_address,
        tx_out.value.to_sat()
    );

    Ok(ResolvedInput {
        out_point,
        holding_address,
        redeem_script_hex,
        script_pubkey_hex: tx_out.script_pubkey_hex,
        amount: tx_out.value,
    })
}
