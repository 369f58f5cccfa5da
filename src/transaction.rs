use std::collections::BTreeMap;
use std::str::FromStr;

use bitcoin::{
    consensus::encode, network::Network as BitcoinNetwork, Address, Amount, PrivateKey,
    Transaction,
};

use crate::{
    chain::{ChainQuery, NodeSigner},
    error::{AppError, Result},
    payload::encode_op_return_data,
    resolver,
    types::{
        AssembledTransaction, DidOutcome, DidRequest, OutputValue, ResolvedInput, SigningInput,
        DATA_OUTPUT_KEY,
    },
};

// Bitcoin Coreのデフォルトダスト閾値 (P2PKH/P2WPKH出力に対して)
const DUST_THRESHOLD_SATS: u64 = 546;

const SIGHASH_ALL: &str = "ALL";

/// 解決済みUTXOからおつりを計算し、入力1つ・出力2つのトランザクション要求を作る。
///
/// 出力アドレスの形式チェックはここでは行わない (呼び出し側とノードに任せる)。
pub fn assemble(
    input: &ResolvedInput,
    output_address: &str,
    fee: Amount,
    ddo_ref: &str,
) -> Result<AssembledTransaction> {
    let change = input.amount.checked_sub(fee).ok_or(AppError::InsufficientFunds {
        available: input.amount.to_sat(),
        fee: fee.to_sat(),
    })?;

    if change.to_sat() < DUST_THRESHOLD_SATS {
        log::warn!(
            "おつり {} sats はダスト閾値 {} sats 未満です。ノードに拒否される可能性があります。",
            change.to_sat(),
            DUST_THRESHOLD_SATS
        );
    }
    if output_address == DATA_OUTPUT_KEY {
        return Err(AppError::InputValidation(format!(
            "出力アドレスに予約キー \"{}\" は使えません",
            DATA_OUTPUT_KEY
        )));
    }

    let mut outputs = BTreeMap::new();
    outputs.insert(output_address.to_string(), OutputValue::Amount(change));
    outputs.insert(
        DATA_OUTPUT_KEY.to_string(),
        OutputValue::Data(encode_op_return_data(ddo_ref)?),
    );

    log::debug!(
        "おつり計算: {} - {} = {} sats -> {}",
        input.amount.to_sat(),
        fee.to_sat(),
        change.to_sat(),
        output_address
    );

    Ok(AssembledTransaction { inputs: vec![input.out_point], outputs })
}

fn validate_private_key(wif: &str, network: BitcoinNetwork) -> Result<()> {
    let private_key = PrivateKey::from_wif(wif).map_err(AppError::BitcoinKey)?;
    if private_key.network != network.into() {
        return Err(AppError::NetworkMismatch {
            node_network: format!("{:?}", network),
            subject: "WIF",
            inferred_network: format!("{:?}", private_key.network),
        });
    }
    Ok(())
}

fn validate_output_address(address: &str, network: BitcoinNetwork) -> Result<()> {
    Address::from_str(address)?
        .require_network(network)
        .map_err(|_| AppError::NetworkMismatch {
            node_network: format!("{:?}", network),
            subject: "出力アドレス",
            inferred_network: address.to_string(),
        })?;
    Ok(())
}

/// 署名済みトランザクション内の OP_RETURN 出力の位置
fn data_output_index(signed_hex: &str) -> Result<usize> {
    let tx: Transaction = encode::deserialize_hex(signed_hex)?;
    tx.output
        .iter()
        .position(|out| out.script_pubkey.is_op_return())
        .ok_or_else(|| AppError::Internal("署名済みトランザクションに OP_RETURN 出力がありません".to_string()))
}

/// UTXOの特定から署名、(dry run でなければ) 送信までを行う。
pub fn create_did_transaction<N>(request: &DidRequest, node: &N) -> Result<DidOutcome>
where
    N: ChainQuery + NodeSigner + ?Sized,
{
    log::info!("DIDトランザクション作成処理を開始します。");
    resolver::ensure_supported(&request.identifier)?;

    let chain = node.chain_info()?;
    log::debug!("ノードのネットワーク: {:?}, ブロック数: {}", chain.network, chain.blocks);

    validate_private_key(&request.private_key_wif, chain.network)?;
    validate_output_address(&request.output_address, chain.network)?;

    // 1. 入力から使用可能な残高を取得
    let resolved = resolver::resolve(&request.identifier, request.txo_index, chain.network, node)?;
    log::debug!(
        "署名対象の入力: {} (address={}, redeemScript={:?})",
        resolved.out_point,
        resolved.holding_address,
        resolved.redeem_script_hex
    );

    // 2. おつりを計算してトランザクションを組み立てる
    let assembled = assemble(&resolved, &request.output_address, request.fee, &request.ddo_ref)?;
    let raw_transaction = node.create_raw_transaction(&assembled)?;
    log::debug!("Raw transaction hex: {}", raw_transaction);

    // 3. 秘密鍵で署名
    log::info!("トランザクション署名処理を開始します。");
    let signed = node.sign_raw_transaction_with_key(
        &raw_transaction,
        &[SigningInput::from(&resolved)],
        std::slice::from_ref(&request.private_key_wif),
        SIGHASH_ALL,
    )?;
    if signed.hex.is_empty() || !signed.complete {
        return Err(AppError::SigningFailure);
    }
    log::info!("署名済みトランザクションの生成に成功しました。");

    if request.dry_run {
        log::info!("dry run のためネットワークへの送信は行いません。");
        return Ok(DidOutcome::DryRun { signed_hex: signed.hex });
    }

    // 4. ネットワークへ送信
    let txo_index = data_output_index(&signed.hex)?;
    let txid = node.send_raw_transaction(&signed.hex)?;
    log::info!("トランザクションを送信しました: txid={}, OP_RETURN txoIndex={}", txid, txo_index);

    Ok(DidOutcome::Submitted { txid, txo_index })
}
