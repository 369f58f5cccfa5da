use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use clap::Parser;

mod amount;
mod chain;
mod classify;
mod cli;
mod config;
mod error;
mod payload;
mod resolver;
mod rpc;
mod transaction;
mod txref;
mod types;

use cli::CliArgs;
use config::RpcConfig;
use error::AppError;
use rpc::BitcoinRpc;
use types::{DidOutcome, SubmissionReport};

fn main() -> ExitCode {
    env_logger::init();

    match run() {
        Ok(()) => {
            log::info!("処理が正常に完了しました。");
            ExitCode::SUCCESS
        }
        Err(e) => {
            if let AppError::BroadcastRejected(_) = e {
                if let Ok(json) = serde_json::to_string_pretty(&SubmissionReport::rejected()) {
                    println!("{}", json);
                }
            }
            log::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), AppError> {
    let args = CliArgs::parse();
    log::info!("アプリケーションを開始します。");

    // 0. 入力の種類を判定 (アドレスはノードに接続する前に拒否)
    let identifier = classify::classify(&args.input)?;
    log::info!("入力の種類: {} ({})", identifier.kind(), identifier.as_str());
    resolver::ensure_supported(&identifier)?;

    let home = std::env::var_os("HOME").map(PathBuf::from);
    let conf = config::load_conf(args.config.as_deref(), home.as_deref())?;
    let rpc_config = RpcConfig::resolve(&args, &conf)?;
    let request = args.into_request(identifier)?;

    let rpc = BitcoinRpc::connect(&rpc_config)?;
    let outcome = transaction::create_did_transaction(&request, &rpc)?;

    let mut stdout = std::io::stdout().lock();
    match outcome {
        DidOutcome::DryRun { signed_hex } => {
            writeln!(
                stdout,
                "トランザクションの構築と署名に成功しました。Bitcoinネットワークへは送信していません。"
            )?;
            writeln!(stdout, "{}", signed_hex)?;
        }
        DidOutcome::Submitted { txid, txo_index } => {
            writeln!(
                stdout,
                "トランザクションの構築と署名に成功し、Bitcoinネットワークへ送信しました。"
            )?;
            writeln!(
                stdout,
                "数分後、以下のデータを txid2txref に渡すと txref と DID を計算できます。"
            )?;
            serde_json::to_writer_pretty(&mut stdout, &SubmissionReport::submitted(txid, txo_index))?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}
