use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::CliArgs;
use crate::error::{AppError, Result};

pub const DEFAULT_RPC_HOST: &str = "127.0.0.1";
/// ポート未指定時はメインネット、テストネットの順に試す
pub const DEFAULT_RPC_PORTS: [u16; 2] = [8332, 18332];

/// RPC接続に必要な設定。コマンドライン > 設定ファイル > デフォルト の順で決まる。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcConfig {
    pub host: String,
    pub port: Option<u16>,
    pub user: String,
    pub password: String,
}

impl RpcConfig {
    pub fn resolve(args: &CliArgs, conf: &HashMap<String, String>) -> Result<Self> {
        let host = args
            .rpchost
            .clone()
            .or_else(|| conf.get("rpcconnect").cloned())
            .or_else(|| conf.get("rpchost").cloned())
            .unwrap_or_else(|| DEFAULT_RPC_HOST.to_string());

        let port = match args.rpcport {
            Some(p) => Some(p),
            None => conf
                .get("rpcport")
                .map(|p| {
                    p.parse::<u16>()
                        .map_err(|e| AppError::Config(format!("rpcport が不正です ({}): {}", p, e)))
                })
                .transpose()?,
        };

        let user = args
            .rpcuser
            .clone()
            .or_else(|| conf.get("rpcuser").cloned())
            .ok_or_else(|| {
                AppError::Config(
                    "'rpcuser' が見つかりません。bitcoin.conf かコマンドラインを確認してください。".to_string(),
                )
            })?;
        let password = args
            .rpcpassword
            .clone()
            .or_else(|| conf.get("rpcpassword").cloned())
            .ok_or_else(|| {
                AppError::Config(
                    "'rpcpassword' が見つかりません。bitcoin.conf かコマンドラインを確認してください。".to_string(),
                )
            })?;

        Ok(RpcConfig { host, port, user, password })
    }

    pub fn candidate_urls(&self) -> Vec<String> {
        match self.port {
            Some(port) => vec![format!("http://{}:{}", self.host, port)],
            None => DEFAULT_RPC_PORTS
                .iter()
                .map(|port| format!("http://{}:{}", self.host, port))
                .collect(),
        }
    }
}

/// bitcoin.conf 形式 (key=value) を読む。`[section]` 以下のキーは無視する。
pub fn parse_bitcoin_conf(content: &str) -> HashMap<String, String> {
    let mut values = HashMap::new();
    let mut in_section = false;
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') {
            in_section = true;
            continue;
        }
        if in_section {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            // 同じキーが複数あるときは最初のものを使う (bitcoind と同じ)
            values
                .entry(key.trim().to_string())
                .or_insert_with(|| value.trim().to_string());
        }
    }
    values
}

pub fn default_conf_path(home: Option<&Path>) -> Option<PathBuf> {
    home.map(|h| h.join(".bitcoin").join("bitcoin.conf"))
}

/// 設定ファイルを読み込む。明示指定されたファイルが読めない場合はエラー、
/// デフォルトの場所のファイルが読めない場合は警告のみ。
pub fn load_conf(explicit: Option<&Path>, home: Option<&Path>) -> Result<HashMap<String, String>> {
    if let Some(path) = explicit {
        let content = fs::read_to_string(path).map_err(|e| AppError::ConfigFile {
            file_path: path.to_path_buf(),
            source: e,
        })?;
        log::debug!("設定ファイルを読み込みました: {:?}", path);
        return Ok(parse_bitcoin_conf(&content));
    }

    let Some(path) = default_conf_path(home) else {
        return Ok(HashMap::new());
    };
    match fs::read_to_string(&path) {
        Ok(content) => {
            log::debug!("設定ファイルを読み込みました: {:?}", path);
            Ok(parse_bitcoin_conf(&content))
        }
        Err(e) => {
            log::warn!(
                "設定ファイル {:?} を読み込めません ({})。--config を試してください。処理を続行します...",
                path, e
            );
            Ok(HashMap::new())
        }
    }
}
