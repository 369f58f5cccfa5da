use crate::error::{AppError, Result};

/// 標準ルールで許される OP_RETURN データの最大長
pub const MAX_OP_RETURN_SIZE: usize = 80;

/// DDO参照を createrawtransaction の "data" 出力用の16進文字列にする。
/// 空の参照は空のデータになる。
pub fn encode_op_return_data(ddo_ref: &str) -> Result<String> {
    let bytes = ddo_ref.as_bytes();
    if bytes.len() > MAX_OP_RETURN_SIZE {
        return Err(AppError::PayloadTooLarge {
            size: bytes.len(),
            max: MAX_OP_RETURN_SIZE,
        });
    }
    Ok(hex::encode(bytes))
}
