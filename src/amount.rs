use bitcoin::Amount;

use crate::error::{AppError, Result};

/// 1 BTC あたりの satoshi 数の桁数
const BTC_DECIMALS: usize = 8;
const SATS_PER_BTC: u64 = 100_000_000;

/// "0.001" のような10進文字列を satoshi に変換する。
///
/// 小数点以下9桁目以降は四捨五入する。
pub fn btc_to_amount(decimal: &str) -> Result<Amount> {
    let invalid = || AppError::InvalidAmount(decimal.to_string());

    let s = decimal.trim();
    let s = s.strip_prefix('+').unwrap_or(s);
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let whole_sats = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<u64>()
            .ok()
            .and_then(|w| w.checked_mul(SATS_PER_BTC))
            .ok_or_else(invalid)?
    };

    let (kept, dropped) = frac.split_at(frac.len().min(BTC_DECIMALS));
    let mut frac_sats: u64 = 0;
    for (i, digit) in kept.bytes().enumerate() {
        frac_sats += u64::from(digit - b'0') * 10u64.pow((BTC_DECIMALS - 1 - i) as u32);
    }
    if dropped.bytes().next().is_some_and(|d| d >= b'5') {
        frac_sats += 1;
    }

    let sats = whole_sats.checked_add(frac_sats).ok_or_else(invalid)?;
    if sats > Amount::MAX_MONEY.to_sat() {
        return Err(invalid());
    }
    Ok(Amount::from_sat(sats))
}

/// satoshi を "<整数部>.<8桁>" 形式のBTC文字列に戻す。
pub fn amount_to_btc(amount: Amount) -> String {
    let sats = amount.to_sat();
    format!(
        "{}.{:0width$}",
        sats / SATS_PER_BTC,
        sats % SATS_PER_BTC,
        width = BTC_DECIMALS
    )
}

/// RPC応答のJSON数値を satoshi に変換する。
///
/// serde_json は数値を最短の10進表現で再出力するため、その文字列を経由すれば
/// ノードが返した桁をそのまま整数化できる。小さな値は "5.46e-6" のような
/// 指数表記になるので、先に固定小数点へ展開する。
pub fn value_to_amount(value: &serde_json::Number) -> Result<Amount> {
    let rendered = value.to_string();
    match rendered.split_once(['e', 'E']) {
        Some((mantissa, exp)) => {
            let exp: i32 = exp
                .parse()
                .map_err(|_| AppError::InvalidAmount(rendered.clone()))?;
            btc_to_amount(&shift_decimal_point(mantissa, exp))
        }
        None => btc_to_amount(&rendered),
    }
}

fn shift_decimal_point(mantissa: &str, exp: i32) -> String {
    let (whole, frac) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits = format!("{whole}{frac}");
    let point = whole.len() as i32 + exp;
    if point <= 0 {
        format!("0.{}{}", "0".repeat(point.unsigned_abs() as usize), digits)
    } else if point as usize >= digits.len() {
        format!("{}{}", digits, "0".repeat(point as usize - digits.len()))
    } else {
        let (w, f) = digits.split_at(point as usize);
        format!("{w}.{f}")
    }
}
