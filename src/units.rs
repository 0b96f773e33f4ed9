//! Display helpers for token amounts

use alloy::primitives::U256;

/// Format a base-unit amount as a decimal string with `decimals` places,
/// trimming trailing zeros.
pub fn format_units(value: U256, decimals: u8) -> String {
    if value.is_zero() {
        return "0".to_string();
    }

    let divisor = U256::from(10).pow(U256::from(decimals));
    let whole = value / divisor;
    let remainder = value % divisor;

    if remainder.is_zero() {
        return whole.to_string();
    }

    let remainder_str = format!("{:0>width$}", remainder, width = decimals as usize);
    format!("{}.{}", whole, remainder_str.trim_end_matches('0'))
}
