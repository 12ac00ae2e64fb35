// Big-integer wei arithmetic. USD-denominated values stay `f64`/`Decimal`
// for display (spec.md §9 DESIGN NOTES); anything that ends up as an
// on-chain amount goes through `U256` here.
use ethers_core::types::U256;

/// `floor(to_amount * (100 - slippage_pct) / 100)`, spec.md §4.1.
/// `slippage_pct` is expressed in whole/fractional percent (e.g. `1.0` = 1%).
pub fn min_to_amount(to_amount: U256, slippage_pct: f64) -> U256 {
    let slippage_bps = slippage_bps(slippage_pct);
    let keep_bps = 10_000u64.saturating_sub(slippage_bps);
    to_amount * U256::from(keep_bps) / U256::from(10_000u64)
}

/// `floor(slippage_pct * 100)`, i.e. basis points, spec.md §4.1.
pub fn slippage_bps(slippage_pct: f64) -> u64 {
    (slippage_pct * 100.0).floor().max(0.0) as u64
}

/// `floor((total_fee_usd / eth_price_usd) * 10^18)`, spec.md §4.5.
/// USD inputs are floats (display precision); the floor into wei is taken
/// once, at the boundary, and everything past that point is integer math.
pub fn usd_to_wei(usd: f64, eth_price_usd: f64) -> U256 {
    if eth_price_usd <= 0.0 || usd <= 0.0 {
        return U256::zero();
    }
    let eth = usd / eth_price_usd;
    // 10^18 as f64 loses no precision for values representable exactly as
    // integers up to 2^53; beyond that we fall back to string-based
    // scaling to stay exact for larger amounts.
    let scaled = eth * 1e18;
    if scaled.is_finite() && scaled < 9e15 {
        U256::from(scaled.floor() as u128)
    } else {
        decimal_to_wei(eth)
    }
}

/// Converts a floating-point "whole units" quantity into wei via a
/// fixed-point decimal string, avoiding `f64` precision loss for larger
/// magnitudes than [`usd_to_wei`]'s fast path handles.
fn decimal_to_wei(whole_units: f64) -> U256 {
    let scaled = format!("{:.18}", whole_units).replace('.', "");
    let trimmed = scaled.trim_start_matches('0');
    if trimmed.is_empty() {
        U256::zero()
    } else {
        U256::from_dec_str(trimmed).unwrap_or_default()
    }
}

/// Splits `total_fee_wei` into `(referrer_wei, treasury_wei)` using
/// integer math: `referrer = total * floor(referrer_share * 100) / 100`,
/// `treasury = total - referrer` (spec.md §4.5). Invariant:
/// `referrer + treasury == total` exactly.
pub fn split_fee(total_fee_wei: U256, referrer_share: f64) -> (U256, U256) {
    let share_hundredths = (referrer_share * 100.0).floor().max(0.0) as u64;
    let referrer = total_fee_wei * U256::from(share_hundredths) / U256::from(100u64);
    let treasury = total_fee_wei - referrer;
    (referrer, treasury)
}

/// `raw_amount / 10^decimals` as an `f64` human-readable quantity. Used to
/// derive `Token::human_amount` from `rawAmountHex` when a client submits
/// dust tokens without a separate human-readable amount (spec.md §4.9 lists
/// only `{address, symbol, decimals, rawAmountHex, priceUSD}` for supplied
/// dust tokens; `humanAmount` is reconstructed from the raw amount per the
/// Token invariant in spec.md §3). Display-only, not used for wei math.
pub fn raw_to_human(raw_amount: U256, decimals: u8) -> f64 {
    let divisor = 10f64.powi(decimals as i32);
    if divisor <= 0.0 {
        return 0.0;
    }
    raw_amount.to_string().parse::<f64>().unwrap_or(0.0) / divisor
}

/// Rounds a gas estimate up to the nearest multiple of `step` (spec.md
/// §4.4's "gasLimit rounded up").
pub fn round_up_gas(gas: U256, step: u64) -> U256 {
    let step = U256::from(step.max(1));
    let remainder = gas % step;
    if remainder.is_zero() {
        gas
    } else {
        gas + (step - remainder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_to_amount_matches_s1() {
        let to_amount = U256::from(6_000_000_000_000u64);
        assert_eq!(min_to_amount(to_amount, 1.0), U256::from(5_940_000_000_000u64));
    }

    #[test]
    fn fee_split_matches_s2() {
        let total_fee_wei = U256::from(666_666_666u64);
        let (referrer, treasury) = split_fee(total_fee_wei, 0.7);
        assert_eq!(referrer, U256::from(466_666_666u64));
        assert_eq!(treasury, U256::from(200_000_000u64));
        assert_eq!(referrer + treasury, total_fee_wei);
    }

    #[test]
    fn usd_to_wei_matches_s2() {
        let wei = usd_to_wei(0.000_002, 3000.0);
        assert_eq!(wei, U256::from(666_666_666u64));
    }

    #[test]
    fn raw_to_human_matches_s1_dust_token() {
        // rawAmountHex 0xF4240 = 1_000_000 at 6 decimals -> 1.0 human unit.
        let human = raw_to_human(U256::from(0xF4240u64), 6);
        assert!((human - 1.0).abs() < 1e-9);
    }

    #[test]
    fn no_referral_treasury_equals_total() {
        let total_fee_wei = U256::from(123_456u64);
        let (referrer, treasury) = split_fee(U256::zero(), 0.0);
        assert_eq!(referrer, U256::zero());
        assert_eq!(treasury, U256::zero());
        assert_eq!(total_fee_wei - U256::zero(), total_fee_wei);
    }
}
