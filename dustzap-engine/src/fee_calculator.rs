// Fee Calculator (C5): splits the platform fee into referrer/treasury
// shares using integer wei math (spec.md §4.5).
use dustzap_common::wei::{split_fee, usd_to_wei};
use dustzap_common::FeeInfo;
use ethers_core::types::U256;

pub struct FeeConfig {
    pub platform_fee_rate: f64,
    pub referrer_share: f64,
    pub treasury_address: String,
}

pub struct FeeCalculator {
    config: FeeConfig,
}

/// One native-transfer instruction the caller appends via C4.
pub struct FeeTransfer {
    pub to: String,
    pub amount_wei: U256,
}

pub struct FeeOutcome {
    pub transfers: Vec<FeeTransfer>,
    pub info: FeeInfo,
}

impl FeeCalculator {
    pub fn new(config: FeeConfig) -> Self {
        Self { config }
    }

    /// Computes the fee split for `total_value_usd` and returns the native
    /// transfers to append plus client-facing metadata. The metadata
    /// deliberately omits where in the transaction batch the transfers
    /// land (spec.md §4.5).
    pub fn compute(
        &self,
        total_value_usd: f64,
        eth_price_usd: f64,
        referral_address: Option<&str>,
    ) -> FeeOutcome {
        let total_fee_usd = total_value_usd * self.config.platform_fee_rate;
        let total_fee_wei = usd_to_wei(total_fee_usd, eth_price_usd);

        match referral_address {
            Some(referrer) => {
                let (referrer_wei, treasury_wei) = split_fee(total_fee_wei, self.config.referrer_share);
                let referrer_fee_usd = total_fee_usd * (self.config.referrer_share * 100.0).floor().max(0.0) / 100.0;
                let treasury_fee_usd = total_fee_usd - referrer_fee_usd;
                FeeOutcome {
                    transfers: vec![
                        FeeTransfer { to: referrer.to_string(), amount_wei: referrer_wei },
                        FeeTransfer { to: self.config.treasury_address.clone(), amount_wei: treasury_wei },
                    ],
                    info: FeeInfo {
                        total_fee_usd,
                        referrer_fee_usd,
                        treasury_fee_usd,
                        fee_transaction_count: 2,
                    },
                }
            }
            None => FeeOutcome {
                transfers: vec![FeeTransfer {
                    to: self.config.treasury_address.clone(),
                    amount_wei: total_fee_wei,
                }],
                info: FeeInfo {
                    total_fee_usd,
                    referrer_fee_usd: 0.0,
                    treasury_fee_usd: total_fee_usd,
                    fee_transaction_count: 1,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calculator(referrer_share: f64) -> FeeCalculator {
        FeeCalculator::new(FeeConfig {
            platform_fee_rate: 0.0001,
            referrer_share,
            treasury_address: "0xtreasury".to_string(),
        })
    }

    #[test]
    fn no_referral_emits_single_treasury_transfer() {
        let outcome = calculator(0.7).compute(20.0, 3000.0, None);
        assert_eq!(outcome.transfers.len(), 1);
        assert_eq!(outcome.transfers[0].to, "0xtreasury");
        assert_eq!(outcome.info.fee_transaction_count, 1);
        assert_eq!(outcome.info.referrer_fee_usd, 0.0);
    }

    #[test]
    fn referral_splits_wei_exactly_matching_s2() {
        // total_value_usd * 0.0001 = 0.000002 USD @ ethPriceUSD=3000 -> 666_666_666 wei (spec.md S2).
        let outcome = calculator(0.7).compute(0.02, 3000.0, Some("0xreferrer"));
        assert_eq!(outcome.transfers.len(), 2);
        assert_eq!(outcome.transfers[0].to, "0xreferrer");
        assert_eq!(outcome.transfers[1].to, "0xtreasury");
        assert_eq!(outcome.transfers[0].amount_wei, U256::from(466_666_666u64));
        assert_eq!(outcome.transfers[1].amount_wei, U256::from(200_000_000u64));
        assert_eq!(
            outcome.transfers[0].amount_wei + outcome.transfers[1].amount_wei,
            U256::from(666_666_666u64)
        );
        assert_eq!(outcome.info.fee_transaction_count, 2);
    }

    #[test]
    fn fee_info_never_exposes_transaction_indices() {
        let outcome = calculator(0.5).compute(100.0, 3000.0, Some("0xreferrer"));
        // FeeInfo has no index/offset fields by construction; this test
        // documents that guarantee at the type level.
        let _: f64 = outcome.info.total_fee_usd;
        let _: u8 = outcome.info.fee_transaction_count;
    }
}
