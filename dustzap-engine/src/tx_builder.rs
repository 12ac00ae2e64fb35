// Transaction Builder (C4): append-only ordered sequence of calldata-ready
// transactions. Indices are monotonic from 0 and past entries never mutate.
use dustzap_common::wei::round_up_gas;
use dustzap_common::{SwapQuote, Transaction};
use ethers_core::types::{Bytes, U256};

const GAS_STEP: u64 = 1_000;
const APPROVE_GAS_LIMIT: u64 = 60_000;

pub struct TransactionBuilder {
    transactions: Vec<Transaction>,
}

impl TransactionBuilder {
    pub fn new() -> Self {
        Self { transactions: Vec::new() }
    }

    /// `addApprove(tokenAddr, spender, rawAmount) -> index` (spec.md §4.4).
    pub fn add_approve(&mut self, token_addr: &str, spender: &str, raw_amount: U256) -> usize {
        let data = encode_approve(spender, raw_amount);
        self.push(Transaction {
            to: token_addr.to_string(),
            value: "0".to_string(),
            data,
            description: Some(format!("approve {spender}")),
            gas_limit: APPROVE_GAS_LIMIT.to_string(),
        })
    }

    /// `addSwap(quote, description) -> index` (spec.md §4.4).
    pub fn add_swap(&mut self, quote: &SwapQuote, description: impl Into<String>) -> usize {
        let gas_limit = round_up_gas(quote.gas, GAS_STEP);
        self.push(Transaction {
            to: quote.to.clone(),
            value: "0".to_string(),
            data: quote.data.clone(),
            description: Some(description.into()),
            gas_limit: gas_limit.to_string(),
        })
    }

    /// `addNativeTransfer(to, rawWei, description) -> index` (spec.md §4.4).
    pub fn add_native_transfer(&mut self, to: &str, raw_wei: U256, description: impl Into<String>) -> usize {
        self.push(Transaction {
            to: to.to_string(),
            value: raw_wei.to_string(),
            data: "0x".to_string(),
            description: Some(description.into()),
            gas_limit: 21_000.to_string(),
        })
    }

    pub fn get_transactions(&self) -> Vec<Transaction> {
        self.transactions.clone()
    }

    /// `getTotalGas() -> decimal string` (spec.md §4.4).
    pub fn get_total_gas(&self) -> String {
        let total = self.transactions.iter().fold(U256::zero(), |acc, tx| {
            acc + U256::from_dec_str(&tx.gas_limit).unwrap_or_default()
        });
        total.to_string()
    }

    fn push(&mut self, tx: Transaction) -> usize {
        let index = self.transactions.len();
        self.transactions.push(tx);
        index
    }
}

impl Default for TransactionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// `approve(address,uint256)` selector: first 4 bytes of
/// `keccak256("approve(address,uint256)")`.
const APPROVE_SELECTOR: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3];

/// Hand-encodes ERC-20 `approve(address,uint256)` calldata: selector +
/// left-padded address + big-endian `uint256` amount, each word 32 bytes.
fn encode_approve(spender: &str, amount: U256) -> String {
    let spender_hex = spender.trim_start_matches("0x");
    let mut spender_bytes = [0u8; 20];
    if let Ok(decoded) = hex_decode(spender_hex) {
        if decoded.len() == 20 {
            spender_bytes.copy_from_slice(&decoded);
        }
    }

    let mut calldata = Vec::with_capacity(4 + 32 + 32);
    calldata.extend_from_slice(&APPROVE_SELECTOR);
    calldata.extend_from_slice(&[0u8; 12]);
    calldata.extend_from_slice(&spender_bytes);
    let mut amount_bytes = [0u8; 32];
    amount.to_big_endian(&mut amount_bytes);
    calldata.extend_from_slice(&amount_bytes);

    Bytes::from(calldata).to_string()
}

fn hex_decode(s: &str) -> Result<Vec<u8>, std::num::ParseIntError> {
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..(i + 2).min(s.len())], 16))
        .collect()
}
