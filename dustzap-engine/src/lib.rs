// Streaming dust-zap execution engine: aggregator adapters (C1),
// quote selector (C2), retry wiring (C3), transaction builder (C4),
// fee calculator (C5), and token processor (C6).

pub mod adapters;
pub mod fee_calculator;
pub mod selector;
pub mod token_processor;
pub mod tx_builder;

pub use adapters::{AdapterError, OneInchAdapter, ParaswapAdapter, QuoteAdapter, ZeroExAdapter};
pub use fee_calculator::{FeeCalculator, FeeConfig, FeeOutcome, FeeTransfer};
pub use selector::{QuoteSelector, SelectorError};
pub use token_processor::TokenProcessor;
pub use tx_builder::TransactionBuilder;
