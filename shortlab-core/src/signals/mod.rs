//! Signal generation: short-entry scoring, the trailing growth gate, and the
//! multi-timeframe reversal scanner.
//!
//! Everything here is synchronous and side-effect free. Callers resolve market
//! snapshots first (see [`crate::data`]) and pass them in; nothing in this
//! module touches the network, the clock, or the log.

pub mod evaluator;
pub mod growth_gate;
pub mod reversal;

pub use evaluator::{EvaluatorConfig, NotReady, ShortEvaluator, ShortFactors};
pub use growth_gate::{
    apply_gate, trailing_growth_pct, GrowthGate, MissingHistoryPolicy, DEFAULT_MIN_GROWTH_PCT,
    GROWTH_WINDOW_MS,
};
pub use reversal::{ReversalAlert, ReversalConfig, ReversalReport, ReversalScanner};
