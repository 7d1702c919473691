//! Signal log persistence.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use tempfile::TempDir;

use shortlab_core::domain::{RiskLevel, Signal, SignalDecision, Timeframe};
use shortlab_runner::recorder::{read_records, Recorder, RecorderHandle, SignalRecord};

fn decision(symbol: &str, signal: Signal) -> SignalDecision {
    SignalDecision {
        symbol: symbol.into(),
        timeframe: Timeframe::FIVE_MINUTES,
        signal,
        score: 3,
        strength: 75,
        risk_level: Some(RiskLevel::Medium),
        funding: Some(0.0001),
        oi_change: None,
        reasons: vec![
            "Overbought (StochRSI / MFI)".into(),
            "Price turning down".into(),
            "Order book imbalance (asks > bids)".into(),
        ],
    }
}

#[test]
fn decision_round_trips_through_the_log() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("signals_log.csv");
    let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 15).unwrap();
    let d = decision("SOLUSDT", Signal::Short);

    Recorder::new(&path)
        .append(&SignalRecord::from_decision(ts, "SOLUSDT", 142.35, &d))
        .unwrap();

    let records = read_records(&path).unwrap();
    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r.timestamp, "2024-05-01 12:30:15");
    assert_eq!(r.symbol, "SOLUSDT");
    assert_eq!(r.price, 142.35);
    assert_eq!(r.signal, Signal::Short);
    assert_eq!(r.strength, 75);
    assert_eq!(r.risk_level, Some(RiskLevel::Medium));
    assert_eq!(r.funding, Some(0.0001));
    assert_eq!(r.oi_change, None);
    assert_eq!(r.reasons_list(), d.reasons);
}

#[test]
fn header_is_written_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("signals_log.csv");
    let recorder = Recorder::new(&path);
    let ts = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
    for symbol in ["AUSDT", "BUSDT", "CUSDT"] {
        recorder
            .append(&SignalRecord::from_decision(ts, symbol, 1.0, &decision(symbol, Signal::Hold)))
            .unwrap();
    }

    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("timestamp,symbol,timeframe,price,signal,strength"));
    assert_eq!(text.matches("timestamp,").count(), 1);
}

#[test]
fn empty_existing_file_gets_a_header() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("signals_log.csv");
    std::fs::write(&path, "").unwrap();
    let ts = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
    Recorder::new(&path)
        .append(&SignalRecord::from_decision(ts, "AUSDT", 1.0, &decision("AUSDT", Signal::Hold)))
        .unwrap();
    assert_eq!(read_records(&path).unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_writers_never_interleave_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("signals_log.csv");
    let (handle, task) = RecorderHandle::spawn(Recorder::new(&path));

    let mut writers = tokio::task::JoinSet::new();
    for i in 0..32 {
        let handle = handle.clone();
        writers.spawn(async move {
            let symbol = format!("S{i:02}USDT");
            let d = decision(&symbol, Signal::Short);
            handle.append(Utc::now(), &symbol, i as f64, &d).await
        });
    }
    while let Some(joined) = writers.join_next().await {
        joined.unwrap().unwrap();
    }
    drop(handle);
    task.await.unwrap();

    let records = read_records(&path).unwrap();
    assert_eq!(records.len(), 32);
    for r in &records {
        assert_eq!(r.reasons_list().len(), 3);
        assert_eq!(r.timeframe, "5m");
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Reasons are free text: commas, quotes and newlines must survive the CSV.
    #[test]
    fn free_text_reasons_survive_the_log(
        reasons in prop::collection::vec("[a-zA-Z0-9 ,\"%<>()\n.-]{1,24}", 1..5),
        price in 0.0001..100_000.0_f64,
    ) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("signals_log.csv");
        let mut d = decision("XUSDT", Signal::Hold);
        d.reasons = reasons.clone();
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();

        Recorder::new(&path)
            .append(&SignalRecord::from_decision(ts, "XUSDT", price, &d))
            .unwrap();
        let records = read_records(&path).unwrap();
        prop_assert_eq!(records.len(), 1);
        prop_assert_eq!(records[0].price, price);
        prop_assert_eq!(records[0].reasons_list(), reasons);
    }
}
