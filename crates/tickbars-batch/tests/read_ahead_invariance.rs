//! Property tests: page size and read-ahead depth never change batch output

use proptest::prelude::*;
use std::io::Cursor;
use tickbars_batch::{BatchConfig, BatchEngine, Prefetch};
use tickbars_core::test_utils::generators;
use tickbars_core::{BarSpec, Trade};
use tickbars_io::{CsvTradeSource, TradeLayout};

fn trade_strategy() -> impl Strategy<Value = Vec<Trade>> {
    prop::collection::vec((1.0f64..500.0, 0.0f64..20.0), 0..300).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (price, volume))| {
                Trade::new(1_700_000_000_000_000 + i as i64 * 1_000, price, volume).unwrap()
            })
            .collect()
    })
}

fn to_csv(trades: &[Trade]) -> Vec<u8> {
    let mut text = String::from("timestamp,price,volume\n");
    for t in trades {
        text.push_str(&format!("{},{},{}\n", t.timestamp, t.price, t.volume));
    }
    text.into_bytes()
}

fn specs() -> Vec<BarSpec> {
    vec![
        BarSpec::tick(9).unwrap(),
        BarSpec::volume(35.0).unwrap(),
        BarSpec::dollar(4_000.0).unwrap(),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn read_ahead_matches_one_by_one(
        trades in trade_strategy(),
        page_size in 1usize..50,
        depth in 0usize..4,
    ) {
        let expected = generators::process_one_by_one(&trades, &specs());

        let source = CsvTradeSource::from_reader(
            Cursor::new(to_csv(&trades)),
            "memory.csv",
            TradeLayout::Epoch,
            page_size,
        )
        .unwrap();
        let mut prefetch = Prefetch::spawn(source, depth).unwrap();

        let engine = BatchEngine::new(
            specs(),
            BatchConfig { page_size, prefetch_pages: depth },
        )
        .unwrap();
        let result = engine.process(&mut prefetch).unwrap();

        prop_assert_eq!(result.bars, expected);
        prop_assert_eq!(result.trades_processed, trades.len() as u64);
        prop_assert!(result.rejected.is_empty());
    }

    #[test]
    fn split_runs_resume_exactly(
        trades in trade_strategy(),
        split in 0usize..300,
        page_size in 1usize..50,
    ) {
        let split = split.min(trades.len());
        let expected = generators::process_one_by_one(&trades, &specs());
        let config = BatchConfig { page_size, prefetch_pages: 0 };

        let engine = BatchEngine::new(specs(), config).unwrap();
        let first = engine.process_trades(&trades[..split]).unwrap();
        let second = engine
            .clone()
            .resume_from(first.checkpoints.clone())
            .process_trades(&trades[split..])
            .unwrap();

        let mut combined = first.bars;
        combined.merge(second.bars);
        prop_assert_eq!(combined, expected);
    }
}
