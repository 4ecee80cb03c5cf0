//! Property-based sampling cadence tests
//!
//! For any M complete enter/exit pairs sampled 1-in-N, exactly floor(M / N)
//! pairs are recorded, evenly spaced every N calls.

use circtrace::collector::Collector;
use circtrace::config::{CollectorConfig, PolicyTable};
use circtrace::record::{FrameId, FunctionId};
use proptest::prelude::*;

fn recorded_calls(pairs: u64, ratio: u64) -> Vec<u64> {
    let dir = tempfile::tempdir().unwrap();
    let trace = dir.path().join("trace.log");
    let config = CollectorConfig {
        trace_file_name: trace.clone(),
        use_direct_output: true,
        ..CollectorConfig::default()
    };
    let mut policies = PolicyTable::new();
    policies.add_sample(FunctionId(0x10), ratio);

    let mut collector = Collector::new(config, policies).unwrap();
    for call in 1..=pairs {
        // Timestamp encodes the call number so recorded positions can be
        // read back from the log.
        collector.on_enter(FunctionId(0x10), call).unwrap();
        collector.on_exit(FunctionId(0x10), FrameId(call), call).unwrap();
    }
    collector.finish().unwrap();

    std::fs::read_to_string(&trace)
        .unwrap()
        .lines()
        .filter(|line| line.starts_with("i "))
        .map(|line| line.split_whitespace().nth(2).unwrap().parse().unwrap())
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_sampling_records_floor_m_over_n_pairs(pairs in 1u64..150, ratio in 2u64..12) {
        let recorded = recorded_calls(pairs, ratio);
        prop_assert_eq!(recorded.len() as u64, pairs / ratio);
        // Recorded calls sit at N, 2N, 3N, ...
        for (index, call) in recorded.iter().enumerate() {
            prop_assert_eq!(*call, (index as u64 + 1) * ratio);
        }
    }

    #[test]
    fn prop_enter_and_exit_counts_match(pairs in 1u64..150, ratio in 2u64..12) {
        let dir = tempfile::tempdir().unwrap();
        let trace = dir.path().join("trace.log");
        let config = CollectorConfig {
            trace_file_name: trace.clone(),
            use_direct_output: true,
            ..CollectorConfig::default()
        };
        let mut policies = PolicyTable::new();
        policies.add_sample(FunctionId(0x10), ratio);

        let mut collector = Collector::new(config, policies).unwrap();
        for call in 1..=pairs {
            collector.on_enter(FunctionId(0x10), call).unwrap();
            collector.on_exit(FunctionId(0x10), FrameId(call), call).unwrap();
        }
        collector.finish().unwrap();

        let contents = std::fs::read_to_string(&trace).unwrap();
        let enters = contents.lines().filter(|l| l.starts_with("i ")).count();
        let exits = contents.lines().filter(|l| l.starts_with("o ")).count();
        prop_assert_eq!(enters, exits);
        prop_assert_eq!(enters as u64, pairs / ratio);
    }
}
