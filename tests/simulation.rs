//! End-to-end simulation over scripted algorithm doubles.
//!
//! A four-bit sensor replays literal bit patterns into a four-column region.
//! The spatial double wires column `c` to bit `c` and the temporal double
//! predicts each active column's right-hand neighbor, so every step is
//! hand-checkable: record text determines the active bits and columns, the
//! shifted set determines the prediction marks, and reconstruction turns the
//! marks back into a pattern whose hits and misses drive the precision chain.
//!
//! Run with: `cargo test --test simulation`

mod common;

use common::{pattern_sensor, shift_region, ScriptedEngine};
use htm_scope::core::network::Network;
use htm_scope::core::state::MAX_STEPS_WITH_INFERENCE;
use htm_scope::types::FieldValue;

fn pattern_network(rows: &[&str]) -> Network {
    let mut network = Network::new();
    network.add_node(pattern_sensor("input", 4, rows)).unwrap();
    network.add_node(shift_region("pool", 4)).unwrap();
    network.add_link("input", "pool").unwrap();
    network
}

fn sensor_flags(network: &Network, pick: impl Fn(&htm_scope::core::bit::Bit) -> bool) -> Vec<bool> {
    let sensor = network.node("input").unwrap().as_sensor().unwrap();
    sensor.bits.iter().map(pick).collect()
}

fn column_flags(
    network: &Network,
    pick: impl Fn(&htm_scope::core::cell::Cell) -> bool,
) -> Vec<bool> {
    let region = network.node("pool").unwrap().as_region().unwrap();
    region.columns.iter().map(|column| pick(&column.cells[0])).collect()
}

#[test]
fn a_narrow_region_tracks_its_share_of_the_bits() {
    // The smallest interesting network: four bits feeding two columns, one
    // cell each. Bits follow the record text verbatim; the columns mirror
    // the two bits they pool.
    let mut network = Network::new();
    network
        .add_node(pattern_sensor("input", 4, &["1010", "0101"]))
        .unwrap();
    network.add_node(shift_region("pool", 2)).unwrap();
    network.add_link("input", "pool").unwrap();
    let mut ctx = network.initialize(&ScriptedEngine).unwrap();
    assert_eq!(network.phases(), &[vec![0], vec![1]]);

    let records = [
        (vec![true, false, true, false], vec![true, false]),
        (vec![false, true, false, true], vec![false, true]),
        (vec![true, false, true, false], vec![true, false]),
    ];
    for (bits, columns) in &records {
        network.next_step(&mut ctx).unwrap();
        assert_eq!(&sensor_flags(&network, |bit| *bit.is_active.at_curr_step()), bits);
        assert_eq!(
            &column_flags(&network, |cell| *cell.is_active.at_curr_step()),
            columns
        );
    }
}

#[test]
fn inference_widens_the_window_and_schedules_two_phases() {
    let mut network = pattern_network(&["1010", "0101"]);
    let ctx = network.initialize(&ScriptedEngine).unwrap();
    assert_eq!(ctx.window, MAX_STEPS_WITH_INFERENCE);
    assert_eq!(ctx.time_step, 0);
    assert_eq!(network.phases(), &[vec![0], vec![1]]);
    assert!(network.is_initialized());
}

#[test]
fn bits_and_columns_follow_the_replayed_records() {
    let mut network = pattern_network(&["1010", "0101"]);
    let mut ctx = network.initialize(&ScriptedEngine).unwrap();
    let expected = [
        vec![true, false, true, false],
        vec![false, true, false, true],
        // The stream rewinds and the rows come around again.
        vec![true, false, true, false],
        vec![false, true, false, true],
    ];
    for step in &expected {
        network.next_step(&mut ctx).unwrap();
        assert_eq!(&sensor_flags(&network, |bit| *bit.is_active.at_curr_step()), step);
        assert_eq!(&column_flags(&network, |cell| *cell.is_active.at_curr_step()), step);
    }
    assert_eq!(ctx.time_step, 4);
}

#[test]
fn predicted_columns_mark_cells_and_input_bits() {
    let mut network = pattern_network(&["1010", "0101"]);
    let mut ctx = network.initialize(&ScriptedEngine).unwrap();
    network.next_step(&mut ctx).unwrap();
    // Active columns {0, 2} predict {1, 3}; each predicted column's connected
    // synapse marks the one sensor bit it pools.
    let shifted = vec![false, true, false, true];
    assert_eq!(column_flags(&network, |cell| *cell.is_predicted.at_curr_step()), shifted);
    assert_eq!(sensor_flags(&network, |bit| *bit.is_predicted.at_curr_step()), shifted);
}

#[test]
fn reconstruction_reads_the_marks_back_as_a_pattern() {
    let mut network = pattern_network(&["1010", "0101"]);
    let mut ctx = network.initialize(&ScriptedEngine).unwrap();
    network.next_step(&mut ctx).unwrap();
    let sensor = network.node("input").unwrap().as_sensor().unwrap();
    let encoding = sensor.encoding("bits").unwrap();
    let predictions = encoding.predictions(1);
    assert_eq!(predictions.len(), 1);
    assert_eq!(predictions[0].label, "0101");
    assert_eq!(predictions[0].probability, 1.0);
    assert_eq!(
        encoding.best_predicted_value.at_curr_step(),
        &FieldValue::Text("0101".to_string())
    );
}

#[test]
fn missed_predictions_flag_bits_as_falsely_predicted() {
    let mut network = pattern_network(&["1010", "0101", "1100"]);
    let mut ctx = network.initialize(&ScriptedEngine).unwrap();
    // Step 2 leaves marks on bits {0, 2}; step 3 reads "1100", so bit 0 lands
    // and bit 2 misses.
    for _ in 0..3 {
        network.next_step(&mut ctx).unwrap();
    }
    assert_eq!(
        sensor_flags(&network, |bit| *bit.is_falsely_predicted.at_curr_step()),
        vec![false, false, true, false]
    );
    assert_eq!(
        column_flags(&network, |cell| *cell.is_falsely_predicted.at_curr_step()),
        vec![false, false, true, false]
    );
}

#[test]
fn precision_discounts_hits_and_misses_across_nodes() {
    let mut network = pattern_network(&["1010", "0101", "1100"]);
    let mut ctx = network.initialize(&ScriptedEngine).unwrap();
    // Step 1 has no prior prediction. Step 2's "0101" was predicted; step 3's
    // "1100" and step 4's wrapped-around "1010" were not.
    let expected = [0.0, 0.5, 0.25, 0.125];
    for &precision in &expected {
        network.next_step(&mut ctx).unwrap();
        let sensor = network.node("input").unwrap().as_sensor().unwrap();
        assert!((sensor.stats_precision_rate - precision).abs() < 1e-12);
        let region = network.node("pool").unwrap().as_region().unwrap();
        assert!((region.stats_precision_rate - precision).abs() < 1e-12);
        assert!((network.precision_rate() - precision).abs() < 1e-12);
    }
}

#[test]
fn bit_counters_accumulate_over_the_run() {
    let mut network = pattern_network(&["1010", "0101", "1100"]);
    let mut ctx = network.initialize(&ScriptedEngine).unwrap();
    for _ in 0..4 {
        network.next_step(&mut ctx).unwrap();
    }
    // Bit 0 is active on "1010", "1100", "1010" and was predicted once, by
    // step 2's marks, landing on step 3.
    let sensor = network.node("input").unwrap().as_sensor().unwrap();
    let bit = sensor.bit(0, 0).unwrap();
    assert_eq!(bit.stats.activation_count, 3);
    assert!((bit.stats.activation_rate - 0.75).abs() < 1e-12);
    assert_eq!(bit.stats.prediction_count, 1);
    assert!((bit.stats.precision_rate - 1.0).abs() < 1e-12);
}
