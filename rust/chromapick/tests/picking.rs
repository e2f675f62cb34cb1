use chromapick::errors::HierarchyError;
use chromapick::{
    BasicPeakPicker,
    ChromaPickError,
    Chromatogram,
    HierarchicalPeakPicker,
    PeakPicker,
    PickOutcome,
    PickerConfig,
    Sequence,
};

const SIGMA: f64 = 0.1;

/// 600 samples over 10 minutes: a unit baseline plus Gaussian peaks.
fn chromatogram(names: &[&str], peaks: &[(f64, f64)]) -> Chromatogram {
    let time: Vec<f64> = (0..600).map(|i| i as f64 / 60.0).collect();
    let intensity = time
        .iter()
        .map(|t| {
            1.0 + peaks
                .iter()
                .map(|(c, h)| h * (-(t - c).powi(2) / (2.0 * SIGMA * SIGMA)).exp())
                .sum::<f64>()
        })
        .collect();
    Chromatogram::new(Sequence::from_names(names), time, intensity).unwrap()
}

fn flat(names: &[&str]) -> Chromatogram {
    let time: Vec<f64> = (0..600).map(|i| i as f64 / 60.0).collect();
    Chromatogram::new(Sequence::from_names(names), time, vec![1.0; 600]).unwrap()
}

fn picked_time(outcome: Option<&PickOutcome>) -> f64 {
    match outcome {
        Some(PickOutcome::Picked(p)) => p.time,
        other => panic!("Expected a picked peak, got {:?}", other),
    }
}

#[test]
fn test_latest_peak_after_descendants_is_picked() {
    let batch = vec![
        chromatogram(&["X", "Y"], &[(2.0, 50.0), (6.0, 100.0)]),
        chromatogram(&["X", "Null"], &[(3.0, 40.0)]),
        chromatogram(&["Null", "Y"], &[(4.0, 60.0)]),
        chromatogram(&["Null", "Null"], &[(1.0, 20.0)]),
    ];
    let picker = HierarchicalPeakPicker::new(&PickerConfig::default()).unwrap();
    let report = picker.pick(batch).unwrap();
    let results = &report.results;
    assert_eq!(results.len(), 4);

    let expected = [
        (vec!["Null", "Null"], 1.0, 0),
        (vec!["X", "Null"], 3.0, 1),
        (vec!["Null", "Y"], 4.0, 1),
        (vec!["X", "Y"], 6.0, 2),
    ];
    for (names, time, level) in expected {
        let seq = Sequence::from_names(&names);
        let t = picked_time(results.outcome(&seq));
        assert!((t - time).abs() < 0.02, "{}: expected {:?}, got {:?}", seq, time, t);
        assert_eq!(results.get(&seq).unwrap().level, level);
    }

    // The level-2 search starts after max(3, 4) + 0.5.
    let top = report
        .chromatograms
        .iter()
        .find(|c| c.sequence() == &Sequence::from_names(&["X", "Y"]))
        .unwrap();
    let mask = top.search_mask().unwrap();
    let corrected = top.corrected().unwrap();
    for (t, m) in corrected.time().iter().zip(mask.iter()) {
        assert_eq!(*m, *t >= 4.5, "Mask wrong at {}", t);
    }
    assert!(top.picked_peak().unwrap().height > 60.0);

    let hierarchy = report.hierarchy.unwrap();
    let order = hierarchy.ordered_sequences_by_level(1);
    assert_eq!(order[0], Sequence::from_names(&["X", "Null"]));
    assert_eq!(order[1], Sequence::from_names(&["Null", "Y"]));
}

#[test]
fn test_unpicked_descendant_imposes_nothing() {
    let batch = vec![
        chromatogram(&["Null", "Null"], &[(1.0, 20.0)]),
        chromatogram(&["Null", "Y"], &[(2.0, 60.0)]),
        // Too small to pass the absolute height threshold.
        chromatogram(&["X", "Null"], &[(5.0, 3.0)]),
        chromatogram(&["X", "Y"], &[(3.5, 100.0)]),
    ];
    let picker = HierarchicalPeakPicker::new(&PickerConfig::default()).unwrap();
    let report = picker.pick(batch).unwrap();
    let results = &report.results;

    let lonely = Sequence::from_names(&["X", "Null"]);
    assert_eq!(results.outcome(&lonely), Some(&PickOutcome::NoPeak));
    assert_eq!(report.hierarchy.unwrap().sequence_value(&lonely), None);

    // Only the sibling at t=2 constrains the top sequence.
    let t = picked_time(results.outcome(&Sequence::from_names(&["X", "Y"])));
    assert!((t - 3.5).abs() < 0.02, "Expected 3.5, got {}", t);
}

#[test]
fn test_failures_are_isolated() {
    let batch = vec![
        chromatogram(&["X", "Y"], &[(6.0, 100.0)]),
        flat(&["X", "Null"]),
        chromatogram(&["Null", "Y"], &[(4.0, 60.0)]),
    ];
    let picker = HierarchicalPeakPicker::new(&PickerConfig::default()).unwrap();
    let report = picker.pick(batch).unwrap();
    let results = &report.results;

    assert!(matches!(
        results.outcome(&Sequence::from_names(&["X", "Null"])),
        Some(PickOutcome::Failed { .. })
    ));
    assert_eq!(results.num_failed(), 1);
    assert_eq!(results.num_picked(), 2);
    let t = picked_time(results.outcome(&Sequence::from_names(&["X", "Y"])));
    assert!((t - 6.0).abs() < 0.02);
}

#[test]
fn test_foreign_sequence_aborts_batch() {
    let batch = vec![
        chromatogram(&["X", "Y"], &[(6.0, 100.0)]),
        chromatogram(&["Z", "Null"], &[(3.0, 40.0)]),
    ];
    let picker = HierarchicalPeakPicker::new(&PickerConfig::default()).unwrap();
    let err = picker.pick(batch).unwrap_err();
    assert!(matches!(
        err,
        ChromaPickError::HierarchyInconsistency(HierarchyError::UnknownSequence { .. })
    ));

    assert!(matches!(
        picker.pick(Vec::new()),
        Err(ChromaPickError::HierarchyInconsistency(HierarchyError::Empty))
    ));
}

#[test]
fn test_repeated_sequence_fails_alone() {
    let batch = vec![
        chromatogram(&["X", "Y"], &[(6.0, 100.0)]),
        chromatogram(&["X", "Null"], &[(3.0, 40.0)]),
        chromatogram(&["X", "Null"], &[(3.2, 40.0)]),
        chromatogram(&["Null", "Y"], &[(4.0, 60.0)]),
    ];
    let picker = HierarchicalPeakPicker::new(&PickerConfig::default()).unwrap();
    let report = picker.pick(batch).unwrap();

    assert_eq!(report.outcomes.len(), 4);
    assert_eq!(report.chromatograms[2].sequence(), &Sequence::from_names(&["X", "Null"]));
    assert!(matches!(
        &report.outcomes[2],
        PickOutcome::Failed { reason } if reason.contains("more than one")
    ));
    for (i, time) in [(0, 6.0), (1, 3.0), (3, 4.0)] {
        let t = picked_time(Some(&report.outcomes[i]));
        assert!((t - time).abs() < 0.02, "input {}: expected {}, got {}", i, time, t);
    }

    // The keyed result belongs to the first occurrence.
    let t = picked_time(report.results.outcome(&Sequence::from_names(&["X", "Null"])));
    assert!((t - 3.0).abs() < 0.02);
    assert_eq!(report.results.len(), 3);
}

#[test]
fn test_basic_picker_accepts_replicates() {
    let batch = vec![
        chromatogram(&["X", "Null"], &[(3.0, 40.0)]),
        chromatogram(&["X", "Null"], &[(3.1, 40.0)]),
        chromatogram(&["Null", "Y"], &[(5.0, 60.0)]),
    ];
    let picker = BasicPeakPicker::new(&PickerConfig::default()).unwrap();
    let report = picker.pick(batch).unwrap();

    let times: Vec<f64> = report
        .outcomes
        .iter()
        .map(|o| picked_time(Some(o)))
        .collect();
    for (t, expected) in times.iter().zip([3.0, 3.1, 5.0]) {
        assert!((t - expected).abs() < 0.02, "Expected {}, got {}", expected, t);
    }
    let t = picked_time(report.results.outcome(&Sequence::from_names(&["X", "Null"])));
    assert!((t - 3.0).abs() < 0.02);
    let t = picked_time(report.results.outcome(&Sequence::from_names(&["Null", "Y"])));
    assert!((t - 5.0).abs() < 0.02);
}

#[test]
fn test_basic_picker_ignores_hierarchy() {
    let batch = vec![
        chromatogram(&["X", "Y"], &[(2.0, 100.0), (6.0, 90.0)]),
        // Would be rejected by the hierarchical picker for preceding its descendant.
        chromatogram(&["Null", "Y"], &[(7.0, 60.0)]),
    ];
    let picker = BasicPeakPicker::new(&PickerConfig::default()).unwrap();
    let report = picker.pick(batch).unwrap();
    assert!(report.hierarchy.is_none());

    let t = picked_time(report.results.outcome(&Sequence::from_names(&["X", "Y"])));
    assert!((t - 6.0).abs() < 0.02, "Expected 6.0, got {}", t);
    let t = picked_time(report.results.outcome(&Sequence::from_names(&["Null", "Y"])));
    assert!((t - 7.0).abs() < 0.02);
    assert_eq!(report.results.get(&Sequence::from_names(&["X", "Y"])).unwrap().level, 2);
}

#[test]
fn test_results_serialize() {
    let batch = vec![chromatogram(&["X"], &[(5.0, 50.0)])];
    let picker = HierarchicalPeakPicker::new(&PickerConfig::default()).unwrap();
    let report = picker.pick(batch).unwrap();
    let json = serde_json::to_value(&report.results).unwrap();
    assert_eq!(json["results"].as_array().unwrap().len(), 1);
    assert_eq!(json["results"][0]["outcome"]["status"], "picked");
    assert!(json["timings"]["detection_ms"].is_number());
}
