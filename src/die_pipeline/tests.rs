use crate::die_pipeline::classify::{ClassificationStrategy, ClusterConfig, ReferenceDiscriminant};
use crate::die_pipeline::common::{BitMatrix, CancelFlag};
use crate::die_pipeline::export::{DumpLayout, dump, merge};
use crate::die_pipeline::geometry::{CalibrationDescriptor, Lattice, presets};
use crate::die_pipeline::overrides::OverrideTable;
use crate::die_pipeline::photo::{FeatureMap, Photograph};

/// 4 x 4 photograph whose cell (r, c) sits on pixel (c, r), with a strong
/// and a weak negative signature at cells (1, 1) and (2, 3).
fn signature_photo() -> Photograph {
    let descriptor = CalibrationDescriptor::synthetic("e2e.png", 4, 4, (4, 4), (0.0, 0.0), (1.0, 1.0));
    let feature = FeatureMap::from_fn(4, 4, |x, y| match (x, y) {
        (1, 1) => -10.0,
        (3, 2) => -5.0,
        (0, 0) => 3.0,
        _ => 0.0,
    });
    Photograph::from_feature_map(descriptor, feature)
}

/// Looks only at the patch element over the cell centre: bit 1 when it is
/// negative.
fn centre_discriminant() -> ReferenceDiscriminant {
    ReferenceDiscriminant::new(1, false, vec![0.0; 4], vec![0.0, 0.0, 0.0, 1.0], 0.0).unwrap()
}

#[test]
fn test_overrides_reach_the_dump() {
    let photo = signature_photo();
    let raw = centre_discriminant().read_bits(&photo, &CancelFlag::new()).unwrap();
    assert_eq!(raw.diff(&BitMatrix::zeros(4, 4)).unwrap(), vec![(1, 1), (2, 3)]);

    let mut overrides = OverrideTable::new();
    overrides.insert(1, 1, false);
    overrides.insert(3, 0, true);
    let (bits, changed) = overrides.applied(&raw).unwrap();
    assert_eq!(changed, 2);

    let text = dump(&bits, DumpLayout { group_rows: 4, word_rows: 4 });
    assert_eq!(text, "0000\n0000\n0001\n1000");

    let lines: Vec<Vec<char>> = text.lines().map(|l| l.chars().collect()).collect();
    for (row, line) in lines.iter().enumerate() {
        for (col, &ch) in line.iter().enumerate() {
            let expected = overrides.get(row, col).unwrap_or(raw[(row, col)]);
            assert_eq!(ch == '1', expected, "cell ({row}, {col})");
        }
    }
}

#[test]
fn test_strategy_dispatch_matches_direct_read() {
    let photo = signature_photo();
    let cancel = CancelFlag::new();
    let direct = centre_discriminant().read_bits(&photo, &cancel).unwrap();
    let reading = ClassificationStrategy::Discriminant(centre_discriminant()).read(&photo, &cancel).unwrap();
    assert_eq!(reading.bits, direct);
    assert!(reading.ranking.is_none());
}

#[test]
fn test_merge_two_reads_then_override() {
    let photo = signature_photo();
    let top = centre_discriminant().read_bits(&photo, &CancelFlag::new()).unwrap();
    let bottom = BitMatrix::ones(4, 4);

    let mut merged = merge(&top, &bottom, 2).unwrap();
    let mut overrides = OverrideTable::new();
    overrides.insert(3, 3, false);
    assert_eq!(overrides.apply(&mut merged).unwrap(), 1);
    assert_eq!(dump(&merged, DumpLayout { group_rows: 4, word_rows: 4 }), "0000\n0100\n1111\n1110");
}

#[test]
fn test_descriptor_json_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut descriptor = CalibrationDescriptor::synthetic("die.png", 64, 48, (4, 6), (4.0, 4.0), (10.0, 12.0));
    descriptor.name = String::new();
    let json_path = dir.path().join("die.json");
    std::fs::write(&json_path, descriptor.to_json().unwrap()).unwrap();

    let loaded = CalibrationDescriptor::from_json_file(&json_path).unwrap();
    assert_eq!(loaded.path, dir.path().join("die.png"));
    assert_eq!(loaded.name, "die");
    assert_eq!(loaded.lattice, Lattice::new(4, 6));
    assert_eq!(loaded.row_corners, descriptor.row_corners);
    assert_eq!(loaded.col_corners, descriptor.col_corners);
}

#[test]
fn test_lattice_defaults_when_absent() {
    let dir = tempfile::tempdir().unwrap();
    let json_path = dir.path().join("mk51.json");
    let json = r#"{
        "path": "/photos/mk51.jpg",
        "width": 4000,
        "height": 3000,
        "row_corners": [[[10, 10], [3900, 12]], [[11, 2900], [3901, 2903]]],
        "col_corners": [[[10, 10], [3900, 12]], [[11, 2900], [3901, 2903]]]
    }"#;
    std::fs::write(&json_path, json).unwrap();
    let loaded = CalibrationDescriptor::from_json_file(&json_path).unwrap();
    assert_eq!(loaded.lattice, Lattice::default());
    assert_eq!(loaded.default_radius(), 4);
}

#[test]
fn test_preset_descriptors_survive_json() {
    for preset in presets::all() {
        let text = preset.to_json().unwrap();
        let back: CalibrationDescriptor = serde_json::from_str(&text).unwrap();
        assert_eq!(back, preset);
    }
}

#[test]
fn test_strategy_json_is_tagged() {
    let strategy = ClassificationStrategy::Discriminant(ReferenceDiscriminant::mk51());
    let text = serde_json::to_string(&strategy).unwrap();
    assert!(text.contains(r#""kind":"discriminant""#));
    assert_eq!(serde_json::from_str::<ClassificationStrategy>(&text).unwrap(), strategy);

    let cluster: ClassificationStrategy = serde_json::from_str(
        r#"{"kind":"tile_cluster","radius":null,"normalize":true,"iterations":5,"convergence_epsilon":null,
            "exemplars":{"zero":[2,1],"one":[1,1]},"tile_rows":16,"tile_cols":16,"ranking_len":10}"#,
    )
    .unwrap();
    let ClassificationStrategy::TileCluster(config) = cluster else {
        panic!("expected tile clustering");
    };
    assert_eq!(config, ClusterConfig { normalize: true, iterations: 5, ranking_len: 10, ..ClusterConfig::default() });
}
