use hfe::config::{CollapseConfig, ConvertConfig, CountConfig};
use hfe::feature::{Feature, FeatureSet};
use hfe::hasher::{field_key, hash_str};
use hfe::schema::{Column, Schema};
use hfe::svmlight::format_line;
use hfe::Error;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

fn reference_header() -> String {
    let mut header = vec!["Id".to_owned(), "Label".to_owned()];
    header.extend((1..=13).map(|i| format!("I{}", i)));
    header.extend((1..=26).map(|i| format!("C{}", i)));
    header.join(",")
}

fn hashed(discriminator: u32, value: &str, nr_bins: u64) -> u64 {
    hash_str(&field_key(discriminator, value), nr_bins) + 28
}

/// Label, one continuous column with max 10 and one categorical column.
fn small_schema() -> Schema {
    let mut max_values = BTreeMap::new();
    max_values.insert(1, 10.0);
    Schema::from_columns(
        Column::Position(0),
        vec![Column::Position(1)],
        &max_values,
        vec![Column::Position(2)],
    )
    .unwrap()
}

fn write(path: &Path, contents: &str) {
    fs::write(path, contents).unwrap();
}

#[test]
fn reference_row() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("tr.csv");
    let svm_path = dir.path().join("tr.svm");
    let mut row = vec!["0", "1", "1500"];
    row.extend(std::iter::repeat("").take(12));
    row.push("68fd1e64");
    row.extend(std::iter::repeat("").take(25));
    assert_eq!(row.len(), 41);
    write(
        &csv_path,
        &format!("{}\n{}\n", reference_header(), row.join(",")),
    );

    let config = ConvertConfig {
        nr_bins: 100,
        ..ConvertConfig::new(&csv_path, &svm_path)
    };
    let summary = hfe::read_featurize_write(&config).unwrap();
    assert_eq!(summary.rows, 1);

    let mut expected = vec![
        Feature::new(1, 1500.0 / 5775.0),
        Feature::new(15, 1500f64.ln()),
        Feature::presence(hashed(1, "1500", 100)),
        Feature::presence(hashed(1, "68fd1e64", 100)),
    ];
    for i in 2..=13 {
        expected.push(Feature::presence(hashed(i, "", 100)));
    }
    for i in 2..=26 {
        expected.push(Feature::presence(hashed(i, "", 100)));
    }
    let expected: FeatureSet = expected.into_iter().collect();
    assert_eq!(summary.features, expected.len() as u64);
    assert_eq!(
        fs::read_to_string(&svm_path).unwrap(),
        format_line("1", &expected)
    );
}

#[test]
fn named_layout_with_label_override() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("tr.csv");
    let svm_path = dir.path().join("tr.svm");
    // columns shuffled relative to the positional layout
    let mut header: Vec<String> = (1..=26).rev().map(|i| format!("C{}", i)).collect();
    header.extend((1..=13).map(|i| format!("I{}", i)));
    header.push("clicked".to_owned());
    let mut row = vec![""; 26];
    row[25] = "x";
    row.extend(vec!["2"; 13]);
    row.push("0");
    write(
        &csv_path,
        &format!("{}\n{}\n", header.join(","), row.join(",")),
    );

    let mut schema = Schema::reference_named();
    schema.label = Column::Name("clicked".to_owned());
    let config = ConvertConfig {
        nr_bins: 1000,
        schema,
        ..ConvertConfig::new(&csv_path, &svm_path)
    };
    hfe::read_featurize_write(&config).unwrap();

    let line = fs::read_to_string(&svm_path).unwrap();
    assert!(line.starts_with("0 1:"));
    let c1 = format!(" {}:1", hash_str(&field_key(1, "x"), 1000) + 28);
    assert!(line.contains(&c1), "{} missing from {}", c1, line);
    let i10 = format!(" 10:{}", 2.0 / 11.0);
    assert!(line.contains(&i10), "{} missing from {}", i10, line);
}

#[test]
fn short_row_leaves_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("tr.csv");
    let svm_path = dir.path().join("tr.svm");
    write(&csv_path, "Label,I1,C1\n1,3,a\n0,4\n");

    let config = ConvertConfig {
        schema: small_schema(),
        ..ConvertConfig::new(&csv_path, &svm_path)
    };
    match hfe::read_featurize_write(&config) {
        Err(Error::Parse { line, .. }) => assert_eq!(line, 3),
        other => panic!("expected parse error, got {:?}", other),
    }
    assert!(!svm_path.exists());
    assert!(!dir.path().join("tr.svm.tmp").exists());
}

#[test]
fn bad_number_is_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("tr.csv");
    let svm_path = dir.path().join("tr.svm");
    write(&csv_path, "Label,I1,C1\n1,abc,a\n");
    let config = ConvertConfig {
        schema: small_schema(),
        ..ConvertConfig::new(&csv_path, &svm_path)
    };
    assert!(matches!(
        hfe::read_featurize_write(&config),
        Err(Error::Parse { line: 2, .. })
    ));
}

#[test]
fn missing_max_value_fails_before_reading() {
    let result = Schema::from_columns(
        Column::Position(0),
        vec![Column::Position(1), Column::Position(2)],
        &BTreeMap::new(),
        vec![],
    );
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn overlapping_layout_fails_before_reading() {
    let dir = tempfile::tempdir().unwrap();
    let mut config =
        ConvertConfig::new(dir.path().join("nope.csv"), dir.path().join("out.svm"));
    config.layout.hash_offset = 20;
    assert!(matches!(
        hfe::read_featurize_write(&config),
        Err(Error::Config(_))
    ));
}

#[test]
fn count_then_collapse() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("tr.csv");
    let freq_path = dir.path().join("freq.csv");
    let svm_path = dir.path().join("tr.svm");
    write(&csv_path, "Label,I1,C1\n1,,a\n0,,a\n1,,a\n0,,b\n");

    let count = CountConfig {
        schema: small_schema(),
        ..CountConfig::new(&csv_path, &freq_path)
    };
    assert_eq!(hfe::count_frequencies(&count).unwrap(), 2);
    assert_eq!(
        fs::read_to_string(&freq_path).unwrap(),
        "Field,Value,Neg,Pos,Total\nC1,a,1,2,3\nC1,b,1,0,1\n"
    );

    let config = ConvertConfig {
        nr_bins: 1000,
        collapse: Some(CollapseConfig {
            frequencies: freq_path,
            threshold: 2,
        }),
        schema: small_schema(),
        ..ConvertConfig::new(&csv_path, &svm_path)
    };
    hfe::read_featurize_write(&config).unwrap();

    let empty = hash_str(&field_key(1, ""), 1000) + 28;
    let a = hash_str(&field_key(1, "a"), 1000) + 28;
    let rare = hash_str(&field_key(1, "C1less"), 1000) + 28;
    let line = |label: &str, c: u64| {
        let set: FeatureSet = vec![Feature::presence(empty), Feature::presence(c)]
            .into_iter()
            .collect();
        format_line(label, &set)
    };
    let expected = [line("1", a), line("0", a), line("1", a), line("0", rare)].concat();
    assert_eq!(fs::read_to_string(&svm_path).unwrap(), expected);
}

#[test]
fn input_named_like_temporary_output_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("tr.svm.tmp");
    let svm_path = dir.path().join("tr.svm");
    let contents = format!("{}\n0,1,5{}\n", reference_header(), ",".repeat(38));
    write(&csv_path, &contents);

    let config = ConvertConfig::new(&csv_path, &svm_path);
    assert!(matches!(
        hfe::read_featurize_write(&config),
        Err(Error::Config(_))
    ));
    assert_eq!(fs::read_to_string(&csv_path).unwrap(), contents);
    assert!(!svm_path.exists());
}
