//! Unit tests for the table model and its text form.

use std::io::Cursor;

use proptest::prelude::*;
use rstest::rstest;
use ttm_test_support::profile::ProptestRunProfile;

use super::*;

type TestResult = core::result::Result<(), Box<dyn std::error::Error>>;

fn two_row_table() -> Table {
    let mut table = Table::new(Header::new(["text"]).expect("valid header"));
    table
        .push_row(Row::new(DocumentId::from_parts("a.txt", 0), vec!["x".into()]))
        .expect("first row");
    table
        .push_row(Row::new(DocumentId::from_parts("a.txt", 1), vec!["y".into()]))
        .expect("second row");
    table
}

fn parse(text: &str) -> Result<Table> {
    Table::read(Cursor::new(text.as_bytes()), "test")
}

fn format_error(result: Result<Table>) -> FormatError {
    match result {
        Ok(table) => panic!("expected a format error, parsed {table:?}"),
        Err(TtmError::Format { error, .. }) => error,
        Err(other) => panic!("expected a format error, got {other:?}"),
    }
}

#[test]
fn reads_header_and_rows() -> TestResult {
    let table = parse("id\ttext\tcluster\na:0\thello\t1\na:1\tworld\t2\n")?;
    assert_eq!(table.header().columns(), &["text", "cluster"]);
    assert_eq!(table.len(), 2);
    assert_eq!(table.column("cluster")?, vec!["1", "2"]);
    assert_eq!(table.column("id")?, vec!["a:0", "a:1"]);
    Ok(())
}

#[rstest]
#[case::empty("", FormatError::EmptyInput)]
#[case::missing_id("doc\ttext\n", FormatError::MissingIdColumn { found: "doc".into() })]
#[case::duplicate_column("id\ttext\ttext\n", FormatError::DuplicateColumn { column: "text".into() })]
#[case::short_row(
    "id\ttext\na:0\n",
    FormatError::ColumnCountMismatch { row: 0, expected: 2, actual: 1 }
)]
#[case::long_row(
    "id\ttext\na:0\tx\na:1\ty\tz\n",
    FormatError::ColumnCountMismatch { row: 1, expected: 2, actual: 3 }
)]
#[case::duplicate_id(
    "id\ttext\na:0\tx\na:1\ty\na:0\tz\n",
    FormatError::DuplicateId { row: 2, id: "a:0".into() }
)]
#[case::empty_id("id\ttext\n\tx\n", FormatError::EmptyId { row: 0 })]
fn rejects_malformed_tables(#[case] text: &str, #[case] expected: FormatError) {
    assert_eq!(format_error(parse(text)), expected);
}

#[test]
fn write_then_read_preserves_special_characters() -> TestResult {
    let mut table = Table::new(Header::new(["text", "note"])?);
    table.push_row(Row::new(
        DocumentId::new("odd\tid"),
        vec!["tab\there\nnewline".into(), "back\\slash\r".into()],
    ))?;
    let mut buffer = Vec::new();
    table.write(&mut buffer)?;
    let parsed = Table::read(Cursor::new(buffer), "round-trip")?;
    assert_eq!(parsed, table);
    Ok(())
}

#[test]
fn append_column_extends_every_row() -> TestResult {
    let mut table = two_row_table();
    table.append_column("cluster", vec!["0".into(), "1".into()])?;
    assert_eq!(table.header().columns(), &["text", "cluster"]);
    assert_eq!(table.rows()[1].cells, vec!["y", "1"]);
    Ok(())
}

#[rstest]
#[case(vec![])]
#[case(vec!["0".into()])]
#[case(vec!["0".into(), "1".into(), "2".into()])]
fn append_column_requires_one_value_per_row(#[case] values: Vec<String>) {
    let mut table = two_row_table();
    let actual = values.len();
    let err = table
        .append_column("cluster", values)
        .expect_err("count mismatch must fail");
    assert_eq!(
        err,
        SchemaError::ValueCountMismatch {
            column: "cluster".into(),
            expected: 2,
            actual,
        }
    );
    assert_eq!(table.header().columns(), &["text"]);
}

#[rstest]
#[case("text")]
#[case("id")]
fn append_column_never_rewrites_existing_columns(#[case] name: &str) {
    let mut table = two_row_table();
    let err = table
        .append_column(name, vec!["a".into(), "b".into()])
        .expect_err("existing column must be rejected");
    assert!(matches!(err, SchemaError::ColumnExists { .. }));
}

#[test]
fn vector_column_needs_rows_times_dimension_values() {
    let mut table = two_row_table();
    let err = table
        .append_vector_column("highdim", &[0.1, 0.2], 3)
        .expect_err("two values cannot fill a 2 x 3 column");
    assert!(matches!(
        err,
        TtmError::Schema(SchemaError::VectorShapeMismatch {
            ref column,
            rows: 2,
            dimension: 3,
            values: 2,
        }) if column == "highdim"
    ));
}

#[test]
fn vector_column_rejects_non_finite_values() {
    let mut table = two_row_table();
    let err = table
        .append_vector_column("highdim", &[1.0, 0.0, 0.0, f64::INFINITY], 2)
        .expect_err("infinity has no cell encoding");
    assert!(matches!(err, TtmError::Algorithm { ref method, .. } if method == "highdim"));
    assert_eq!(table.header().columns(), &["text"]);
}

#[test]
fn vector_column_encodes_json_cells() -> TestResult {
    let mut table = two_row_table();
    table.append_vector_column("highdim", &[1.0, 0.0, 0.5, 0.0, 1.0, 0.25], 3)?;
    assert_eq!(table.column("highdim")?, vec!["[1.0,0.0,0.5]", "[0.0,1.0,0.25]"]);
    Ok(())
}

#[test]
fn crlf_input_is_accepted() -> TestResult {
    let table = parse("id\ttext\r\na:0\thello\r\n")?;
    assert_eq!(table.column("text")?, vec!["hello"]);
    Ok(())
}

fn field() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z \\t\\n\\r\\\\é]{0,12}").expect("valid regex")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(ProptestRunProfile::load(64).cases()))]

    #[test]
    fn serialise_then_parse_is_identity(
        columns in prop::collection::hash_set("[a-z]{1,6}", 0..4),
        rows in prop::collection::vec(prop::collection::vec(field(), 4), 0..8),
    ) {
        let columns: Vec<String> = columns.into_iter().filter(|c| c != "id").collect();
        let mut table = Table::new(Header::new(columns.clone()).expect("unique columns"));
        for (index, cells) in rows.into_iter().enumerate() {
            let cells = cells.into_iter().take(columns.len()).collect();
            table
                .push_row(Row::new(DocumentId::new(format!("doc\t{index}")), cells))
                .expect("row fits header");
        }
        let mut buffer = Vec::new();
        table.write(&mut buffer).expect("write to memory");
        let parsed = Table::read(Cursor::new(buffer), "prop").expect("parse back");
        prop_assert_eq!(parsed, table);
    }
}
