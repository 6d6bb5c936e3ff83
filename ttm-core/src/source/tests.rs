//! Unit tests for seekable and buffered table sources.

use std::fs;
use std::io::Cursor;
use std::path::PathBuf;

use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;

type TestResult = core::result::Result<(), Box<dyn std::error::Error>>;

const TABLE: &str = "id\ttext\tlowdim\na:0\tfirst\t[1.0,0.0]\na:1\tsecond\\tcell\t[0.0,1.0]\n";

#[fixture]
fn temp_dir() -> TempDir {
    match TempDir::new() {
        Ok(dir) => dir,
        Err(err) => panic!("failed to create temp dir: {err}"),
    }
}

fn write_file(dir: &TempDir, name: &str, contents: &str) -> std::io::Result<PathBuf> {
    let path = dir.path().join(name);
    fs::write(&path, contents)?;
    Ok(path)
}

fn buffered(contents: &str) -> TableSource {
    TableSource::from_reader("memory", Box::new(Cursor::new(contents.as_bytes().to_vec())))
}

fn collect_rows(source: &mut TableSource) -> Result<Vec<Row>> {
    source.rows()?.collect()
}

#[rstest]
fn seekable_and_buffered_sources_yield_identical_rows(temp_dir: TempDir) -> TestResult {
    let path = write_file(&temp_dir, "table.tsv", TABLE)?;
    let mut seekable = TableSource::open_path(&path)?;
    let mut stream = buffered(TABLE);
    assert!(seekable.is_seekable());
    assert!(!stream.is_seekable());

    assert_eq!(seekable.shape()?, stream.shape()?);
    assert_eq!(collect_rows(&mut seekable)?, collect_rows(&mut stream)?);
    assert_eq!(seekable.matrix("lowdim")?, stream.matrix("lowdim")?);
    Ok(())
}

#[test]
fn buffered_source_supports_repeated_passes() -> TestResult {
    let mut source = buffered(TABLE);
    let first = source.collect_column("text")?;
    let second = source.collect_column("text")?;
    assert_eq!(first, vec!["first", "second\tcell"]);
    assert_eq!(first, second);
    Ok(())
}

#[rstest]
fn opening_defers_reading_until_first_pass(temp_dir: TempDir) -> TestResult {
    let path = write_file(&temp_dir, "table.tsv", "not a table")?;
    let mut source = TableSource::open_path(&path)?;
    write_file(&temp_dir, "table.tsv", TABLE)?;
    assert_eq!(source.len()?, 2);
    Ok(())
}

#[rstest]
fn missing_files_are_io_errors(temp_dir: TempDir) {
    let err = TableSource::open_path(&temp_dir.path().join("missing.tsv"))
        .expect_err("missing file must fail");
    assert!(matches!(err, TtmError::Io { .. }));
}

#[rstest]
fn directories_are_io_errors(temp_dir: TempDir) {
    let err = TableSource::open_path(temp_dir.path()).expect_err("directory must fail");
    assert!(matches!(err, TtmError::Io { .. }));
}

#[cfg(all(feature = "bzip2", feature = "xz"))]
#[rstest]
#[case("table.tsv.bz2")]
#[case("table.tsv.xz")]
fn compressed_tables_written_by_the_sink_read_back(
    temp_dir: TempDir,
    #[case] name: &str,
) -> TestResult {
    use crate::sink::{OutputDesignator, TableWriter};

    let path = temp_dir.path().join(name);
    let expected = buffered(TABLE).read_table()?;
    let mut writer = TableWriter::open(&OutputDesignator::Path(path.clone()))?;
    writer.write_table(&expected)?;
    writer.finish()?;
    assert_ne!(fs::read(&path)?, TABLE.as_bytes());

    let mut source = TableSource::open_path(&path)?;
    assert!(source.is_seekable());
    assert_eq!(source.read_table()?, expected);
    assert_eq!(source.collect_column("text")?, vec!["first", "second\tcell"]);
    Ok(())
}

#[cfg(feature = "gzip")]
#[rstest]
fn gzip_sources_are_decoded_on_every_pass(temp_dir: TempDir) -> TestResult {
    use std::io::Write;

    use flate2::{Compression as Level, write::GzEncoder};

    let path = temp_dir.path().join("table.tsv.gz");
    let mut encoder = GzEncoder::new(fs::File::create(&path)?, Level::default());
    encoder.write_all(TABLE.as_bytes())?;
    encoder.finish()?;

    let mut source = TableSource::open_path(&path)?;
    assert!(source.is_seekable());
    assert_eq!(source.len()?, 2);
    assert_eq!(source.collect_column("text")?, vec!["first", "second\tcell"]);
    Ok(())
}

#[test]
fn duplicate_ids_fail_validation() {
    let mut source = buffered("id\ttext\na:0\tx\na:0\ty\n");
    let err = source.shape().expect_err("duplicate id must fail");
    assert!(matches!(
        err,
        TtmError::Format {
            error: FormatError::DuplicateId { row: 1, .. },
            ..
        }
    ));
}

#[test]
fn missing_columns_are_schema_errors() {
    let mut source = buffered(TABLE);
    let err = source.column("cluster").expect_err("column is absent");
    assert!(matches!(
        err,
        TtmError::Schema(SchemaError::MissingColumn { ref column }) if column == "cluster"
    ));
}

#[test]
fn malformed_vectors_name_the_row() {
    let mut source = buffered("id\tlowdim\na:0\t[1.0]\na:1\t[1.0,2.0]\n");
    let err = source.matrix("lowdim").expect_err("ragged vectors must fail");
    assert!(matches!(
        err,
        TtmError::Format {
            error: FormatError::InconsistentDimension { row: 1, expected: 1, actual: 2, .. },
            ..
        }
    ));
}

#[test]
fn first_vector_len_reads_a_single_cell() -> TestResult {
    let mut source = buffered(TABLE);
    assert_eq!(source.first_vector_len("lowdim")?, Some(2));
    let mut empty = buffered("id\tlowdim\n");
    assert_eq!(empty.first_vector_len("lowdim")?, None);
    Ok(())
}

#[test]
fn read_table_materialises_every_row() -> TestResult {
    let mut source = buffered(TABLE);
    let table = source.read_table()?;
    assert_eq!(table.len(), 2);
    assert_eq!(table.header().columns(), &["text", "lowdim"]);
    Ok(())
}

#[rstest]
#[case(None, InputDesignator::Stdin)]
#[case(Some("-"), InputDesignator::Stdin)]
#[case(Some("in.tsv"), InputDesignator::Path(PathBuf::from("in.tsv")))]
fn designator_follows_argument(#[case] arg: Option<&str>, #[case] expected: InputDesignator) {
    assert_eq!(InputDesignator::from_arg(arg.map(std::path::Path::new)), expected);
}
