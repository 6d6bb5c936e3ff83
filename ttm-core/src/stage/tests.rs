//! Unit tests for the stage runner.

use std::io::Cursor;
use std::path::PathBuf;

use rstest::rstest;
use ttm_test_support::fixtures::{temp_dir, tsv, write_file};
use ttm_test_support::tracing::RecordingLayer;

use super::*;
use crate::error::TtmError;
use crate::table::Table;

type TestResult = core::result::Result<(), Box<dyn std::error::Error>>;

/// Appends the character count of the `text` column.
struct LengthStage {
    column: &'static str,
}

impl Stage for LengthStage {
    fn name(&self) -> &str {
        "length"
    }

    fn method(&self) -> String {
        "chars".to_owned()
    }

    fn output_column(&self) -> &str {
        self.column
    }

    fn derive(&self, source: &mut TableSource) -> Result<Vec<String>> {
        Ok(source
            .collect_column("text")?
            .iter()
            .map(|text| text.chars().count().to_string())
            .collect())
    }
}

/// Derives one value fewer than there are rows.
struct ShortStage;

impl Stage for ShortStage {
    fn name(&self) -> &str {
        "short"
    }

    fn method(&self) -> String {
        "broken".to_owned()
    }

    fn output_column(&self) -> &str {
        "short"
    }

    fn derive(&self, source: &mut TableSource) -> Result<Vec<String>> {
        let rows = source.len()?;
        Ok(vec![String::new(); rows.saturating_sub(1)])
    }
}

/// Counts characters, then replaces its input file before the final pass.
struct RewritingStage {
    path: PathBuf,
    replacement: String,
}

impl Stage for RewritingStage {
    fn name(&self) -> &str {
        "rewrite"
    }

    fn method(&self) -> String {
        "chars".to_owned()
    }

    fn output_column(&self) -> &str {
        "length"
    }

    fn derive(&self, source: &mut TableSource) -> Result<Vec<String>> {
        let values = LengthStage { column: "length" }.derive(source)?;
        std::fs::write(&self.path, &self.replacement)
            .map_err(|err| TtmError::io(self.path.display().to_string(), err))?;
        Ok(values)
    }
}

fn input() -> String {
    tsv(
        &["text", "group"],
        &[("a:0", &["hello", "x"]), ("a:1", &["hi", "y"]), ("b:0", &["hey there", "x"])],
    )
}

fn buffered(contents: &str) -> TableSource {
    TableSource::from_reader("memory", Box::new(Cursor::new(contents.as_bytes().to_vec())))
}

fn run(stage: &dyn Stage, source: &mut TableSource) -> Result<(StageSummary, Vec<u8>)> {
    let mut writer = TableWriter::new("memory", Vec::new());
    let summary = StageRunner::new().run(stage, source, &mut writer)?;
    Ok((summary, writer.into_inner()))
}

#[test]
fn appends_one_column_and_preserves_everything_else() -> TestResult {
    let text = input();
    let (summary, output) = run(&LengthStage { column: "length" }, &mut buffered(&text))?;
    assert_eq!(summary.rows, 3);
    assert_eq!(summary.column, "length");

    let before = Table::read(Cursor::new(text.as_bytes()), "before")?;
    let after = Table::read(Cursor::new(output), "after")?;
    assert_eq!(after.header().columns(), &["text", "group", "length"]);
    assert_eq!(after.column("length")?, vec!["5", "2", "9"]);
    for (old, new) in before.rows().iter().zip(after.rows()) {
        assert_eq!(old.id, new.id);
        assert_eq!(old.cells, new.cells[..old.cells.len()]);
    }
    Ok(())
}

#[rstest]
#[case("text")]
#[case("id")]
fn refuses_to_overwrite_existing_columns(#[case] column: &'static str) {
    let text = input();
    let mut writer = TableWriter::new("memory", Vec::new());
    let err = StageRunner::new()
        .run(&LengthStage { column }, &mut buffered(&text), &mut writer)
        .expect_err("existing column must be rejected");
    assert!(matches!(err, TtmError::Schema(SchemaError::ColumnExists { .. })));
    assert!(writer.into_inner().is_empty());
}

#[test]
fn wrong_value_count_writes_nothing() {
    let text = input();
    let mut writer = TableWriter::new("memory", Vec::new());
    let err = StageRunner::new()
        .run(&ShortStage, &mut buffered(&text), &mut writer)
        .expect_err("short output must be rejected");
    assert!(matches!(
        err,
        TtmError::Schema(SchemaError::ValueCountMismatch { expected: 3, actual: 2, .. })
    ));
    assert!(writer.into_inner().is_empty());
}

#[test]
fn seekable_and_buffered_inputs_produce_identical_output() -> TestResult {
    let dir = temp_dir();
    let text = input();
    let path = write_file(dir.path(), "in.tsv", &text)?;

    let (file_summary, from_file) =
        run(&LengthStage { column: "length" }, &mut TableSource::open_path(&path)?)?;
    let (stream_summary, from_stream) =
        run(&LengthStage { column: "length" }, &mut buffered(&text))?;

    assert!(file_summary.seekable);
    assert!(!stream_summary.seekable);
    assert_eq!(from_file, from_stream);
    Ok(())
}

#[rstest]
#[case::shrunk(&[("a:0", &["hello", "x"][..]), ("a:1", &["hi", "y"][..])], 2)]
#[case::grown(
    &[("a:0", &["a", "x"][..]), ("a:1", &["b", "y"][..]), ("b:0", &["c", "x"][..]), ("b:1", &["d", "y"][..])],
    4
)]
fn input_changing_between_passes_is_a_format_error(
    #[case] rows: &[(&str, &[&str])],
    #[case] seen: usize,
) -> TestResult {
    let dir = temp_dir();
    let path = write_file(dir.path(), "in.tsv", &input())?;
    let stage = RewritingStage {
        path: path.clone(),
        replacement: tsv(&["text", "group"], rows),
    };
    let mut source = TableSource::open_path(&path)?;
    let mut writer = TableWriter::new("memory", Vec::new());
    let err = StageRunner::new()
        .run(&stage, &mut source, &mut writer)
        .expect_err("the row count changed between passes");
    assert!(matches!(
        err,
        TtmError::Format {
            error: FormatError::RowCountChanged { expected: 3, actual },
            ..
        } if actual == seen
    ));
    Ok(())
}

#[test]
fn empty_tables_keep_their_header() -> TestResult {
    let (summary, output) =
        run(&LengthStage { column: "length" }, &mut buffered("id\ttext\n"))?;
    assert_eq!(summary.rows, 0);
    assert_eq!(String::from_utf8(output)?, "id\ttext\tlength\n");
    Ok(())
}

#[test]
fn records_stage_span_and_completion_event() -> TestResult {
    let text = input();
    let (result, layer) =
        RecordingLayer::capture(|| run(&LengthStage { column: "length" }, &mut buffered(&text)));
    result?;

    let span = layer.span("stage.run").expect("stage.run span must exist");
    assert_eq!(span.field("stage"), Some("length"));
    assert_eq!(span.field("method"), Some("chars"));
    assert_eq!(span.field("rows"), Some("3"));

    let completed = layer
        .event("stage completed")
        .expect("completion event must exist");
    assert_eq!(completed.field("rows"), Some("3"));
    assert!(layer.event("buffered non-seekable input in memory").is_some());
    Ok(())
}
