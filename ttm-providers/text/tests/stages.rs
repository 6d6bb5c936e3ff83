#![expect(clippy::expect_used, reason = "tests require contextual panics")]
//! Integration tests running the text stages through the stage runner.
use std::io::Cursor;

use rstest::rstest;
use ttm_core::{Stage, StageRunner, Table, TableSource, TableWriter};
use ttm_providers_text::{DescStage, EmbedStage, desc::DescColumns};
use ttm_test_support::fixtures::{temp_dir, tsv, write_file};

fn corpus() -> String {
    tsv(
        &["text", "cluster"],
        &[
            ("a.txt:0", &["Rust borrows and owns memory", "0"]),
            ("a.txt:1", &["The borrow checker owns lifetimes", "0"]),
            ("b.txt:0", &["Gardening needs water and soil", "1"]),
        ],
    )
}

fn run(stage: &dyn Stage, source: &mut TableSource) -> Vec<u8> {
    let mut writer = TableWriter::new("memory", Vec::new());
    StageRunner::new()
        .run(stage, source, &mut writer)
        .expect("stage must succeed");
    writer.into_inner()
}

fn words(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_owned).collect()
}

#[rstest]
#[case("bow")]
#[case("tfidf --min-df 1")]
#[case("hash --features 32 tfidf")]
fn embed_output_is_identical_for_files_and_streams(#[case] line: &str) {
    let dir = temp_dir();
    let text = corpus();
    let path = write_file(dir.path(), "corpus.tsv", &text).expect("write corpus");
    let stage = EmbedStage::from_words("text", "highdim", &words(line)).expect("stage builds");

    let from_file = run(&stage, &mut TableSource::open_path(&path).expect("open"));
    let from_stream = run(
        &stage,
        &mut TableSource::from_reader("stdin", Box::new(Cursor::new(text.into_bytes()))),
    );
    assert_eq!(from_file, from_stream);
}

#[test]
fn desc_appends_after_embed() {
    let embed = EmbedStage::from_words("text", "highdim", &words("bow")).expect("stage builds");
    let embedded = run(
        &embed,
        &mut TableSource::from_reader("stdin", Box::new(Cursor::new(corpus().into_bytes()))),
    );
    let desc = DescStage::from_words(DescColumns::default(), &words("tfidf --limit 2"))
        .expect("stage builds");
    let described = run(
        &desc,
        &mut TableSource::from_reader("stdin", Box::new(Cursor::new(embedded))),
    );

    let table = Table::read(Cursor::new(described), "described").expect("valid table");
    assert_eq!(table.header().columns(), &["text", "cluster", "highdim", "desc"]);
    let descriptions = table.column("desc").expect("desc column");
    assert_eq!(descriptions[0], descriptions[1]);
    assert_ne!(descriptions[0], descriptions[2]);
}
