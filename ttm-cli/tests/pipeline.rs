#![expect(clippy::expect_used, reason = "tests require contextual panics")]
//! End-to-end runs of the enrichment pipeline through the command surface.
use std::fs;
use std::io::Cursor;
use std::path::Path;

use clap::Parser;
use ttm_cli::cli::{Cli, run_cli};
use ttm_core::Table;
use ttm_test_support::fixtures::{temp_dir, write_corpus};

const CORPUS: &[(&str, &str)] = &[
    (
        "garden.txt",
        "Apples and pears ripen in the orchard.\n\n\
         The orchard keeps apples, pears and plums.\n\n\
         Plums and apples fall from orchard trees.\n",
    ),
    (
        "garage.txt",
        "Engines and gearboxes fill the garage.\n\n\
         The garage smells of engines and oil.\n\n\
         Oil drips from gearboxes onto the garage floor.\n",
    ),
];

fn path_str(path: &Path) -> &str {
    path.to_str().expect("temporary paths are UTF-8")
}

fn ttm(args: &[&str]) -> String {
    let cli = Cli::try_parse_from(std::iter::once("ttm").chain(args.iter().copied()))
        .expect("arguments parse");
    let mut report = Vec::new();
    run_cli(cli, &mut report).unwrap_or_else(|err| panic!("ttm {args:?} failed: {err}"));
    String::from_utf8(report).expect("reports are UTF-8")
}

fn read_table(path: &Path) -> Table {
    let text = fs::read_to_string(path).expect("table exists");
    Table::read(Cursor::new(text), path_str(path)).expect("table parses")
}

#[test]
fn every_stage_appends_its_column() {
    let corpus = temp_dir();
    write_corpus(corpus.path(), CORPUS).expect("write corpus");
    let work = temp_dir();
    let file = |name: &str| work.path().join(name);
    let (cat, embedded, reduced, clustered, described) = (
        file("corpus.tsv"),
        file("embedded.tsv"),
        file("reduced.tsv"),
        file("clustered.tsv"),
        file("described.tsv"),
    );

    ttm(&["-o", path_str(&cat), "cat", path_str(corpus.path())]);
    let stage = |input: &Path, output: &Path, words: &[&str]| {
        let mut args = vec!["-i", path_str(input), "-o", path_str(output)];
        args.extend_from_slice(words);
        ttm(&args);
    };
    stage(&cat, &embedded, &["embed", "tfidf", "hash", "--features", "16"]);
    stage(&embedded, &reduced, &["redim", "svd", "--components", "2"]);
    stage(&reduced, &clustered, &["cluster", "kmeans", "--clusters", "2"]);
    stage(&clustered, &described, &["desc", "tfidf", "--limit", "3"]);

    let table = read_table(&described);
    assert_eq!(
        table.header().columns(),
        ["text", "highdim", "lowdim", "cluster", "desc"]
    );
    let ids: Vec<&str> = table.rows().iter().map(|row| row.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "garage.txt:0",
            "garage.txt:1",
            "garage.txt:2",
            "garden.txt:0",
            "garden.txt:1",
            "garden.txt:2",
        ]
    );
    assert_eq!(read_table(&cat).column("text"), table.column("text"));

    let report = ttm(&["eval", path_str(&described)]);
    assert!(report.starts_with(&format!("Evaluation results for {}\n", path_str(&described))));
    assert!(report.contains("  lowdim-size           2\n"), "{report}");
    assert!(report.ends_with("\n\n"));
}

#[test]
fn gzip_tables_flow_between_stages() {
    let corpus = temp_dir();
    write_corpus(corpus.path(), CORPUS).expect("write corpus");
    let work = temp_dir();
    let packed = work.path().join("corpus.tsv.gz");
    let embedded = work.path().join("embedded.tsv");

    ttm(&["-o", path_str(&packed), "cat", path_str(corpus.path())]);
    let raw = fs::read(&packed).expect("compressed output exists");
    assert_eq!(raw.get(..2), Some([0x1f, 0x8b].as_slice()));

    ttm(&["-i", path_str(&packed), "-o", path_str(&embedded), "embed", "hash"]);
    assert_eq!(read_table(&embedded).len(), 6);
}

#[test]
fn rerunning_a_stage_on_its_own_output_is_rejected() {
    let corpus = temp_dir();
    write_corpus(corpus.path(), CORPUS).expect("write corpus");
    let work = temp_dir();
    let cat = work.path().join("corpus.tsv");
    let embedded = work.path().join("embedded.tsv");
    let again = work.path().join("again.tsv");

    ttm(&["-o", path_str(&cat), "cat", path_str(corpus.path())]);
    ttm(&["-i", path_str(&cat), "-o", path_str(&embedded), "embed", "hash"]);
    let cli = Cli::try_parse_from([
        "ttm",
        "-i",
        path_str(&embedded),
        "-o",
        path_str(&again),
        "embed",
        "hash",
    ])
    .expect("arguments parse");
    let err = run_cli(cli, &mut Vec::new()).expect_err("highdim already exists");
    assert!(err.to_string().contains("highdim"), "{err}");
    assert!(!again.exists());
}
