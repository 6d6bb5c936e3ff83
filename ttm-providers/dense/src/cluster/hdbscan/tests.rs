//! Unit tests for HDBSCAN clustering.

use std::collections::HashSet;

use rstest::rstest;

use super::*;

fn line(points: &[f64]) -> Matrix {
    Matrix::from_flat(points.len(), 1, points.to_vec()).expect("one column")
}

fn hdbscan(min_cluster_size: usize, selection: Selection) -> Hdbscan {
    Hdbscan::new(min_cluster_size, min_cluster_size, Metric::Euclidean, selection)
        .expect("valid configuration")
}

fn distinct(labels: &[i64]) -> HashSet<i64> {
    labels.iter().copied().filter(|&label| label != NOISE).collect()
}

const TWO_BLOBS: [f64; 8] = [0.0, 0.1, 0.2, 0.3, 10.0, 10.1, 10.2, 10.3];
/// Two close blobs and a distant third one.
const NESTED: [f64; 12] = [
    0.0, 0.1, 0.2, 0.3, 0.6, 0.7, 0.8, 0.9, 50.0, 50.1, 50.2, 50.3,
];

#[rstest]
#[case(Selection::Eom)]
#[case(Selection::Leaf)]
fn separates_two_blobs(#[case] selection: Selection) -> ttm_core::Result<()> {
    let labels = hdbscan(3, selection).cluster(&line(&TWO_BLOBS))?;
    assert!(labels.iter().all(|&label| label != NOISE), "{labels:?}");
    assert!(labels[..4].iter().all(|&label| label == labels[0]));
    assert!(labels[4..].iter().all(|&label| label == labels[4]));
    assert_ne!(labels[0], labels[4]);
    Ok(())
}

#[test]
fn distant_outlier_is_noise() -> ttm_core::Result<()> {
    let mut points = TWO_BLOBS.to_vec();
    points.push(100.0);
    let labels = hdbscan(3, Selection::Eom).cluster(&line(&points))?;
    assert_eq!(labels[8], NOISE);
    assert_eq!(distinct(&labels).len(), 2);
    Ok(())
}

#[test]
fn a_single_dense_run_is_all_noise() -> ttm_core::Result<()> {
    let labels = hdbscan(3, Selection::Eom).cluster(&line(&[0.0, 1.0, 2.0, 3.0, 4.0]))?;
    assert_eq!(labels, vec![NOISE; 5]);
    Ok(())
}

#[test]
fn fewer_rows_than_the_minimum_are_noise() -> ttm_core::Result<()> {
    let labels = hdbscan(5, Selection::Eom).cluster(&line(&[0.0, 0.1, 0.2]))?;
    assert_eq!(labels, vec![NOISE; 3]);
    Ok(())
}

#[test]
fn excess_of_mass_keeps_the_persistent_parent() -> ttm_core::Result<()> {
    let labels = hdbscan(3, Selection::Eom).cluster(&line(&NESTED))?;
    assert_eq!(distinct(&labels).len(), 2, "{labels:?}");
    assert!(labels[..8].iter().all(|&label| label == labels[0]));
    assert_ne!(labels[0], labels[8]);
    Ok(())
}

#[test]
fn leaf_selection_keeps_the_finest_clusters() -> ttm_core::Result<()> {
    let labels = hdbscan(3, Selection::Leaf).cluster(&line(&NESTED))?;
    assert_eq!(distinct(&labels).len(), 3, "{labels:?}");
    assert_ne!(labels[0], labels[4]);
    assert_ne!(labels[4], labels[8]);
    Ok(())
}

#[test]
fn duplicate_points_keep_finite_stabilities() -> ttm_core::Result<()> {
    let points = [0.0, 0.0, 0.0, 0.0, 5.0, 5.0, 5.0, 5.0];
    let labels = hdbscan(3, Selection::Eom).cluster(&line(&points))?;
    assert_eq!(distinct(&labels).len(), 2, "{labels:?}");
    Ok(())
}

#[rstest]
#[case(&["--min-cluster-size", "1"])]
#[case(&["--min-samples", "0"])]
#[case(&["--cluster-selection-method", "flat"])]
fn rejects_bad_arguments(#[case] args: &[&str]) {
    let args: Vec<String> = args.iter().map(|&arg| arg.to_owned()).collect();
    assert!(matches!(Hdbscan::from_args(&args), Err(TtmError::Config { .. })));
}

#[test]
fn min_samples_defaults_to_min_cluster_size() -> ttm_core::Result<()> {
    let parsed = Hdbscan::from_args(&["--min-cluster-size".to_owned(), "4".to_owned()])?;
    assert_eq!(parsed, hdbscan(4, Selection::Eom));
    Ok(())
}
