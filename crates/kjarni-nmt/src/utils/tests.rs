use super::*;
use approx::assert_abs_diff_eq;
use ndarray::{arr1, arr2, Array2};

#[test]
fn test_softmax_rows_sum_to_one() {
    let mut scores = arr2(&[[1.0, 2.0, 3.0], [1000.0, 1000.0, 1000.0]]);
    softmax_rows_inplace(&mut scores);

    for row in scores.rows() {
        assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-6);
    }
    assert!(scores[[0, 2]] > scores[[0, 1]]);
    assert_abs_diff_eq!(scores[[1, 0]], 1.0 / 3.0, epsilon = 1e-6);
}

#[test]
fn test_softmax_rows_are_independent() {
    let mut a = arr2(&[[0.5, -1.0], [3.0, 2.0]]);
    let mut b = arr2(&[[3.0, 2.0], [0.5, -1.0]]);
    softmax_rows_inplace(&mut a);
    softmax_rows_inplace(&mut b);
    assert_eq!(a.row(0), b.row(1));
    assert_eq!(a.row(1), b.row(0));
}

#[test]
fn test_softmax_1d() {
    let mut v = arr1(&[0.0, 0.0, 0.0, 0.0]);
    softmax_1d_inplace(&mut v);
    assert_abs_diff_eq!(v[0], 0.25, epsilon = 1e-7);
}

#[test]
fn test_sigmoid_inplace() {
    let mut a = arr2(&[[0.0, 100.0, -100.0]]);
    sigmoid_inplace(&mut a);
    assert_abs_diff_eq!(a[[0, 0]], 0.5, epsilon = 1e-7);
    assert_abs_diff_eq!(a[[0, 1]], 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(a[[0, 2]], 0.0, epsilon = 1e-6);
}

#[test]
fn test_assemble_rows_duplicates_and_drops() {
    let source = arr2(&[[0.0, 0.1], [1.0, 1.1], [2.0, 2.1], [3.0, 3.1]]);
    let out = assemble_rows(&source, &[0, 0, 3]);

    assert_eq!(out.dim(), (3, 2));
    assert_eq!(out.row(0), source.row(0));
    assert_eq!(out.row(1), source.row(0));
    assert_eq!(out.row(2), source.row(3));
}

#[test]
fn test_assemble_rows_can_grow() {
    let source = arr2(&[[7.0, 8.0]]);
    let out = assemble_rows(&source, &[0, 0, 0, 0, 0]);
    assert_eq!(out, Array2::from_shape_fn((5, 2), |(_, j)| if j == 0 { 7.0 } else { 8.0 }));
}

#[test]
fn test_levenshtein_suggestions() {
    assert_eq!(distance("kitten", "sitting"), 3);
    assert_eq!(similarity("dl4mt", "dl4mt"), 1.0);

    let found = find_similar("Nematsu", &["dl4mt", "nematus"], 3, 0.4);
    assert_eq!(found[0].0, "nematus");
}

#[test]
fn test_distance_edge_cases() {
    assert_eq!(distance("", ""), 0);
    assert_eq!(distance("", "abc"), 3);
    assert_eq!(distance("abc", ""), 3);
    assert_eq!(distance("dl4mt", "dl4nt"), 1);
    assert_eq!(distance("sitting", "kitten"), 3);
    assert_eq!(distance("flaw", "lawn"), 2);
    assert_eq!(distance("nematus", "nematsu"), 2);
    assert_eq!(distance("größe", "grösse"), 2);
}
