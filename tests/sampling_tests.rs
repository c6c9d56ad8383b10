//! Page selection: clamping, the non-positive-means-maximum policy, and
//! sampling without replacement.

use std::collections::HashSet;

use quotescrape::select_pages;

#[test]
fn honors_an_exact_request() {
    let pages = select_pages(Some(4), 5, 10);
    assert_eq!(pages.len(), 4);
}

#[test]
fn falls_back_to_the_default_count() {
    let pages = select_pages(None, 5, 10);
    assert_eq!(pages.len(), 5);
}

#[test]
fn clamps_requests_beyond_the_universe() {
    let pages = select_pages(Some(25), 5, 10);
    assert_eq!(pages.len(), 10);
}

#[test]
fn zero_means_every_page() {
    let pages = select_pages(Some(0), 5, 10);
    assert_eq!(pages.len(), 10);
}

#[test]
fn full_universe_request_covers_every_page() {
    let pages: HashSet<usize> = select_pages(Some(10), 5, 10).into_iter().collect();
    assert_eq!(pages, (1..=10).collect());
}

#[test]
fn samples_without_replacement_within_the_universe() {
    for _ in 0..50 {
        let pages = select_pages(Some(7), 5, 10);
        let unique: HashSet<usize> = pages.iter().copied().collect();
        assert_eq!(unique.len(), pages.len(), "a page was drawn twice");
        assert!(pages.iter().all(|p| (1..=10).contains(p)));
    }
}

#[test]
fn empty_universe_yields_no_pages() {
    assert!(select_pages(Some(3), 5, 0).is_empty());
    assert!(select_pages(None, 5, 0).is_empty());
}
