//! Cross-operation behavior of the view types: search consistency,
//! replacement semantics, destructive parsing, and ordering.

use std::cmp::Ordering;

use vireo_range::{Piece, PieceMut, StringPiece};

fn naive_find(hay: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    if needle.len() > hay.len() {
        return None;
    }
    (0..=hay.len() - needle.len()).find(|&i| &hay[i..i + needle.len()] == needle)
}

#[test]
fn test_find_agrees_with_naive_scan_over_corpus() {
    let haystacks: &[&[u8]] = &[
        b"",
        b"a",
        b"ab",
        b"aaaaaaa",
        b"abcdefg",
        b"the quick brown fox jumps over the lazy dog",
        b"mississippi",
        b"\x00\x01\x02\x00\x01\x02",
    ];
    let needles: &[&[u8]] = &[
        b"", b"a", b"q", b"the", b"ssi", b"ppi", b"og", b"\x01\x02", b"zzz",
        b"mississippi river",
    ];
    for hay in haystacks {
        let p = StringPiece::new(hay);
        for needle in needles {
            assert_eq!(
                p.find(needle),
                naive_find(hay, needle),
                "hay={hay:?} needle={needle:?}"
            );
        }
    }
}

#[test]
fn test_replace_all_sequential_overlap() {
    let mut buf = *b"aaaaaaa";
    let mut p = PieceMut::new(&mut buf);
    let n = p.replace_all(b"aa", b"ba").unwrap();
    assert_eq!(n, 3);
    assert_eq!(&buf, b"bababaa");
}

#[test]
fn test_replace_at_fits_iff_within_bounds() {
    let mut buf = *b"buffer";
    let mut p = PieceMut::new(&mut buf);

    // pos + |x| == |r| fits exactly
    assert!(p.replace_at(4, b"le"));
    assert_eq!(p, "buffle");

    // pos + |x| > |r| fails and leaves the view unchanged
    assert!(!p.replace_at(5, b"xy"));
    assert_eq!(p, "buffle");
}

#[test]
fn test_split_step_empty_fields_and_exhaustion() {
    let mut p = StringPiece::from("a,b,,c");
    let fields: Vec<String> = std::iter::from_fn(|| {
        if p.is_empty() {
            None
        } else {
            Some(p.split_step(&b',').to_string())
        }
    })
    .collect();
    assert_eq!(fields, ["a", "b", "", "c"]);
    assert!(p.is_empty());
}

#[test]
fn test_remove_prefix_mutates_iff_starts_with() {
    let mut p = StringPiece::from("abcdef");
    let held = p.starts_with(b"abc");
    assert!(held);
    assert!(p.remove_prefix(b"abc"));
    assert_eq!(p, "def");

    let held = p.starts_with(b"zzz");
    assert!(!held);
    assert!(!p.remove_prefix(b"zzz"));
    assert_eq!(p, "def");
}

#[test]
fn test_compare_is_antisymmetric_and_transitive() {
    let words: &[&[u8]] = &[b"", b"a", b"ab", b"abc", b"abd", b"b", b"ba"];
    let pieces: Vec<StringPiece<'_>> = words.iter().map(|w| StringPiece::new(w)).collect();

    for a in &pieces {
        for b in &pieces {
            // Antisymmetry
            assert_eq!(a.cmp(b), b.cmp(a).reverse());
            for c in &pieces {
                // Transitivity
                if a.cmp(b) == Ordering::Less && b.cmp(c) == Ordering::Less {
                    assert_eq!(a.cmp(c), Ordering::Less);
                }
            }
        }
    }
}

#[test]
fn test_byte_ordering_matches_memcmp_for_equal_lengths() {
    let pairs: &[(&[u8], &[u8])] = &[
        (b"abc", b"abd"),
        (b"\x00\x01", b"\x00\x02"),
        (b"\xff\x00", b"\x00\xff"),
        (b"same", b"same"),
    ];
    for (x, y) in pairs {
        let expected = x.cmp(y); // slice cmp is memcmp ordering for u8
        assert_eq!(StringPiece::new(x).cmp(&StringPiece::new(y)), expected);
    }
}

#[test]
fn test_generic_element_views() {
    let v = vec![10u32, 20, 30, 20, 10];
    let p = Piece::new(&v);
    assert_eq!(p.find(&[20, 30]), Some(1));
    assert_eq!(p.rfind(&20), Some(3));
    assert!(p.starts_with(&[10, 20]));
    assert!(p.ends_with(&[20, 10]));

    let mut q = p;
    assert_eq!(q.split_step(&30).data(), &[10, 20]);
    assert_eq!(q.data(), &[20, 10]);
}
