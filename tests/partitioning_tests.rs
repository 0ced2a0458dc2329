//! Source partitioning tests

use std::sync::Arc;

use partix::prelude::*;
use partix_exec::drain_all;
use proptest::prelude::*;

fn partitions(len: i64, n: usize, striped: bool) -> Vec<Vec<(i64, usize)>> {
    let stream = ListPartitioner::partition(Arc::new(0..len), n, striped).expect("partition");
    let (runs, _) = drain_all(stream, &ThreadExecutor::new(), &CancellationToken::new(), 64)
        .expect("drain");
    runs
}

#[test]
fn test_contiguous_layout_is_balanced() {
    let runs = partitions(10, 3, false);
    let sizes: Vec<usize> = runs.iter().map(Vec::len).collect();
    // First M % N partitions take one extra element.
    assert_eq!(sizes, vec![4, 3, 3]);
    assert_eq!(runs[1][0], (4, 4));
}

#[test]
fn test_striped_layout() {
    let runs = partitions(7, 3, true);
    let keys: Vec<Vec<usize>> = runs
        .iter()
        .map(|r| r.iter().map(|(_, k)| *k).collect())
        .collect();
    assert_eq!(keys, vec![vec![0, 3, 6], vec![1, 4], vec![2, 5]]);
}

#[test]
fn test_more_partitions_than_elements() {
    let runs = partitions(2, 5, false);
    assert_eq!(runs.len(), 5);
    assert_eq!(runs.iter().map(Vec::len).sum::<usize>(), 2);
    assert!(runs[2..].iter().all(Vec::is_empty));
}

#[test]
fn test_zero_partitions_rejected() {
    let err = ListPartitioner::partition(Arc::new(0..10i64), 0, false).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn test_empty_source() {
    let runs = partitions(0, 4, true);
    assert!(runs.iter().all(Vec::is_empty));
}

#[test]
fn test_range_wider_than_i64_max() {
    let full = i64::MIN..i64::MAX;
    let span = usize::try_from(u64::MAX).ok();
    assert_eq!(IndexedSource::checked_len(&full), span);
    assert_eq!(IndexedSource::len(&full), span.unwrap_or(usize::MAX));
    if let Some(len) = span {
        assert_eq!(IndexedSource::get(&full, 0), i64::MIN);
        assert_eq!(IndexedSource::get(&full, len - 1), i64::MAX - 1);
    }

    let source = Arc::new(-10i64..i64::MAX);
    match usize::try_from(i64::MAX as u64 + 10) {
        Ok(len) => {
            let mut stream = ListPartitioner::partition(source, 2, false).expect("partition");
            // Odd length: partition 0 takes the extra element.
            let second = len - len / 2;
            let tail = stream.partition_mut(1).expect("second partition");
            match tail.advance().expect("advance") {
                Advance::Yielded(value, key) => {
                    assert_eq!(key, second);
                    assert_eq!(value, -10 + second as i64);
                }
                Advance::Exhausted => panic!("second partition is empty"),
            }
            let head = stream.partition_mut(0).expect("first partition");
            assert!(matches!(
                head.advance().expect("advance"),
                Advance::Yielded(-10, 0)
            ));
            stream.dispose_all().expect("dispose");
        }
        Err(_) => {
            let err = ListPartitioner::partition(source, 2, false).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_striped_covers_every_index_once(len in 0i64..300, n in 1usize..9) {
        let runs = partitions(len, n, true);
        let mut seen = vec![0u32; len as usize];
        for (p, run) in runs.iter().enumerate() {
            for (value, key) in run {
                prop_assert_eq!(*value, *key as i64);
                prop_assert_eq!(key % n, p);
                seen[*key] += 1;
            }
        }
        prop_assert!(seen.iter().all(|&c| c == 1));
    }

    #[test]
    fn prop_contiguous_concatenation_is_source(len in 0i64..300, n in 1usize..9) {
        let runs = partitions(len, n, false);
        let flat: Vec<i64> = runs.into_iter().flatten().map(|(v, _)| v).collect();
        prop_assert_eq!(flat, (0..len).collect::<Vec<_>>());
    }
}
