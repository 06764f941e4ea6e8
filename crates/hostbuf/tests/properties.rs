//! Property tests over random access sequences and shapes.

use std::sync::Arc;

use hostbuf::prelude::*;
use proptest::prelude::*;

fn access_mode() -> impl Strategy<Value = AccessMode> {
    proptest::sample::select(AccessMode::ALL.to_vec())
}

fn shape_2d() -> impl Strategy<Value = (usize, usize)> {
    (1usize..8, 1usize..8)
}

proptest! {
    #[test]
    fn write_back_copies_every_element_in_order(
        (rows, cols) in shape_2d(),
        modes in proptest::collection::vec(access_mode(), 1..10),
    ) {
        let n = rows * cols;
        let values: Vec<i32> = (0..n as i32).map(|v| v * 3 - 7).collect();
        let destination = shared_host_data(vec![0; n]);
        let buffer = Buffer::<i32, 2>::from_read_only(&values, [rows, cols]).unwrap();
        buffer.set_final_data(Arc::clone(&destination));
        for &m in &modes {
            buffer.access(m, AccessTarget::HostBuffer).unwrap();
        }
        let wrote = modes.iter().any(|m| m.is_write_capable());
        let stats = buffer.stats();
        drop(buffer);

        if wrote {
            prop_assert_eq!(&*destination.lock(), &values);
            prop_assert_eq!(stats.write_backs(), 1);
        } else {
            prop_assert_eq!(&*destination.lock(), &vec![0; n]);
            prop_assert_eq!(stats.write_backs(), 0);
        }
        prop_assert_eq!(stats.lifecycle(), Lifecycle::Destroyed);
    }

    #[test]
    fn alias_writable_never_released(
        len in 1usize..64,
        modes in proptest::collection::vec(access_mode(), 0..10),
        extra_holders in 0usize..4,
    ) {
        let mut caller = vec![1u16; len];
        let stats = {
            let buffer = Buffer::<u16, 1>::from_host(&mut caller, len).unwrap();
            let clones: Vec<_> = (0..extra_holders).map(|_| buffer.clone()).collect();
            for &m in &modes {
                buffer.access(m, AccessTarget::HostBuffer).unwrap();
            }
            let stats = buffer.stats();
            drop(clones);
            stats
        };
        prop_assert_eq!(stats.releases(), 0);
        prop_assert_eq!(stats.allocations(), 0);
        prop_assert_eq!(caller.len(), len);
    }

    #[test]
    fn row_major_indexing_matches_storage_order(
        (rows, cols) in shape_2d(),
        r in 0usize..8,
        c in 0usize..8,
    ) {
        let n = rows * cols;
        let buffer = Buffer::<usize, 2>::from_elements_with_range(0..n, [rows, cols]).unwrap();
        let acc = buffer.access(AccessMode::Read, AccessTarget::HostBuffer).unwrap();
        let got = acc.get([r, c]);
        if r < rows && c < cols {
            prop_assert_eq!(got, Ok(r * cols + c));
        } else {
            let is_out_of_range = matches!(got, Err(BufferError::IndexOutOfRange { .. }));
            prop_assert!(is_out_of_range);
        }
    }
}
