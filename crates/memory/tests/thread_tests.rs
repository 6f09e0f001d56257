//! Thread-safety tests for the atomic counter strategy
#![cfg(feature = "arc")]

use std::thread;

use tether_memory::{SharedHandle, SharedHandleMut, WeakHandle};

fn assert_send_and_sync<T: Send + Sync>() {}

#[test]
fn handles_cross_threads_when_the_object_does() {
    assert_send_and_sync::<SharedHandle<String>>();
    assert_send_and_sync::<WeakHandle<String>>();
    assert_send_and_sync::<SharedHandleMut<String>>();
}

#[test]
fn concurrent_clones_and_drops_leave_a_consistent_count() {
    let handle = SharedHandle::new(0u64);

    let threads: Vec<_> = (0..8)
        .map(|_| {
            let handle = handle.clone();
            thread::spawn(move || {
                for _ in 0..10_000 {
                    let copy = handle.clone();
                    assert!(copy.is_valid());
                }
            })
        })
        .collect();

    for thread in threads {
        thread.join().unwrap();
    }

    assert_eq!(handle.strong_count(), 1);
    assert_eq!(handle.get(), Ok(&0));
}

#[test]
fn concurrent_observers_expire_exactly_once() {
    let handle = SharedHandle::new(1u32);

    let threads: Vec<_> = (0..8)
        .map(|_| {
            let weak = handle.downgrade();
            thread::spawn(move || {
                for _ in 0..10_000 {
                    let observer = weak.clone();
                    drop(observer);
                }
                weak
            })
        })
        .collect();

    drop(handle);
    for thread in threads {
        let weak = thread.join().unwrap();
        assert!(weak.upgrade().is_none());
    }
}

#[test]
fn upgrades_race_the_final_drop_without_resurrection() {
    for _ in 0..200 {
        let handle = SharedHandle::new(7u32);
        let weak = handle.downgrade();

        let upgrader = thread::spawn(move || {
            // Each successful upgrade must observe the intact object; once
            // the upgrade fails the object is gone for good.
            while let Some(strong) = weak.upgrade() {
                assert_eq!(strong.get(), Ok(&7));
            }
            assert!(weak.upgrade().is_none());
        });

        drop(handle);
        upgrader.join().unwrap();
    }
}

#[test]
fn get_mut_refuses_access_while_an_observer_can_upgrade() {
    for _ in 0..2_000 {
        let mut handle = SharedHandle::new(0u32);
        let weak = handle.downgrade();

        // Upgrade first and drop the weak second, so a uniqueness check that
        // reads the two counts separately could observe strong==1 before the
        // upgrade and weak==0 after the drop.
        let racer = thread::spawn(move || {
            let strong = weak.upgrade().unwrap();
            drop(weak);
            for _ in 0..100 {
                assert_eq!(strong.get(), Ok(&0));
            }
        });

        for _ in 0..500 {
            if let Some(value) = handle.get_mut() {
                // Exclusive access means the racing strong handle and its
                // observer are both gone, so nothing can read this write.
                *value = 1;
                *value = 0;
                assert_eq!(handle.strong_count(), 1);
                assert_eq!(handle.weak_count(), 0);
            }
        }

        racer.join().unwrap();
        assert!(handle.get_mut().is_some());
    }
}

#[test]
fn shared_mutation_is_serialized() {
    let handle = SharedHandleMut::from(0u64);

    let threads: Vec<_> = (0..4)
        .map(|_| {
            let handle = handle.clone();
            thread::spawn(move || {
                for _ in 0..1_000 {
                    *handle.get().unwrap().borrow_mut() += 1;
                }
            })
        })
        .collect();

    for thread in threads {
        thread.join().unwrap();
    }

    assert_eq!(*handle.get().unwrap().borrow(), 4_000);
}
