// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::sync::SharedNvm;
use crate::tests::support::fresh_engine;
use crate::types::AttrId;
use std::thread;
use std::vec;

#[test]
fn test_concurrent_writers_never_tear_a_page() {
    let nvm = SharedNvm::new(fresh_engine());

    thread::scope(|s| {
        for t in 0..4u8 {
            let nvm = &nvm;
            s.spawn(move || {
                for round in 0..8u8 {
                    let id = AttrId((t + round) % 3);
                    let value = t.wrapping_mul(16).wrapping_add(round);
                    nvm.set_attribute(id, &vec![value; 0x80]).unwrap();

                    let read = nvm.read_attribute(id).unwrap();
                    assert!(read[..0x80].iter().all(|&b| b == read[0]));
                }
            });
        }
    });

    let mut engine = nvm.into_inner();
    assert_eq!(engine.scrub(), Ok(0));
    for id in 0..3u8 {
        let value = engine.read_attribute(AttrId(id)).unwrap();
        assert!(value[..0x80].iter().all(|&b| b == value[0]));
    }
}

#[test]
fn test_with_engine_holds_lock_across_calls() {
    let nvm = SharedNvm::new(fresh_engine());
    let value = nvm.with_engine(|engine| {
        engine.set_attribute(AttrId(2), &[0x5A; 0x80])?;
        engine.read_attribute(AttrId(2))
    });
    assert_eq!(value.unwrap(), vec![0x5A; 0x80]);

    let mut out = [0u8; 0x80];
    assert_eq!(nvm.get_attribute(AttrId(2), &mut out), Ok(0x80));
    assert_eq!(out, [0x5A; 0x80]);
}
