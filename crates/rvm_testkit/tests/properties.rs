//! Property tests for commit and abort.

use proptest::prelude::*;
use rvm_testkit::prelude::*;

const SIZE: usize = 64;

fn apply(t: &mut TestStore, edits: &[Edit]) -> rvm_core::TransactionId {
    let seg = t.map("seg", SIZE);
    let txn = t.rvm.begin(t.store, &[seg]).unwrap();
    for edit in edits {
        t.rvm
            .about_to_modify(txn, seg, edit.offset, edit.data.len())
            .unwrap();
        t.write(seg, edit.offset, &edit.data);
    }
    txn
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn commit_persists_buffer(
        initial in contents_strategy(SIZE),
        edits in edits_strategy(SIZE, 6),
    ) {
        let mut t = TestStore::new();
        t.seed_file("seg", &initial);
        let txn = apply(&mut t, &edits);
        let seg = t.rvm.transaction(txn).unwrap().segments().iter().copied().next().unwrap();
        let at_commit = t.read(seg);

        t.rvm.commit(txn).unwrap();

        let on_disk = t.file_bytes("seg");
        for edit in &edits {
            prop_assert_eq!(
                &on_disk[edit.offset..edit.end()],
                &at_commit[edit.offset..edit.end()]
            );
        }

        let seg = t.remap(seg, "seg", SIZE);
        let mut expected = initial.clone();
        for edit in &edits {
            expected[edit.offset..edit.end()].copy_from_slice(&at_commit[edit.offset..edit.end()]);
        }
        prop_assert_eq!(t.read(seg), expected);
    }

    #[test]
    fn abort_restores_disjoint_edits(
        initial in contents_strategy(SIZE),
        edits in disjoint_edits_strategy(SIZE, 6),
    ) {
        let mut t = TestStore::new();
        t.seed_file("seg", &initial);
        let txn = apply(&mut t, &edits);
        let seg = t.rvm.transaction(txn).unwrap().segments().iter().copied().next().unwrap();

        t.rvm.abort(txn).unwrap();

        prop_assert_eq!(t.read(seg), initial.clone());
        prop_assert_eq!(t.file_bytes("seg"), initial);
    }

    #[test]
    fn abort_never_touches_file(
        initial in contents_strategy(SIZE),
        edits in edits_strategy(SIZE, 6),
    ) {
        let mut t = TestStore::new();
        t.seed_file("seg", &initial);
        let txn = apply(&mut t, &edits);

        t.rvm.abort(txn).unwrap();

        prop_assert_eq!(t.file_bytes("seg"), initial);
    }
}
