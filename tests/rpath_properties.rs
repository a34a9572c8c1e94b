//! Property tests for rpath editing

use linkage_patcher::{
    edit_rpath, normalize_rpath, RPathAddition, RPathDeletion, RPathList, RPathRename,
};
use proptest::prelude::*;

fn entry() -> impl Strategy<Value = String> {
    "[a-z/$.]{1,6}"
}

fn rpath() -> impl Strategy<Value = String> {
    prop::collection::vec(entry(), 0..6).prop_map(|entries| entries.join(":"))
}

proptest! {
    #[test]
    fn normalize_is_idempotent(value in "[a-z:]{0,12}") {
        let once = normalize_rpath(&value);
        prop_assert_eq!(normalize_rpath(&once), once.clone());
        prop_assert!(!once.contains("::"));
        prop_assert_ne!(once.as_str(), ":");
    }

    #[test]
    fn delete_removes_every_occurrence_and_nothing_else(current in rpath(), old in entry()) {
        let mut deletions = vec![RPathDeletion::new(old.clone())];
        let result = edit_rpath(&current, &mut [], &[], &mut deletions);

        let before = RPathList::parse(&current);
        let after = RPathList::parse(&result.value);
        let expected: Vec<_> = before.entries().iter().filter(|e| **e != old).cloned().collect();

        prop_assert_eq!(after.entries(), expected.as_slice());
        prop_assert_eq!(deletions[0].matched, before.contains(&old));
        prop_assert_eq!(result.dirty, before.contains(&old));
    }

    #[test]
    fn rename_only_touches_whole_entries(current in rpath(), old in entry(), new in entry()) {
        prop_assume!(old != new);
        let mut renames = vec![RPathRename::new(old.clone(), new.clone())];
        let result = edit_rpath(&current, &mut renames, &[], &mut []);

        let before = RPathList::parse(&current);
        let after = RPathList::parse(&result.value);
        prop_assert_eq!(before.entries().len(), after.entries().len());
        for (b, a) in before.entries().iter().zip(after.entries()) {
            if *b == old {
                prop_assert_eq!(a, &new);
            } else {
                prop_assert_eq!(a, b);
            }
        }
    }

    #[test]
    fn addition_appends_one_entry(current in rpath(), new in entry()) {
        let result = edit_rpath(&current, &mut [], &[RPathAddition::new(new.clone())], &mut []);

        prop_assert!(result.dirty);
        prop_assert!(!result.value.starts_with(':'));
        prop_assert!(!result.value.ends_with(':'));
        let expected = if current.is_empty() { new } else { format!("{current}:{new}") };
        prop_assert_eq!(result.value, expected);
    }

    #[test]
    fn dirty_output_is_canonical(current in "[a-c:]{0,10}", old in "[a-c]{1,2}") {
        let mut deletions = vec![RPathDeletion::new(old)];
        let result = edit_rpath(&current, &mut [], &[], &mut deletions);

        if result.dirty {
            prop_assert!(!result.value.contains("::"));
            prop_assert!(!result.value.starts_with(':'));
            prop_assert!(!result.value.ends_with(':'));
        } else {
            prop_assert_eq!(result.value, current);
        }
    }
}
