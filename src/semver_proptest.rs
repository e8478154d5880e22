//! Property-based tests for the version key comparator.
//!
//! These tests use proptest to generate random keys and verify that the
//! ordering is a consistent total order with a build-metadata tiebreak.

#[cfg(test)]
mod proptest_tests {
    use crate::version::semver::SemverKey;
    use proptest::prelude::*;
    use std::cmp::Ordering;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn identifier() -> impl Strategy<Value = String> {
        prop_oneof![
            (0u32..40).prop_map(|n| n.to_string()),
            "[a-z]{1,5}",
        ]
    }

    fn core() -> impl Strategy<Value = String> {
        prop::collection::vec(0u64..30, 1..5).prop_map(|parts| {
            parts
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(".")
        })
    }

    fn prerelease() -> impl Strategy<Value = Option<String>> {
        prop::option::of(prop::collection::vec(identifier(), 1..4).prop_map(|ids| ids.join(".")))
    }

    fn build() -> impl Strategy<Value = Option<String>> {
        prop::option::of("[a-z0-9]{1,6}")
    }

    fn key() -> impl Strategy<Value = SemverKey> {
        (core(), prerelease(), build()).prop_map(|(core, pre, build)| {
            let mut raw = core;
            if let Some(pre) = pre {
                raw.push('-');
                raw.push_str(&pre);
            }
            if let Some(build) = build {
                raw.push('+');
                raw.push_str(&build);
            }
            SemverKey::parse(&raw).unwrap()
        })
    }

    fn hash_of(k: &SemverKey) -> u64 {
        let mut hasher = DefaultHasher::new();
        k.hash(&mut hasher);
        hasher.finish()
    }

    proptest! {
        /// Property: comparison is antisymmetric
        #[test]
        fn comparison_is_antisymmetric(a in key(), b in key()) {
            prop_assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
        }

        /// Property: comparison is transitive
        #[test]
        fn comparison_is_transitive(a in key(), b in key(), c in key()) {
            let mut sorted = [a, b, c];
            sorted.sort();
            prop_assert!(sorted[0] <= sorted[1]);
            prop_assert!(sorted[1] <= sorted[2]);
            prop_assert!(sorted[0] <= sorted[2]);
        }

        /// Property: equal keys hash equally
        #[test]
        fn equal_keys_hash_equally(a in key(), b in key()) {
            if a == b {
                prop_assert_eq!(hash_of(&a), hash_of(&b));
            }
        }

        /// Property: keys differing only in build metadata order like their build strings
        #[test]
        fn build_metadata_breaks_ties(
            core in core(),
            pre in prerelease(),
            left in "[a-z0-9]{1,6}",
            right in "[a-z0-9]{1,6}",
        ) {
            let base = match pre {
                Some(pre) => format!("{core}-{pre}"),
                None => core,
            };
            let a = SemverKey::parse(&format!("{base}+{left}")).unwrap();
            let b = SemverKey::parse(&format!("{base}+{right}")).unwrap();
            prop_assert_eq!(a.cmp(&b), left.cmp(&right));
            if left != right {
                prop_assert_ne!(a.cmp(&b), Ordering::Equal);
            }
        }

        /// Property: display reproduces the parsed input
        #[test]
        fn display_reproduces_input(k in key()) {
            let again = SemverKey::parse(&k.to_string()).unwrap();
            prop_assert_eq!(again.to_string(), k.to_string());
        }
    }
}
