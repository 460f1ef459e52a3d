//! Property-based tests for locator parsing and path manipulation.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::error::Error;
    use crate::locator::parse;
    use crate::path::{normalize_subdir, package_name_from_path, resolve_relative_remote};
    use proptest::prelude::*;

    fn segment() -> impl Strategy<Value = String> {
        "[a-z0-9_-]{1,8}"
    }

    fn segments(max: usize) -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec(segment(), 1..max)
    }

    // ============================================================================
    // normalize_subdir property tests
    // ============================================================================

    proptest! {
        /// Property: a normalized subdir is relative and never contains '..'
        #[test]
        fn normalize_subdir_output_is_relative(input in "[a-z./]{0,24}") {
            if let Ok(subdir) = normalize_subdir(&input) {
                prop_assert!(!subdir.is_empty());
                prop_assert!(!subdir.starts_with('/'));
                prop_assert!(!subdir.ends_with('/'));
                prop_assert!(!subdir.split('/').any(|s| s == ".." || s == "." || s.is_empty()));
            }
        }

        /// Property: normalization is idempotent
        #[test]
        fn normalize_subdir_is_idempotent(input in "[a-z./]{0,24}") {
            if let Ok(once) = normalize_subdir(&input) {
                prop_assert_eq!(normalize_subdir(&once).unwrap(), once);
            }
        }

        /// Property: any '..' segment is rejected
        #[test]
        fn normalize_subdir_rejects_parent_segments(
            before in segments(3),
            after in segments(3),
        ) {
            let input = format!("{}/../{}", before.join("/"), after.join("/"));
            prop_assert!(normalize_subdir(&input).is_err());
        }
    }

    // ============================================================================
    // Locator parse property tests
    // ============================================================================

    proptest! {
        /// Property: parse never panics, and failures are always MalformedLocator
        #[test]
        fn parse_never_panics(input in ".{0,64}") {
            if let Err(error) = parse(&input) {
                let is_malformed = matches!(error, Error::MalformedLocator { .. });
                prop_assert!(is_malformed);
            }
        }

        /// Property: the canonical rendering parses back to the same locator
        #[test]
        fn parse_display_is_stable(
            host in "[a-z]{1,10}",
            path in segments(4),
            subdir in prop::option::of(segments(3)),
            lfs in prop::option::of(prop::bool::ANY),
            refspec in prop::option::of("[a-zA-Z0-9._/-]{1,16}"),
        ) {
            let mut raw = format!("https://{}.example/{}", host, path.join("/"));
            let mut query = Vec::new();
            if let Some(subdir) = &subdir {
                query.push(format!("subdir={}", subdir.join("/")));
            }
            if let Some(lfs) = lfs {
                query.push(format!("lfs={}", u8::from(lfs)));
            }
            if !query.is_empty() {
                raw.push('?');
                raw.push_str(&query.join("&"));
            }
            if let Some(refspec) = &refspec {
                raw.push('#');
                raw.push_str(refspec);
            }

            let locator = parse(&raw).unwrap();
            prop_assert_eq!(locator.ref_spec(), refspec.as_deref());
            let reparsed = parse(&locator.to_string()).unwrap();
            prop_assert_eq!(reparsed, locator);
        }
    }

    // ============================================================================
    // resolve_relative_remote property tests
    // ============================================================================

    proptest! {
        /// Property: '../name' always lands next to the base remote
        #[test]
        fn relative_sibling_replaces_last_component(
            base in prop::collection::vec(segment(), 2..5),
            name in segment(),
        ) {
            let base_remote = format!("/{}", base.join("/"));
            let resolved = resolve_relative_remote(&base_remote, &format!("../{}", name)).unwrap();

            let mut expected = base.clone();
            expected.pop();
            expected.push(name);
            prop_assert_eq!(resolved, format!("/{}", expected.join("/")));
        }

        /// Property: climbing more levels than the base has always fails
        #[test]
        fn relative_remote_cannot_escape_root(base in segments(5), extra in 0usize..3) {
            let climbs = "../".repeat(base.len() + 1 + extra);
            let relative = format!("{}x", climbs);
            prop_assert_eq!(resolve_relative_remote(&format!("/{}", base.join("/")), &relative), None);
        }

        /// Property: a package name derived from a path never contains a separator
        #[test]
        fn package_name_has_no_separator(path in segments(5)) {
            let name = package_name_from_path(&path.join("/")).unwrap();
            prop_assert!(!name.contains('/'));
            prop_assert_eq!(Some(&name), path.last());
        }
    }
}
