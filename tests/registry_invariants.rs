//! Index Registry Invariant Tests
//!
//! Tests for registry invariants:
//! - Most recently registered plugin is primary
//! - A disabled index never blocks another plugin
//! - Alternates join only when they carry the primary's associated attributes
//! - Registration is safe while searches hold read guards

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use aerodir::dn::Dn;
use aerodir::filter::{parse, Filter};
use aerodir::idlist::IdList;
use aerodir::index::{Evaluation, IndexDescriptor, IndexRegistry, PluginValidator, RegistryError};
use aerodir::storage::SuffixResolver;
use proptest::prelude::*;

// =============================================================================
// Helper Functions
// =============================================================================

fn ns() -> Dn {
    Dn::new("dc=example,dc=com")
}

fn registry() -> IndexRegistry {
    IndexRegistry::new(Arc::new(SuffixResolver::new([ns()])))
}

fn answer(ids: &'static [u64]) -> impl Fn(&Filter, &Dn) -> Option<IdList> + Send + Sync {
    move |_: &Filter, _: &Dn| Some(IdList::from_ids(ids.iter().copied()))
}

fn chain_plugins(registry: &IndexRegistry, filter: &str) -> Vec<String> {
    let mut f = parse(filter).unwrap();
    registry.read().assign_decoder(&mut f);
    f.decoders().iter().map(|e| e.plugin_id().to_string()).collect()
}

// =============================================================================
// Ordering Tests
// =============================================================================

/// P2 registered after P1 is primary for (cn=*).
#[test]
fn test_first_match_wins() {
    let r = registry();
    r.register_plugin("p1", None).unwrap();
    r.register_index("p1", IndexDescriptor::new("(cn=*)", ns()).with_lookup(answer(&[1])))
        .unwrap();
    r.register_plugin("p2", None).unwrap();
    r.register_index("p2", IndexDescriptor::new("(cn=*)", ns()).with_lookup(answer(&[2])))
        .unwrap();

    assert_eq!(chain_plugins(&r, "(cn=*)"), vec!["p2", "p1"]);

    let mut f = parse("(cn=*)").unwrap();
    let reader = r.read();
    let assigned = reader.assign_filter_decoders(&mut f);
    assert_eq!(
        reader.evaluate(&assigned, &ns()),
        Evaluation::Evaluated(IdList::from_ids([2]))
    );
}

/// P1's alternate is dropped when its associated attributes differ.
#[test]
fn test_alternate_requires_associated_attrs() {
    let r = registry();
    r.register_plugin("p1", None).unwrap();
    r.register_index("p1", IndexDescriptor::new("(cn=*)", ns()).with_lookup(answer(&[1])))
        .unwrap();
    r.register_plugin("p2", None).unwrap();
    r.register_index(
        "p2",
        IndexDescriptor::new("(cn=*)", ns())
            .with_lookup(answer(&[2]))
            .with_associated(["objectclass"]),
    )
    .unwrap();

    assert_eq!(chain_plugins(&r, "(cn=*)"), vec!["p2"]);
}

/// A disabled index under P1 does not hide P2's working index, whichever
/// was registered first.
#[test]
fn test_disabled_index_fallthrough() {
    let r = registry();
    r.register_plugin("p1", None).unwrap();
    r.register_index("p1", IndexDescriptor::new("(mail=*)", ns())).unwrap();
    r.register_plugin("p2", None).unwrap();
    r.register_index("p2", IndexDescriptor::new("(mail=*)", ns()).with_lookup(answer(&[5])))
        .unwrap();
    assert_eq!(chain_plugins(&r, "(mail=*)"), vec!["p2"]);

    let r = registry();
    r.register_plugin("p2", None).unwrap();
    r.register_index("p2", IndexDescriptor::new("(mail=*)", ns()).with_lookup(answer(&[5])))
        .unwrap();
    r.register_plugin("p1", None).unwrap();
    r.register_index("p1", IndexDescriptor::new("(mail=*)", ns())).unwrap();

    assert_eq!(chain_plugins(&r, "(mail=*)"), vec!["p2"]);
}

/// A plugin whose validator fails is skipped until it passes again.
#[test]
fn test_validator_toggles_plugin() {
    let healthy = Arc::new(AtomicBool::new(false));
    let probe = Arc::clone(&healthy);

    let r = registry();
    r.register_plugin("fallback", None).unwrap();
    r.register_index("fallback", IndexDescriptor::new("(uid=**)", ns()).with_lookup(answer(&[1])))
        .unwrap();
    let validator: PluginValidator = Arc::new(move || probe.load(Ordering::Acquire));
    r.register_plugin("fast", Some(validator)).unwrap();
    r.register_index("fast", IndexDescriptor::new("(uid=**)", ns()).with_lookup(answer(&[2])))
        .unwrap();

    assert_eq!(chain_plugins(&r, "(uid=jdoe)"), vec!["fallback"]);
    healthy.store(true, Ordering::Release);
    assert_eq!(chain_plugins(&r, "(uid=jdoe)"), vec!["fast", "fallback"]);
}

/// Registration errors leave the registry untouched.
#[test]
fn test_registration_errors() {
    let r = registry();
    assert!(matches!(
        r.register_index("ghost", IndexDescriptor::new("(cn=*)", ns())),
        Err(RegistryError::UnknownPlugin(_))
    ));

    r.register_plugin("p", None).unwrap();
    let err = r
        .register_index("p", IndexDescriptor::new("(cn=*)", Dn::new("o=elsewhere")))
        .unwrap_err();
    assert!(matches!(err, RegistryError::NamespaceNotServed(_)));
    assert_eq!(r.index_count(), 0);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

/// Searches and a registration can interleave without tearing state.
#[test]
fn test_concurrent_assignment_and_registration() {
    let r = Arc::new(registry());
    r.register_plugin("p", None).unwrap();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let r = Arc::clone(&r);
            thread::spawn(move || {
                for _ in 0..200 {
                    let mut f = parse("(|(cn=a)(sn=b))").unwrap();
                    let assigned = r.assign_filter_decoders(&mut f);
                    let decoders: usize = assigned.leaves().iter().map(|l| l.decoders().len()).sum();
                    assert!(decoders <= 2);
                }
            })
        })
        .collect();

    for attr in ["cn", "sn", "mail", "uid"] {
        let descriptor = format!("({}=**)", attr);
        r.register_index("p", IndexDescriptor::new(&descriptor, ns()).with_lookup(answer(&[1])))
            .unwrap();
    }

    for handle in readers {
        handle.join().unwrap();
    }
    assert_eq!(r.index_count(), 4);
}

// =============================================================================
// Property Tests
// =============================================================================

fn attr_subset() -> impl Strategy<Value = Vec<&'static str>> {
    proptest::sample::subsequence(vec!["sn", "uid", "mail", "objectclass"], 0..=4)
}

proptest! {
    /// The alternate joins the chain iff every associated attribute of the
    /// primary is among the alternate's (compared case-insensitively).
    #[test]
    fn prop_alternate_associated_rule(primary in attr_subset(), alternate in attr_subset(), upper in any::<bool>()) {
        let r = registry();
        r.register_plugin("alt", None).unwrap();
        let alternate_attrs: Vec<String> = alternate
            .iter()
            .map(|a| if upper { a.to_uppercase() } else { a.to_string() })
            .collect();
        r.register_index(
            "alt",
            IndexDescriptor::new("(cn=**)", ns())
                .with_lookup(answer(&[1]))
                .with_associated(alternate_attrs),
        )
        .unwrap();
        r.register_plugin("primary", None).unwrap();
        r.register_index(
            "primary",
            IndexDescriptor::new("(cn=**)", ns())
                .with_lookup(answer(&[2]))
                .with_associated(primary.clone()),
        )
        .unwrap();

        let chain = chain_plugins(&r, "(cn=x)");
        prop_assert_eq!(&chain[0], "primary");

        let covered = primary.iter().all(|a| alternate.contains(a));
        prop_assert_eq!(chain.len() == 2, covered);
    }
}
