use proptest::prelude::*;
use wp_test_utils::*;
use wp_topology::resolve::{generate_password, resolve};
use wp_topology::resource::{ResourceKind, ResourceProps};
use wp_topology::types::{AttrRef, Attribute, LogicalId};

#[test]
fn test_container_host_matches_database_endpoint() {
    let graph = build_example();
    let resolved = resolve(&graph, TEST_REGION, &mut seeded_rng(42));

    let ResourceProps::TaskDefinition(task) = &only_of_kind(&graph, ResourceKind::TaskDefinition).props
    else {
        unreachable!()
    };
    let env = &task.find_container("WordpressContainer").unwrap().environment;
    let host = resolved.value(&env["MARIADB_HOST"]).unwrap();

    let endpoint = resolved
        .attribute(&AttrRef {
            target: LogicalId::new("db"),
            attribute: Attribute::EndpointAddress,
        })
        .unwrap();
    assert_eq!(host, endpoint);
    assert!(host.starts_with("db."));
    assert!(host.ends_with(".us-east-1.rds.amazonaws.com"));
}

#[test]
fn test_database_and_container_share_one_password() {
    let graph = build_example();
    let resolved = resolve(&graph, TEST_REGION, &mut seeded_rng(7));

    let ResourceProps::DatabaseInstance(db) = &only_of_kind(&graph, ResourceKind::DatabaseInstance).props
    else {
        unreachable!()
    };
    let ResourceProps::TaskDefinition(task) = &only_of_kind(&graph, ResourceKind::TaskDefinition).props
    else {
        unreachable!()
    };
    let env = &task.find_container("WordpressContainer").unwrap().environment;

    let db_password = resolved.value(&db.password).unwrap();
    let container_password = resolved.value(&env["WORDPRESS_DATABASE_PASSWORD"]).unwrap();
    assert_eq!(db_password, container_password);
    assert_eq!(db_password.len(), 32);

    let secret = resolved.secret(&LogicalId::new("WordpressSecret")).unwrap();
    assert_eq!(secret["username"], "admin");
    assert_eq!(resolved.value(&db.username).as_deref(), Some("admin"));
}

#[test]
fn test_generated_values_differ_but_structure_does_not() {
    let graph = build_example();
    let first = resolve(&graph, TEST_REGION, &mut seeded_rng(1));
    let second = resolve(&graph, TEST_REGION, &mut seeded_rng(2));
    let secret = LogicalId::new("WordpressSecret");

    assert_ne!(
        first.secret(&secret).unwrap()["password"],
        second.secret(&secret).unwrap()["password"]
    );
    assert_ne!(
        first.physical_id(&LogicalId::new("Vpc")),
        second.physical_id(&LogicalId::new("Vpc"))
    );
    // looked-up identifiers are not generated
    assert_eq!(first.physical_id(&LogicalId::new("Domain")), Some(TEST_ZONE_ID));
    assert_eq!(second.physical_id(&LogicalId::new("Domain")), Some(TEST_ZONE_ID));
}

#[test]
fn test_security_groups_resolve_to_group_ids() {
    let graph = build_example();
    let resolved = resolve(&graph, TEST_REGION, &mut seeded_rng(9));
    for group in ids_of_kind(&graph, ResourceKind::SecurityGroup) {
        let id = resolved
            .attribute(&AttrRef {
                target: group.clone(),
                attribute: Attribute::GroupId,
            })
            .unwrap();
        assert!(id.starts_with("sg-"), "{group}: {id}");
    }
}

#[test]
fn test_alias_targets_resolve() {
    let graph = build_example();
    let resolved = resolve(&graph, TEST_REGION, &mut seeded_rng(5));
    let ResourceProps::AliasRecord(alias) = &only_of_kind(&graph, ResourceKind::AliasRecord).props
    else {
        unreachable!()
    };
    let dns = resolved.value(&alias.target_dns).unwrap();
    assert!(dns.ends_with(".us-east-1.elb.amazonaws.com"));
    assert!(resolved.value(&alias.target_zone_id).is_some());
}

proptest! {
    #[test]
    fn prop_password_never_contains_excluded_characters(seed in any::<u64>()) {
        let graph = build_example();
        let resolved = resolve(&graph, TEST_REGION, &mut seeded_rng(seed));
        let password = &resolved.secret(&LogicalId::new("WordpressSecret")).unwrap()["password"];
        prop_assert_eq!(password.chars().count(), 32);
        prop_assert!(!password.contains(['/', '@', '"']));
    }

    #[test]
    fn prop_generated_password_honours_any_exclusion(
        seed in any::<u64>(),
        length in 0usize..64,
        exclude in "[!-~]{0,20}",
    ) {
        let password = generate_password(&mut seeded_rng(seed), length, &exclude);
        prop_assert!(password.chars().all(|c| !exclude.contains(c)));
        prop_assert!(password.chars().all(|c| c.is_ascii_graphic()));
        prop_assert_eq!(password.chars().count(), length);
    }
}
