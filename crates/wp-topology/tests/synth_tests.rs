use pretty_assertions::assert_eq;
use serde_json::{json, Value as Json};
use wp_test_utils::*;
use wp_topology::builder::build_topology;
use wp_topology::resolve::resolve;
use wp_topology::synth::synthesize;
use wp_topology::types::LogicalId;

fn resources_of_type<'a>(template: &'a Json, type_name: &str) -> Vec<(&'a String, &'a Json)> {
    template["Resources"]
        .as_object()
        .unwrap()
        .iter()
        .filter(|(_, r)| r["Type"] == type_name)
        .collect()
}

#[test]
fn test_synthesis_is_deterministic() {
    let first = synthesize(&build_example());
    let second = synthesize(&build_example());
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_template_never_contains_generated_password() {
    let graph = build_example();
    let template = synthesize(&graph);
    let resolved = resolve(&graph, TEST_REGION, &mut seeded_rng(11));
    let password = &resolved.secret(&LogicalId::new("WordpressSecret")).unwrap()["password"];

    let rendered = serde_json::to_string(&template).unwrap();
    assert!(!rendered.contains(password.as_str()));

    let db = &template["Resources"]["db"]["Properties"];
    assert_eq!(db["MasterUserPassword"], secret_field("password"));
    assert_eq!(db["MasterUsername"], secret_field("username"));
}

fn secret_field(field: &str) -> Json {
    json!({
        "Fn::Join": ["", [
            "{{resolve:secretsmanager:",
            { "Ref": "WordpressSecret" },
            format!(":SecretString:{field}::}}}}"),
        ]],
    })
}

/// Ids a rendered resource names through `Ref`, `Fn::GetAtt` or `DependsOn`.
fn wired_to(entry: &Json) -> Vec<String> {
    fn walk(json: &Json, out: &mut Vec<String>) {
        match json {
            Json::Object(map) => {
                for (key, value) in map {
                    match (key.as_str(), value) {
                        ("Ref", Json::String(id)) => out.push(id.clone()),
                        ("Fn::GetAtt", Json::Array(parts)) => {
                            out.extend(parts.first().and_then(Json::as_str).map(String::from));
                        }
                        _ => walk(value, out),
                    }
                }
            }
            Json::Array(items) => items.iter().for_each(|item| walk(item, out)),
            _ => {}
        }
    }
    let mut out = Vec::new();
    walk(&entry["Properties"], &mut out);
    if let Some(depends_on) = entry["DependsOn"].as_array() {
        out.extend(depends_on.iter().filter_map(Json::as_str).map(String::from));
    }
    out
}

#[test]
fn test_secret_consumers_are_wired_to_the_secret() {
    let template = synthesize(&build_example());
    for consumer in ["db", "FargateServiceTaskDef"] {
        let wired = wired_to(&template["Resources"][consumer]);
        assert!(
            wired.iter().any(|id| id == "WordpressSecret"),
            "{consumer} does not reach WordpressSecret"
        );
    }

    let env = template["Resources"]["FargateServiceTaskDef"]["Properties"]["ContainerDefinitions"][0]
        ["Environment"]
        .as_array()
        .unwrap();
    let password = env
        .iter()
        .find(|e| e["Name"] == "WORDPRESS_DATABASE_PASSWORD")
        .unwrap();
    assert_eq!(password["Value"], secret_field("password"));
}

#[test]
fn test_every_graph_reference_is_rendered_or_ordered() {
    let graph = build_example();
    let template = synthesize(&graph);
    for resource in graph.resources() {
        if !resource.kind().is_provisioned() {
            continue;
        }
        let wired = wired_to(&template["Resources"][resource.id.as_str()]);
        for target in resource.references().into_iter().chain(&resource.depends_on) {
            let provisioned = graph.resource(target).is_some_and(|r| r.kind().is_provisioned());
            if provisioned {
                assert!(
                    wired.iter().any(|id| id == target.as_str()),
                    "{} loses its reference to {target}",
                    resource.id
                );
            }
        }
    }
}

#[test]
fn test_resource_keys_are_alphanumeric() {
    let graph = build_topology(
        &config_with(&[("VPC", "site_vpc"), ("DATABASE_NAME", "wp-db")]),
        &example_context(),
    )
    .unwrap();
    let template = synthesize(&graph);
    let resources = template["Resources"].as_object().unwrap();
    assert!(resources.contains_key("sitevpc"));
    assert!(resources.contains_key("wpdb"));
    for id in resources.keys() {
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()), "{id}");
    }
    assert_eq!(resources["wpdb"]["Properties"]["DBName"], "wp-db");
}

#[test]
fn test_nat_instances_sit_in_public_subnets() {
    let template = synthesize(&build_example());
    assert!(template["Resources"].get("NatProvider").is_none());

    let instances = resources_of_type(&template, "AWS::EC2::Instance");
    let ids: Vec<&str> = instances.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["VpcPublicSubnet1NatInstance", "VpcPublicSubnet2NatInstance"]);

    let props = &instances[0].1["Properties"];
    assert_eq!(props["SubnetId"], json!({ "Ref": "VpcPublicSubnet1" }));
    assert_eq!(
        props["SecurityGroupIds"],
        json!([{ "Fn::GetAtt": ["NatProviderSecurityGroup", "GroupId"] }])
    );
    assert_eq!(props["ImageId"], TEST_IMAGE_ID);
    assert_eq!(props["SourceDestCheck"], false);
    assert!(instances[0].1.get("Metadata").is_none());

    let route = &template["Resources"]["VpcPrivateSubnet2DefaultRoute"]["Properties"];
    assert_eq!(route["InstanceId"], json!({ "Ref": "VpcPublicSubnet2NatInstance" }));
}

#[test]
fn test_container_reads_endpoint_through_getatt() {
    let template = synthesize(&build_example());
    let containers =
        &template["Resources"]["FargateServiceTaskDef"]["Properties"]["ContainerDefinitions"];
    let env = containers[0]["Environment"].as_array().unwrap();
    let host = env.iter().find(|e| e["Name"] == "MARIADB_HOST").unwrap();
    assert_eq!(host["Value"], json!({ "Fn::GetAtt": ["db", "Endpoint.Address"] }));
}

#[test]
fn test_hosted_zone_is_imported_not_created() {
    let template = synthesize(&build_example());
    assert!(template["Resources"].get("Domain").is_none());
    assert_eq!(template["Metadata"]["Imports"]["Domain"]["Id"], TEST_ZONE_ID);

    let alias = &template["Resources"]["AliasRecord"]["Properties"];
    assert_eq!(alias["HostedZoneId"], TEST_ZONE_ID);
    assert_eq!(alias["Name"], "example.com.");
    assert_eq!(
        alias["AliasTarget"]["DNSName"],
        json!({ "Fn::GetAtt": ["FargateServiceLB", "DNSName"] })
    );
}

#[test]
fn test_grants_become_ingress_and_policy_resources() {
    let template = synthesize(&build_example());

    let ingress = resources_of_type(&template, "AWS::EC2::SecurityGroupIngress");
    assert_eq!(ingress.len(), 6);

    let egress = resources_of_type(&template, "AWS::EC2::SecurityGroupEgress");
    assert_eq!(egress.len(), 1);
    let (id, rule) = egress[0];
    assert_eq!(id, "FargateServiceLBSecurityGrouptoFargateServiceServiceSecurityGrouptcp8080");
    assert_eq!(
        rule["Properties"]["GroupId"],
        json!({ "Fn::GetAtt": ["FargateServiceLBSecurityGroup", "GroupId"] })
    );
    assert_eq!(
        rule["Properties"]["DestinationSecurityGroupId"],
        json!({ "Fn::GetAtt": ["FargateServiceServiceSecurityGroup", "GroupId"] })
    );
    assert_eq!(rule["Properties"]["FromPort"], 8080);
    assert_eq!(rule["Properties"]["ToPort"], 8080);

    let database_rules: Vec<_> = ingress
        .iter()
        .filter(|(_, r)| {
            r["Properties"]["GroupId"] == json!({ "Fn::GetAtt": ["dbSecurityGroup", "GroupId"] })
        })
        .collect();
    assert_eq!(database_rules.len(), 1);
    let rule = &database_rules[0].1["Properties"];
    assert_eq!(rule["FromPort"], 3306);
    assert_eq!(rule["ToPort"], 3306);
    assert_eq!(
        rule["SourceSecurityGroupId"],
        json!({ "Fn::GetAtt": ["FargateServiceServiceSecurityGroup", "GroupId"] })
    );

    let policies = resources_of_type(&template, "AWS::IAM::Policy");
    let names: Vec<&str> = policies.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "FargateServiceTaskDefExecutionRoleDefaultPolicy",
            "FargateServiceTaskDefTaskRoleDefaultPolicy",
        ]
    );
}

#[test]
fn test_redirect_listener_rendering() {
    let template = synthesize(&build_example());
    let listener = &template["Resources"]["FargateServiceLBPortEightyListener"]["Properties"];
    assert_eq!(listener["Port"], 80);
    assert_eq!(
        listener["DefaultActions"][0]["RedirectConfig"],
        json!({
            "Protocol": "HTTPS",
            "Host": "example.com",
            "Port": "443",
            "Path": "/#{path}",
            "Query": "#{query}",
            "StatusCode": "HTTP_302",
        })
    );
    assert!(listener.get("Certificates").is_none());
}

#[test]
fn test_service_waits_for_https_listener() {
    let template = synthesize(&build_example());
    let service = &template["Resources"]["FargateServiceService"];
    assert_eq!(service["DependsOn"], json!(["FargateServiceLBPublicListener"]));
    assert_eq!(service["Properties"]["DesiredCount"], 2);
    assert_eq!(
        service["Properties"]["NetworkConfiguration"]["AwsvpcConfiguration"]["AssignPublicIp"],
        "DISABLED"
    );
}

#[test]
fn test_stateful_resources_keep_their_data() {
    let template = synthesize(&build_example());
    assert_eq!(template["Resources"]["db"]["DeletionPolicy"], "Snapshot");
    assert_eq!(template["Resources"]["FileSystem"]["DeletionPolicy"], "Retain");
    assert_eq!(template["Resources"]["WordpressSecret"]["DeletionPolicy"], "Delete");
}

#[test]
fn test_volume_authorization_rendering() {
    let template = synthesize(&build_example());
    let volume = &template["Resources"]["FargateServiceTaskDef"]["Properties"]["Volumes"][0];
    let efs = &volume["EFSVolumeConfiguration"];
    assert_eq!(efs["TransitEncryption"], "ENABLED");
    assert_eq!(efs["AuthorizationConfig"]["IAM"], "DISABLED");
    assert_eq!(efs["AuthorizationConfig"]["AccessPointId"], json!({ "Ref": "WordpressAccessPoint" }));
}

#[test]
fn test_fingerprint_is_embedded() {
    let graph = build_example();
    let template = synthesize(&graph);
    assert_eq!(template["Metadata"]["Fingerprint"], graph.fingerprint());
}
