//! Integration tests for configuration parsing and error locations.

use stratum_config::{
    BlockKind, ConfigLayers, ConnectionTarget, EnvConfiguration, ErrorFamily, ObjectPath,
    OverrideScope, ValidationError, ValidationErrorKind, ValidationErrors, Value,
};

const CONFIG: &str = r##"
networks:
  main-network:
    module: acme/aws-network
    vars:
      cidr: 10.0.0.0/16
subdomains:
  docs:
    module: acme/aws-subdomain
    dns_name: docs
    is_shared: true
datastores:
  db:
    module: acme/postgres
    module_version: 1.2.0
    connections:
      network: core.main-network
apps:
  api:
    module: acme/fargate-service
    vars:
      cpu: 256
      tags:
        team: platform
      ports: [80, 443]
    environment:
      LOG_LEVEL: info
      API_KEY:
        value: secret
        sensitive: true
    connections:
      network: main-network
      db:
        stack_name: core
        env_name: prod
        block_name: db
    capabilities:
      - module: acme/aws-load-balancer
        namespace: public
        connections:
          subdomain: docs
events:
  deploys:
    actions: [app-deployed, app-failed]
    blocks: [api]
    targets:
      slack:
        channels: ["#deploys"]
"##;

fn parse() -> EnvConfiguration {
    EnvConfiguration::from_yaml_str("acme/infra", "config.yml", CONFIG).unwrap()
}

#[test]
fn test_parse_full_file() {
    let config = parse();
    assert_eq!(config.iter_blocks().count(), 4);

    let kinds: Vec<BlockKind> = config.iter_blocks().map(|b| b.kind).collect();
    assert_eq!(
        kinds,
        vec![
            BlockKind::Network,
            BlockKind::Subdomain,
            BlockKind::Datastore,
            BlockKind::Application
        ]
    );

    let db = config.get_block(BlockKind::Datastore, "db").unwrap();
    assert_eq!(db.module_version(), "1.2.0");
    assert_eq!(
        db.connections["network"],
        ConnectionTarget::block("main-network").with_stack("core")
    );

    let docs = config.find_block("docs").unwrap();
    assert!(docs.is_shared);
    assert_eq!(docs.dns_name.as_deref(), Some("docs"));

    let event = &config.events["deploys"];
    assert_eq!(event.actions.len(), 2);
    assert_eq!(
        event.targets.slack.as_ref().map(|s| s.channels.clone()),
        Some(vec!["#deploys".to_string()])
    );
}

#[test]
fn test_application_details() {
    let config = parse();
    let api = config.get_block(BlockKind::Application, "api").unwrap();

    assert_eq!(api.path().to_string(), "apps.api");
    assert_eq!(api.module_version(), "latest");
    assert_eq!(api.variables["cpu"].as_i64(), Some(256));
    assert_eq!(api.variables["ports"].type_name(), "list");
    assert_eq!(api.variables["tags"].type_name(), "map");

    assert_eq!(api.env_variables["LOG_LEVEL"].value(), "info");
    assert!(!api.env_variables["LOG_LEVEL"].sensitive());
    assert!(api.env_variables["API_KEY"].sensitive());

    let db = &api.connections["db"];
    assert_eq!(db.to_string(), "core.prod.db");
    assert!(!db.is_normalized());

    let capability = &api.capabilities[0];
    assert_eq!(capability.namespace.as_deref(), Some("public"));
    assert_eq!(capability.connections["subdomain"], ConnectionTarget::block("docs"));
}

#[test]
fn test_invalid_connection_target_rejected() {
    let result = EnvConfiguration::from_yaml_str(
        "acme/infra",
        "config.yml",
        "apps:\n  api:\n    module: acme/x\n    connections:\n      network: a.b.c.d\n",
    );
    assert!(result.is_err());
}

#[test]
fn test_layers_select_override_tree() {
    let base = parse();
    let prod = EnvConfiguration::from_yaml_str(
        "acme/infra",
        "prod.yml",
        "apps:\n  api:\n    vars:\n      cpu: 1024\n",
    )
    .unwrap();
    let previews = EnvConfiguration::from_yaml_str(
        "acme/infra",
        "previews.yml",
        "apps:\n  api:\n    vars:\n      cpu: 128\n",
    )
    .unwrap();
    let layers = ConfigLayers::new(base)
        .with_env_override("prod", prod)
        .with_preview_override(previews);

    let cpu = |scope: OverrideScope| {
        layers
            .overrides_for(&scope)
            .and_then(|t| t.get_block(BlockKind::Application, "api"))
            .map(|b| b.variables["cpu"].clone())
    };
    assert_eq!(cpu(OverrideScope::Environment("prod".into())), Some(Value::from(1024i64)));
    assert_eq!(cpu(OverrideScope::Preview), Some(Value::from(128i64)));
    assert_eq!(cpu(OverrideScope::Environment("dev".into())), None);
}

#[test]
fn test_error_locations_display() {
    let config = parse();
    let ctx = config.context();
    let api = config.get_block(BlockKind::Application, "api").unwrap();

    let mut errors = ValidationErrors::new();
    errors.push(ValidationError::validate(
        &ctx,
        api.path().key("vars", "gpu"),
        ValidationErrorKind::UnknownVariable {
            name: "gpu".into(),
            source_ref: "acme/fargate-service".into(),
        },
    ));
    errors.push(ValidationError::resolve(
        &ctx,
        api.path().index("capabilities", 0).field("module"),
        ValidationErrorKind::MissingModule {
            source_ref: "acme/aws-load-balancer".into(),
        },
    ));

    let lines: Vec<String> = errors.to_string().lines().map(String::from).collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("acme/infra#config.yml (apps.api.vars.gpu): "));
    assert!(lines[1].starts_with("acme/infra#config.yml (apps.api.capabilities[0].module): "));

    assert_eq!(errors.at("apps.api.vars.gpu")[0].family, ErrorFamily::Validate);
    assert!(ObjectPath::root().is_root());
}
