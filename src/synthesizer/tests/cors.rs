use super::*;
use crate::cors::{ALLOW_HEADERS, ALLOW_METHODS};
use yare::parameterized;

#[test]
fn test_strict_rejects_second_preflight() {
    let mut synth = synth_with_units(CorsMode::Strict, &[]);
    let items = synth.resource_for_path("/items").unwrap();
    synth.add_cors_preflight(items).unwrap();

    let err = synth.add_cors_preflight(items).unwrap_err();
    assert_eq!(
        err,
        SynthError::DuplicateMethod {
            path: "/items".to_string(),
            method: "OPTIONS".to_string(),
        }
    );
}

#[test]
fn test_lenient_ignores_second_preflight() {
    let mut synth = synth_with_units(CorsMode::Lenient, &[]);
    let items = synth.resource_for_path("/items").unwrap();
    synth.add_cors_preflight(items).unwrap();
    synth.add_cors_preflight(items).unwrap();

    let node = synth.node(items).unwrap();
    assert_eq!(node.methods().len(), 1);
    assert_eq!(
        node.binding(HttpMethod::Options).unwrap().target,
        MethodTarget::CorsPreflight
    );

    let template = synth.synthesize().unwrap();
    assert_eq!(methods_with_integration(&template, "MOCK").len(), 1);
}

#[parameterized(
    strict = { CorsMode::Strict },
    lenient = { CorsMode::Lenient },
)]
fn test_preflight_after_options_binding(mode: CorsMode) {
    let mut synth = synth_with_units(mode, &["options"]);
    let items = synth.resource_for_path("/items").unwrap();
    synth
        .bind_method(items, HttpMethod::Options, "options")
        .unwrap();

    let err = synth.add_cors_preflight(items).unwrap_err();
    assert!(matches!(err, SynthError::DuplicateMethod { .. }), "got {err:?}");
    assert_eq!(
        synth.node(items).unwrap().binding(HttpMethod::Options).unwrap().target.unit(),
        Some("options")
    );
}

#[parameterized(
    strict = { CorsMode::Strict },
    lenient = { CorsMode::Lenient },
)]
fn test_options_binding_after_preflight(mode: CorsMode) {
    let mut synth = synth_with_units(mode, &["options"]);
    let items = synth.resource_for_path("/items").unwrap();
    synth.add_cors_preflight(items).unwrap();

    let err = synth
        .bind_method(items, HttpMethod::Options, "options")
        .unwrap_err();
    assert_eq!(
        err,
        SynthError::DuplicateMethod {
            path: "/items".to_string(),
            method: "OPTIONS".to_string(),
        }
    );
}

#[test]
fn test_preflight_method_shape() {
    let mut synth = synth_with_units(CorsMode::Strict, &[]);
    let items = synth.resource_for_path("/items").unwrap();
    synth.add_cors_preflight(items).unwrap();
    let template = synth.synthesize().unwrap();

    let method = template.resource("ItemsApiItemsOptionsMethod").unwrap();
    assert_eq!(method.property("HttpMethod"), "OPTIONS");
    assert_eq!(method.property("AuthorizationType"), "NONE");
    assert_eq!(method.property("ResourceId"), &json!({"Ref": "ItemsApiItemsResource"}));

    let integration = method.property("Integration");
    assert_eq!(integration["Type"], "MOCK");
    assert!(integration.get("Uri").is_none());
    assert!(integration.get("IntegrationHttpMethod").is_none());

    let headers = &integration["IntegrationResponses"][0]["ResponseParameters"];
    assert_eq!(
        headers["method.response.header.Access-Control-Allow-Headers"],
        format!("'{ALLOW_HEADERS}'").as_str()
    );
    assert_eq!(
        headers["method.response.header.Access-Control-Allow-Methods"],
        format!("'{ALLOW_METHODS}'").as_str()
    );
    assert_eq!(
        headers["method.response.header.Access-Control-Allow-Origin"],
        "'*'"
    );
    assert_eq!(
        headers["method.response.header.Access-Control-Allow-Credentials"],
        "'false'"
    );

    let declared = &method.property("MethodResponses")[0];
    assert_eq!(declared["StatusCode"], "200");
    assert_eq!(
        declared["ResponseParameters"]
            .as_object()
            .unwrap()
            .values()
            .filter(|v| **v == Value::Bool(true))
            .count(),
        4
    );

    // No compute unit is involved, so no invoke permission either.
    assert_eq!(template.count_of(ResourceType::InvokePermission), 0);
}

#[test]
fn test_preflight_on_root() {
    let mut synth = synth_with_units(CorsMode::Strict, &[]);
    let root = synth.root();
    synth.add_cors_preflight(root).unwrap();
    let template = synth.synthesize().unwrap();

    let method = template.resource("ItemsApiOptionsMethod").unwrap();
    assert_eq!(
        method.property("ResourceId"),
        &json!({"Fn::GetAtt": ["ItemsApi", "RootResourceId"]})
    );
    assert_eq!(template.count_of(ResourceType::ApiResource), 0);
    assert_eq!(template.resource_tree().methods, vec![HttpMethod::Options]);
}

#[test]
fn test_preflights_are_identical_across_nodes() {
    let synth = items_synth();
    let template = synth.synthesize().unwrap();
    let preflights = methods_with_integration(&template, "MOCK");
    assert_eq!(preflights.len(), 3);

    let first = preflights[0].1.property("Integration");
    for (_, method) in &preflights[1..] {
        assert_eq!(method.property("Integration"), first);
        assert_eq!(
            method.property("MethodResponses"),
            preflights[0].1.property("MethodResponses")
        );
    }
}
