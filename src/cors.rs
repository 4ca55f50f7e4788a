//! The fixed CORS preflight contract.
//!
//! Every node that receives a preflight answers `OPTIONS` with the same
//! static 200 response. The policy is not data-driven.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::{Map, Value, json};

pub const ALLOW_HEADERS: &str =
    "Content-Type,X-Amz-Date,Authorization,X-Api-Key,X-Amz-Security-Token,X-Amz-User-Agent";
pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_CREDENTIALS: &str = "false";
pub const ALLOW_METHODS: &str = "OPTIONS,GET,PUT,POST,DELETE";

/// Status code of every preflight response.
pub const PREFLIGHT_STATUS: u16 = 200;

/// Request template applied to `application/json` preflights.
pub const PREFLIGHT_REQUEST_TEMPLATE: &str = r#"{"statusCode": 200}"#;

const RESPONSE_HEADER_PREFIX: &str = "method.response.header.";

/// Header name and value for each of the four fixed CORS headers.
pub static CORS_HEADERS: Lazy<BTreeMap<&'static str, &'static str>> =
    Lazy::new(|| CorsPolicy::default().headers());

/// The CORS policy bound to a node by `add_cors_preflight`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CorsPolicy {
    pub allow_headers: &'static str,
    pub allow_origin: &'static str,
    pub allow_credentials: bool,
    pub allow_methods: &'static str,
}

impl Default for CorsPolicy {
    fn default() -> Self {
        CorsPolicy {
            allow_headers: ALLOW_HEADERS,
            allow_origin: ALLOW_ORIGIN,
            allow_credentials: false,
            allow_methods: ALLOW_METHODS,
        }
    }
}

impl CorsPolicy {
    /// The four response headers, keyed by header name.
    pub fn headers(&self) -> BTreeMap<&'static str, &'static str> {
        BTreeMap::from([
            ("Access-Control-Allow-Headers", self.allow_headers),
            ("Access-Control-Allow-Origin", self.allow_origin),
            (
                "Access-Control-Allow-Credentials",
                if self.allow_credentials { "true" } else { "false" },
            ),
            ("Access-Control-Allow-Methods", self.allow_methods),
        ])
    }

    pub fn preflight_response(&self) -> PreflightResponse {
        PreflightResponse {
            status: PREFLIGHT_STATUS,
            headers: self.headers(),
        }
    }

    /// The `MOCK` integration answering a preflight.
    ///
    /// Header values are single-quoted: the gateway treats quoted mapping
    /// values as static literals. Unmatched content types are rejected
    /// (`NEVER`).
    pub(crate) fn mock_integration(&self) -> Value {
        let response_parameters: Map<String, Value> = self
            .headers()
            .into_iter()
            .map(|(name, value)| {
                (
                    format!("{RESPONSE_HEADER_PREFIX}{name}"),
                    Value::String(format!("'{value}'")),
                )
            })
            .collect();

        json!({
            "Type": "MOCK",
            "PassthroughBehavior": "NEVER",
            "RequestTemplates": {
                "application/json": PREFLIGHT_REQUEST_TEMPLATE,
            },
            "IntegrationResponses": [{
                "StatusCode": PREFLIGHT_STATUS.to_string(),
                "ResponseParameters": response_parameters,
            }],
        })
    }

    /// Method responses declaring the four headers as present.
    pub(crate) fn method_responses(&self) -> Value {
        let response_parameters: Map<String, Value> = self
            .headers()
            .into_keys()
            .map(|name| (format!("{RESPONSE_HEADER_PREFIX}{name}"), Value::Bool(true)))
            .collect();

        json!([{
            "StatusCode": PREFLIGHT_STATUS.to_string(),
            "ResponseParameters": response_parameters,
        }])
    }
}

/// What a preflight returns, independent of the incoming request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreflightResponse {
    pub status: u16,
    pub headers: BTreeMap<&'static str, &'static str>,
}

/// The response of the fixed policy every preflight uses.
pub fn preflight_response() -> PreflightResponse {
    PreflightResponse {
        status: PREFLIGHT_STATUS,
        headers: CORS_HEADERS.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_json_snapshot;

    #[test]
    fn test_preflight_response_has_fixed_headers() {
        let response = preflight_response();
        assert_eq!(response.status, 200);
        assert_eq!(response.headers.len(), 4);
        assert_eq!(
            response.headers["Access-Control-Allow-Headers"],
            "Content-Type,X-Amz-Date,Authorization,X-Api-Key,X-Amz-Security-Token,X-Amz-User-Agent"
        );
        assert_eq!(response.headers["Access-Control-Allow-Origin"], "*");
        assert_eq!(response.headers["Access-Control-Allow-Credentials"], "false");
        assert_eq!(
            response.headers["Access-Control-Allow-Methods"],
            "OPTIONS,GET,PUT,POST,DELETE"
        );
    }

    #[test]
    fn test_policy_matches_headers() {
        let policy = CorsPolicy::default();
        assert_eq!(policy.allow_headers, CORS_HEADERS["Access-Control-Allow-Headers"]);
        assert_eq!(policy.allow_methods, CORS_HEADERS["Access-Control-Allow-Methods"]);
        assert_eq!(policy.allow_origin, "*");
        assert!(!policy.allow_credentials);
        assert_eq!(policy.preflight_response(), preflight_response());
        assert_eq!(policy.headers()["Access-Control-Allow-Credentials"], ALLOW_CREDENTIALS);
    }

    #[test]
    fn test_policy_drives_integration() {
        let policy = CorsPolicy {
            allow_credentials: true,
            ..CorsPolicy::default()
        };
        assert_eq!(policy.headers()["Access-Control-Allow-Credentials"], "true");

        let integration = policy.mock_integration();
        assert_eq!(
            integration["IntegrationResponses"][0]["ResponseParameters"]
                ["method.response.header.Access-Control-Allow-Credentials"],
            "'true'"
        );
        assert_eq!(
            policy.method_responses()[0]["ResponseParameters"]
                .as_object()
                .unwrap()
                .len(),
            4
        );
    }

    #[test]
    fn test_mock_integration() {
        insta::with_settings!({sort_maps => true}, {
            assert_json_snapshot!(CorsPolicy::default().mock_integration(), @r#"
            {
              "IntegrationResponses": [
                {
                  "ResponseParameters": {
                    "method.response.header.Access-Control-Allow-Credentials": "'false'",
                    "method.response.header.Access-Control-Allow-Headers": "'Content-Type,X-Amz-Date,Authorization,X-Api-Key,X-Amz-Security-Token,X-Amz-User-Agent'",
                    "method.response.header.Access-Control-Allow-Methods": "'OPTIONS,GET,PUT,POST,DELETE'",
                    "method.response.header.Access-Control-Allow-Origin": "'*'"
                  },
                  "StatusCode": "200"
                }
              ],
              "PassthroughBehavior": "NEVER",
              "RequestTemplates": {
                "application/json": "{\"statusCode\": 200}"
              },
              "Type": "MOCK"
            }
            "#);
        });
    }

    #[test]
    fn test_method_responses_declare_all_headers() {
        let responses = CorsPolicy::default().method_responses();
        let params = responses[0]["ResponseParameters"].as_object().unwrap();
        assert_eq!(params.len(), 4);
        assert!(params.values().all(|v| v == &Value::Bool(true)));
        assert_eq!(responses[0]["StatusCode"], "200");
    }
}
