//! The VPC consultation stack as a ready-made description.
//!
//! Three read-only functions behind `/vpcs`, `/vpcs/{id}` and
//! `/vpcs/{id}/subnets`, each with `ec2:Describe*` and a CORS preflight.

use crate::context::{EndpointType, StackContext};
use crate::description::{
    GrantAttachment, MethodDescription, ResourceDescription, StackDescription,
};
use crate::types::{ComputeUnit, HttpMethod, PermissionGrant};

const RUNTIME: &str = "python3.7";
const SOURCE: &str = "src";

fn get(unit: &str) -> Vec<MethodDescription> {
    vec![MethodDescription {
        method: HttpMethod::Get,
        unit: unit.to_owned(),
    }]
}

/// Returns the description of the VPC consultation stack.
#[must_use]
pub fn vpc_consultation() -> StackDescription {
    let units = vec![
        ComputeUnit::new("getOneVPC", "get_vpc.handler", RUNTIME, SOURCE)
            .with_function_name("get_vpc_by_id"),
        ComputeUnit::new("getAllVPCs", "get_all_vpcs.handler", RUNTIME, SOURCE)
            .with_function_name("get_all_vpc"),
        ComputeUnit::new("getSubnetsByVPC", "get_subnets_by_vpc.handler", RUNTIME, SOURCE)
            .with_function_name("get_subnets_by_vpc"),
    ];

    let grants = vec![GrantAttachment {
        units: units.iter().map(|u| u.name().to_owned()).collect(),
        grant: PermissionGrant::read_only("ec2"),
    }];

    let subnets = ResourceDescription {
        path_segment: "subnets".to_owned(),
        methods: get("getSubnetsByVPC"),
        cors: true,
        children: vec![],
    };
    let single_vpc = ResourceDescription {
        path_segment: "{id}".to_owned(),
        methods: get("getOneVPC"),
        cors: true,
        children: vec![subnets],
    };
    let vpcs = ResourceDescription {
        path_segment: "vpcs".to_owned(),
        methods: get("getAllVPCs"),
        cors: true,
        children: vec![single_vpc],
    };

    StackDescription {
        stack: StackContext::new("SimplonStack", "VPCApi", "VPC Consultation")
            .with_endpoint_type(EndpointType::Regional),
        units,
        grants,
        root_methods: vec![],
        root_cors: false,
        resources: vec![vpcs],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::ResourceType;
    use insta::assert_snapshot;
    use itertools::Itertools;

    #[test]
    fn test_vpc_consultation_synthesizes() {
        let template = vpc_consultation().synthesize().unwrap();

        assert_eq!(template.count_of(ResourceType::Function), 3);
        assert_eq!(template.count_of(ResourceType::Role), 3);
        assert_eq!(template.count_of(ResourceType::Policy), 3);
        assert_eq!(template.count_of(ResourceType::RestApi), 1);
        assert_eq!(template.count_of(ResourceType::ApiResource), 3);
        assert_eq!(template.count_of(ResourceType::Method), 6);
        assert_eq!(template.count_of(ResourceType::InvokePermission), 3);
        assert_eq!(template.count_of(ResourceType::Deployment), 1);
        assert_eq!(template.count_of(ResourceType::Stage), 1);

        let function = template.resource("GetOneVPCFunction").unwrap();
        assert_eq!(function.property("FunctionName"), "get_vpc_by_id");
        assert_eq!(function.property("Handler"), "get_vpc.handler");
        assert_eq!(function.property("Runtime"), "python3.7");

        let api = template.resource("VPCApi").unwrap();
        assert_eq!(api.property("Name"), "VPC Consultation");
        assert_eq!(api.property("EndpointConfiguration")["Types"][0], "REGIONAL");
    }

    #[test]
    fn test_vpc_consultation_logical_ids() {
        let template = vpc_consultation().synthesize().unwrap();
        let ids = template.resources().map(|(id, _)| id).join("\n");
        assert_snapshot!(ids, @r"
        GetOneVPCServiceRole
        GetOneVPCFunction
        GetAllVPCsServiceRole
        GetAllVPCsFunction
        GetSubnetsByVPCServiceRole
        GetSubnetsByVPCFunction
        GetOneVPCPolicy0
        GetAllVPCsPolicy0
        GetSubnetsByVPCPolicy0
        VPCApi
        VPCApiVpcsResource
        VPCApiVpcsGetPermission
        VPCApiVpcsGetMethod
        VPCApiVpcsOptionsMethod
        VPCApiVpcsIdResource
        VPCApiVpcsIdGetPermission
        VPCApiVpcsIdGetMethod
        VPCApiVpcsIdOptionsMethod
        VPCApiVpcsIdSubnetsResource
        VPCApiVpcsIdSubnetsGetPermission
        VPCApiVpcsIdSubnetsGetMethod
        VPCApiVpcsIdSubnetsOptionsMethod
        VPCApiDeployment
        VPCApiDeploymentStageProd
        ");
    }
}
