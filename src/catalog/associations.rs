//! Associations between two existing objects.

use super::{FieldDefinition, ResourceDefinition};

pub(super) fn resources() -> Vec<ResourceDefinition> {
    vec![
        ResourceDefinition::association(
            "host_associate_group",
            "HostAssociateGroup",
            "/api/v2/hosts/{}/groups/",
            FieldDefinition::required("host_id").describe("Database ID of the host."),
            FieldDefinition::required("group_id").describe("Database ID of the group."),
        ),
        ResourceDefinition::association(
            "job_template_associate_credential",
            "JobTemplateAssociateCredential",
            "/api/v2/job_templates/{}/credentials/",
            FieldDefinition::required("job_template_id"),
            FieldDefinition::required("credential_id"),
        ),
        ResourceDefinition::association(
            "job_template_associate_instance_group",
            "JobTemplateAssociateInstanceGroup",
            "/api/v2/job_templates/{}/instance_groups/",
            FieldDefinition::required("job_template_id"),
            FieldDefinition::required("instance_group_id"),
        ),
        ResourceDefinition::association(
            "organization_associate_instance_group",
            "OrganizationAssociateInstanceGroup",
            "/api/v2/organizations/{}/instance_groups/",
            FieldDefinition::required("organization_id"),
            FieldDefinition::required("instance_group_id"),
        ),
        ResourceDefinition::association(
            "organization_associate_galaxy_credential",
            "OrganizationAssociateGalaxyCredential",
            "/api/v2/organizations/{}/galaxy_credentials/",
            FieldDefinition::required("organization_id"),
            FieldDefinition::required("galaxy_credential_id"),
        ),
    ]
}
