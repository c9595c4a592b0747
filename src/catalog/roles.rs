//! Object role listings.

use super::DataSourceDefinition;

pub(super) fn data_sources() -> Vec<DataSourceDefinition> {
    [
        ("organization", "Organization", "organizations"),
        ("team", "Team", "teams"),
        ("credential", "Credential", "credentials"),
        ("inventory", "Inventory", "inventories"),
        ("project", "Project", "projects"),
        ("workflow_job_template", "WorkflowJobTemplate", "workflow_job_templates"),
    ]
    .into_iter()
    .map(|(entity, display_name, collection)| {
        DataSourceDefinition::object_roles(
            entity,
            display_name,
            &format!("/api/v2/{}/{{}}/object_roles/", collection),
        )
    })
    .collect()
}
