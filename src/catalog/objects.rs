//! Collection-backed AWX objects.

use serde_json::json;

use super::{FieldDefinition, FieldKind, FieldRole, LookupGroup, ResourceDefinition, SecretKind};

fn name() -> FieldDefinition {
    FieldDefinition::required("name").max_length(512)
}

fn description(display_name: &str) -> FieldDefinition {
    FieldDefinition::optional("description")
        .default_value(json!(""))
        .describe(format!("Optional description of this {}.", display_name))
}

fn text(field: &str) -> FieldDefinition {
    FieldDefinition::optional(field).default_value(json!(""))
}

fn int(field: &str, default: i64) -> FieldDefinition {
    FieldDefinition::new(field, FieldKind::Int64, FieldRole::Optional).default_value(json!(default))
}

fn flag(field: &str, default: bool) -> FieldDefinition {
    FieldDefinition::new(field, FieldKind::Bool, FieldRole::Optional).default_value(json!(default))
}

/// Reference to another object by id; left out of the payload when unset.
fn reference(field: &str) -> FieldDefinition {
    FieldDefinition::new(field, FieldKind::Int64, FieldRole::Optional).omit_empty()
}

fn required_reference(field: &str) -> FieldDefinition {
    FieldDefinition::new(field, FieldKind::Int64, FieldRole::Required)
}

fn read_only(field: &str, kind: FieldKind) -> FieldDefinition {
    FieldDefinition::new(field, kind, FieldRole::ReadOnly)
}

fn json_document(field: &str) -> FieldDefinition {
    FieldDefinition::optional(field)
        .kind(FieldKind::Json)
        .default_value(json!("{}"))
}

/// Object resources paired with the search groups of their lookup data source.
pub(super) fn resources() -> Vec<(ResourceDefinition, Vec<LookupGroup>)> {
    vec![
        (organization(), vec![LookupGroup::by_id(), LookupGroup::by_name()]),
        (team(), vec![LookupGroup::by_id(), LookupGroup::by_name()]),
        (user(), vec![LookupGroup::by_id(), LookupGroup::by_username()]),
        (inventory(), vec![LookupGroup::by_id(), LookupGroup::by_name()]),
        (host(), vec![LookupGroup::by_id(), LookupGroup::by_name()]),
        (group(), vec![LookupGroup::by_id()]),
        (credential_type(), vec![LookupGroup::by_id(), LookupGroup::by_name()]),
        (credential(), vec![LookupGroup::by_id(), LookupGroup::by_name()]),
        (project(), vec![LookupGroup::by_id()]),
        (job_template(), vec![LookupGroup::by_id(), LookupGroup::by_name()]),
        (
            label(),
            vec![LookupGroup::by_id(), LookupGroup::by_name_organization()],
        ),
        (instance_group(), vec![LookupGroup::by_id()]),
        (
            execution_environment(),
            vec![LookupGroup::by_id(), LookupGroup::by_name()],
        ),
        (
            notification_template(),
            vec![LookupGroup::by_id(), LookupGroup::by_name()],
        ),
        (
            application(),
            vec![LookupGroup::by_id(), LookupGroup::by_name_organization()],
        ),
        (inventory_source(), vec![LookupGroup::by_id()]),
        (schedule(), vec![LookupGroup::by_id(), LookupGroup::by_name()]),
        (
            workflow_job_template(),
            vec![LookupGroup::by_id(), LookupGroup::by_name()],
        ),
        (role_definition(), vec![LookupGroup::by_id(), LookupGroup::by_name()]),
    ]
}

/// Collections that are only ever read, paired with their search groups.
pub(super) fn read_only_collections() -> Vec<(ResourceDefinition, Vec<LookupGroup>)> {
    vec![
        (role_assignment("user"), vec![LookupGroup::by_id()]),
        (role_assignment("team"), vec![LookupGroup::by_id()]),
    ]
}

fn organization() -> ResourceDefinition {
    ResourceDefinition::object(
        "organization",
        "Organization",
        "/api/v2/organizations/",
        vec![
            name().describe("Name of this organization."),
            description("organization"),
            int("max_hosts", 0)
                .between(0, 2147483647)
                .describe("Maximum number of hosts allowed to be managed by this organization."),
            reference("default_environment")
                .describe("The default execution environment for jobs run by this organization."),
        ],
    )
}

fn team() -> ResourceDefinition {
    ResourceDefinition::object(
        "team",
        "Team",
        "/api/v2/teams/",
        vec![
            name().describe("Name of this team."),
            description("team"),
            required_reference("organization"),
        ],
    )
}

fn user() -> ResourceDefinition {
    ResourceDefinition::object(
        "user",
        "User",
        "/api/v2/users/",
        vec![
            FieldDefinition::required("username")
                .max_length(150)
                .describe("Required. 150 characters or fewer. Letters, digits and @/./+/-/_ only."),
            text("first_name").max_length(150),
            text("last_name").max_length(150),
            text("email").max_length(254),
            flag("is_superuser", false)
                .describe(
                    "Designates that this user has all permissions without explicitly assigning them.",
                ),
            flag("is_system_auditor", false),
            FieldDefinition::new("password", FieldKind::String, FieldRole::WriteOnly)
                .describe("Field used to change the password."),
            read_only("ldap_dn", FieldKind::String),
            read_only("last_login", FieldKind::String),
            read_only("external_account", FieldKind::String),
        ],
    )
}

fn inventory() -> ResourceDefinition {
    ResourceDefinition::object(
        "inventory",
        "Inventory",
        "/api/v2/inventories/",
        vec![
            name().describe("Name of this inventory."),
            description("inventory"),
            required_reference("organization")
                .describe("Organization containing this inventory."),
            text("kind")
                .one_of(["", "smart", "constructed"])
                .force_new()
                .describe("Kind of inventory being represented."),
            text("host_filter").describe(
                "Filter that will be applied to the hosts of this inventory.",
            ),
            text("variables").describe("Inventory variables in JSON or YAML format."),
            flag("prevent_instance_group_fallback", false),
            read_only("total_hosts", FieldKind::Int64),
            read_only("has_active_failures", FieldKind::Bool),
            read_only("pending_deletion", FieldKind::Bool),
        ],
    )
}

fn host() -> ResourceDefinition {
    ResourceDefinition::object(
        "host",
        "Host",
        "/api/v2/hosts/",
        vec![
            name().describe("Name of this host."),
            description("host"),
            required_reference("inventory").force_new(),
            flag("enabled", true).describe("Is this host online and available for running jobs?"),
            text("instance_id").max_length(1024),
            text("variables").describe("Host variables in JSON or YAML format."),
            read_only("last_job", FieldKind::Int64),
            read_only("last_job_host_summary", FieldKind::Int64),
        ],
    )
}

fn group() -> ResourceDefinition {
    ResourceDefinition::object(
        "group",
        "Group",
        "/api/v2/groups/",
        vec![
            name(),
            description("group"),
            required_reference("inventory").force_new(),
            text("variables"),
        ],
    )
}

fn credential_type() -> ResourceDefinition {
    ResourceDefinition::object(
        "credential_type",
        "CredentialType",
        "/api/v2/credential_types/",
        vec![
            name(),
            description("credential type"),
            FieldDefinition::required("kind").one_of(["net", "cloud"]),
            json_document("inputs").describe("Enter inputs using either JSON or YAML syntax."),
            json_document("injectors"),
            read_only("managed", FieldKind::Bool),
            read_only("namespace", FieldKind::String),
        ],
    )
}

fn credential() -> ResourceDefinition {
    ResourceDefinition::object(
        "credential",
        "Credential",
        "/api/v2/credentials/",
        vec![
            name().describe("Name of this credential."),
            description("credential"),
            required_reference("credential_type").describe(
                "Specify the type of credential you want to create. Refer to the documentation for details on each type.",
            ),
            reference("organization").describe(
                "Inherit permissions from organization roles. If provided on creation, do not give either user or team.",
            ),
            json_document("inputs")
                .secret(SecretKind::Document)
                .describe(
                    "Enter inputs using either JSON or YAML syntax. Refer to the documentation for example syntax.",
                ),
            read_only("cloud", FieldKind::Bool),
            read_only("kind", FieldKind::String),
            read_only("kubernetes", FieldKind::Bool),
            read_only("managed", FieldKind::Bool),
        ],
    )
}

fn project() -> ResourceDefinition {
    ResourceDefinition::object(
        "project",
        "Project",
        "/api/v2/projects/",
        vec![
            name().describe("Name of this project."),
            description("project"),
            reference("organization")
                .describe("The organization used to determine access to this template."),
            text("scm_type")
                .one_of(["", "git", "svn", "insights", "archive"])
                .describe("Specifies the source control system used to store the project."),
            text("scm_url").max_length(1024),
            text("scm_branch").max_length(256),
            text("scm_refspec").max_length(1024),
            flag("scm_clean", false),
            flag("scm_delete_on_update", false),
            flag("scm_track_submodules", false),
            flag("scm_update_on_launch", false),
            int("scm_update_cache_timeout", 0).between(0, 2147483647),
            reference("credential"),
            reference("signature_validation_credential"),
            text("local_path").max_length(1024),
            flag("allow_override", false),
            int("timeout", 0).between(-2147483648, 2147483647),
            reference("default_environment"),
            read_only("scm_revision", FieldKind::String),
        ],
    )
}

fn job_template() -> ResourceDefinition {
    ResourceDefinition::object(
        "job_template",
        "JobTemplate",
        "/api/v2/job_templates/",
        vec![
            name().describe("Name of this job template."),
            description("job template"),
            FieldDefinition::optional("job_type")
                .one_of(["run", "check"])
                .default_value(json!("run")),
            reference("inventory"),
            reference("project"),
            text("playbook").max_length(1024),
            text("scm_branch").max_length(1024),
            int("forks", 0).between(0, 2147483647),
            text("limit"),
            int("verbosity", 0).between(0, 5),
            text("extra_vars"),
            text("job_tags"),
            text("skip_tags"),
            text("start_at_task"),
            int("timeout", 0).between(-2147483648, 2147483647),
            flag("use_fact_cache", false),
            reference("execution_environment"),
            text("host_config_key").max_length(1024),
            flag("become_enabled", false),
            flag("diff_mode", false),
            flag("allow_simultaneous", false),
            flag("force_handlers", false),
            flag("survey_enabled", false),
            int("job_slice_count", 1).between(0, 2147483647),
            flag("prevent_instance_group_fallback", false),
            flag("ask_variables_on_launch", false),
            flag("ask_inventory_on_launch", false),
            flag("ask_credential_on_launch", false),
            flag("ask_limit_on_launch", false),
            text("webhook_service").one_of(["", "github", "gitlab"]),
            reference("webhook_credential"),
        ],
    )
}

fn label() -> ResourceDefinition {
    ResourceDefinition::object(
        "label",
        "Label",
        "/api/v2/labels/",
        vec![
            name().describe("Name of this label."),
            required_reference("organization").describe("Organization this label belongs to."),
        ],
    )
}

fn instance_group() -> ResourceDefinition {
    ResourceDefinition::object(
        "instance_group",
        "InstanceGroup",
        "/api/v2/instance_groups/",
        vec![
            FieldDefinition::required("name").max_length(250),
            int("max_concurrent_jobs", 0).between(0, 2147483647),
            int("max_forks", 0).between(0, 2147483647),
            int("policy_instance_minimum", 0).between(0, 2147483647),
            int("policy_instance_percentage", 0).between(0, 100),
            FieldDefinition::new("policy_instance_list", FieldKind::StringList, FieldRole::Optional)
                .default_value(json!([])),
            flag("is_container_group", false).force_new(),
            reference("credential"),
            text("pod_spec_override"),
            read_only("capacity", FieldKind::Int64),
            read_only("consumed_capacity", FieldKind::Float64),
            read_only("percent_capacity_remaining", FieldKind::Float64),
            read_only("jobs_running", FieldKind::Int64),
            read_only("jobs_total", FieldKind::Int64),
            read_only("instances", FieldKind::Int64),
        ],
    )
}

fn execution_environment() -> ResourceDefinition {
    ResourceDefinition::object(
        "execution_environment",
        "ExecutionEnvironment",
        "/api/v2/execution_environments/",
        vec![
            name().describe("Name of this execution environment."),
            description("execution environment"),
            FieldDefinition::required("image")
                .max_length(1024)
                .describe(
                    "The full image location, including the container registry, image name, and version tag.",
                ),
            reference("organization")
                .describe(
                    "The organization used to determine access to this execution environment.",
                ),
            reference("credential"),
            text("pull")
                .one_of(["", "always", "missing", "never"])
                .describe("Pull image before running?"),
            read_only("managed", FieldKind::Bool),
        ],
    )
}

fn notification_template() -> ResourceDefinition {
    ResourceDefinition::object(
        "notification_template",
        "NotificationTemplate",
        "/api/v2/notification_templates/",
        vec![
            name().describe("Name of this notification template."),
            description("notification template"),
            required_reference("organization"),
            FieldDefinition::required("notification_type").one_of([
                "email",
                "grafana",
                "irc",
                "mattermost",
                "pagerduty",
                "rocketchat",
                "slack",
                "twilio",
                "webhook",
            ]),
            json_document("notification_configuration").secret(SecretKind::Document),
            FieldDefinition::optional("messages").kind(FieldKind::Json),
        ],
    )
}

fn application() -> ResourceDefinition {
    ResourceDefinition::object(
        "application",
        "Application",
        "/api/v2/applications/",
        vec![
            FieldDefinition::required("name")
                .max_length(255)
                .describe("Name of this application."),
            description("application"),
            required_reference("organization")
                .describe("Organization containing this application."),
            FieldDefinition::required("authorization_grant_type")
                .one_of(["authorization-code", "password"])
                .describe(
                    "The Grant type the user must use for acquire tokens for this application.",
                ),
            FieldDefinition::required("client_type")
                .one_of(["confidential", "public"])
                .describe(
                    "Set to Public or Confidential depending on how secure the client device is.",
                ),
            FieldDefinition::optional("redirect_uris")
                .describe("Allowed URIs list, space separated"),
            FieldDefinition::new("skip_authorization", FieldKind::Bool, FieldRole::Optional)
                .describe(
                    "Set True to skip authorization step for completely trusted applications.",
                ),
            read_only("client_id", FieldKind::String),
            // Only returned in full by the create call; reads answer with a placeholder.
            read_only("client_secret", FieldKind::String)
                .secret(SecretKind::Scalar)
                .describe(
                    "Used for more stringent verification of access to an application when creating a token.",
                ),
        ],
    )
}

fn inventory_source() -> ResourceDefinition {
    ResourceDefinition::object(
        "inventory_source",
        "InventorySource",
        "/api/v2/inventory_sources/",
        vec![
            name().describe("Name of this inventory source."),
            description("inventory source"),
            required_reference("inventory"),
            FieldDefinition::optional("source").one_of([
                "file",
                "scm",
                "ec2",
                "gce",
                "azure_rm",
                "vmware",
                "satellite6",
                "openstack",
                "rhv",
                "controller",
                "insights",
            ]),
            text("source_path").max_length(1024),
            reference("source_project")
                .describe("Project containing inventory file used as source."),
            text("source_vars").describe("Inventory source variables in YAML or JSON format."),
            reference("credential").describe("Cloud credential to use for inventory updates."),
            reference("execution_environment")
                .describe("The container image to be used for execution."),
            text("enabled_var")
                .describe("Retrieve the enabled state from the given dict of host variables."),
            text("enabled_value").describe(
                "Only used when enabled_var is set. Value when the host is considered enabled.",
            ),
            text("host_filter").describe("Regex where only matching hosts will be imported."),
            FieldDefinition::new("overwrite", FieldKind::Bool, FieldRole::Optional)
                .describe("Overwrite local groups and hosts from remote inventory source."),
            FieldDefinition::new("overwrite_vars", FieldKind::Bool, FieldRole::Optional)
                .describe("Overwrite local variables from remote inventory source."),
            FieldDefinition::new("update_on_launch", FieldKind::Bool, FieldRole::Optional),
            int("update_cache_timeout", 0).between(0, 2147483647),
            int("timeout", 0)
                .between(-2147483648, 2147483647)
                .describe("The amount of time (in seconds) to run before the task is canceled."),
            int("verbosity", 1).between(0, 2),
        ],
    )
}

fn schedule() -> ResourceDefinition {
    ResourceDefinition::object(
        "schedule",
        "Schedule",
        "/api/v2/schedules/",
        vec![
            name().describe("Name of this schedule."),
            description("schedule"),
            FieldDefinition::required("rrule")
                .describe("A value representing the schedules iCal recurrence rule."),
            required_reference("unified_job_template"),
            FieldDefinition::new("enabled", FieldKind::Bool, FieldRole::Optional)
                .describe("Enables processing of this schedule."),
            json_document("extra_data"),
            reference("inventory").describe(
                "Inventory applied as a prompt, assuming job template prompts for inventory",
            ),
            reference("execution_environment")
                .describe("The container image to be used for execution."),
            FieldDefinition::optional("job_type").one_of(["", "run", "check"]),
            FieldDefinition::optional("job_tags"),
            FieldDefinition::optional("skip_tags"),
            FieldDefinition::optional("limit"),
            FieldDefinition::optional("scm_branch"),
            FieldDefinition::new("diff_mode", FieldKind::Bool, FieldRole::Optional),
            FieldDefinition::new("forks", FieldKind::Int64, FieldRole::Optional).omit_empty(),
            FieldDefinition::new("job_slice_count", FieldKind::Int64, FieldRole::Optional)
                .omit_empty(),
            FieldDefinition::new("timeout", FieldKind::Int64, FieldRole::Optional).omit_empty(),
            FieldDefinition::new("verbosity", FieldKind::Int64, FieldRole::Optional)
                .between(0, 5)
                .omit_empty(),
            read_only("dtstart", FieldKind::String)
                .describe("The first occurrence of the schedule occurs on or after this time."),
            read_only("dtend", FieldKind::String),
            read_only("next_run", FieldKind::String)
                .describe("The next time that the scheduled action will run."),
            read_only("timezone", FieldKind::String),
            read_only("until", FieldKind::String),
        ],
    )
}

fn workflow_job_template() -> ResourceDefinition {
    ResourceDefinition::object(
        "workflow_job_template",
        "WorkflowJobTemplate",
        "/api/v2/workflow_job_templates/",
        vec![
            name().describe("Name of this workflow job template."),
            description("workflow job template"),
            reference("organization")
                .describe("The organization used to determine access to this template."),
            reference("inventory").describe(
                "Inventory applied as a prompt, assuming job template prompts for inventory",
            ),
            text("extra_vars"),
            FieldDefinition::optional("limit"),
            FieldDefinition::optional("scm_branch"),
            FieldDefinition::optional("job_tags"),
            FieldDefinition::optional("skip_tags"),
            flag("allow_simultaneous", false),
            flag("survey_enabled", false),
            flag("ask_inventory_on_launch", false),
            flag("ask_labels_on_launch", false),
            flag("ask_limit_on_launch", false),
            flag("ask_scm_branch_on_launch", false),
            flag("ask_skip_tags_on_launch", false),
            flag("ask_tags_on_launch", false),
            flag("ask_variables_on_launch", false),
            text("webhook_service")
                .one_of(["", "github", "gitlab"])
                .describe("Service that webhook requests will be accepted from"),
            reference("webhook_credential")
                .describe("Personal Access Token for posting back the status to the service API"),
        ],
    )
}

fn role_definition() -> ResourceDefinition {
    ResourceDefinition::object(
        "role_definition",
        "RoleDefinition",
        "/api/v2/role_definitions/",
        vec![
            name().describe("Name of this role definition."),
            description("role definition"),
            FieldDefinition::optional("content_type")
                .describe("The type of resource this applies to"),
            FieldDefinition::new("permissions", FieldKind::StringList, FieldRole::Required),
            read_only("managed", FieldKind::Bool),
            read_only("created_by", FieldKind::Int64)
                .describe("The user who created this resource"),
            read_only("modified_by", FieldKind::Int64)
                .describe("The user who last modified this resource"),
        ],
    )
}

/// Assignment of a role definition to a `user` or a `team` on one object.
fn role_assignment(assignee: &str) -> ResourceDefinition {
    let display_name = match assignee {
        "team" => "RoleTeamAssignment",
        _ => "RoleUserAssignment",
    };
    ResourceDefinition::object(
        &format!("role_{}_assignment", assignee),
        display_name,
        &format!("/api/v2/role_{}_assignments/", assignee),
        vec![
            read_only("role_definition", FieldKind::Int64),
            read_only(assignee, FieldKind::Int64),
            read_only(&format!("{}_ansible_id", assignee), FieldKind::String),
            read_only("object_id", FieldKind::String),
            read_only("object_ansible_id", FieldKind::String),
            read_only("content_type", FieldKind::Int64),
            read_only("created_by", FieldKind::Int64),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ResourceKind;

    #[test]
    fn test_endpoints_are_clean() {
        for (resource, _) in resources() {
            let ResourceKind::Object { endpoint } = &resource.kind else {
                panic!("{} is not an object resource", resource.type_name);
            };
            assert!(endpoint.starts_with("/api/v2/"), "{}", endpoint);
            assert!(endpoint.ends_with('/'), "{}", endpoint);
        }
    }

    #[test]
    fn test_field_names_are_unique() {
        for (resource, _) in resources() {
            let mut names: Vec<&str> = resource.fields.iter().map(|f| f.name.as_str()).collect();
            let total = names.len();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), total, "{}", resource.type_name);
            assert!(resource.field("id").is_none(), "{}", resource.type_name);
        }
    }

    #[test]
    fn test_lookup_groups_reference_known_fields() {
        for (resource, groups) in resources() {
            for group in groups {
                for attribute in group.attributes() {
                    assert!(
                        attribute == "id" || resource.field(attribute).is_some(),
                        "{} lookup {} uses unknown attribute {}",
                        resource.type_name,
                        group.name(),
                        attribute
                    );
                }
            }
        }
    }

    #[test]
    fn test_application_client_secret_is_server_generated() {
        let application = application();
        let secret = application.field("client_secret").unwrap();
        assert_eq!(secret.secret, Some(SecretKind::Scalar));
        assert!(!secret.is_writable());
        assert!(secret.is_sensitive());
    }

    #[test]
    fn test_role_assignments_are_read_only() {
        for (collection, groups) in read_only_collections() {
            assert_eq!(groups, vec![LookupGroup::by_id()]);
            assert!(
                collection.fields.iter().all(|f| !f.is_writable()),
                "{}",
                collection.type_name
            );
        }
        let team = role_assignment("team");
        assert_eq!(team.type_name, "awx_role_team_assignment");
        assert!(team.field("team_ansible_id").is_some());
    }

    #[test]
    fn test_references_omit_empty() {
        let credential = credential();
        assert!(credential.field("organization").unwrap().omit_empty);
        assert!(!credential.field("credential_type").unwrap().omit_empty);
    }
}
