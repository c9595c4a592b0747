//! Declarative definitions of every AWX resource and data source.
//!
//! Each AWX entity is described once as data: its endpoint, how its fields map
//! between state and the REST payload, and which of them hold secrets. Schemas,
//! request bodies and state conversion are all derived from these definitions.

mod associations;
mod objects;
mod roles;
mod settings;

use std::collections::BTreeMap;

use serde_json::Value;

use crate::helpers::clean_endpoint;
use crate::schema::{
    Attribute, AttributeFlags, AttributeType, Constraint, ProviderSchema, Schema, Validator,
};

/// Prefix of every resource and data source type name.
pub const TYPE_PREFIX: &str = "awx";

/// Build a type name such as `awx_organization`.
pub fn type_name(entity: &str) -> String {
    format!("{}_{}", TYPE_PREFIX, entity)
}

/// How a field is represented in state and on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Plain string.
    String,
    /// 64-bit integer, also accepted as a numeric string from the API.
    Int64,
    /// Floating point number.
    Float64,
    /// Boolean.
    Bool,
    /// JSON-encoded string in state, raw JSON on the wire.
    Json,
    /// List of strings.
    StringList,
}

impl FieldKind {
    /// The schema type for this kind.
    pub fn attribute_type(self) -> AttributeType {
        match self {
            FieldKind::String | FieldKind::Json => AttributeType::String,
            FieldKind::Int64 => AttributeType::Int64,
            FieldKind::Float64 => AttributeType::Float64,
            FieldKind::Bool => AttributeType::Bool,
            FieldKind::StringList => AttributeType::list(AttributeType::String),
        }
    }
}

/// Who may set a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    /// Must be configured.
    Required,
    /// May be configured; the server fills it in otherwise.
    Optional,
    /// Set by the server only.
    ReadOnly,
    /// Sent to the server but never returned by it.
    WriteOnly,
}

/// How the server redacts a secret field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKind {
    /// A JSON document whose individual values may be replaced by placeholders.
    Document,
    /// A single value that is replaced by a placeholder as a whole.
    Scalar,
}

/// One attribute of a resource or data source.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    /// Attribute name in state.
    pub name: String,
    /// Key in the REST payload.
    pub api_name: String,
    /// Value representation.
    pub kind: FieldKind,
    /// Who may set it.
    pub role: FieldRole,
    /// Planned when unset.
    pub default: Option<Value>,
    /// Human-readable description.
    pub description: Option<String>,
    /// How the server redacts it, if it is a secret.
    pub secret: Option<SecretKind>,
    /// Changing the value replaces the resource.
    pub force_new: bool,
    /// Maximum string length.
    pub max_length: Option<usize>,
    /// Allowed string values.
    pub one_of: Vec<String>,
    /// Inclusive integer range.
    pub between: Option<(i64, i64)>,
    /// Leave zero values out of request bodies.
    pub omit_empty: bool,
}

impl FieldDefinition {
    /// Create a field whose state name and API key are identical.
    pub fn new(name: impl Into<String>, kind: FieldKind, role: FieldRole) -> Self {
        let name = name.into();
        Self {
            api_name: name.clone(),
            name,
            kind,
            role,
            default: None,
            description: None,
            secret: None,
            force_new: false,
            max_length: None,
            one_of: Vec::new(),
            between: None,
            omit_empty: false,
        }
    }

    /// Required string field.
    pub fn required(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::String, FieldRole::Required)
    }

    /// Optional string field.
    pub fn optional(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::String, FieldRole::Optional)
    }

    /// Read-only string field.
    pub fn read_only(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::String, FieldRole::ReadOnly)
    }

    /// Change the value kind.
    pub fn kind(mut self, kind: FieldKind) -> Self {
        self.kind = kind;
        self
    }

    /// Use a different key in the REST payload.
    pub fn api_name(mut self, api_name: impl Into<String>) -> Self {
        self.api_name = api_name.into();
        self
    }

    /// Set the description.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the value planned when the field is unset.
    pub fn default_value(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Mark the field as a secret.
    pub fn secret(mut self, kind: SecretKind) -> Self {
        self.secret = Some(kind);
        self
    }

    /// Changing the value replaces the resource.
    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    /// Limit the string length.
    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    /// Restrict the value to a fixed set of strings.
    pub fn one_of<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.one_of = values.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict an integer to an inclusive range.
    pub fn between(mut self, min: i64, max: i64) -> Self {
        self.between = Some((min, max));
        self
    }

    /// Leave zero values out of request bodies.
    pub fn omit_empty(mut self) -> Self {
        self.omit_empty = true;
        self
    }

    /// True if the field is part of create and update payloads.
    pub fn is_writable(&self) -> bool {
        self.role != FieldRole::ReadOnly
    }

    /// True if the server never returns the field.
    pub fn is_write_only(&self) -> bool {
        self.role == FieldRole::WriteOnly
    }

    /// True if the value must be hidden from logs and plan output.
    pub fn is_sensitive(&self) -> bool {
        self.is_write_only() || self.secret.is_some()
    }

    /// The schema attribute of this field on a managed resource.
    pub fn resource_attribute(&self) -> Attribute {
        let flags = match self.role {
            FieldRole::Required => AttributeFlags::required(),
            FieldRole::Optional => AttributeFlags::optional_computed(),
            FieldRole::ReadOnly => AttributeFlags::computed(),
            FieldRole::WriteOnly => AttributeFlags::optional(),
        };
        let mut attr = self.attribute(flags);
        attr.force_new = self.force_new;
        if self.role == FieldRole::Optional {
            attr.default = self.default.clone();
        }
        attr
    }

    /// The schema attribute of this field on a data source.
    pub fn data_source_attribute(&self, lookup: bool) -> Attribute {
        let flags = if lookup {
            AttributeFlags::optional_computed()
        } else {
            AttributeFlags::computed()
        };
        self.attribute(flags)
    }

    fn attribute(&self, flags: AttributeFlags) -> Attribute {
        let mut attr = Attribute::new(self.kind.attribute_type(), flags);
        attr.description = self.description.clone();
        if self.is_sensitive() {
            attr.flags.sensitive = true;
        }
        if !attr.flags.computed || attr.flags.optional {
            if let Some(max) = self.max_length {
                attr = attr.with_validator(Validator::LengthAtMost(max));
            }
            if !self.one_of.is_empty() {
                attr = attr.with_validator(Validator::OneOf(self.one_of.clone()));
            }
            if let Some((min, max)) = self.between {
                attr = attr.with_validator(Validator::Between(min, max));
            }
            if self.kind == FieldKind::Json {
                attr = attr.with_validator(Validator::JsonObject);
            }
        }
        attr
    }
}

/// How a resource maps onto the REST API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    /// A collection: POST to create, GET/PATCH/DELETE on `<endpoint>/<id>/`.
    Object {
        /// Collection endpoint.
        endpoint: String,
    },
    /// A settings singleton: PATCH to create and update, GET to read, delete is a no-op.
    Settings {
        /// Settings endpoint.
        endpoint: String,
    },
    /// A link between two objects, managed through a sub-collection of the parent.
    Association {
        /// Sub-collection endpoint, with `{}` standing for the parent id.
        endpoint: String,
        /// Attribute holding the parent id.
        parent: String,
        /// Attribute holding the child id.
        child: String,
    },
}

/// A managed resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDefinition {
    /// Type name, e.g. `awx_credential`.
    pub type_name: String,
    /// Human-readable name used in messages.
    pub display_name: String,
    /// REST mapping.
    pub kind: ResourceKind,
    /// Attributes other than `id`.
    pub fields: Vec<FieldDefinition>,
}

impl ResourceDefinition {
    /// A collection-backed resource.
    pub fn object(
        entity: &str,
        display_name: impl Into<String>,
        endpoint: &str,
        fields: Vec<FieldDefinition>,
    ) -> Self {
        Self {
            type_name: type_name(entity),
            display_name: display_name.into(),
            kind: ResourceKind::Object {
                endpoint: clean_endpoint(endpoint),
            },
            fields,
        }
    }

    /// A settings singleton.
    pub fn settings(
        entity: &str,
        display_name: impl Into<String>,
        endpoint: &str,
        fields: Vec<FieldDefinition>,
    ) -> Self {
        Self {
            type_name: type_name(entity),
            display_name: display_name.into(),
            kind: ResourceKind::Settings {
                endpoint: clean_endpoint(endpoint),
            },
            fields,
        }
    }

    /// An association between a parent and a child object.
    pub fn association(
        entity: &str,
        display_name: impl Into<String>,
        endpoint: &str,
        parent: FieldDefinition,
        child: FieldDefinition,
    ) -> Self {
        let parent = parent.kind(FieldKind::Int64).force_new();
        let child = child.kind(FieldKind::Int64).force_new();
        Self {
            type_name: type_name(entity),
            display_name: display_name.into(),
            kind: ResourceKind::Association {
                endpoint: endpoint.to_string(),
                parent: parent.name.clone(),
                child: child.name.clone(),
            },
            fields: vec![parent, child],
        }
    }

    /// Look up a field by state name.
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// True if the resource carries an `id` assigned by the server.
    pub fn has_id(&self) -> bool {
        matches!(self.kind, ResourceKind::Object { .. })
    }

    /// Derive the resource schema.
    pub fn schema(&self) -> Schema {
        let mut schema = Schema::v0().with_description(self.display_name.clone());
        for field in &self.fields {
            schema = schema.with_attribute(field.name.clone(), field.resource_attribute());
        }
        if self.has_id() {
            schema = schema.with_attribute(
                "id",
                Attribute::computed_int64()
                    .with_description(format!("Database ID for this {}.", self.display_name)),
            );
        }
        if let ResourceKind::Association { parent, child, .. } = &self.kind {
            schema = schema.with_constraint(Constraint::also_requires(
                parent.clone(),
                [child.clone()],
            ));
        }
        schema
    }
}

/// A group of attributes that together identify one object for a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupGroup {
    /// Fetch `<endpoint>/<value>/`.
    Path {
        /// Group name, e.g. `by_id`.
        name: String,
        /// Attribute whose value is appended to the path.
        attribute: String,
    },
    /// Search `<endpoint>/?<param>=<value>&...`.
    Query {
        /// Group name, e.g. `by_name`.
        name: String,
        /// `(query parameter, attribute)` pairs.
        params: Vec<(String, String)>,
    },
}

impl LookupGroup {
    /// Look up by database id.
    pub fn by_id() -> Self {
        LookupGroup::Path {
            name: "by_id".to_string(),
            attribute: "id".to_string(),
        }
    }

    /// Search by exact name.
    pub fn by_name() -> Self {
        LookupGroup::Query {
            name: "by_name".to_string(),
            params: vec![("name__exact".to_string(), "name".to_string())],
        }
    }

    /// Search by exact name within an organization.
    pub fn by_name_organization() -> Self {
        LookupGroup::Query {
            name: "by_name_organization".to_string(),
            params: vec![
                ("name__exact".to_string(), "name".to_string()),
                ("organization".to_string(), "organization".to_string()),
            ],
        }
    }

    /// Search by exact username.
    pub fn by_username() -> Self {
        LookupGroup::Query {
            name: "by_username".to_string(),
            params: vec![("username__exact".to_string(), "username".to_string())],
        }
    }

    /// Group name.
    pub fn name(&self) -> &str {
        match self {
            LookupGroup::Path { name, .. } | LookupGroup::Query { name, .. } => name,
        }
    }

    /// Attributes that must all be configured for the group to apply.
    pub fn attributes(&self) -> Vec<&str> {
        match self {
            LookupGroup::Path { attribute, .. } => vec![attribute.as_str()],
            LookupGroup::Query { params, .. } => params.iter().map(|(_, a)| a.as_str()).collect(),
        }
    }
}

/// How a data source reads from the REST API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSourceKind {
    /// Find one object of a collection using one of several search groups.
    Lookup {
        /// Collection endpoint.
        endpoint: String,
        /// Search groups; exactly one must be configured.
        groups: Vec<LookupGroup>,
    },
    /// Read a fixed endpoint.
    Singleton {
        /// Endpoint to read.
        endpoint: String,
    },
    /// List the roles of one object as `name -> id`.
    ObjectRoles {
        /// Endpoint with `{}` standing for the object id.
        endpoint: String,
    },
}

/// A read-only data source.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSourceDefinition {
    /// Type name, e.g. `awx_organization`.
    pub type_name: String,
    /// Human-readable name used in messages.
    pub display_name: String,
    /// REST mapping.
    pub kind: DataSourceKind,
    /// Attributes read from the API.
    pub fields: Vec<FieldDefinition>,
}

impl DataSourceDefinition {
    /// A lookup over the collection behind `resource`.
    ///
    /// Write-only fields are dropped since the API never returns them.
    pub fn lookup(resource: &ResourceDefinition, groups: Vec<LookupGroup>) -> Option<Self> {
        let ResourceKind::Object { endpoint } = &resource.kind else {
            return None;
        };
        let mut fields = vec![FieldDefinition::new("id", FieldKind::Int64, FieldRole::ReadOnly)
            .describe(format!("Database ID for this {}.", resource.display_name))];
        fields.extend(resource.fields.iter().filter(|f| !f.is_write_only()).cloned());
        Some(Self {
            type_name: resource.type_name.clone(),
            display_name: resource.display_name.clone(),
            kind: DataSourceKind::Lookup {
                endpoint: endpoint.clone(),
                groups,
            },
            fields,
        })
    }

    /// A data source reading a fixed endpoint.
    pub fn singleton(
        entity: &str,
        display_name: impl Into<String>,
        endpoint: &str,
        fields: Vec<FieldDefinition>,
    ) -> Self {
        Self {
            type_name: type_name(entity),
            display_name: display_name.into(),
            kind: DataSourceKind::Singleton {
                endpoint: clean_endpoint(endpoint),
            },
            fields: fields.into_iter().filter(|f| !f.is_write_only()).collect(),
        }
    }

    /// The read side of a settings resource.
    pub fn from_settings(resource: &ResourceDefinition) -> Option<Self> {
        let ResourceKind::Settings { endpoint } = &resource.kind else {
            return None;
        };
        Some(Self {
            type_name: resource.type_name.clone(),
            display_name: resource.display_name.clone(),
            kind: DataSourceKind::Singleton {
                endpoint: endpoint.clone(),
            },
            fields: resource
                .fields
                .iter()
                .filter(|f| !f.is_write_only())
                .cloned()
                .collect(),
        })
    }

    /// The roles of one object.
    pub fn object_roles(entity: &str, display_name: impl Into<String>, endpoint: &str) -> Self {
        let display_name = display_name.into();
        Self {
            type_name: type_name(&format!("{}_object_roles", entity)),
            fields: vec![FieldDefinition::new("id", FieldKind::Int64, FieldRole::Required)
                .describe(format!("{} ID", display_name))],
            display_name,
            kind: DataSourceKind::ObjectRoles {
                endpoint: endpoint.to_string(),
            },
        }
    }

    /// Derive the data source schema.
    pub fn schema(&self) -> Schema {
        let mut schema = Schema::v0().with_description(self.display_name.clone());
        match &self.kind {
            DataSourceKind::Lookup { groups, .. } => {
                let lookup: Vec<&str> = groups.iter().flat_map(|g| g.attributes()).collect();
                for field in &self.fields {
                    let is_lookup = lookup.contains(&field.name.as_str());
                    schema = schema
                        .with_attribute(field.name.clone(), field.data_source_attribute(is_lookup));
                }
                for constraint in lookup_constraints(groups) {
                    schema = schema.with_constraint(constraint);
                }
            },
            DataSourceKind::Singleton { .. } => {
                for field in &self.fields {
                    let attribute = field.data_source_attribute(false);
                    schema = schema.with_attribute(field.name.clone(), attribute);
                }
            },
            DataSourceKind::ObjectRoles { .. } => {
                for field in &self.fields {
                    schema = schema.with_attribute(field.name.clone(), field.resource_attribute());
                }
                schema = schema.with_attribute(
                    "roles",
                    Attribute::new(
                        AttributeType::map(AttributeType::Int64),
                        AttributeFlags::computed(),
                    )
                    .with_description("Roles for the object, keyed by role name."),
                );
            },
        }
        schema
    }
}

/// Constraints that make exactly one lookup group apply.
///
/// The first attribute of each group selects it; the rest of a group's
/// attributes must accompany it and may not be mixed with another group.
fn lookup_constraints(groups: &[LookupGroup]) -> Vec<Constraint> {
    let leads: Vec<&str> = groups
        .iter()
        .filter_map(|g| g.attributes().first().copied())
        .collect();
    let mut constraints = Vec::new();
    if leads.len() > 1 {
        constraints.push(Constraint::exactly_one_of(leads.iter().copied()));
    }
    for group in groups {
        let attributes = group.attributes();
        let Some((lead, rest)) = attributes.split_first() else {
            continue;
        };
        if !rest.is_empty() {
            constraints.push(Constraint::also_requires(*lead, rest.iter().copied()));
        }
        let foreign: Vec<&str> = groups
            .iter()
            .filter(|other| *other != group)
            .flat_map(|other| other.attributes().into_iter().skip(1))
            .filter(|a| !attributes.contains(a))
            .collect();
        if !foreign.is_empty() {
            constraints.push(Constraint::conflicts_with(*lead, foreign));
        }
    }
    constraints
}

/// Every resource and data source the provider serves.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    resources: BTreeMap<String, ResourceDefinition>,
    data_sources: BTreeMap<String, DataSourceDefinition>,
}

impl Catalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// The AWX catalog.
    pub fn awx() -> Self {
        let mut catalog = Self::new();
        for (resource, groups) in objects::resources() {
            if let Some(data_source) = DataSourceDefinition::lookup(&resource, groups) {
                catalog.add_data_source(data_source);
            }
            catalog.add_resource(resource);
        }
        for (collection, groups) in objects::read_only_collections() {
            if let Some(data_source) = DataSourceDefinition::lookup(&collection, groups) {
                catalog.add_data_source(data_source);
            }
        }
        for resource in settings::resources() {
            if let Some(data_source) = DataSourceDefinition::from_settings(&resource) {
                catalog.add_data_source(data_source);
            }
            catalog.add_resource(resource);
        }
        for data_source in settings::data_sources() {
            catalog.add_data_source(data_source);
        }
        for resource in associations::resources() {
            catalog.add_resource(resource);
        }
        for data_source in roles::data_sources() {
            catalog.add_data_source(data_source);
        }
        catalog
    }

    /// Register a resource, replacing any with the same type name.
    pub fn add_resource(&mut self, resource: ResourceDefinition) {
        self.resources.insert(resource.type_name.clone(), resource);
    }

    /// Register a data source, replacing any with the same type name.
    pub fn add_data_source(&mut self, data_source: DataSourceDefinition) {
        self.data_sources
            .insert(data_source.type_name.clone(), data_source);
    }

    /// Look up a resource by type name.
    pub fn resource(&self, type_name: &str) -> Option<&ResourceDefinition> {
        self.resources.get(type_name)
    }

    /// Look up a data source by type name.
    pub fn data_source(&self, type_name: &str) -> Option<&DataSourceDefinition> {
        self.data_sources.get(type_name)
    }

    /// All resources, ordered by type name.
    pub fn resources(&self) -> impl Iterator<Item = &ResourceDefinition> {
        self.resources.values()
    }

    /// All data sources, ordered by type name.
    pub fn data_sources(&self) -> impl Iterator<Item = &DataSourceDefinition> {
        self.data_sources.values()
    }

    /// Resource and data source schemas, with `provider` as the configuration schema.
    pub fn provider_schema(&self, provider: Schema) -> ProviderSchema {
        let mut schema = ProviderSchema::new().with_provider_config(provider);
        for resource in self.resources() {
            schema = schema.with_resource(resource.type_name.clone(), resource.schema());
        }
        for data_source in self.data_sources() {
            schema = schema.with_data_source(data_source.type_name.clone(), data_source.schema());
        }
        schema
    }
}
