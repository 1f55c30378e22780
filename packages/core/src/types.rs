// ABOUTME: Entity type definitions for agent specifications
// ABOUTME: Models, fields, actions, steps, schedules and external connections

use serde::{Deserialize, Serialize};

use crate::validation::{self, SchemaError};

fn is_false(value: &bool) -> bool {
    !*value
}

/// Field data type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Number,
    Boolean,
    Date,
    Reference,
    Enum,
    ImageUrl,
    Oauth,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Reference => "reference",
            FieldType::Enum => "enum",
            FieldType::ImageUrl => "image_url",
            FieldType::Oauth => "oauth",
        }
    }
}

/// How many target records a reference field points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    #[default]
    One,
    Many,
}

fn default_reference_field() -> String {
    "id".to_string()
}

/// Target of a reference field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldReference {
    pub model: String,
    #[serde(default = "default_reference_field")]
    pub field: String,
    #[serde(default)]
    pub cardinality: Cardinality,
}

/// Typed attribute of a model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,
    pub title: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<FieldReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Set when the field was synthesized from a step output
    #[serde(default, skip_serializing_if = "is_false")]
    pub derived: bool,
}

impl Field {
    /// Create a plain optional field of the given type
    pub fn new(name: impl Into<String>, title: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            field_type,
            required: false,
            reference: None,
            enum_values: None,
            description: None,
            derived: false,
        }
    }

    pub fn text(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(name, title, FieldType::Text)
    }

    /// Create a reference field pointing at another model's id
    pub fn reference(
        name: impl Into<String>,
        title: impl Into<String>,
        model: impl Into<String>,
        cardinality: Cardinality,
    ) -> Self {
        Self {
            reference: Some(FieldReference {
                model: model.into(),
                field: default_reference_field(),
                cardinality,
            }),
            ..Self::new(name, title, FieldType::Reference)
        }
    }

    /// Create an enum field; an empty value list is rejected
    pub fn enumeration(
        name: impl Into<String>,
        title: impl Into<String>,
        values: Vec<String>,
    ) -> Result<Self, SchemaError> {
        let field = Self {
            enum_values: Some(values),
            ..Self::new(name, title, FieldType::Enum)
        };
        SchemaError::check(|violations| {
            validation::validate_field(&field, &field.name, violations)
        })?;
        Ok(field)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_text(&self) -> bool {
        self.field_type == FieldType::Text
    }
}

/// Data entry surface kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormKind {
    /// Creates a record
    New,
    /// Updates a narrow subset of fields on an existing record
    Edit,
}

/// View-only form metadata attached to a model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Form {
    pub name: String,
    pub title: String,
    pub kind: FormKind,
    #[serde(default)]
    pub fields: Vec<String>,
}

/// Named record schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_fields: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forms: Vec<Form>,
}

impl Model {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            fields,
            display_fields: None,
            forms: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    pub fn with_display_fields(mut self, names: &[&str]) -> Self {
        self.display_fields = Some(names.iter().map(|n| n.to_string()).collect());
        self
    }
}

/// Discriminant of a step's configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Reasoning,
    WebSearch,
    CustomCode,
    ImageGeneration,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Reasoning => "reasoning",
            StepKind::WebSearch => "web_search",
            StepKind::CustomCode => "custom_code",
            StepKind::ImageGeneration => "image_generation",
        }
    }
}

/// Kind-specific step configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum StepConfig {
    Reasoning {
        prompt: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model: Option<String>,
    },
    WebSearch {
        query: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_results: Option<u32>,
    },
    CustomCode {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        #[serde(default)]
        dependencies: Vec<String>,
        #[serde(default)]
        env_vars: Vec<String>,
    },
    ImageGeneration {
        prompt: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        aspect_ratio: Option<String>,
    },
}

impl StepConfig {
    pub fn kind(&self) -> StepKind {
        match self {
            StepConfig::Reasoning { .. } => StepKind::Reasoning,
            StepConfig::WebSearch { .. } => StepKind::WebSearch,
            StepConfig::CustomCode { .. } => StepKind::CustomCode,
            StepConfig::ImageGeneration { .. } => StepKind::ImageGeneration,
        }
    }

    /// Custom code step with nothing generated yet
    pub fn empty_custom_code() -> Self {
        StepConfig::CustomCode {
            code: None,
            dependencies: Vec::new(),
            env_vars: Vec::new(),
        }
    }
}

/// Ordered unit of work inside an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub input_fields: Vec<String>,
    #[serde(default)]
    pub output_fields: Vec<String>,
    #[serde(flatten)]
    pub config: StepConfig,
}

impl Step {
    pub fn kind(&self) -> StepKind {
        self.config.kind()
    }

    /// Whether the step can run without further preparation.
    /// Custom code steps need generated code first.
    pub fn is_execution_ready(&self) -> bool {
        match &self.config {
            StepConfig::CustomCode { code, .. } => {
                code.as_deref().is_some_and(|c| !c.trim().is_empty())
            }
            StepConfig::Reasoning { .. }
            | StepConfig::WebSearch { .. }
            | StepConfig::ImageGeneration { .. } => true,
        }
    }
}

/// Named operation bound to one target model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub name: String,
    pub title: String,
    /// Single-glyph marker shown next to the action
    #[serde(default)]
    pub emoji: String,
    #[serde(default)]
    pub description: String,
    pub target_model: String,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleMode {
    Once,
    Recurring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleStatus {
    #[default]
    Active,
    Paused,
}

fn empty_query() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// (model, filter query, action, order) tuple executed by a schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleStep {
    pub model_name: String,
    #[serde(default = "empty_query")]
    pub query: serde_json::Value,
    pub action_name: String,
    #[serde(default)]
    pub order: u32,
}

impl ScheduleStep {
    pub fn new(model_name: impl Into<String>, action_name: impl Into<String>, order: u32) -> Self {
        Self {
            model_name: model_name.into(),
            query: empty_query(),
            action_name: action_name.into(),
            order,
        }
    }
}

/// Time-triggered automation unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub mode: ScheduleMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_hours: Option<u32>,
    #[serde(default)]
    pub status: ScheduleStatus,
    #[serde(default)]
    pub steps: Vec<ScheduleStep>,
}

impl Schedule {
    /// One-shot schedule
    pub fn once(name: impl Into<String>, steps: Vec<ScheduleStep>) -> Result<Self, SchemaError> {
        Self::build(name.into(), ScheduleMode::Once, None, steps)
    }

    /// Recurring schedule firing every `interval_hours`
    pub fn recurring(
        name: impl Into<String>,
        interval_hours: u32,
        steps: Vec<ScheduleStep>,
    ) -> Result<Self, SchemaError> {
        Self::build(name.into(), ScheduleMode::Recurring, Some(interval_hours), steps)
    }

    fn build(
        name: String,
        mode: ScheduleMode,
        interval_hours: Option<u32>,
        steps: Vec<ScheduleStep>,
    ) -> Result<Self, SchemaError> {
        let schedule = Self {
            name,
            description: None,
            mode,
            interval_hours,
            status: ScheduleStatus::Active,
            steps,
        };
        SchemaError::check(|violations| validation::validate_schedule(&schedule, violations))?;
        Ok(schedule)
    }
}

/// External-service credential requirement derived from step content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub provider: String,
    pub title: String,
    pub scopes: Vec<String>,
    /// Credential field on the Workspace model
    pub field_name: String,
}
