//! Tool descriptors and parameter schemas.

use serde_json::{Map, Value, json};

/// The kinds a tool parameter may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
    StringArray,
    /// A JSON object with arbitrary string keys.
    Object,
}

impl ParamKind {
    fn json_type(&self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
            ParamKind::StringArray => "array",
            ParamKind::Object => "object",
        }
    }
}

/// A validated argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    StringArray(Vec<String>),
    Object(Map<String, Value>),
}

impl ArgValue {
    pub fn to_json(&self) -> Value {
        match self {
            ArgValue::String(s) => json!(s),
            ArgValue::Integer(i) => json!(i),
            ArgValue::Number(n) => json!(n),
            ArgValue::Boolean(b) => json!(b),
            ArgValue::StringArray(items) => json!(items),
            ArgValue::Object(map) => Value::Object(map.clone()),
        }
    }
}

/// What to do with a numeric argument outside its declared range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsPolicy {
    /// Silently move the value to the nearest bound.
    Clamp,
    /// Fail the call with `InvalidParameter`.
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub policy: BoundsPolicy,
}

/// One declared parameter of a tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub description: &'static str,
    pub required: bool,
    pub default: Option<ArgValue>,
    pub allowed: Option<&'static [&'static str]>,
    pub bounds: Option<Bounds>,
    /// Refuse values starting with `-`, for values that end up as
    /// positional command-line arguments.
    pub positional: bool,
}

impl ParamSpec {
    fn new(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            description: "",
            required: false,
            default: None,
            allowed: None,
            bounds: None,
            positional: false,
        }
    }

    pub fn string(name: &'static str) -> Self {
        Self::new(name, ParamKind::String)
    }

    pub fn integer(name: &'static str) -> Self {
        Self::new(name, ParamKind::Integer)
    }

    pub fn number(name: &'static str) -> Self {
        Self::new(name, ParamKind::Number)
    }

    pub fn boolean(name: &'static str) -> Self {
        Self::new(name, ParamKind::Boolean)
    }

    pub fn string_array(name: &'static str) -> Self {
        Self::new(name, ParamKind::StringArray)
    }

    pub fn object(name: &'static str) -> Self {
        Self::new(name, ParamKind::Object)
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: ArgValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn default_str(self, value: &str) -> Self {
        self.default_value(ArgValue::String(value.to_string()))
    }

    pub fn default_int(self, value: i64) -> Self {
        self.default_value(ArgValue::Integer(value))
    }

    pub fn default_num(self, value: f64) -> Self {
        self.default_value(ArgValue::Number(value))
    }

    pub fn default_bool(self, value: bool) -> Self {
        self.default_value(ArgValue::Boolean(value))
    }

    pub fn one_of(mut self, allowed: &'static [&'static str]) -> Self {
        self.allowed = Some(allowed);
        self
    }

    pub fn clamp(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.bounds = Some(Bounds {
            min,
            max,
            policy: BoundsPolicy::Clamp,
        });
        self
    }

    pub fn reject_outside(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.bounds = Some(Bounds {
            min,
            max,
            policy: BoundsPolicy::Reject,
        });
        self
    }

    pub fn positional(mut self) -> Self {
        self.positional = true;
        self
    }

    fn json_schema(&self) -> Value {
        let mut schema = Map::new();
        schema.insert("type".into(), json!(self.kind.json_type()));
        if self.kind == ParamKind::StringArray {
            schema.insert("items".into(), json!({ "type": "string" }));
        }
        if !self.description.is_empty() {
            schema.insert("description".into(), json!(self.description));
        }
        if let Some(allowed) = self.allowed {
            schema.insert("enum".into(), json!(allowed));
        }
        if let Some(default) = &self.default {
            schema.insert("default".into(), default.to_json());
        }
        if let Some(bounds) = &self.bounds {
            if let Some(min) = bounds.min {
                schema.insert("minimum".into(), number_json(self.kind, min));
            }
            if let Some(max) = bounds.max {
                schema.insert("maximum".into(), number_json(self.kind, max));
            }
        }
        Value::Object(schema)
    }
}

fn number_json(kind: ParamKind, value: f64) -> Value {
    if kind == ParamKind::Integer {
        json!(value as i64)
    } else {
        json!(value)
    }
}

/// A named tool and its ordered parameter schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub params: Vec<ParamSpec>,
}

impl ToolDescriptor {
    pub fn new(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            params: Vec::new(),
        }
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    pub fn get_param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// JSON Schema (`type: object`) for the tool input.
    pub fn input_schema(&self) -> Map<String, Value> {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| (p.name.to_string(), p.json_schema()))
            .collect();
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();

        let mut schema = Map::new();
        schema.insert("type".into(), json!("object"));
        schema.insert("properties".into(), Value::Object(properties));
        schema.insert("required".into(), json!(required));
        schema
    }

    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": Value::Object(self.input_schema()),
        })
    }
}
