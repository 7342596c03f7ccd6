//! Compiled JSON-Schema (draft-07 subset) validator
//!
//! `compile` turns a schema document into a tree of [`Node`]s once; the tree
//! is then applied to any number of instances. Keywords outside the
//! supported vocabulary (including the application keywords `_default`,
//! `_transform`, `_unique`, `_order`, `_html`) are ignored rather than
//! rejected. `format` is not enforced. `$ref` is accepted but not resolved:
//! entity schemas reference each other only in the combined external
//! document, so a referencing property is unconstrained here.

use regex::Regex;
use serde_json::{json, Map, Value};

use crate::errors::ValidationIssue;
use crate::query::values::{json_eq, type_name};

/// Schema compilation failure; `path` points into the schema document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub path: String,
    pub reason: String,
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JsonType {
    Null,
    Boolean,
    Object,
    Array,
    Number,
    Integer,
    String,
}

impl JsonType {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "null" => JsonType::Null,
            "boolean" => JsonType::Boolean,
            "object" => JsonType::Object,
            "array" => JsonType::Array,
            "number" => JsonType::Number,
            "integer" => JsonType::Integer,
            "string" => JsonType::String,
            _ => return None,
        })
    }

    fn name(&self) -> &'static str {
        match self {
            JsonType::Null => "null",
            JsonType::Boolean => "boolean",
            JsonType::Object => "object",
            JsonType::Array => "array",
            JsonType::Number => "number",
            JsonType::Integer => "integer",
            JsonType::String => "string",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (JsonType::Null, Value::Null) => true,
            (JsonType::Boolean, Value::Bool(_)) => true,
            (JsonType::Object, Value::Object(_)) => true,
            (JsonType::Array, Value::Array(_)) => true,
            (JsonType::Number, Value::Number(_)) => true,
            (JsonType::Integer, Value::Number(n)) => {
                n.is_i64() || n.is_u64() || n.as_f64().map(|f| f.fract() == 0.0).unwrap_or(false)
            }
            (JsonType::String, Value::String(_)) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
enum Items {
    Each(Box<Node>),
    Tuple(Vec<Node>),
}

#[derive(Debug, Clone)]
enum Additional {
    Allowed,
    Denied,
    Schema(Box<Node>),
}

/// One compiled schema (sub)document
#[derive(Debug, Clone)]
struct Node {
    /// `Some(false)` for the literal `false` schema
    always: Option<bool>,
    types: Option<Vec<JsonType>>,
    enum_values: Option<Vec<Value>>,
    const_value: Option<Value>,
    properties: Vec<(String, Node)>,
    required: Vec<String>,
    additional: Additional,
    min_properties: Option<usize>,
    max_properties: Option<usize>,
    items: Option<Items>,
    min_items: Option<usize>,
    max_items: Option<usize>,
    unique_items: bool,
    min_length: Option<usize>,
    max_length: Option<usize>,
    pattern: Option<Regex>,
    minimum: Option<f64>,
    maximum: Option<f64>,
    exclusive_minimum: Option<f64>,
    exclusive_maximum: Option<f64>,
    multiple_of: Option<f64>,
    all_of: Vec<Node>,
    any_of: Vec<Node>,
    one_of: Vec<Node>,
    not: Option<Box<Node>>,
}

impl Node {
    fn literal(always: bool) -> Self {
        Node {
            always: Some(always),
            types: None,
            enum_values: None,
            const_value: None,
            properties: Vec::new(),
            required: Vec::new(),
            additional: Additional::Allowed,
            min_properties: None,
            max_properties: None,
            items: None,
            min_items: None,
            max_items: None,
            unique_items: false,
            min_length: None,
            max_length: None,
            pattern: None,
            minimum: None,
            maximum: None,
            exclusive_minimum: None,
            exclusive_maximum: None,
            multiple_of: None,
            all_of: Vec::new(),
            any_of: Vec::new(),
            one_of: Vec::new(),
            not: None,
        }
    }
}

/// A compiled, reusable validator
#[derive(Debug, Clone)]
pub struct Validator {
    root: Node,
}

impl Validator {
    /// Validate an instance, returning every violated rule (empty when valid)
    pub fn validate(&self, instance: &Value) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        check(&self.root, instance, "", "#", &mut issues);
        issues
    }

    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validate(instance).is_empty()
    }
}

/// Compile a schema document into a [`Validator`]
///
/// # Errors
///
/// Returns a [`CompileError`] when a supported keyword has a malformed value
/// (e.g. `properties` that is not an object, an unknown `type` name, an
/// invalid `pattern`).
pub fn compile(schema: &Value) -> Result<Validator, CompileError> {
    Ok(Validator {
        root: compile_node(schema, "#")?,
    })
}

fn err(path: &str, keyword: &str, reason: impl Into<String>) -> CompileError {
    CompileError {
        path: format!("{}/{}", path, keyword),
        reason: reason.into(),
    }
}

fn non_negative_int(v: &Value, path: &str, keyword: &str) -> Result<usize, CompileError> {
    v.as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| err(path, keyword, "must be a non-negative integer"))
}

fn number(v: &Value, path: &str, keyword: &str) -> Result<f64, CompileError> {
    v.as_f64()
        .ok_or_else(|| err(path, keyword, "must be a number"))
}

fn schema_list(v: &Value, path: &str, keyword: &str) -> Result<Vec<Node>, CompileError> {
    let list = v
        .as_array()
        .filter(|a| !a.is_empty())
        .ok_or_else(|| err(path, keyword, "must be a non-empty array of schemas"))?;
    list.iter()
        .enumerate()
        .map(|(i, s)| compile_node(s, &format!("{}/{}/{}", path, keyword, i)))
        .collect()
}

fn compile_node(schema: &Value, path: &str) -> Result<Node, CompileError> {
    let obj: &Map<String, Value> = match schema {
        Value::Bool(b) => return Ok(Node::literal(*b)),
        Value::Object(obj) => obj,
        other => {
            return Err(CompileError {
                path: path.to_string(),
                reason: format!("schema must be an object or boolean, got {}", type_name(other)),
            })
        }
    };

    let mut node = Node::literal(true);
    node.always = None;

    if let Some(t) = obj.get("type") {
        let names: Vec<&Value> = match t {
            Value::Array(list) => list.iter().collect(),
            single => vec![single],
        };
        let mut types = Vec::with_capacity(names.len());
        for name in names {
            let parsed = name
                .as_str()
                .and_then(JsonType::parse)
                .ok_or_else(|| err(path, "type", format!("unknown type {}", name)))?;
            types.push(parsed);
        }
        node.types = Some(types);
    }

    if let Some(e) = obj.get("enum") {
        let values = e
            .as_array()
            .ok_or_else(|| err(path, "enum", "must be an array"))?;
        node.enum_values = Some(values.clone());
    }
    node.const_value = obj.get("const").cloned();

    if let Some(props) = obj.get("properties") {
        let props = props
            .as_object()
            .ok_or_else(|| err(path, "properties", "must be an object"))?;
        for (name, sub) in props {
            let sub_path = format!("{}/properties/{}", path, escape_pointer(name));
            node.properties.push((name.clone(), compile_node(sub, &sub_path)?));
        }
    }

    if let Some(req) = obj.get("required") {
        let list = req
            .as_array()
            .ok_or_else(|| err(path, "required", "must be an array"))?;
        for item in list {
            let name = item
                .as_str()
                .ok_or_else(|| err(path, "required", "items must be strings"))?;
            node.required.push(name.to_string());
        }
    }

    node.additional = match obj.get("additionalProperties") {
        None | Some(Value::Bool(true)) => Additional::Allowed,
        Some(Value::Bool(false)) => Additional::Denied,
        Some(s) => Additional::Schema(Box::new(compile_node(
            s,
            &format!("{}/additionalProperties", path),
        )?)),
    };

    if let Some(v) = obj.get("minProperties") {
        node.min_properties = Some(non_negative_int(v, path, "minProperties")?);
    }
    if let Some(v) = obj.get("maxProperties") {
        node.max_properties = Some(non_negative_int(v, path, "maxProperties")?);
    }

    node.items = match obj.get("items") {
        None => None,
        Some(Value::Array(list)) => Some(Items::Tuple(
            list.iter()
                .enumerate()
                .map(|(i, s)| compile_node(s, &format!("{}/items/{}", path, i)))
                .collect::<Result<_, _>>()?,
        )),
        Some(s) => Some(Items::Each(Box::new(compile_node(
            s,
            &format!("{}/items", path),
        )?))),
    };
    if let Some(v) = obj.get("minItems") {
        node.min_items = Some(non_negative_int(v, path, "minItems")?);
    }
    if let Some(v) = obj.get("maxItems") {
        node.max_items = Some(non_negative_int(v, path, "maxItems")?);
    }
    if let Some(v) = obj.get("uniqueItems") {
        node.unique_items = v
            .as_bool()
            .ok_or_else(|| err(path, "uniqueItems", "must be a boolean"))?;
    }

    if let Some(v) = obj.get("minLength") {
        node.min_length = Some(non_negative_int(v, path, "minLength")?);
    }
    if let Some(v) = obj.get("maxLength") {
        node.max_length = Some(non_negative_int(v, path, "maxLength")?);
    }
    if let Some(v) = obj.get("pattern") {
        let source = v
            .as_str()
            .ok_or_else(|| err(path, "pattern", "must be a string"))?;
        let re = Regex::new(source).map_err(|e| err(path, "pattern", e.to_string()))?;
        node.pattern = Some(re);
    }

    if let Some(v) = obj.get("minimum") {
        node.minimum = Some(number(v, path, "minimum")?);
    }
    if let Some(v) = obj.get("maximum") {
        node.maximum = Some(number(v, path, "maximum")?);
    }
    if let Some(v) = obj.get("exclusiveMinimum") {
        node.exclusive_minimum = Some(number(v, path, "exclusiveMinimum")?);
    }
    if let Some(v) = obj.get("exclusiveMaximum") {
        node.exclusive_maximum = Some(number(v, path, "exclusiveMaximum")?);
    }
    if let Some(v) = obj.get("multipleOf") {
        let m = number(v, path, "multipleOf")?;
        if m <= 0.0 {
            return Err(err(path, "multipleOf", "must be greater than 0"));
        }
        node.multiple_of = Some(m);
    }

    if let Some(v) = obj.get("allOf") {
        node.all_of = schema_list(v, path, "allOf")?;
    }
    if let Some(v) = obj.get("anyOf") {
        node.any_of = schema_list(v, path, "anyOf")?;
    }
    if let Some(v) = obj.get("oneOf") {
        node.one_of = schema_list(v, path, "oneOf")?;
    }
    if let Some(v) = obj.get("not") {
        node.not = Some(Box::new(compile_node(v, &format!("{}/not", path))?));
    }

    if let Some(r) = obj.get("$ref") {
        if !r.is_string() {
            return Err(err(path, "$ref", "must be a string"));
        }
    }

    Ok(node)
}

fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn issue(
    issues: &mut Vec<ValidationIssue>,
    instance_path: &str,
    schema_path: &str,
    keyword: &str,
    message: String,
    params: Value,
) {
    issues.push(ValidationIssue {
        instance_path: instance_path.to_string(),
        schema_path: format!("{}/{}", schema_path, keyword),
        keyword: keyword.to_string(),
        message,
        params,
    });
}

fn check(node: &Node, value: &Value, ipath: &str, spath: &str, issues: &mut Vec<ValidationIssue>) {
    if let Some(always) = node.always {
        if !always {
            issues.push(ValidationIssue {
                instance_path: ipath.to_string(),
                schema_path: spath.to_string(),
                keyword: "false schema".to_string(),
                message: "boolean schema is false".to_string(),
                params: json!({}),
            });
        }
        return;
    }

    if let Some(types) = &node.types {
        if !types.iter().any(|t| t.matches(value)) {
            let names: Vec<&str> = types.iter().map(|t| t.name()).collect();
            let joined = names.join(",");
            issue(
                issues,
                ipath,
                spath,
                "type",
                format!("must be {}", joined),
                json!({ "type": joined }),
            );
            // Type mismatch makes the remaining keywords meaningless
            return;
        }
    }

    if let Some(allowed) = &node.enum_values {
        if !allowed.iter().any(|a| json_eq(a, value)) {
            issue(
                issues,
                ipath,
                spath,
                "enum",
                "must be equal to one of the allowed values".to_string(),
                json!({ "allowedValues": allowed }),
            );
        }
    }
    if let Some(c) = &node.const_value {
        if !json_eq(c, value) {
            issue(
                issues,
                ipath,
                spath,
                "const",
                "must be equal to constant".to_string(),
                json!({ "allowedValue": c }),
            );
        }
    }

    match value {
        Value::Object(obj) => check_object(node, obj, ipath, spath, issues),
        Value::Array(list) => check_array(node, list, ipath, spath, issues),
        Value::String(s) => check_string(node, s, ipath, spath, issues),
        Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                check_number(node, f, ipath, spath, issues)
            }
        }
        _ => {}
    }

    for (i, sub) in node.all_of.iter().enumerate() {
        check(sub, value, ipath, &format!("{}/allOf/{}", spath, i), issues);
    }
    if !node.any_of.is_empty() {
        let ok = node.any_of.iter().any(|sub| {
            let mut scratch = Vec::new();
            check(sub, value, ipath, spath, &mut scratch);
            scratch.is_empty()
        });
        if !ok {
            issue(
                issues,
                ipath,
                spath,
                "anyOf",
                "must match a schema in anyOf".to_string(),
                json!({}),
            );
        }
    }
    if !node.one_of.is_empty() {
        let passing = node
            .one_of
            .iter()
            .filter(|sub| {
                let mut scratch = Vec::new();
                check(sub, value, ipath, spath, &mut scratch);
                scratch.is_empty()
            })
            .count();
        if passing != 1 {
            issue(
                issues,
                ipath,
                spath,
                "oneOf",
                "must match exactly one schema in oneOf".to_string(),
                json!({ "passingSchemas": passing }),
            );
        }
    }
    if let Some(not) = &node.not {
        let mut scratch = Vec::new();
        check(not, value, ipath, spath, &mut scratch);
        if scratch.is_empty() {
            issue(
                issues,
                ipath,
                spath,
                "not",
                "must NOT be valid".to_string(),
                json!({}),
            );
        }
    }
}

fn check_object(
    node: &Node,
    obj: &Map<String, Value>,
    ipath: &str,
    spath: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    for name in &node.required {
        if !obj.contains_key(name) {
            issue(
                issues,
                ipath,
                spath,
                "required",
                format!("must have required property '{}'", name),
                json!({ "missingProperty": name }),
            );
        }
    }

    for (name, sub) in &node.properties {
        if let Some(v) = obj.get(name) {
            let escaped = escape_pointer(name);
            check(
                sub,
                v,
                &format!("{}/{}", ipath, escaped),
                &format!("{}/properties/{}", spath, escaped),
                issues,
            );
        }
    }

    let is_declared = |k: &str| node.properties.iter().any(|(name, _)| name == k);
    match &node.additional {
        Additional::Allowed => {}
        Additional::Denied => {
            for k in obj.keys().filter(|k| !is_declared(k)) {
                issue(
                    issues,
                    ipath,
                    spath,
                    "additionalProperties",
                    "must NOT have additional properties".to_string(),
                    json!({ "additionalProperty": k }),
                );
            }
        }
        Additional::Schema(sub) => {
            for (k, v) in obj.iter().filter(|(k, _)| !is_declared(k)) {
                check(
                    sub,
                    v,
                    &format!("{}/{}", ipath, escape_pointer(k)),
                    &format!("{}/additionalProperties", spath),
                    issues,
                );
            }
        }
    }

    if let Some(min) = node.min_properties {
        if obj.len() < min {
            issue(
                issues,
                ipath,
                spath,
                "minProperties",
                format!("must NOT have fewer than {} properties", min),
                json!({ "limit": min }),
            );
        }
    }
    if let Some(max) = node.max_properties {
        if obj.len() > max {
            issue(
                issues,
                ipath,
                spath,
                "maxProperties",
                format!("must NOT have more than {} properties", max),
                json!({ "limit": max }),
            );
        }
    }
}

fn check_array(
    node: &Node,
    list: &[Value],
    ipath: &str,
    spath: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    match &node.items {
        Some(Items::Each(sub)) => {
            for (i, v) in list.iter().enumerate() {
                check(
                    sub,
                    v,
                    &format!("{}/{}", ipath, i),
                    &format!("{}/items", spath),
                    issues,
                );
            }
        }
        Some(Items::Tuple(subs)) => {
            for (i, (sub, v)) in subs.iter().zip(list.iter()).enumerate() {
                check(
                    sub,
                    v,
                    &format!("{}/{}", ipath, i),
                    &format!("{}/items/{}", spath, i),
                    issues,
                );
            }
        }
        None => {}
    }

    if let Some(min) = node.min_items {
        if list.len() < min {
            issue(
                issues,
                ipath,
                spath,
                "minItems",
                format!("must NOT have fewer than {} items", min),
                json!({ "limit": min }),
            );
        }
    }
    if let Some(max) = node.max_items {
        if list.len() > max {
            issue(
                issues,
                ipath,
                spath,
                "maxItems",
                format!("must NOT have more than {} items", max),
                json!({ "limit": max }),
            );
        }
    }
    if node.unique_items {
        for i in 0..list.len() {
            if let Some(j) = (i + 1..list.len()).find(|&j| json_eq(&list[i], &list[j])) {
                issue(
                    issues,
                    ipath,
                    spath,
                    "uniqueItems",
                    format!(
                        "must NOT have duplicate items (items ## {} and {} are identical)",
                        j, i
                    ),
                    json!({ "i": j, "j": i }),
                );
                break;
            }
        }
    }
}

fn check_string(node: &Node, s: &str, ipath: &str, spath: &str, issues: &mut Vec<ValidationIssue>) {
    let len = s.chars().count();
    if let Some(min) = node.min_length {
        if len < min {
            issue(
                issues,
                ipath,
                spath,
                "minLength",
                format!("must NOT have fewer than {} characters", min),
                json!({ "limit": min }),
            );
        }
    }
    if let Some(max) = node.max_length {
        if len > max {
            issue(
                issues,
                ipath,
                spath,
                "maxLength",
                format!("must NOT have more than {} characters", max),
                json!({ "limit": max }),
            );
        }
    }
    if let Some(re) = &node.pattern {
        if !re.is_match(s) {
            issue(
                issues,
                ipath,
                spath,
                "pattern",
                format!("must match pattern \"{}\"", re.as_str()),
                json!({ "pattern": re.as_str() }),
            );
        }
    }
}

fn check_number(node: &Node, n: f64, ipath: &str, spath: &str, issues: &mut Vec<ValidationIssue>) {
    let mut limit = |keyword: &str, ok: bool, op: &str, bound: f64| {
        if !ok {
            issue(
                issues,
                ipath,
                spath,
                keyword,
                format!("must be {} {}", op, bound),
                json!({ "comparison": op, "limit": bound }),
            );
        }
    };
    if let Some(b) = node.minimum {
        limit("minimum", n >= b, ">=", b);
    }
    if let Some(b) = node.maximum {
        limit("maximum", n <= b, "<=", b);
    }
    if let Some(b) = node.exclusive_minimum {
        limit("exclusiveMinimum", n > b, ">", b);
    }
    if let Some(b) = node.exclusive_maximum {
        limit("exclusiveMaximum", n < b, "<", b);
    }
    if let Some(m) = node.multiple_of {
        let q = n / m;
        if (q - q.round()).abs() > 1e-9 {
            issue(
                issues,
                ipath,
                spath,
                "multipleOf",
                format!("must be multiple of {}", m),
                json!({ "multipleOf": m }),
            );
        }
    }
}
