//! Per-account mapping documents: which CSV column feeds which transaction
//! field, how to parse it, importer settings and classification rules.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{FinnError, Result};
use crate::models::TxType;
use crate::rules::{ClassificationRule, RuleSet};

pub const DEFAULT_DATE_FORMAT: &str = "%m/%d/%Y";

/// Column-name → raw string view of one CSV row.
pub type RowFields = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Str,
    Int,
    Float,
    Bool,
    Date,
}

impl FieldType {
    pub fn parse(s: &str) -> Option<FieldType> {
        match s.trim().to_ascii_lowercase().as_str() {
            "str" | "string" => Some(Self::Str),
            "int" | "integer" => Some(Self::Int),
            "float" => Some(Self::Float),
            "bool" | "boolean" => Some(Self::Bool),
            "date" => Some(Self::Date),
            _ => None,
        }
    }
}

/// Transaction attribute a mapped column is written to. Resolved once when
/// the mapping is loaded so rows never look attributes up by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldTarget {
    Date,
    Amount,
    Currency,
    ForeignAmount,
    Description,
    Consolidated,
    Type,
    Contact,
    Category,
    Project,
    Extra(String),
}

impl FieldTarget {
    pub fn for_name(name: &str) -> FieldTarget {
        match name {
            "date" => Self::Date,
            "amount" | "amt" => Self::Amount,
            "currency" => Self::Currency,
            "foreignamount" | "foreign_amount" | "foreignamt" => Self::ForeignAmount,
            "description" => Self::Description,
            "consolidated" => Self::Consolidated,
            "type" | "txtype" => Self::Type,
            "contact" => Self::Contact,
            "category" => Self::Category,
            "project" => Self::Project,
            other => Self::Extra(other.to_string()),
        }
    }

    /// Type assumed when the mapping entry does not declare one.
    pub fn default_type(&self) -> FieldType {
        match self {
            Self::Date => FieldType::Date,
            Self::Amount | Self::ForeignAmount => FieldType::Float,
            Self::Consolidated => FieldType::Bool,
            _ => FieldType::Str,
        }
    }

    /// Targets read straight from the classified row rather than converted.
    pub fn is_reference_or_type(&self) -> bool {
        matches!(self, Self::Type | Self::Contact | Self::Category | Self::Project)
    }

    pub fn accepts(&self, field_type: FieldType) -> bool {
        match self {
            Self::Date => field_type == FieldType::Date,
            Self::Amount | Self::ForeignAmount => {
                matches!(field_type, FieldType::Float | FieldType::Int)
            }
            Self::Consolidated => field_type == FieldType::Bool,
            Self::Currency
            | Self::Description
            | Self::Type
            | Self::Contact
            | Self::Category
            | Self::Project => field_type == FieldType::Str,
            Self::Extra(_) => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub position: usize,
    /// Lowercased column name; empty means the column is ignored.
    pub name: String,
    pub field_type: FieldType,
    pub options: Map<String, Value>,
    /// `None` for ignored columns.
    pub target: Option<FieldTarget>,
}

impl FieldSpec {
    pub fn ignore(position: usize) -> Self {
        Self {
            position,
            name: String::new(),
            field_type: FieldType::Str,
            options: Map::new(),
            target: None,
        }
    }

    pub fn is_ignored(&self) -> bool {
        self.name.is_empty()
    }

    pub fn date_format(&self) -> &str {
        self.options
            .get("format")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_DATE_FORMAT)
    }

    pub fn negate(&self) -> bool {
        self.options
            .get("negate")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// Settings from the document's `config` block.
#[derive(Debug, Clone)]
pub struct ImporterSettings {
    pub header_line: bool,
    pub delimiter: u8,
    pub currency: Option<String>,
    /// Keys the importer does not recognize, kept as given.
    pub extra: HashMap<String, Value>,
}

impl Default for ImporterSettings {
    fn default() -> Self {
        Self {
            header_line: false,
            delimiter: b',',
            currency: None,
            extra: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MappingConfig {
    pub fields: Vec<FieldSpec>,
    pub settings: ImporterSettings,
    pub rules: RuleSet,
}

impl MappingConfig {
    /// Build the working field map for one record. Ignored columns and
    /// columns beyond the mapping are dropped.
    pub fn map_row<'a, I>(&self, columns: I) -> RowFields
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut fields = RowFields::new();
        for (ix, value) in columns.into_iter().enumerate() {
            let Some(spec) = self.fields.get(ix) else {
                break;
            };
            if spec.is_ignored() {
                continue;
            }
            fields.insert(spec.name.clone(), value.to_string());
        }
        fields
    }

    pub fn mapped_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|spec| !spec.is_ignored())
    }
}

// ---------------------------------------------------------------------------
// Document shapes
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct MappingDocument {
    #[serde(default)]
    mapping: Vec<Option<ColumnEntry>>,
    #[serde(default)]
    config: Map<String, Value>,
    #[serde(default)]
    templates: Vec<RuleDocument>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColumnEntry {
    Name(String),
    Spec(ColumnDocument),
}

#[derive(Deserialize)]
struct ColumnDocument {
    #[serde(default)]
    name: String,
    #[serde(default, rename = "type")]
    field_type: Option<String>,
    #[serde(default, alias = "num")]
    position: Option<usize>,
    #[serde(flatten)]
    options: Map<String, Value>,
}

#[derive(Deserialize)]
struct RuleDocument {
    template: String,
    #[serde(default = "default_match_on", alias = "matchOn")]
    matchon: String,
    #[serde(default, rename = "type")]
    tx_type: Option<String>,
    #[serde(default)]
    contact: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    project: Option<String>,
}

fn default_match_on() -> String {
    "description".to_string()
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

pub fn mapping_path(mappings_dir: &Path, account_name: &str) -> PathBuf {
    mappings_dir.join(format!("{account_name}.json"))
}

pub fn load_mapping(mappings_dir: &Path, account_name: &str) -> Result<MappingConfig> {
    let path = mapping_path(mappings_dir, account_name);
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(FinnError::ConfigNotFound(path));
        }
        Err(e) => return Err(e.into()),
    };
    let config = parse_mapping(&text, &path)?;
    tracing::debug!(
        "loaded mapping {} ({} columns, {} rules)",
        path.display(),
        config.fields.len(),
        config.rules.rules().len()
    );
    Ok(config)
}

pub fn parse_mapping(text: &str, path: &Path) -> Result<MappingConfig> {
    let parse_err = |message: String| FinnError::ConfigParse {
        path: path.to_path_buf(),
        message,
    };
    let doc: MappingDocument = serde_json::from_str(text).map_err(|e| parse_err(e.to_string()))?;

    let mut specs = Vec::with_capacity(doc.mapping.len());
    for (ix, entry) in doc.mapping.into_iter().enumerate() {
        let spec = match entry {
            None => FieldSpec::ignore(ix),
            Some(ColumnEntry::Name(name)) => field_spec(ix, &name, None, Map::new())
                .map_err(|m| parse_err(format!("column {ix}: {m}")))?,
            Some(ColumnEntry::Spec(col)) => {
                let position = col.position.unwrap_or(ix);
                field_spec(position, &col.name, col.field_type.as_deref(), col.options)
                    .map_err(|m| parse_err(format!("column {position}: {m}")))?
            }
        };
        specs.push(spec);
    }
    let fields = index_by_position(specs);

    let unknown: Vec<&str> = fields
        .iter()
        .filter_map(|spec| match &spec.target {
            Some(FieldTarget::Extra(name)) => Some(name.as_str()),
            _ => None,
        })
        .collect();
    if !unknown.is_empty() {
        tracing::warn!(
            "{}: no transaction attribute for {:?}; values go to extra fields",
            path.display(),
            unknown
        );
    }

    let settings = importer_settings(doc.config).map_err(parse_err)?;

    let mut rules = Vec::with_capacity(doc.templates.len());
    for (ix, rule) in doc.templates.into_iter().enumerate() {
        rules.push(compile_rule(rule).map_err(|m| parse_err(format!("template {ix}: {m}")))?);
    }

    Ok(MappingConfig {
        fields,
        settings,
        rules: RuleSet::new(rules),
    })
}

fn field_spec(
    position: usize,
    name: &str,
    declared: Option<&str>,
    options: Map<String, Value>,
) -> std::result::Result<FieldSpec, String> {
    let name = name.trim().to_lowercase();
    if name.is_empty() {
        return Ok(FieldSpec::ignore(position));
    }
    let target = FieldTarget::for_name(&name);
    let field_type = match declared.filter(|t| !t.trim().is_empty()) {
        Some(t) => FieldType::parse(t).ok_or_else(|| format!("unknown type '{t}'"))?,
        None => target.default_type(),
    };
    if !target.accepts(field_type) {
        return Err(format!("'{name}' cannot be read as {field_type:?}"));
    }
    if let Some(format) = options.get("format") {
        if !format.is_string() {
            return Err(format!("'{name}': format must be a string"));
        }
    }
    Ok(FieldSpec {
        position,
        name,
        field_type,
        options,
        target: Some(target),
    })
}

/// Place every spec at its declared position. Gaps become ignore specs so
/// indexing by column number never goes out of range; a later spec claiming
/// an occupied position replaces the earlier one.
fn index_by_position(specs: Vec<FieldSpec>) -> Vec<FieldSpec> {
    let len = specs.iter().map(|s| s.position + 1).max().unwrap_or(0);
    let mut fields: Vec<FieldSpec> = (0..len).map(FieldSpec::ignore).collect();
    for spec in specs {
        let pos = spec.position;
        fields[pos] = spec;
    }
    fields
}

fn importer_settings(config: Map<String, Value>) -> std::result::Result<ImporterSettings, String> {
    let mut settings = ImporterSettings::default();
    for (key, value) in config {
        match key.to_ascii_lowercase().as_str() {
            "headerline" => {
                settings.header_line = value
                    .as_bool()
                    .ok_or_else(|| format!("config.{key} must be true or false"))?;
            }
            "delimiter" => {
                let delim = value.as_str().unwrap_or_default();
                if delim.len() != 1 {
                    return Err(format!("config.{key} must be a single character"));
                }
                settings.delimiter = delim.as_bytes()[0];
            }
            "currency" => {
                let ccy = value
                    .as_str()
                    .ok_or_else(|| format!("config.{key} must be a string"))?;
                settings.currency = Some(ccy.trim().to_uppercase());
            }
            _ => {
                tracing::debug!("config.{key} kept as extra importer setting");
                settings.extra.insert(key, value);
            }
        }
    }
    Ok(settings)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn compile_rule(doc: RuleDocument) -> std::result::Result<ClassificationRule, String> {
    let pattern = regex::Regex::new(&doc.template)
        .map_err(|e| format!("invalid regex '{}': {e}", doc.template))?;
    let tx_type = non_empty(doc.tx_type);
    if let Some(t) = &tx_type {
        if TxType::parse(t).is_none() {
            return Err(format!("unknown transaction type '{t}'"));
        }
    }
    Ok(ClassificationRule {
        pattern,
        match_field: doc.matchon.to_lowercase(),
        tx_type,
        contact: non_empty(doc.contact),
        category: non_empty(doc.category),
        project: non_empty(doc.project),
    })
}
