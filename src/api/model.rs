//! Purpose: Load the table model (schemas, columns, data directories) from JSON.
//! Exports: `Model`.
//! Role: Turns a model file into shared `TableDescriptor`s before any data is read.
//! Invariants: Unknown type names fail at load time, naming table and column.
//! Invariants: Relative data directories resolve against one base directory.
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::core::error::{Error, ErrorKind};
use crate::core::schema::{ColumnDescriptor, DEFAULT_TIME_SCALE, TableDescriptor, TypeTag};

const MAX_TIME_SCALE: u8 = 7;
const MAX_DECIMAL_SCALE: u8 = 38;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModelFile {
    tables: Vec<TableEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TableEntry {
    schema: String,
    name: String,
    #[serde(default)]
    data_dir: Option<PathBuf>,
    columns: Vec<ColumnEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ColumnEntry {
    name: String,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default = "default_nullable")]
    nullable: bool,
    #[serde(default)]
    length: Option<i32>,
    #[serde(default)]
    scale: Option<u8>,
    #[serde(default)]
    precision: Option<u8>,
}

/// Arguments carried in the type string, e.g. `decimal(10,2)` or `nvarchar(max)`.
#[derive(Debug, Default, PartialEq, Eq)]
struct TypeArgs {
    length: Option<i32>,
    precision: Option<u8>,
    scale: Option<u8>,
}

fn default_nullable() -> bool {
    true
}

#[derive(Clone, Debug)]
pub struct Model {
    tables: Vec<Arc<TableDescriptor>>,
}

impl Model {
    /// Reads a model file. Relative data directories resolve against
    /// `base`, or the directory holding the model file.
    pub fn load(path: impl AsRef<Path>, base: Option<&Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            let kind = match err.kind() {
                std::io::ErrorKind::NotFound => ErrorKind::NotFound,
                _ => ErrorKind::Io,
            };
            Error::new(kind)
                .with_message("failed to read model file")
                .with_path(path)
                .with_source(err)
        })?;
        let base = match base {
            Some(base) => base.to_path_buf(),
            None => path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        };
        Self::from_json(&text, &base).map_err(|err| err.with_path(path))
    }

    pub fn from_json(text: &str, base: &Path) -> Result<Self, Error> {
        let file: ModelFile = serde_json::from_str(text).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message("invalid model json")
                .with_hint("Expected {\"tables\": [{\"schema\", \"name\", \"columns\": [...]}]}.")
                .with_source(err)
        })?;

        let mut seen = HashSet::new();
        let mut tables = Vec::with_capacity(file.tables.len());
        for entry in file.tables {
            let table = build_table(entry, base)?;
            let qualified = table.qualified_name();
            if !seen.insert(qualified.clone()) {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("table listed twice in model")
                    .with_table(qualified));
            }
            tables.push(Arc::new(table));
        }
        Ok(Self { tables })
    }

    pub fn tables(&self) -> &[Arc<TableDescriptor>] {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Looks a table up by `schema.name`, or by bare name when only one
    /// schema holds it.
    pub fn table(&self, name: &str) -> Result<Arc<TableDescriptor>, Error> {
        if let Some(table) = self
            .tables
            .iter()
            .find(|table| table.qualified_name() == name)
        {
            return Ok(Arc::clone(table));
        }

        let matches: Vec<_> = self
            .tables
            .iter()
            .filter(|table| table.name == name)
            .collect();
        match matches.as_slice() {
            [table] => Ok(Arc::clone(table)),
            [] => Err(Error::new(ErrorKind::NotFound)
                .with_message("table not in model")
                .with_table(name)
                .with_hint("Run `bcp2pg tables --model <FILE>` to list tables.")),
            _ => Err(Error::new(ErrorKind::Usage)
                .with_message("table name is ambiguous")
                .with_table(name)
                .with_hint("Qualify the table as schema.name.")),
        }
    }
}

fn build_table(entry: TableEntry, base: &Path) -> Result<TableDescriptor, Error> {
    let qualified = format!("{}.{}", entry.schema, entry.name);
    let data_dir = entry
        .data_dir
        .unwrap_or_else(|| PathBuf::from("Data").join(&qualified));
    let data_dir = if data_dir.is_absolute() {
        data_dir
    } else {
        base.join(data_dir)
    };

    let mut table = TableDescriptor::new(entry.schema, entry.name).with_data_dir(data_dir);
    for column in entry.columns {
        let descriptor = build_column(column).map_err(|err| err.with_table(qualified.clone()))?;
        table = table.with_column(descriptor);
    }
    Ok(table)
}

fn build_column(entry: ColumnEntry) -> Result<ColumnDescriptor, Error> {
    let type_tag: TypeTag = entry
        .type_name
        .parse()
        .map_err(|err: Error| err.with_column(entry.name.clone()))?;
    let args = type_args(&entry.type_name, type_tag)
        .map_err(|err| err.with_column(entry.name.clone()))?;

    let length = merge_arg("length", entry.length, args.length)
        .map_err(|err| err.with_column(entry.name.clone()))?;
    let precision = merge_arg("precision", entry.precision, args.precision)
        .map_err(|err| err.with_column(entry.name.clone()))?;
    let scale = merge_arg("scale", entry.scale, args.scale)
        .map_err(|err| err.with_column(entry.name.clone()))?;

    let scale = match scale {
        Some(scale) => scale,
        None if type_tag.has_time_scale() => DEFAULT_TIME_SCALE,
        None => 0,
    };
    let max_scale = if type_tag.has_time_scale() {
        MAX_TIME_SCALE
    } else {
        MAX_DECIMAL_SCALE
    };
    if scale > max_scale {
        return Err(Error::new(ErrorKind::MalformedColumn)
            .with_message(format!("scale {scale} exceeds {max_scale} for {type_tag}"))
            .with_column(entry.name));
    }

    Ok(ColumnDescriptor::new(entry.name, type_tag)
        .nullable(entry.nullable)
        .with_length(length.unwrap_or(0))
        .with_scale(scale)
        .with_precision(precision.unwrap_or(0))
        .with_type_name(entry.type_name))
}

/// An explicit field wins when the type string is silent; both present must agree.
fn merge_arg<T: PartialEq + std::fmt::Display>(
    field: &str,
    explicit: Option<T>,
    from_type: Option<T>,
) -> Result<Option<T>, Error> {
    match (explicit, from_type) {
        (Some(explicit), Some(from_type)) if explicit != from_type => {
            Err(Error::new(ErrorKind::MalformedColumn).with_message(format!(
                "{field} {explicit} disagrees with type argument {from_type}"
            )))
        }
        (Some(value), _) | (None, Some(value)) => Ok(Some(value)),
        (None, None) => Ok(None),
    }
}

fn type_args(type_name: &str, type_tag: TypeTag) -> Result<TypeArgs, Error> {
    let Some(open) = type_name.find('(') else {
        return Ok(TypeArgs::default());
    };
    let bad = || {
        Error::new(ErrorKind::MalformedColumn)
            .with_message(format!("invalid type arguments in {type_name:?}"))
    };
    let inner = type_name[open + 1..]
        .trim_end()
        .strip_suffix(')')
        .ok_or_else(bad)?;
    let args: Vec<&str> = inner.split(',').map(str::trim).collect();
    let number = |text: &str| text.parse::<u8>().map_err(|_| bad());

    let parsed = match (type_tag, args.as_slice()) {
        (TypeTag::Time | TypeTag::Datetime2, [scale]) => TypeArgs {
            scale: Some(number(*scale)?),
            ..TypeArgs::default()
        },
        (TypeTag::Decimal | TypeTag::Numeric, [precision]) => TypeArgs {
            precision: Some(number(*precision)?),
            ..TypeArgs::default()
        },
        (TypeTag::Decimal | TypeTag::Numeric, [precision, scale]) => TypeArgs {
            precision: Some(number(*precision)?),
            scale: Some(number(*scale)?),
            ..TypeArgs::default()
        },
        (
            TypeTag::Char
            | TypeTag::Varchar
            | TypeTag::NChar
            | TypeTag::NVarchar
            | TypeTag::Binary
            | TypeTag::Varbinary,
            [length],
        ) => {
            let length = if length.eq_ignore_ascii_case("max") {
                -1
            } else {
                length.parse::<i32>().map_err(|_| bad())?
            };
            TypeArgs {
                length: Some(length),
                ..TypeArgs::default()
            }
        }
        (
            TypeTag::Time
            | TypeTag::Datetime2
            | TypeTag::Decimal
            | TypeTag::Numeric
            | TypeTag::Char
            | TypeTag::Varchar
            | TypeTag::NChar
            | TypeTag::NVarchar
            | TypeTag::Binary
            | TypeTag::Varbinary,
            _,
        ) => return Err(bad()),
        _ => TypeArgs::default(),
    };
    Ok(parsed)
}
