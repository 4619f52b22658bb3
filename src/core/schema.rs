// Column and table descriptors plus the closed set of SQL type tags.
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::core::error::{Error, ErrorKind};

/// Default fractional-second scale for `time` and `datetime2` columns.
pub const DEFAULT_TIME_SCALE: u8 = 7;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum TypeTag {
    BigInt,
    Binary,
    Bit,
    Char,
    Date,
    Datetime,
    Datetime2,
    Decimal,
    Float,
    Geography,
    Geometry,
    HierarchyId,
    Image,
    Int,
    Money,
    NChar,
    NText,
    Numeric,
    NVarchar,
    Real,
    RowVersion,
    SmallDatetime,
    SmallInt,
    SmallMoney,
    SqlVariant,
    Text,
    Time,
    TinyInt,
    UniqueIdentifier,
    Varbinary,
    Varchar,
    Xml,
}

const TYPE_NAMES: &[(&str, TypeTag)] = &[
    ("bigint", TypeTag::BigInt),
    ("binary", TypeTag::Binary),
    ("bit", TypeTag::Bit),
    ("char", TypeTag::Char),
    ("date", TypeTag::Date),
    ("datetime", TypeTag::Datetime),
    ("datetime2", TypeTag::Datetime2),
    ("decimal", TypeTag::Decimal),
    ("float", TypeTag::Float),
    ("geography", TypeTag::Geography),
    ("geometry", TypeTag::Geometry),
    ("hierarchyid", TypeTag::HierarchyId),
    ("image", TypeTag::Image),
    ("int", TypeTag::Int),
    ("money", TypeTag::Money),
    ("nchar", TypeTag::NChar),
    ("ntext", TypeTag::NText),
    ("numeric", TypeTag::Numeric),
    ("nvarchar", TypeTag::NVarchar),
    ("real", TypeTag::Real),
    ("rowversion", TypeTag::RowVersion),
    ("smalldatetime", TypeTag::SmallDatetime),
    ("smallint", TypeTag::SmallInt),
    ("smallmoney", TypeTag::SmallMoney),
    ("sql_variant", TypeTag::SqlVariant),
    ("text", TypeTag::Text),
    ("time", TypeTag::Time),
    ("timestamp", TypeTag::RowVersion),
    ("tinyint", TypeTag::TinyInt),
    ("uniqueidentifier", TypeTag::UniqueIdentifier),
    ("varbinary", TypeTag::Varbinary),
    ("varchar", TypeTag::Varchar),
    ("xml", TypeTag::Xml),
];

impl TypeTag {
    /// Parses a SQL type name such as `nvarchar`, `[decimal]`, or `decimal(10,2)`.
    pub fn parse(name: &str) -> Option<Self> {
        let base = match name.find('(') {
            Some(idx) => &name[..idx],
            None => name,
        };
        let base = base.trim().trim_start_matches('[').trim_end_matches(']');
        let base = base.strip_prefix("sys.").unwrap_or(base);
        TYPE_NAMES
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(base))
            .map(|(_, tag)| *tag)
    }

    pub fn as_str(self) -> &'static str {
        TYPE_NAMES
            .iter()
            .find(|(_, tag)| *tag == self)
            .map(|(name, _)| *name)
            .unwrap_or("unknown")
    }

    /// True for types whose scale is a fractional-seconds precision.
    pub fn has_time_scale(self) -> bool {
        matches!(self, TypeTag::Time | TypeTag::Datetime2)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TypeTag::parse(s).ok_or_else(|| {
            Error::new(ErrorKind::MalformedColumn).with_message(format!("unknown type {s:?}"))
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub type_tag: TypeTag,
    /// Declared length; `-1` for `max`.
    pub length: i32,
    pub scale: u8,
    pub precision: u8,
    pub nullable: bool,
    pub type_name: String,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, type_tag: TypeTag) -> Self {
        let scale = if type_tag.has_time_scale() {
            DEFAULT_TIME_SCALE
        } else {
            0
        };
        Self {
            name: name.into(),
            type_tag,
            length: 0,
            scale,
            precision: 0,
            nullable: true,
            type_name: type_tag.as_str().to_string(),
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn not_null(self) -> Self {
        self.nullable(false)
    }

    pub fn with_length(mut self, length: i32) -> Self {
        self.length = length;
        self
    }

    pub fn with_scale(mut self, scale: u8) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_precision(mut self, precision: u8) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = type_name.into();
        self
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TableDescriptor {
    pub schema: String,
    pub name: String,
    pub columns: Vec<Arc<ColumnDescriptor>>,
    pub data_dir: PathBuf,
}

impl TableDescriptor {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            columns: Vec::new(),
            data_dir: PathBuf::new(),
        }
    }

    pub fn with_column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(Arc::new(column));
        self
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// `schema.name`, the identifier used in diagnostics and file names.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}
