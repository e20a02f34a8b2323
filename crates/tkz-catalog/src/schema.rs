//! Catalog schema metadata.
//!
//! Every table is described by a [`TableDef`] constant emitted at
//! definition time; the CRUD layers read keys, foreign keys and column
//! types from here instead of reflecting against the live database. Table
//! names derive mechanically from the UpperCamelCase model name and are
//! cached on first use.
//!
//! Three fact tables (`Transformer`, `Cable`, `CurrentBreaker`) join
//! dimension tables whose sole non-key column is unique; `OtherContact` is
//! flat. Fact-table foreign keys cascade on update and delete of their
//! dimension row.

use std::sync::OnceLock;

use crate::session::Dialect;

/// SQL column type, rendered per dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Integer,
    /// `DECIMAL(precision, scale)`
    Decimal(u8, u8),
    VarChar(u16),
}

impl SqlType {
    fn render(self) -> String {
        match self {
            SqlType::Integer => "INTEGER".to_string(),
            SqlType::Decimal(precision, scale) => format!("DECIMAL({precision},{scale})"),
            SqlType::VarChar(len) => format!("VARCHAR({len})"),
        }
    }
}

/// One column of a catalog table.
#[derive(Debug)]
pub struct ColumnDef {
    pub name: &'static str,
    pub sql_type: SqlType,
    pub primary: bool,
    pub nullable: bool,
    pub unique: bool,
    pub default_zero: bool,
    /// Dimension table this column references, for foreign keys.
    pub references: Option<&'static TableDef>,
}

impl ColumnDef {
    /// Surrogate auto-increment primary key; every table has one.
    pub const fn pk() -> ColumnDef {
        ColumnDef {
            name: "id",
            sql_type: SqlType::Integer,
            primary: true,
            nullable: false,
            unique: false,
            default_zero: false,
            references: None,
        }
    }

    pub const fn fk(name: &'static str, target: &'static TableDef) -> ColumnDef {
        ColumnDef {
            name,
            sql_type: SqlType::Integer,
            primary: false,
            nullable: true,
            unique: false,
            default_zero: false,
            references: Some(target),
        }
    }

    const fn data(name: &'static str, sql_type: SqlType) -> ColumnDef {
        ColumnDef {
            name,
            sql_type,
            primary: false,
            nullable: false,
            unique: false,
            default_zero: false,
            references: None,
        }
    }

    /// Unique, non-null natural key of a dimension table.
    pub const fn natural(name: &'static str, sql_type: SqlType) -> ColumnDef {
        let mut column = ColumnDef::data(name, sql_type);
        column.unique = true;
        column
    }

    /// Non-null fact column.
    pub const fn required(name: &'static str, sql_type: SqlType) -> ColumnDef {
        ColumnDef::data(name, sql_type)
    }

    /// Nullable fact column with a stored default of 0.
    pub const fn optional(name: &'static str, sql_type: SqlType) -> ColumnDef {
        let mut column = ColumnDef::data(name, sql_type);
        column.nullable = true;
        column.default_zero = true;
        column
    }

    pub fn is_foreign(&self) -> bool {
        self.references.is_some()
    }

    fn render(&self, dialect: Dialect) -> String {
        if self.primary {
            let auto = match dialect {
                Dialect::Sqlite => "AUTOINCREMENT",
                Dialect::MySql => "AUTO_INCREMENT",
            };
            return format!("{} INTEGER PRIMARY KEY {auto}", self.name);
        }
        let mut rendered = format!("{} {}", self.name, self.sql_type.render());
        if !self.nullable {
            rendered.push_str(" NOT NULL");
        }
        if self.unique {
            rendered.push_str(" UNIQUE");
        }
        if self.default_zero {
            rendered.push_str(" DEFAULT 0");
        }
        rendered
    }
}

/// Static description of one catalog table.
#[derive(Debug)]
pub struct TableDef {
    /// UpperCamelCase model name; the table name derives from it.
    pub model: &'static str,
    /// Columns in declaration order, primary key first.
    pub columns: &'static [ColumnDef],
    /// Dimension tables of a fact table, in foreign-key column order.
    pub subtables: &'static [&'static TableDef],
    name_cache: OnceLock<String>,
}

impl TableDef {
    pub const fn new(
        model: &'static str,
        columns: &'static [ColumnDef],
        subtables: &'static [&'static TableDef],
    ) -> TableDef {
        TableDef {
            model,
            columns,
            subtables,
            name_cache: OnceLock::new(),
        }
    }

    /// snake_case table name, derived once and cached.
    pub fn table_name(&self) -> &str {
        self.name_cache.get_or_init(|| camel_to_snake(self.model))
    }

    /// CSV file name for the installer: plural of the table name.
    pub fn csv_file_name(&self) -> String {
        format!("{}s", self.table_name())
    }

    pub fn is_joined(&self) -> bool {
        !self.subtables.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Name of the surrogate primary key column.
    pub fn primary_key(&self) -> &'static str {
        self.columns
            .iter()
            .find(|column| column.primary)
            .map(|column| column.name)
            .expect("every table declares a primary key")
    }

    /// Primary key plus foreign keys, in declaration order.
    pub fn all_keys(&self) -> Vec<&'static str> {
        self.columns
            .iter()
            .filter(|column| column.primary || column.is_foreign())
            .map(|column| column.name)
            .collect()
    }

    pub fn foreign_keys(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|column| column.is_foreign())
    }

    /// Columns that are not the primary key; foreign keys are included only
    /// when `allow_foreign` is set.
    pub fn non_keys(&self, allow_foreign: bool) -> Vec<&ColumnDef> {
        self.columns
            .iter()
            .filter(|column| !column.primary && (allow_foreign || !column.is_foreign()))
            .collect()
    }

    /// The sole non-key column of a dimension table.
    pub fn value_column(&self) -> &ColumnDef {
        self.columns
            .iter()
            .find(|column| !column.primary && !column.is_foreign())
            .expect("dimension tables declare a natural key column")
    }

    pub fn create_sql(&self, dialect: Dialect) -> String {
        let mut parts: Vec<String> = self
            .columns
            .iter()
            .map(|column| column.render(dialect))
            .collect();
        for column in self.foreign_keys() {
            let target = column.references.expect("foreign key declares a target");
            parts.push(format!(
                "FOREIGN KEY ({}) REFERENCES {} (id) ON UPDATE CASCADE ON DELETE CASCADE",
                column.name,
                target.table_name()
            ));
        }
        format!("CREATE TABLE {} ({})", self.table_name(), parts.join(", "))
    }
}

/// Mechanical UpperCamelCase -> snake_case conversion.
pub fn camel_to_snake(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (index, &ch) in chars.iter().enumerate() {
        if ch.is_ascii_uppercase() {
            let after_lower = index > 0
                && (chars[index - 1].is_ascii_lowercase() || chars[index - 1].is_ascii_digit());
            let before_lower = chars
                .get(index + 1)
                .is_some_and(|next| next.is_ascii_lowercase());
            if index > 0 && (after_lower || before_lower) {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

// Transformer cluster.

pub static POWER_NOMINAL: TableDef = TableDef::new(
    "PowerNominal",
    &[
        ColumnDef::pk(),
        ColumnDef::natural("power", SqlType::Integer),
    ],
    &[],
);

pub static VOLTAGE_NOMINAL: TableDef = TableDef::new(
    "VoltageNominal",
    &[
        ColumnDef::pk(),
        ColumnDef::natural("voltage", SqlType::Decimal(6, 3)),
    ],
    &[],
);

pub static SCHEME: TableDef = TableDef::new(
    "Scheme",
    &[
        ColumnDef::pk(),
        ColumnDef::natural("vector_group", SqlType::VarChar(10)),
    ],
    &[],
);

pub static TRANSFORMER: TableDef = TableDef::new(
    "Transformer",
    &[
        ColumnDef::pk(),
        ColumnDef::fk("power_id", &POWER_NOMINAL),
        ColumnDef::fk("voltage_id", &VOLTAGE_NOMINAL),
        ColumnDef::fk("vector_group_id", &SCHEME),
        ColumnDef::required("power_short_circuit", SqlType::Decimal(6, 3)),
        ColumnDef::required("voltage_short_circuit", SqlType::Decimal(6, 3)),
        ColumnDef::required("resistance_r1", SqlType::Decimal(8, 5)),
        ColumnDef::required("reactance_x1", SqlType::Decimal(8, 5)),
        ColumnDef::required("resistance_r0", SqlType::Decimal(8, 5)),
        ColumnDef::required("reactance_x0", SqlType::Decimal(8, 5)),
    ],
    &[&POWER_NOMINAL, &VOLTAGE_NOMINAL, &SCHEME],
);

// Cable cluster.

pub static MARK: TableDef = TableDef::new(
    "Mark",
    &[
        ColumnDef::pk(),
        ColumnDef::natural("mark_name", SqlType::VarChar(20)),
    ],
    &[],
);

pub static AMOUNT: TableDef = TableDef::new(
    "Amount",
    &[
        ColumnDef::pk(),
        ColumnDef::natural("multicore_amount", SqlType::Integer),
    ],
    &[],
);

pub static RANGE_VAL: TableDef = TableDef::new(
    "RangeVal",
    &[
        ColumnDef::pk(),
        ColumnDef::natural("cable_range", SqlType::Decimal(4, 1)),
    ],
    &[],
);

pub static CABLE: TableDef = TableDef::new(
    "Cable",
    &[
        ColumnDef::pk(),
        ColumnDef::fk("mark_name_id", &MARK),
        ColumnDef::fk("multicore_amount_id", &AMOUNT),
        ColumnDef::fk("cable_range_id", &RANGE_VAL),
        ColumnDef::required("continuous_current", SqlType::Decimal(5, 2)),
        ColumnDef::required("resistance_r1", SqlType::Decimal(8, 5)),
        ColumnDef::required("reactance_x1", SqlType::Decimal(8, 5)),
        ColumnDef::required("resistance_r0", SqlType::Decimal(8, 5)),
        ColumnDef::required("reactance_x0", SqlType::Decimal(8, 5)),
    ],
    &[&MARK, &AMOUNT, &RANGE_VAL],
);

// Current-breaker cluster.

pub static DEVICE: TableDef = TableDef::new(
    "Device",
    &[
        ColumnDef::pk(),
        ColumnDef::natural("device_type", SqlType::VarChar(25)),
    ],
    &[],
);

pub static CURRENT_NOMINAL: TableDef = TableDef::new(
    "CurrentNominal",
    &[
        ColumnDef::pk(),
        ColumnDef::natural("current_value", SqlType::Integer),
    ],
    &[],
);

pub static CURRENT_BREAKER: TableDef = TableDef::new(
    "CurrentBreaker",
    &[
        ColumnDef::pk(),
        ColumnDef::fk("device_type_id", &DEVICE),
        ColumnDef::fk("current_value_id", &CURRENT_NOMINAL),
        ColumnDef::required("resistance_r1", SqlType::Decimal(8, 5)),
        ColumnDef::optional("reactance_x1", SqlType::Decimal(8, 5)),
        ColumnDef::optional("resistance_r0", SqlType::Decimal(8, 5)),
        ColumnDef::optional("reactance_x0", SqlType::Decimal(8, 5)),
    ],
    &[&DEVICE, &CURRENT_NOMINAL],
);

// Flat contacts table.

pub static OTHER_CONTACT: TableDef = TableDef::new(
    "OtherContact",
    &[
        ColumnDef::pk(),
        ColumnDef::natural("contact_type", SqlType::VarChar(25)),
        ColumnDef::required("resistance_r1", SqlType::Decimal(8, 5)),
        ColumnDef::optional("reactance_x1", SqlType::Decimal(8, 5)),
        ColumnDef::optional("resistance_r0", SqlType::Decimal(8, 5)),
        ColumnDef::optional("reactance_x0", SqlType::Decimal(8, 5)),
    ],
    &[],
);

/// Every catalog table, dimension tables before the facts that reference
/// them; the installer relies on this ordering.
pub static ALL_TABLES: &[&TableDef] = &[
    &POWER_NOMINAL,
    &VOLTAGE_NOMINAL,
    &SCHEME,
    &TRANSFORMER,
    &MARK,
    &AMOUNT,
    &RANGE_VAL,
    &CABLE,
    &DEVICE,
    &CURRENT_NOMINAL,
    &CURRENT_BREAKER,
    &OTHER_CONTACT,
];

/// Look a table up by its snake_case name.
pub fn table_by_name(name: &str) -> Option<&'static TableDef> {
    ALL_TABLES
        .iter()
        .copied()
        .find(|table| table.table_name() == name)
}
