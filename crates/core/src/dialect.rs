use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const POSTGRES_DEFAULT_SCHEMA: &str = "public";
const SQLSERVER_DEFAULT_SCHEMA: &str = "dbo";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    MySql,
    Postgres,
    SqlServer,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown SQL dialect `{0}` (expected mysql, postgres or sqlserver)")]
pub struct UnknownDialect(String);

impl Dialect {
    /// Picks the dialect from a connection URL. Anything that is neither a
    /// postgres nor a sqlserver URL is treated as a MySQL DSN.
    #[must_use]
    pub fn detect(connection_url: &str) -> Self {
        let trimmed = connection_url.trim_start();
        if trimmed.starts_with("postgres") {
            Self::Postgres
        } else if trimmed.starts_with("sqlserver") {
            Self::SqlServer
        } else {
            Self::MySql
        }
    }

    #[must_use]
    pub fn identifier(self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::Postgres => "postgres",
            Self::SqlServer => "sqlserver",
        }
    }

    #[must_use]
    pub fn catalog(self) -> &'static dyn DialectCatalog {
        match self {
            Self::MySql => &MySqlCatalog,
            Self::Postgres => &PostgresCatalog,
            Self::SqlServer => &SqlServerCatalog,
        }
    }

    /// Whether the dialect lets a session switch databases on an open
    /// connection. Postgres binds the database to the connection URL.
    #[must_use]
    pub fn supports_database_switch(self) -> bool {
        !matches!(self, Self::Postgres)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

impl FromStr for Dialect {
    type Err = UnknownDialect;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Self::MySql),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "sqlserver" | "mssql" => Ok(Self::SqlServer),
            _ => Err(UnknownDialect(raw.to_string())),
        }
    }
}

/// Catalog queries and name handling for one SQL engine.
///
/// Every column-info query returns the same six text columns, in order:
/// name, data type, nullable (`YES`/`NO`), primary key (`YES`/`NO`),
/// default value and max length (empty when not applicable). Referencing
/// foreign-key queries return referencing table, referencing column and
/// referenced column.
pub trait DialectCatalog: Sync {
    fn dialect(&self) -> Dialect;

    fn list_databases(&self) -> String;

    fn list_tables(&self, database: &str) -> String;

    fn primary_key_query(&self, database: &str, table: &str) -> String;

    fn column_info_query(&self, database: &str, table: &str) -> String;

    fn referencing_foreign_keys_query(&self, database: &str, table: &str) -> String;

    fn qualify_table_name(&self, table: &str) -> String {
        table.to_string()
    }

    fn clean_table_name(&self, table: &str) -> String {
        table.to_string()
    }

    fn extract_schema(&self, _table: &str) -> String {
        String::new()
    }

    fn prepend_database_selector(&self, _database: &str, sql: &str) -> String {
        sql.to_string()
    }

    /// Statement that makes `database` current for the rest of the session,
    /// if the dialect has one.
    fn use_database(&self, _database: &str) -> Option<String> {
        None
    }
}

#[must_use]
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn strip_identifier_quotes(raw: &str) -> &str {
    raw.trim()
        .trim_matches(|ch| matches!(ch, '[' | ']' | '"' | '`'))
        .trim()
}

fn split_qualified(table: &str) -> (Option<&str>, &str) {
    match table.rfind('.') {
        Some(index) => (
            Some(strip_identifier_quotes(&table[..index])),
            strip_identifier_quotes(&table[index + 1..]),
        ),
        None => (None, strip_identifier_quotes(table)),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlCatalog;

impl MySqlCatalog {
    fn schema_predicate(column: &str, database: &str) -> String {
        if database.trim().is_empty() {
            format!("{column} = DATABASE()")
        } else {
            format!("{column} = {}", quote_literal(database))
        }
    }

    /// A `db.table` name overrides the session database.
    fn scope<'a>(database: &'a str, table: &'a str) -> (&'a str, &'a str) {
        match split_qualified(table) {
            (Some(schema), name) if !schema.is_empty() => (schema, name),
            (_, name) => (database, name),
        }
    }
}

impl DialectCatalog for MySqlCatalog {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    fn list_databases(&self) -> String {
        "SHOW DATABASES".to_string()
    }

    fn list_tables(&self, database: &str) -> String {
        format!(
            "SELECT TABLE_NAME FROM information_schema.TABLES \
             WHERE {} ORDER BY TABLE_NAME",
            Self::schema_predicate("TABLE_SCHEMA", database)
        )
    }

    fn primary_key_query(&self, database: &str, table: &str) -> String {
        let (database, table) = Self::scope(database, table);
        format!(
            "SELECT COLUMN_NAME FROM information_schema.KEY_COLUMN_USAGE \
             WHERE {} AND TABLE_NAME = {} AND CONSTRAINT_NAME = 'PRIMARY' \
             ORDER BY ORDINAL_POSITION",
            Self::schema_predicate("TABLE_SCHEMA", database),
            quote_literal(table)
        )
    }

    fn column_info_query(&self, database: &str, table: &str) -> String {
        let (database, table) = Self::scope(database, table);
        format!(
            "SELECT COLUMN_NAME, COLUMN_TYPE, IS_NULLABLE, \
             CASE WHEN COLUMN_KEY = 'PRI' THEN 'YES' ELSE 'NO' END, \
             COALESCE(COLUMN_DEFAULT, ''), \
             COALESCE(CAST(CHARACTER_MAXIMUM_LENGTH AS CHAR), '') \
             FROM information_schema.COLUMNS \
             WHERE {} AND TABLE_NAME = {} ORDER BY ORDINAL_POSITION",
            Self::schema_predicate("TABLE_SCHEMA", database),
            quote_literal(table)
        )
    }

    fn referencing_foreign_keys_query(&self, database: &str, table: &str) -> String {
        let (database, table) = Self::scope(database, table);
        format!(
            "SELECT TABLE_NAME, COLUMN_NAME, REFERENCED_COLUMN_NAME \
             FROM information_schema.KEY_COLUMN_USAGE \
             WHERE {} AND REFERENCED_TABLE_NAME = {} \
             ORDER BY TABLE_NAME, COLUMN_NAME",
            Self::schema_predicate("REFERENCED_TABLE_SCHEMA", database),
            quote_literal(table)
        )
    }

    fn use_database(&self, database: &str) -> Option<String> {
        Some(format!("USE `{}`", database.replace('`', "``")))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresCatalog;

impl PostgresCatalog {
    fn schema_and_table(table: &str) -> (String, String) {
        let (schema, name) = split_qualified(table);
        (
            schema.unwrap_or(POSTGRES_DEFAULT_SCHEMA).to_string(),
            name.to_string(),
        )
    }
}

impl DialectCatalog for PostgresCatalog {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn list_databases(&self) -> String {
        "SELECT datname FROM pg_database WHERE datistemplate = false ORDER BY datname".to_string()
    }

    fn list_tables(&self, _database: &str) -> String {
        "SELECT CASE WHEN schemaname = 'public' THEN tablename \
         ELSE schemaname || '.' || tablename END \
         FROM pg_catalog.pg_tables \
         WHERE schemaname NOT IN ('pg_catalog', 'information_schema') \
         ORDER BY 1"
            .to_string()
    }

    fn primary_key_query(&self, _database: &str, table: &str) -> String {
        let (schema, name) = Self::schema_and_table(table);
        format!(
            "SELECT a.attname FROM pg_catalog.pg_index i \
             JOIN pg_catalog.pg_class c ON c.oid = i.indrelid \
             JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
             JOIN pg_catalog.pg_attribute a ON a.attrelid = c.oid AND a.attnum = ANY(i.indkey) \
             WHERE i.indisprimary AND n.nspname = {} AND c.relname = {} \
             ORDER BY array_position(i.indkey::int2[], a.attnum)",
            quote_literal(&schema),
            quote_literal(&name)
        )
    }

    fn column_info_query(&self, _database: &str, table: &str) -> String {
        let (schema, name) = Self::schema_and_table(table);
        format!(
            "SELECT c.column_name, c.data_type, c.is_nullable, \
             CASE WHEN EXISTS (\
             SELECT 1 FROM information_schema.table_constraints tc \
             JOIN information_schema.key_column_usage k \
             ON k.constraint_name = tc.constraint_name \
             AND k.table_schema = tc.table_schema AND k.table_name = tc.table_name \
             WHERE tc.constraint_type = 'PRIMARY KEY' \
             AND tc.table_schema = c.table_schema AND tc.table_name = c.table_name \
             AND k.column_name = c.column_name) THEN 'YES' ELSE 'NO' END, \
             COALESCE(c.column_default, ''), \
             COALESCE(CAST(c.character_maximum_length AS TEXT), '') \
             FROM information_schema.columns c \
             WHERE c.table_schema = {} AND c.table_name = {} \
             ORDER BY c.ordinal_position",
            quote_literal(&schema),
            quote_literal(&name)
        )
    }

    fn referencing_foreign_keys_query(&self, _database: &str, table: &str) -> String {
        let (schema, name) = Self::schema_and_table(table);
        format!(
            "SELECT CASE WHEN sn.nspname = 'public' THEN src.relname \
             ELSE sn.nspname || '.' || src.relname END, sa.attname, ta.attname \
             FROM pg_catalog.pg_constraint con \
             JOIN pg_catalog.pg_class src ON src.oid = con.conrelid \
             JOIN pg_catalog.pg_namespace sn ON sn.oid = src.relnamespace \
             JOIN pg_catalog.pg_class tgt ON tgt.oid = con.confrelid \
             JOIN pg_catalog.pg_namespace tn ON tn.oid = tgt.relnamespace \
             CROSS JOIN LATERAL unnest(con.conkey, con.confkey) AS k(src_attnum, tgt_attnum) \
             JOIN pg_catalog.pg_attribute sa ON sa.attrelid = con.conrelid AND sa.attnum = k.src_attnum \
             JOIN pg_catalog.pg_attribute ta ON ta.attrelid = con.confrelid AND ta.attnum = k.tgt_attnum \
             WHERE con.contype = 'f' AND tn.nspname = {} AND tgt.relname = {} \
             ORDER BY 1, 2",
            quote_literal(&schema),
            quote_literal(&name)
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerCatalog;

impl SqlServerCatalog {
    fn catalog_prefix(database: &str) -> String {
        let database = strip_identifier_quotes(database);
        if database.is_empty() {
            "INFORMATION_SCHEMA".to_string()
        } else {
            format!("[{database}].INFORMATION_SCHEMA")
        }
    }
}

impl DialectCatalog for SqlServerCatalog {
    fn dialect(&self) -> Dialect {
        Dialect::SqlServer
    }

    fn list_databases(&self) -> String {
        "SELECT name FROM sys.databases WHERE database_id > 4 ORDER BY name".to_string()
    }

    fn list_tables(&self, database: &str) -> String {
        format!(
            "SELECT TABLE_SCHEMA + '.' + TABLE_NAME FROM {}.TABLES \
             WHERE TABLE_TYPE = 'BASE TABLE' ORDER BY TABLE_SCHEMA, TABLE_NAME",
            Self::catalog_prefix(database)
        )
    }

    fn primary_key_query(&self, database: &str, table: &str) -> String {
        let prefix = Self::catalog_prefix(database);
        format!(
            "SELECT k.COLUMN_NAME FROM {prefix}.TABLE_CONSTRAINTS tc \
             JOIN {prefix}.KEY_COLUMN_USAGE k ON k.CONSTRAINT_NAME = tc.CONSTRAINT_NAME \
             AND k.TABLE_SCHEMA = tc.TABLE_SCHEMA AND k.TABLE_NAME = tc.TABLE_NAME \
             WHERE tc.CONSTRAINT_TYPE = 'PRIMARY KEY' \
             AND tc.TABLE_SCHEMA = {} AND tc.TABLE_NAME = {} \
             ORDER BY k.ORDINAL_POSITION",
            quote_literal(&self.extract_schema(table)),
            quote_literal(&self.clean_table_name(table))
        )
    }

    fn column_info_query(&self, database: &str, table: &str) -> String {
        let prefix = Self::catalog_prefix(database);
        format!(
            "SELECT c.COLUMN_NAME, c.DATA_TYPE, c.IS_NULLABLE, \
             CASE WHEN EXISTS (\
             SELECT 1 FROM {prefix}.TABLE_CONSTRAINTS tc \
             JOIN {prefix}.KEY_COLUMN_USAGE k ON k.CONSTRAINT_NAME = tc.CONSTRAINT_NAME \
             AND k.TABLE_SCHEMA = tc.TABLE_SCHEMA AND k.TABLE_NAME = tc.TABLE_NAME \
             WHERE tc.CONSTRAINT_TYPE = 'PRIMARY KEY' \
             AND tc.TABLE_SCHEMA = c.TABLE_SCHEMA AND tc.TABLE_NAME = c.TABLE_NAME \
             AND k.COLUMN_NAME = c.COLUMN_NAME) THEN 'YES' ELSE 'NO' END, \
             COALESCE(c.COLUMN_DEFAULT, ''), \
             COALESCE(CAST(c.CHARACTER_MAXIMUM_LENGTH AS VARCHAR(20)), '') \
             FROM {prefix}.COLUMNS c \
             WHERE c.TABLE_SCHEMA = {} AND c.TABLE_NAME = {} \
             ORDER BY c.ORDINAL_POSITION",
            quote_literal(&self.extract_schema(table)),
            quote_literal(&self.clean_table_name(table))
        )
    }

    fn referencing_foreign_keys_query(&self, database: &str, table: &str) -> String {
        let prefix = Self::catalog_prefix(database);
        format!(
            "SELECT fk.TABLE_SCHEMA + '.' + fk.TABLE_NAME, fk.COLUMN_NAME, pk.COLUMN_NAME \
             FROM {prefix}.REFERENTIAL_CONSTRAINTS rc \
             JOIN {prefix}.KEY_COLUMN_USAGE fk ON fk.CONSTRAINT_SCHEMA = rc.CONSTRAINT_SCHEMA \
             AND fk.CONSTRAINT_NAME = rc.CONSTRAINT_NAME \
             JOIN {prefix}.KEY_COLUMN_USAGE pk ON pk.CONSTRAINT_SCHEMA = rc.UNIQUE_CONSTRAINT_SCHEMA \
             AND pk.CONSTRAINT_NAME = rc.UNIQUE_CONSTRAINT_NAME \
             AND pk.ORDINAL_POSITION = fk.ORDINAL_POSITION \
             WHERE pk.TABLE_SCHEMA = {} AND pk.TABLE_NAME = {} \
             ORDER BY 1, 2",
            quote_literal(&self.extract_schema(table)),
            quote_literal(&self.clean_table_name(table))
        )
    }

    fn qualify_table_name(&self, table: &str) -> String {
        match split_qualified(table) {
            (Some(schema), name) => format!("[{schema}].[{name}]"),
            (None, name) => format!("[{name}]"),
        }
    }

    fn clean_table_name(&self, table: &str) -> String {
        split_qualified(table).1.to_string()
    }

    fn extract_schema(&self, table: &str) -> String {
        split_qualified(table)
            .0
            .filter(|schema| !schema.is_empty())
            .unwrap_or(SQLSERVER_DEFAULT_SCHEMA)
            .to_string()
    }

    fn prepend_database_selector(&self, database: &str, sql: &str) -> String {
        let database = strip_identifier_quotes(database);
        if database.is_empty() {
            return sql.to_string();
        }
        format!("USE [{database}]; {sql}")
    }
}
