//! Rendered DDL scanning
//!
//! Splits rendered template output into statements, finds every table a
//! script creates, and parses `CREATE TABLE` / `CREATE INDEX` statements
//! back into [`TableDescriptor`]s. Only the subset of SQL the templates emit
//! needs to be understood.

use crate::models::{ColumnDef, ForeignKeyRef, IndexDef, TableDescriptor, TableSource};
use once_cell::sync::Lazy;
use regex::Regex;

const IDENT: &str = r#"[`"\[]?([A-Za-z_][A-Za-z0-9_$]*)[`"\]]?"#;

static CREATE_TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\bCREATE\s+(?:TEMP(?:ORARY)?\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?{}",
        IDENT
    ))
    .expect("valid CREATE TABLE pattern")
});

static CREATE_TABLE_STMT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)^\s*CREATE\s+(?:TEMP(?:ORARY)?\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?{}",
        IDENT
    ))
    .expect("valid CREATE TABLE pattern")
});

static DROP_TABLE_STMT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)^\s*DROP\s+TABLE\s+(?:IF\s+EXISTS\s+)?{}", IDENT))
        .expect("valid DROP TABLE pattern")
});

static CREATE_INDEX_STMT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?is)^\s*CREATE\s+(UNIQUE\s+)?INDEX\s+(?:IF\s+NOT\s+EXISTS\s+)?{}\s+ON\s+{}\s*\(([^)]*)\)(?:\s+WHERE\s+(.+?))?\s*$",
        IDENT, IDENT
    ))
    .expect("valid CREATE INDEX pattern")
});

static INSERT_STMT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)^\s*INSERT\s+(?:OR\s+IGNORE\s+|IGNORE\s+)?INTO\s+{}",
        IDENT
    ))
    .expect("valid INSERT pattern")
});

static REFERENCES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\bREFERENCES\s+{}\s*(?:\(([^)]*)\))?", IDENT))
        .expect("valid REFERENCES pattern")
});

static FOREIGN_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?is)^FOREIGN\s+KEY\s*\(([^)]*)\)\s*REFERENCES\s+{}\s*(?:\(([^)]*)\))?",
        IDENT
    ))
    .expect("valid FOREIGN KEY pattern")
});

/// MySQL inline index, `[UNIQUE] KEY|INDEX <name> (<columns>)`
static INLINE_INDEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?is)^(UNIQUE\s+)?(?:KEY|INDEX)\s+{}\s+\(([^)]*)\)\s*$",
        IDENT
    ))
    .expect("valid inline index pattern")
});

static DEFAULT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bDEFAULT\s+(\([^)]*\)|'[^']*'|[^\s,]+)").expect("valid DEFAULT pattern")
});

/// Words that end the type portion of a column definition
const COLUMN_CONSTRAINTS: &[&str] = &[
    "NOT", "NULL", "DEFAULT", "PRIMARY", "REFERENCES", "UNIQUE", "CHECK", "COLLATE",
    "AUTO_INCREMENT", "AUTOINCREMENT", "CONSTRAINT",
];

/// What a statement does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    CreateTable(String),
    CreateIndex { table: String },
    Insert { table: String },
    DropTable(String),
    Other,
}

/// One DDL statement, without its trailing semicolon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub kind: StatementKind,
}

impl Statement {
    pub fn parse(sql: &str) -> Self {
        let sql = sql.trim().trim_end_matches(';').trim_end().to_string();
        let kind = if let Some(caps) = CREATE_TABLE_STMT.captures(&sql) {
            StatementKind::CreateTable(caps[1].to_string())
        } else if let Some(caps) = CREATE_INDEX_STMT.captures(&sql) {
            StatementKind::CreateIndex {
                table: caps[3].to_string(),
            }
        } else if let Some(caps) = INSERT_STMT.captures(&sql) {
            StatementKind::Insert {
                table: caps[1].to_string(),
            }
        } else if let Some(caps) = DROP_TABLE_STMT.captures(&sql) {
            StatementKind::DropTable(caps[1].to_string())
        } else {
            StatementKind::Other
        };
        Self { sql, kind }
    }

    /// Table the statement belongs to, if any
    pub fn table(&self) -> Option<&str> {
        match &self.kind {
            StatementKind::CreateTable(t) | StatementKind::DropTable(t) => Some(t),
            StatementKind::CreateIndex { table } | StatementKind::Insert { table } => Some(table),
            StatementKind::Other => None,
        }
    }

    pub fn to_sql(&self) -> String {
        format!("{};", self.sql)
    }
}

/// Remove `--` line comments outside string literals
pub fn strip_comments(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    for line in sql.lines() {
        let mut in_quote = false;
        let mut cut = line.len();
        let bytes = line.as_bytes();
        for (i, &b) in bytes.iter().enumerate() {
            match b {
                b'\'' => in_quote = !in_quote,
                b'-' if !in_quote && bytes.get(i + 1) == Some(&b'-') => {
                    cut = i;
                    break;
                }
                _ => {}
            }
        }
        out.push_str(&line[..cut]);
        out.push('\n');
    }
    out
}

/// Split a script on top-level semicolons
pub fn split_statements(sql: &str) -> Vec<Statement> {
    let sql = strip_comments(sql);
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;

    for c in sql.chars() {
        match c {
            '\'' => {
                in_quote = !in_quote;
                current.push(c);
            }
            ';' if !in_quote => {
                if !current.trim().is_empty() {
                    statements.push(Statement::parse(&current));
                }
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        statements.push(Statement::parse(&current));
    }
    statements
}

/// Every table a script creates, in order, without duplicates
pub fn created_tables(sql: &str) -> Vec<String> {
    let sql = strip_comments(sql);
    let mut tables: Vec<String> = Vec::new();
    for caps in CREATE_TABLE.captures_iter(&sql) {
        let name = caps[1].to_string();
        if !tables.contains(&name) {
            tables.push(name);
        }
    }
    tables
}

fn unquote(ident: &str) -> String {
    ident
        .trim()
        .trim_matches(|c| c == '"' || c == '`' || c == '[' || c == ']')
        .to_string()
}

fn ident_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(unquote)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Split on `sep` outside parentheses and quotes
fn split_top_level(body: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut in_quote = false;
    let mut start = 0;

    for (i, c) in body.char_indices() {
        match c {
            '\'' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => depth -= 1,
            c if c == sep && depth == 0 && !in_quote => {
                parts.push(&body[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&body[start..]);
    parts
}

fn paren_list(item: &str) -> Vec<String> {
    match (item.find('('), item.find(')')) {
        (Some(open), Some(close)) if close > open => ident_list(&item[open + 1..close]),
        _ => Vec::new(),
    }
}

/// Parse a `CREATE TABLE` statement
pub fn parse_create_table(sql: &str) -> Option<TableDescriptor> {
    let name = CREATE_TABLE_STMT.captures(sql)?[1].to_string();
    let open = sql.find('(')?;
    let close = sql.rfind(')')?;
    if close <= open {
        return None;
    }

    let mut table = TableDescriptor::new(name, TableSource::Templated);
    for item in split_top_level(&sql[open + 1..close], ',') {
        parse_table_item(&mut table, item.trim());
    }

    if let Some(pk) = table.primary_key.clone() {
        for column in table.columns.iter_mut() {
            if pk.contains(&column.name) {
                column.is_primary_key = true;
                column.nullable = false;
            }
        }
    }
    Some(table)
}

fn parse_table_item(table: &mut TableDescriptor, item: &str) {
    if item.is_empty() {
        return;
    }
    let upper = item.to_ascii_uppercase();

    if upper.starts_with("CONSTRAINT") {
        // CONSTRAINT <name> <definition>
        let mut words = item.splitn(3, char::is_whitespace);
        words.next();
        words.next();
        if let Some(definition) = words.next() {
            parse_table_item(table, definition.trim());
        }
    } else if upper.starts_with("PRIMARY KEY") {
        table.primary_key = Some(paren_list(item));
    } else if upper.starts_with("FOREIGN KEY") {
        if let Some(caps) = FOREIGN_KEY.captures(item) {
            table.foreign_keys.push(ForeignKeyRef {
                columns: ident_list(&caps[1]),
                referenced_table: caps[2].to_string(),
                referenced_columns: caps
                    .get(3)
                    .map(|m| ident_list(m.as_str()))
                    .unwrap_or_else(|| vec!["id".to_string()]),
            });
        }
    } else if let Some(caps) = INLINE_INDEX.captures(item) {
        table.indexes.push(IndexDef {
            name: caps[2].to_string(),
            columns: ident_list(&caps[3]),
            is_unique: caps.get(1).is_some(),
            predicate: None,
        });
    } else if upper.starts_with("UNIQUE") {
        let columns = paren_list(item);
        table.indexes.push(IndexDef {
            name: format!("{}_{}_key", table.table_name, columns.join("_")),
            columns,
            is_unique: true,
            predicate: None,
        });
    } else if upper.starts_with("CHECK") {
        // check constraints carry no structure we plan around
    } else {
        parse_column(table, item);
    }
}

fn parse_column(table: &mut TableDescriptor, item: &str) {
    let mut words = item.split_whitespace();
    let Some(raw_name) = words.next() else {
        return;
    };
    let name = unquote(raw_name);

    let mut type_words = Vec::new();
    let mut constraint_words = Vec::new();
    for word in words {
        let keyword = word.to_ascii_uppercase();
        if constraint_words.is_empty() && !COLUMN_CONSTRAINTS.contains(&keyword.as_str()) {
            type_words.push(word);
        } else {
            constraint_words.push(keyword);
        }
    }
    let constraints = constraint_words.join(" ");
    let primary = constraints.contains("PRIMARY KEY");

    if primary {
        table.primary_key = Some(vec![name.clone()]);
    }
    if let Some(caps) = REFERENCES.captures(item) {
        table.foreign_keys.push(ForeignKeyRef {
            columns: vec![name.clone()],
            referenced_table: caps[1].to_string(),
            referenced_columns: caps
                .get(2)
                .map(|m| ident_list(m.as_str()))
                .unwrap_or_else(|| vec!["id".to_string()]),
        });
    }
    if constraint_words.iter().any(|w| w == "UNIQUE") {
        table.indexes.push(IndexDef {
            name: format!("{}_{}_key", table.table_name, name),
            columns: vec![name.clone()],
            is_unique: true,
            predicate: None,
        });
    }

    table.columns.push(ColumnDef {
        name,
        data_type: type_words.join(" "),
        nullable: !primary && !constraints.contains("NOT NULL"),
        default_value: DEFAULT.captures(item).map(|caps| caps[1].to_string()),
        is_primary_key: primary,
    });
}

/// Parse a `CREATE INDEX` statement into (table, index)
pub fn parse_create_index(sql: &str) -> Option<(String, IndexDef)> {
    let caps = CREATE_INDEX_STMT.captures(sql.trim().trim_end_matches(';'))?;
    let index = IndexDef {
        name: caps[2].to_string(),
        columns: ident_list(&caps[4]),
        is_unique: caps.get(1).is_some(),
        predicate: caps.get(5).map(|m| m.as_str().trim().to_string()),
    };
    Some((caps[3].to_string(), index))
}

/// Build descriptors for every table a script creates
pub fn describe_statements(statements: &[Statement]) -> Vec<TableDescriptor> {
    let mut tables: Vec<TableDescriptor> = Vec::new();
    for statement in statements {
        match &statement.kind {
            StatementKind::CreateTable(name) => {
                if tables.iter().any(|t| &t.table_name == name) {
                    continue;
                }
                if let Some(table) = parse_create_table(&statement.sql) {
                    tables.push(table);
                }
            }
            StatementKind::CreateIndex { .. } => {
                if let Some((table_name, index)) = parse_create_index(&statement.sql) {
                    if let Some(table) = tables.iter_mut().find(|t| t.table_name == table_name) {
                        table.indexes.push(index);
                    }
                }
            }
            _ => {}
        }
    }
    tables
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SCRIPT: &str = r#"
-- lookup table; not a CREATE TABLE fake_table
CREATE TABLE IF NOT EXISTS account_statuses (
    id INTEGER PRIMARY KEY,
    name VARCHAR(255) NOT NULL UNIQUE
);
INSERT INTO account_statuses (id, name) VALUES (1, 'Unverified; really') ON CONFLICT DO NOTHING;
CREATE TABLE IF NOT EXISTS accounts (
    id BIGSERIAL PRIMARY KEY,
    email citext NOT NULL,
    status_id INTEGER NOT NULL DEFAULT 1,
    FOREIGN KEY (status_id) REFERENCES account_statuses(id)
);
CREATE UNIQUE INDEX IF NOT EXISTS accounts_email_index ON accounts (email) WHERE status_id IN (1, 2);
CREATE TABLE `account_recovery_codes` (
    id BIGINT NOT NULL,
    `code` VARCHAR(255) NOT NULL,
    PRIMARY KEY (id, `code`),
    CONSTRAINT fk_codes FOREIGN KEY (id) REFERENCES accounts(id)
);
"#;

    #[test]
    fn test_created_tables_skips_comments() {
        assert_eq!(
            created_tables(SCRIPT),
            vec!["account_statuses", "accounts", "account_recovery_codes"]
        );
    }

    #[test]
    fn test_split_respects_quotes() {
        let statements = split_statements(SCRIPT);
        assert_eq!(statements.len(), 5);
        assert_eq!(
            statements[1].kind,
            StatementKind::Insert {
                table: "account_statuses".to_string()
            }
        );
        assert!(statements[1].sql.contains("'Unverified; really'"));
        assert_eq!(
            statements[3].kind,
            StatementKind::CreateIndex {
                table: "accounts".to_string()
            }
        );
    }

    #[test]
    fn test_describe_statements() {
        let tables = describe_statements(&split_statements(SCRIPT));
        assert_eq!(tables.len(), 3);

        let statuses = &tables[0];
        assert_eq!(statuses.primary_key, Some(vec!["id".to_string()]));
        assert_eq!(statuses.indexes[0].columns, vec!["name"]);

        let accounts = &tables[1];
        assert_eq!(accounts.column("email").unwrap().data_type, "citext");
        assert!(!accounts.column("email").unwrap().nullable);
        assert_eq!(accounts.column("status_id").unwrap().default_value.as_deref(), Some("1"));
        assert!(accounts.references("account_statuses"));
        let email_index = &accounts.indexes[0];
        assert!(email_index.is_unique);
        assert_eq!(email_index.predicate.as_deref(), Some("status_id IN (1, 2)"));

        let codes = &tables[2];
        assert_eq!(codes.primary_key, Some(vec!["id".to_string(), "code".to_string()]));
        assert!(codes.column("code").unwrap().is_primary_key);
        assert!(codes.references("accounts"));
        assert!(!codes.is_one_to_one_with("accounts"));
    }

    #[test]
    fn test_inline_mysql_indexes() {
        let table = parse_create_table(
            "CREATE TABLE IF NOT EXISTS `account_jwt_refresh_keys` (\n    id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,\n    account_id BIGINT NOT NULL,\n    `key` VARCHAR(255) NOT NULL,\n    UNIQUE KEY account_jwt_refresh_keys_key_index (`key`),\n    KEY account_jwt_refresh_keys_account_id_index (account_id)\n)",
        )
        .unwrap();

        assert_eq!(
            table.columns.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            vec!["id", "account_id", "key"]
        );
        assert_eq!(table.column("key").unwrap().data_type, "VARCHAR(255)");
        assert_eq!(table.indexes.len(), 2);
        assert_eq!(table.indexes[0].name, "account_jwt_refresh_keys_key_index");
        assert_eq!(table.indexes[0].columns, vec!["key"]);
        assert!(table.indexes[0].is_unique);
        assert_eq!(table.indexes[1].columns, vec!["account_id"]);
        assert!(!table.indexes[1].is_unique);
    }

    #[test]
    fn test_inline_references() {
        let table = parse_create_table(
            "CREATE TABLE account_password_hashes (id BIGINT PRIMARY KEY REFERENCES accounts(id), password_hash VARCHAR(255) NOT NULL)",
        )
        .unwrap();
        assert!(table.is_one_to_one_with("accounts"));
        assert_eq!(table.column("password_hash").unwrap().data_type, "VARCHAR(255)");
    }

    #[test]
    fn test_drop_statement_kind() {
        let statement = Statement::parse("DROP TABLE IF EXISTS account_remember_keys;");
        assert_eq!(
            statement.kind,
            StatementKind::DropTable("account_remember_keys".to_string())
        );
        assert_eq!(statement.to_sql(), "DROP TABLE IF EXISTS account_remember_keys;");
    }
}
