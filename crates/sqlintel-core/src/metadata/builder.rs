//! Snapshot builder - turns DDL text into a `SchemaDraft`

use sqlparser::ast::{
    AlterTableOperation, ColumnDef, ColumnOption, CreateIndex, CreateTable, Expr, ObjectName,
    SelectItem, SetExpr, Statement, TableConstraint, TableFactor,
};
use sqlparser::dialect::Dialect;
use sqlparser::parser::Parser;

use super::snapshot::{ColumnMeta, IndexMeta, SchemaDraft, TableKind, TableMeta};
use crate::dialect::SqlDialect;
use crate::parser::statement_ranges;

/// Builds schema drafts from CREATE / ALTER statements, the way a live
/// refresher would from introspection queries
pub struct SnapshotBuilder {
    dialect: Box<dyn Dialect + Send + Sync>,
    draft: SchemaDraft,
    warnings: Vec<String>,
}

impl SnapshotBuilder {
    pub fn new(dialect: SqlDialect) -> Self {
        let default_schema = match dialect.default_schema() {
            "" => "public",
            schema => schema,
        };
        Self {
            dialect: dialect.parser_dialect(),
            draft: SchemaDraft::new(default_schema),
            warnings: Vec::new(),
        }
    }

    /// Add the definitions in `sql`. Statements that do not parse or do not
    /// define schema objects are skipped.
    pub fn parse(&mut self, sql: &str) {
        match Parser::parse_sql(self.dialect.as_ref(), sql) {
            Ok(statements) => {
                for stmt in statements {
                    self.process_statement(&stmt);
                }
            }
            Err(_) => self.parse_statements_individually(sql),
        }
    }

    /// Fall back to one statement at a time so unsupported syntax (functions,
    /// triggers, domains) does not hide the tables around it
    fn parse_statements_individually(&mut self, sql: &str) {
        for range in statement_ranges(sql) {
            let raw = sql[range.start..range.end].trim();
            if raw.is_empty() {
                continue;
            }
            match Parser::parse_sql(self.dialect.as_ref(), raw) {
                Ok(statements) => {
                    for stmt in statements {
                        self.process_statement(&stmt);
                    }
                }
                Err(err) => {
                    tracing::debug!(error = %err, "skipping unparseable schema statement");
                }
            }
        }
    }

    fn process_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::CreateTable(create) => self.process_create_table(create),
            Statement::CreateView {
                name,
                columns,
                query,
                ..
            } => {
                let names = if !columns.is_empty() {
                    columns.iter().map(|c| c.name.value.clone()).collect()
                } else {
                    self.infer_view_columns(&query.body)
                };
                let (schema, view_name) = split_name(name);
                let mut view = TableMeta::new(view_name, TableKind::View);
                view.columns = names
                    .into_iter()
                    .map(|n| ColumnMeta::new(n, String::new()))
                    .collect();
                self.draft.add_table(schema.as_deref(), view);
            }
            Statement::CreateIndex(index) => self.process_create_index(index),
            Statement::AlterTable {
                name, operations, ..
            } => self.process_alter_table(name, operations),
            _ => {}
        }
    }

    fn process_create_table(&mut self, create: &CreateTable) {
        let (schema, name) = split_name(&create.name);
        let mut table = TableMeta::new(name, TableKind::Table);
        for column in &create.columns {
            table.columns.push(column_meta(column));
        }
        for constraint in &create.constraints {
            apply_constraint(&mut table, constraint);
        }
        self.draft.add_table(schema.as_deref(), table);
    }

    fn process_create_index(&mut self, index: &CreateIndex) {
        let (schema, table_name) = split_name(&index.table_name);
        let Some(table) = self.draft.table_mut(schema.as_deref(), &table_name) else {
            self.warnings.push(format!(
                "CREATE INDEX references table '{}' which was not found in schema",
                table_name
            ));
            return;
        };
        let columns = index.columns.iter().map(|c| c.expr.to_string()).collect();
        let name = index
            .name
            .as_ref()
            .map(|n| n.to_string())
            .unwrap_or_else(|| format!("{}_idx", table.name));
        table.indexes.push(IndexMeta {
            name,
            columns,
            unique: index.unique,
        });
    }

    fn process_alter_table(&mut self, name: &ObjectName, operations: &[AlterTableOperation]) {
        let (schema, table_name) = split_name(name);
        if self
            .draft
            .table_mut(schema.as_deref(), &table_name)
            .is_none()
        {
            self.warnings.push(format!(
                "ALTER TABLE references table '{}' which was not found in schema",
                table_name
            ));
            return;
        }

        for operation in operations {
            match operation {
                AlterTableOperation::AddColumn { column_def, .. } => {
                    if let Some(table) = self.draft.table_mut(schema.as_deref(), &table_name) {
                        table.columns.push(column_meta(column_def));
                    }
                }
                AlterTableOperation::DropColumn { column_name, .. } => {
                    if let Some(table) = self.draft.table_mut(schema.as_deref(), &table_name) {
                        table
                            .columns
                            .retain(|c| !c.name.eq_ignore_ascii_case(&column_name.value));
                    }
                }
                AlterTableOperation::RenameColumn {
                    old_column_name,
                    new_column_name,
                } => {
                    if let Some(table) = self.draft.table_mut(schema.as_deref(), &table_name) {
                        if let Some(col) = table
                            .columns
                            .iter_mut()
                            .find(|c| c.name.eq_ignore_ascii_case(&old_column_name.value))
                        {
                            col.name = new_column_name.value.clone();
                        }
                    }
                }
                AlterTableOperation::RenameTable {
                    table_name: new_name,
                } => {
                    let schema_name = schema
                        .clone()
                        .unwrap_or_else(|| self.draft.default_schema.clone());
                    let (_, renamed) = split_name(new_name);
                    let tables = &mut self.draft.schema_mut(&schema_name).tables;
                    if let Some(mut table) = tables.shift_remove(&table_name) {
                        table.name = renamed.clone();
                        tables.insert(renamed, table);
                    }
                }
                AlterTableOperation::AddConstraint(constraint) => {
                    if let Some(table) = self.draft.table_mut(schema.as_deref(), &table_name) {
                        apply_constraint(table, constraint);
                    }
                }
                _ => {}
            }
        }
    }

    /// Infer column names from a view's SELECT, expanding `*` from tables
    /// defined earlier
    fn infer_view_columns(&self, set_expr: &SetExpr) -> Vec<String> {
        let mut columns = Vec::new();
        let SetExpr::Select(select) = set_expr else {
            return columns;
        };
        for item in &select.projection {
            match item {
                SelectItem::UnnamedExpr(Expr::Identifier(ident)) => {
                    columns.push(ident.value.clone());
                }
                SelectItem::UnnamedExpr(Expr::CompoundIdentifier(idents)) => {
                    if let Some(col) = idents.last() {
                        columns.push(col.value.clone());
                    }
                }
                SelectItem::ExprWithAlias { alias, .. } => columns.push(alias.value.clone()),
                SelectItem::Wildcard(_) => {
                    for table in &select.from {
                        if let TableFactor::Table { name, .. } = &table.relation {
                            self.expand_wildcard(name, &mut columns);
                        }
                    }
                }
                SelectItem::QualifiedWildcard(name, _) => self.expand_wildcard(name, &mut columns),
                _ => columns.push(format!("?column?{}", columns.len() + 1)),
            }
        }
        columns
    }

    fn expand_wildcard(&self, name: &ObjectName, columns: &mut Vec<String>) {
        let (schema, table_name) = split_name(name);
        let schema = schema.unwrap_or_else(|| self.draft.default_schema.clone());
        let found = self
            .draft
            .schemas
            .get(&schema)
            .and_then(|s| s.table(&table_name));
        if let Some(table) = found {
            columns.extend(table.columns.iter().map(|c| c.name.clone()));
        }
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Consume the builder and return the draft plus any warnings
    pub fn build(self) -> (SchemaDraft, Vec<String>) {
        (self.draft, self.warnings)
    }
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new(SqlDialect::default())
    }
}

fn split_name(name: &ObjectName) -> (Option<String>, String) {
    match name.0.as_slice() {
        [table] => (None, table.value.clone()),
        [.., schema, table] => (Some(schema.value.clone()), table.value.clone()),
        [] => (None, String::new()),
    }
}

fn column_meta(column: &ColumnDef) -> ColumnMeta {
    let mut meta = ColumnMeta::new(column.name.value.clone(), column.data_type.to_string());
    meta.nullable = Some(true);
    for option in &column.options {
        match &option.option {
            ColumnOption::Null => meta.nullable = Some(true),
            ColumnOption::NotNull => meta.nullable = Some(false),
            ColumnOption::Unique { is_primary, .. } if *is_primary => {
                meta.primary_key = true;
                meta.nullable = Some(false);
            }
            _ => {}
        }
    }
    meta
}

fn apply_constraint(table: &mut TableMeta, constraint: &TableConstraint) {
    match constraint {
        TableConstraint::PrimaryKey { columns, .. } => {
            for name in columns {
                if let Some(col) = table
                    .columns
                    .iter_mut()
                    .find(|c| c.name.eq_ignore_ascii_case(&name.value))
                {
                    col.primary_key = true;
                    col.nullable = Some(false);
                }
            }
        }
        TableConstraint::Unique { name, columns, .. } => {
            let columns: Vec<String> = columns.iter().map(|c| c.value.clone()).collect();
            let name = name
                .as_ref()
                .map(|n| n.value.clone())
                .unwrap_or_else(|| format!("{}_{}_key", table.name, columns.join("_")));
            table.indexes.push(IndexMeta {
                name,
                columns,
                unique: true,
            });
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(sql: &str) -> (SchemaDraft, Vec<String>) {
        let mut builder = SnapshotBuilder::new(SqlDialect::PostgreSQL);
        builder.parse(sql);
        builder.build()
    }

    #[test]
    fn test_parse_simple_table() {
        let (draft, _) = build(
            r#"
            CREATE TABLE users (
                id SERIAL PRIMARY KEY,
                name VARCHAR(100) NOT NULL,
                email TEXT UNIQUE
            );
        "#,
        );
        let table = draft.schemas["public"].table("users").unwrap();
        assert_eq!(table.column_names(), vec!["id", "name", "email"]);
        assert!(table.column("id").unwrap().primary_key);
        assert_eq!(table.column("name").unwrap().nullable, Some(false));
        assert_eq!(table.column("name").unwrap().data_type, "VARCHAR(100)");
        assert_eq!(table.column("email").unwrap().nullable, Some(true));
    }

    #[test]
    fn test_views_and_indexes() {
        let (draft, warnings) = build(
            r#"
            CREATE TABLE orders (id INT, user_id INT, total NUMERIC);
            CREATE UNIQUE INDEX orders_user ON orders (user_id);
            CREATE VIEW big_orders AS SELECT * FROM orders WHERE total > 100;
        "#,
        );
        assert!(warnings.is_empty());
        let public = &draft.schemas["public"];
        let orders = public.table("orders").unwrap();
        assert_eq!(orders.indexes.len(), 1);
        assert!(orders.indexes[0].unique);

        let view = public.table("big_orders").unwrap();
        assert_eq!(view.kind, TableKind::View);
        assert_eq!(view.column_names(), vec!["id", "user_id", "total"]);
    }

    #[test]
    fn test_alter_table() {
        let (draft, _) = build(
            r#"
            CREATE TABLE users (id INT, nick TEXT, legacy TEXT);
            ALTER TABLE users ADD COLUMN email TEXT;
            ALTER TABLE users DROP COLUMN legacy;
            ALTER TABLE users RENAME COLUMN nick TO handle;
            ALTER TABLE users RENAME TO members;
        "#,
        );
        let public = &draft.schemas["public"];
        assert!(public.table("users").is_none());
        let members = public.table("members").unwrap();
        assert_eq!(members.column_names(), vec!["id", "handle", "email"]);
    }

    #[test]
    fn test_unsupported_statements_are_skipped() {
        let (draft, _) = build(
            r#"
            CREATE TABLE users (id SERIAL PRIMARY KEY);

            CREATE FUNCTION touch() RETURNS TRIGGER AS $$
            BEGIN
                NEW.updated_at = NOW();
                RETURN NEW;
            END;
            $$ LANGUAGE plpgsql;

            CREATE TABLE posts (id SERIAL PRIMARY KEY, user_id INTEGER NOT NULL);
        "#,
        );
        let public = &draft.schemas["public"];
        assert!(public.table("users").is_some());
        assert!(public.table("posts").is_some());
    }

    #[test]
    fn test_schema_qualified_tables() {
        let (draft, _) = build("CREATE TABLE audit.events (id INT);");
        assert!(draft.schemas["audit"].table("events").is_some());
    }

    #[test]
    fn test_alter_unknown_table_warns() {
        let (_, warnings) = build("ALTER TABLE ghost ADD COLUMN x INT;");
        assert_eq!(warnings.len(), 1);
    }
}
