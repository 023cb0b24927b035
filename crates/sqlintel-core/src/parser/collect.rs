//! Reference collector - walks a parsed statement and records the tables,
//! CTEs and columns it mentions

use sqlparser::ast::{
    AssignmentTarget, Delete, Expr, FromTable, FunctionArg, FunctionArgExpr, FunctionArguments,
    GroupByExpr, Ident, Insert, ObjectName, Query, Select, SelectItem, SetExpr, Statement,
    Subscript, TableFactor, TableWithJoins,
};

use super::location::LineIndex;
use super::tree::{CteDef, StatementKind, TableRef};
use crate::error::Span;

/// Column reference before it is attributed to a clause
#[derive(Debug, Clone)]
pub(crate) struct RawColumn {
    pub(crate) qualifier: Option<String>,
    pub(crate) name: String,
    pub(crate) span: Option<Span>,
}

pub(crate) struct Collector<'a> {
    index: &'a LineIndex<'a>,
    pub(crate) tables: Vec<TableRef>,
    pub(crate) ctes: Vec<CteDef>,
    pub(crate) columns: Vec<RawColumn>,
    pub(crate) output_aliases: Vec<String>,
    /// False when the statement kind has no table/column walk and the
    /// token scan should supply tables instead
    pub(crate) walked: bool,
}

impl<'a> Collector<'a> {
    pub(crate) fn new(index: &'a LineIndex<'a>) -> Self {
        Self {
            index,
            tables: Vec::new(),
            ctes: Vec::new(),
            columns: Vec::new(),
            output_aliases: Vec::new(),
            walked: true,
        }
    }

    pub(crate) fn collect_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Query(query) => self.collect_query(query),
            Statement::Insert(insert) => self.collect_insert(insert),
            Statement::Update {
                table,
                assignments,
                from,
                selection,
                returning,
                ..
            } => {
                self.collect_table_with_joins(table);
                if let Some(from) = from {
                    self.collect_table_with_joins(from);
                }
                for assignment in assignments {
                    if let AssignmentTarget::ColumnName(name) = &assignment.target {
                        if let Some(col) = name.0.last() {
                            self.push_column(None, col);
                        }
                    }
                    self.collect_expr(&assignment.value);
                }
                if let Some(selection) = selection {
                    self.collect_expr(selection);
                }
                if let Some(items) = returning {
                    self.collect_select_items(items);
                }
            }
            Statement::Delete(delete) => self.collect_delete(delete),
            Statement::CreateView { query, .. } => {
                self.walked = false;
                self.collect_query(query);
            }
            _ => self.walked = false,
        }
    }

    fn collect_insert(&mut self, insert: &Insert) {
        self.push_table(&insert.table_name, insert.table_alias.as_ref());
        for col in &insert.columns {
            self.push_column(None, col);
        }
        if let Some(source) = &insert.source {
            self.collect_query(source);
        }
        if let Some(items) = &insert.returning {
            self.collect_select_items(items);
        }
    }

    fn collect_delete(&mut self, delete: &Delete) {
        let tables = match &delete.from {
            FromTable::WithFromKeyword(tables) => tables,
            FromTable::WithoutKeyword(tables) => tables,
        };
        for table in tables {
            self.collect_table_with_joins(table);
        }
        if let Some(using) = &delete.using {
            for table in using {
                self.collect_table_with_joins(table);
            }
        }
        if let Some(selection) = &delete.selection {
            self.collect_expr(selection);
        }
        if let Some(items) = &delete.returning {
            self.collect_select_items(items);
        }
    }

    fn collect_query(&mut self, query: &Query) {
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                let columns = if !cte.alias.columns.is_empty() {
                    cte.alias
                        .columns
                        .iter()
                        .map(|c| c.name.value.clone())
                        .collect()
                } else {
                    infer_columns(&cte.query.body)
                };
                self.ctes.push(CteDef {
                    name: cte.alias.name.value.clone(),
                    columns,
                    span: self.ident_span(&cte.alias.name).unwrap_or_default(),
                    body: None,
                    referenced: false,
                });
                self.collect_query(&cte.query);
            }
        }

        self.collect_set_expr(&query.body);

        if let Some(order_by) = &query.order_by {
            for ob in &order_by.exprs {
                self.collect_expr(&ob.expr);
            }
        }
    }

    fn collect_set_expr(&mut self, set_expr: &SetExpr) {
        match set_expr {
            SetExpr::Select(select) => self.collect_select(select),
            SetExpr::Query(query) => self.collect_query(query),
            SetExpr::SetOperation { left, right, .. } => {
                self.collect_set_expr(left);
                self.collect_set_expr(right);
            }
            SetExpr::Values(values) => {
                for row in &values.rows {
                    for expr in row {
                        self.collect_expr(expr);
                    }
                }
            }
            _ => {}
        }
    }

    fn collect_select(&mut self, select: &Select) {
        for table in &select.from {
            self.collect_table_with_joins(table);
        }
        self.collect_select_items(&select.projection);
        if let Some(selection) = &select.selection {
            self.collect_expr(selection);
        }
        if let GroupByExpr::Expressions(exprs, _) = &select.group_by {
            for expr in exprs {
                self.collect_expr(expr);
            }
        }
        if let Some(having) = &select.having {
            self.collect_expr(having);
        }
    }

    fn collect_select_items(&mut self, items: &[SelectItem]) {
        for item in items {
            match item {
                SelectItem::UnnamedExpr(expr) => self.collect_expr(expr),
                SelectItem::ExprWithAlias { expr, alias } => {
                    self.collect_expr(expr);
                    self.output_aliases.push(alias.value.clone());
                }
                SelectItem::QualifiedWildcard(_, _) | SelectItem::Wildcard(_) => {}
            }
        }
    }

    fn collect_table_with_joins(&mut self, table: &TableWithJoins) {
        self.collect_table_factor(&table.relation);
        for join in &table.joins {
            self.collect_table_factor(&join.relation);
            self.collect_join_condition(&join.join_operator);
        }
    }

    fn collect_join_condition(&mut self, join_op: &sqlparser::ast::JoinOperator) {
        use sqlparser::ast::JoinConstraint;
        use sqlparser::ast::JoinOperator::*;

        let constraint = match join_op {
            Inner(c) | LeftOuter(c) | RightOuter(c) | FullOuter(c) | LeftSemi(c) | RightSemi(c)
            | LeftAnti(c) | RightAnti(c) => Some(c),
            CrossJoin | CrossApply | OuterApply | AsOf { .. } | Anti(_) | Semi(_) => None,
        };

        match constraint {
            Some(JoinConstraint::On(expr)) => self.collect_expr(expr),
            Some(JoinConstraint::Using(columns)) => {
                for col in columns {
                    self.push_column(None, col);
                }
            }
            _ => {}
        }
    }

    fn collect_table_factor(&mut self, factor: &TableFactor) {
        match factor {
            TableFactor::Table {
                name, alias, args, ..
            } => {
                if args.is_some() {
                    // table-valued function: only the alias is addressable
                    if let Some(a) = alias {
                        self.push_alias_only(&a.name);
                    }
                    return;
                }
                self.push_table(name, alias.as_ref().map(|a| &a.name));
            }
            TableFactor::Derived {
                subquery, alias, ..
            } => {
                self.collect_query(subquery);
                if let Some(a) = alias {
                    self.push_alias_only(&a.name);
                }
            }
            TableFactor::TableFunction { alias, .. } | TableFactor::Function { alias, .. } => {
                if let Some(a) = alias {
                    self.push_alias_only(&a.name);
                }
            }
            TableFactor::NestedJoin {
                table_with_joins, ..
            } => self.collect_table_with_joins(table_with_joins),
            _ => {}
        }
    }

    fn collect_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Identifier(ident) => self.push_column(None, ident),
            Expr::CompoundIdentifier(idents) => match idents.as_slice() {
                [table, column] | [_, table, column] => self.push_column(Some(table), column),
                _ => {}
            },
            Expr::BinaryOp { left, right, .. }
            | Expr::AnyOp { left, right, .. }
            | Expr::AllOp { left, right, .. } => {
                self.collect_expr(left);
                self.collect_expr(right);
            }
            Expr::UnaryOp { expr, .. }
            | Expr::Nested(expr)
            | Expr::IsNull(expr)
            | Expr::IsNotNull(expr)
            | Expr::IsTrue(expr)
            | Expr::IsFalse(expr)
            | Expr::IsNotTrue(expr)
            | Expr::IsNotFalse(expr)
            | Expr::IsUnknown(expr)
            | Expr::IsNotUnknown(expr)
            | Expr::Cast { expr, .. }
            | Expr::Extract { expr, .. }
            | Expr::Collate { expr, .. }
            | Expr::Ceil { expr, .. }
            | Expr::Floor { expr, .. } => self.collect_expr(expr),
            Expr::Function(func) => {
                self.collect_function_args(&func.args);
                if let Some(filter) = &func.filter {
                    self.collect_expr(filter);
                }
                if let Some(sqlparser::ast::WindowType::WindowSpec(spec)) = &func.over {
                    for e in &spec.partition_by {
                        self.collect_expr(e);
                    }
                    for ob in &spec.order_by {
                        self.collect_expr(&ob.expr);
                    }
                }
            }
            Expr::InList { expr, list, .. } => {
                self.collect_expr(expr);
                for e in list {
                    self.collect_expr(e);
                }
            }
            Expr::InSubquery { expr, subquery, .. } => {
                self.collect_expr(expr);
                self.collect_query(subquery);
            }
            Expr::Subquery(query) | Expr::Exists { subquery: query, .. } => {
                self.collect_query(query)
            }
            Expr::Between {
                expr, low, high, ..
            } => {
                self.collect_expr(expr);
                self.collect_expr(low);
                self.collect_expr(high);
            }
            Expr::Case {
                operand,
                conditions,
                results,
                else_result,
            } => {
                if let Some(op) = operand {
                    self.collect_expr(op);
                }
                for e in conditions.iter().chain(results) {
                    self.collect_expr(e);
                }
                if let Some(e) = else_result {
                    self.collect_expr(e);
                }
            }
            Expr::Substring {
                expr,
                substring_from,
                substring_for,
                ..
            } => {
                self.collect_expr(expr);
                for e in [substring_from, substring_for].into_iter().flatten() {
                    self.collect_expr(e);
                }
            }
            Expr::Trim {
                expr, trim_what, ..
            } => {
                self.collect_expr(expr);
                if let Some(what) = trim_what {
                    self.collect_expr(what);
                }
            }
            Expr::Position { expr, r#in } => {
                self.collect_expr(expr);
                self.collect_expr(r#in);
            }
            Expr::Like { expr, pattern, .. }
            | Expr::ILike { expr, pattern, .. }
            | Expr::SimilarTo { expr, pattern, .. }
            | Expr::RLike { expr, pattern, .. } => {
                self.collect_expr(expr);
                self.collect_expr(pattern);
            }
            Expr::IsDistinctFrom(a, b) | Expr::IsNotDistinctFrom(a, b) => {
                self.collect_expr(a);
                self.collect_expr(b);
            }
            Expr::AtTimeZone {
                timestamp,
                time_zone,
            } => {
                self.collect_expr(timestamp);
                self.collect_expr(time_zone);
            }
            Expr::Tuple(exprs) => {
                for e in exprs {
                    self.collect_expr(e);
                }
            }
            Expr::Array(arr) => {
                for e in &arr.elem {
                    self.collect_expr(e);
                }
            }
            Expr::Subscript { expr, subscript } => {
                self.collect_expr(expr);
                match subscript.as_ref() {
                    Subscript::Index { index } => self.collect_expr(index),
                    Subscript::Slice {
                        lower_bound,
                        upper_bound,
                        stride,
                    } => {
                        for e in [lower_bound, upper_bound, stride].into_iter().flatten() {
                            self.collect_expr(e);
                        }
                    }
                }
            }
            Expr::JsonAccess { value, .. } => self.collect_expr(value),
            // literals, parameters and intervals carry no references
            _ => {}
        }
    }

    fn collect_function_args(&mut self, args: &FunctionArguments) {
        if let FunctionArguments::List(list) = args {
            for arg in &list.args {
                match arg {
                    FunctionArg::Unnamed(FunctionArgExpr::Expr(e))
                    | FunctionArg::Named {
                        arg: FunctionArgExpr::Expr(e),
                        ..
                    }
                    | FunctionArg::ExprNamed {
                        arg: FunctionArgExpr::Expr(e),
                        ..
                    } => self.collect_expr(e),
                    _ => {}
                }
            }
        }
    }

    fn ident_span(&self, ident: &Ident) -> Option<Span> {
        self.index.span(&ident.span)
    }

    fn push_table(&mut self, name: &ObjectName, alias: Option<&Ident>) {
        let parts = &name.0;
        let Some(last) = parts.last() else {
            return;
        };
        let span = parts
            .iter()
            .filter_map(|id| self.ident_span(id))
            .reduce(|a, b| a.cover(&b))
            .unwrap_or_default();
        let schema = parts.len().checked_sub(2).map(|i| parts[i].value.clone());
        self.tables.push(TableRef {
            schema,
            name: last.value.clone(),
            alias: alias.map(|a| a.value.clone()),
            span,
        });
    }

    fn push_alias_only(&mut self, alias: &Ident) {
        self.tables.push(TableRef {
            schema: None,
            name: alias.value.clone(),
            alias: None,
            span: self.ident_span(alias).unwrap_or_default(),
        });
    }

    fn push_column(&mut self, qualifier: Option<&Ident>, column: &Ident) {
        let span = match (qualifier.and_then(|q| self.ident_span(q)), self.ident_span(column)) {
            (Some(q), Some(c)) => Some(q.cover(&c)),
            (_, c) => c,
        };
        self.columns.push(RawColumn {
            qualifier: qualifier.map(|q| q.value.clone()),
            name: column.value.clone(),
            span,
        });
    }
}

/// Output column names of a query body, from its first SELECT
pub(crate) fn infer_columns(set_expr: &SetExpr) -> Vec<String> {
    match set_expr {
        SetExpr::SetOperation { left, .. } => infer_columns(left),
        SetExpr::Query(query) => infer_columns(&query.body),
        SetExpr::Select(select) => select
            .projection
            .iter()
            .enumerate()
            .filter_map(|(idx, item)| match item {
                SelectItem::UnnamedExpr(Expr::Identifier(ident)) => Some(ident.value.clone()),
                SelectItem::UnnamedExpr(Expr::CompoundIdentifier(idents)) => {
                    idents.last().map(|id| id.value.clone())
                }
                SelectItem::ExprWithAlias { alias, .. } => Some(alias.value.clone()),
                SelectItem::Wildcard(_) | SelectItem::QualifiedWildcard(_, _) => None,
                _ => Some(format!("?column?{}", idx + 1)),
            })
            .collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn statement_kind(stmt: &Statement) -> StatementKind {
    match stmt {
        Statement::Query(_) => StatementKind::Select,
        Statement::Insert(_) => StatementKind::Insert,
        Statement::Update { .. } => StatementKind::Update,
        Statement::Delete(_) => StatementKind::Delete,
        Statement::CreateTable(_)
        | Statement::CreateView { .. }
        | Statement::CreateIndex(_)
        | Statement::CreateSchema { .. }
        | Statement::CreateType { .. } => StatementKind::Create,
        Statement::AlterTable { .. } => StatementKind::Alter,
        Statement::Drop { .. } => StatementKind::Drop,
        Statement::Truncate { .. } => StatementKind::Truncate,
        _ => StatementKind::Other,
    }
}

/// True if the statement filters its target rows
pub(crate) fn has_where(stmt: &Statement) -> Option<bool> {
    match stmt {
        Statement::Update { selection, .. } => Some(selection.is_some()),
        Statement::Delete(delete) => Some(delete.selection.is_some()),
        _ => None,
    }
}
