//! Built-in suggestion sources

use std::sync::Arc;

use super::{Candidate, SuggestRequest, SuggestionKind, SuggestionSource};
use crate::catalog::CatalogStore;
use crate::dialect::SqlDialect;
use crate::metadata::{MetadataSnapshot, TableKind};
use crate::parser::{is_reserved_word, TableRef};

/// Keywords, functions and snippets from the dialect catalog
pub struct CatalogSuggestions {
    catalog: Arc<CatalogStore>,
}

impl CatalogSuggestions {
    pub fn new(catalog: Arc<CatalogStore>) -> Self {
        Self { catalog }
    }
}

impl SuggestionSource for CatalogSuggestions {
    fn name(&self) -> &'static str {
        "catalog"
    }

    fn collect(&self, request: &SuggestRequest<'_>, out: &mut Vec<Candidate>) {
        let clause = request.context.clause;
        let kinds = request.kinds;
        if kinds.keywords {
            out.extend(self.catalog.keywords_for(clause).map(|k| {
                Candidate::new(SuggestionKind::Keyword, k.keyword, k.detail, k.keyword)
            }));
        }
        if kinds.functions {
            out.extend(self.catalog.functions_for(clause).map(|f| {
                Candidate::new(
                    SuggestionKind::Function,
                    f.name,
                    f.signature,
                    format!("{}()", f.name),
                )
            }));
        }
        if kinds.snippets {
            let table = request.context.tables.first().map(|t| t.name.as_str());
            out.extend(self.catalog.snippets_for(clause).map(|s| {
                Candidate::new(SuggestionKind::Snippet, s.label, s.detail, s.render(table))
            }));
        }
    }
}

/// Tables, views, CTEs and columns
pub struct SchemaIdentifiers {
    dialect: SqlDialect,
}

impl SchemaIdentifiers {
    pub fn new(dialect: SqlDialect) -> Self {
        Self { dialect }
    }

    fn columns(&self, request: &SuggestRequest<'_>, table: &TableRef, out: &mut Vec<Candidate>) {
        if table.schema.is_none() {
            if let Some(cte) = request.tree.cte(&table.name) {
                for column in cte.columns.iter().filter(|c| !c.starts_with("?column?")) {
                    out.push(Candidate::new(
                        SuggestionKind::Identifier,
                        column.as_str(),
                        format!("{} (CTE)", cte.name),
                        quote_ident(column, self.dialect),
                    ));
                }
                return;
            }
        }
        let Some(meta) = request
            .snapshot
            .table(table.schema.as_deref(), &table.name)
        else {
            return;
        };
        for column in &meta.columns {
            out.push(Candidate::new(
                SuggestionKind::Identifier,
                column.name.as_str(),
                format!("{}.{} {}", meta.name, column.name, column.data_type),
                quote_ident(&column.name, self.dialect),
            ));
        }
    }
}

impl SuggestionSource for SchemaIdentifiers {
    fn name(&self) -> &'static str {
        "schema"
    }

    fn collect(&self, request: &SuggestRequest<'_>, out: &mut Vec<Candidate>) {
        let ctx = request.context;

        if let Some(qualifier) = &ctx.qualifier {
            if let Some(table) = ctx.qualified_table() {
                self.columns(request, table, out);
            } else if let Some(schema) = request.snapshot.schema(qualifier) {
                out.extend(schema.tables.values().map(|t| {
                    Candidate::new(
                        SuggestionKind::Identifier,
                        t.name.as_str(),
                        kind_detail(t.kind),
                        quote_ident(&t.name, self.dialect),
                    )
                }));
            }
            return;
        }

        if request.kinds.tables {
            out.extend(request.schema_tables.iter().cloned());
            out.extend(request.tree.ctes.iter().map(|cte| {
                Candidate::new(
                    SuggestionKind::Identifier,
                    cte.name.as_str(),
                    "CTE",
                    quote_ident(&cte.name, self.dialect),
                )
            }));
        }
        if request.kinds.columns {
            for table in &ctx.tables {
                self.columns(request, table, out);
            }
        }
    }
}

/// Table and view candidates of a snapshot. Tables outside the default
/// schema are labelled `schema.table`.
pub fn table_candidates(snapshot: &MetadataSnapshot, dialect: SqlDialect) -> Vec<Candidate> {
    snapshot
        .tables()
        .map(|(schema, table)| {
            let quoted = quote_ident(&table.name, dialect);
            if schema.eq_ignore_ascii_case(&snapshot.default_schema) {
                Candidate::new(
                    SuggestionKind::Identifier,
                    table.name.as_str(),
                    kind_detail(table.kind),
                    quoted,
                )
            } else {
                Candidate::new(
                    SuggestionKind::Identifier,
                    format!("{}.{}", schema, table.name),
                    kind_detail(table.kind),
                    format!("{}.{}", quote_ident(schema, dialect), quoted),
                )
            }
        })
        .collect()
}

fn kind_detail(kind: TableKind) -> &'static str {
    match kind {
        TableKind::Table => "table",
        TableKind::View => "view",
    }
}

/// Quote `name` if it would not survive unquoted
pub(crate) fn quote_ident(name: &str, dialect: SqlDialect) -> String {
    let plain = name
        .chars()
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false)
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !is_reserved_word(name);
    // PostgreSQL folds unquoted names to lower case
    let folds = dialect == SqlDialect::PostgreSQL && name.chars().any(|c| c.is_ascii_uppercase());
    if plain && !folds {
        return name.to_string();
    }
    let quote = dialect.identifier_quote();
    let escaped = name.replace(quote, &format!("{quote}{quote}"));
    format!("{quote}{escaped}{quote}")
}
