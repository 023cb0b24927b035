use crate::error::{Diagnostic, RuleError, Span};
use crate::lint::{LintContext, Rule};
use crate::metadata::MetadataSnapshot;
use crate::parser::{ClauseKind, ColumnRef, StatementTree, TableRef};

/// Column that no table in scope provides.
///
/// Columns inside the clause holding the cursor are skipped since they are
/// likely still being typed. The whole statement is skipped when any table
/// in scope is missing from the snapshot: the unknown table could provide
/// anything.
pub struct UnresolvedColumn;

/// Columns of one table in scope, or `None` when its shape is unknown
enum Columns<'a> {
    Known(Vec<&'a str>),
    Unknown,
}

impl Columns<'_> {
    fn has(&self, name: &str) -> bool {
        match self {
            Columns::Known(cols) => cols.iter().any(|c| c.eq_ignore_ascii_case(name)),
            Columns::Unknown => true,
        }
    }
}

impl Rule for UnresolvedColumn {
    fn id(&self) -> &'static str {
        "unresolved-column"
    }

    fn check(&self, ctx: &LintContext<'_>) -> Result<Vec<Diagnostic>, RuleError> {
        let tree = ctx.tree;
        if tree.tables.is_empty() {
            return Ok(Vec::new());
        }
        let mut scope = Vec::with_capacity(tree.tables.len());
        for table in &tree.tables {
            match columns_of(tree, ctx.snapshot, table) {
                Some(columns) => scope.push((table, columns)),
                None => return Ok(Vec::new()),
            }
        }

        let typing = ctx.cursor.and_then(|cursor| {
            tree.clauses
                .iter()
                .map(|c| c.span())
                .filter(|span| span.touches(cursor))
                .max_by_key(|span| span.start)
        });

        let mut diagnostics = Vec::new();
        for column in &tree.columns {
            if column.span == Span::default() {
                continue;
            }
            if typing.map(|t| t.contains_span(&column.span)).unwrap_or(false) {
                continue;
            }
            if let Some(diag) = self.resolve(tree, &scope, column) {
                diagnostics.push(diag.with_stale_metadata(ctx.stale));
            }
        }
        Ok(diagnostics)
    }
}

impl UnresolvedColumn {
    fn resolve(
        &self,
        tree: &StatementTree,
        scope: &[(&TableRef, Columns<'_>)],
        column: &ColumnRef,
    ) -> Option<Diagnostic> {
        match &column.qualifier {
            Some(qualifier) => {
                // ON CONFLICT ... DO UPDATE SET x = excluded.x
                if qualifier.eq_ignore_ascii_case("excluded") {
                    return None;
                }
                let Some(table) = tree.table_for_qualifier(qualifier) else {
                    return Some(
                        Diagnostic::warning(
                            self.id(),
                            format!("Unknown table or alias '{qualifier}'"),
                            column.span,
                        )
                        .with_help("Add the table to FROM or JOIN, or fix the alias"),
                    );
                };
                let (_, columns) = scope.iter().find(|(t, _)| std::ptr::eq(*t, table))?;
                if columns.has(&column.name) {
                    return None;
                }
                let mut diag = Diagnostic::warning(
                    self.id(),
                    format!(
                        "Column '{}' not found in table '{}'",
                        column.name, table.name
                    ),
                    column.span,
                );
                if let Some(similar) = find_similar_column(std::iter::once(columns), &column.name)
                {
                    diag = diag.with_help(format!("Did you mean '{similar}'?"));
                }
                Some(diag)
            }
            None => {
                let sorts = matches!(
                    column.clause,
                    Some(ClauseKind::OrderBy | ClauseKind::GroupBy | ClauseKind::Having)
                );
                if sorts
                    && tree
                        .output_aliases
                        .iter()
                        .any(|a| a.eq_ignore_ascii_case(&column.name))
                {
                    return None;
                }
                if scope.iter().any(|(_, cols)| cols.has(&column.name)) {
                    return None;
                }
                let mut diag = Diagnostic::warning(
                    self.id(),
                    format!("Column '{}' not found in any table in scope", column.name),
                    column.span,
                );
                if let Some(similar) =
                    find_similar_column(scope.iter().map(|(_, c)| c), &column.name)
                {
                    diag = diag.with_help(format!("Did you mean '{similar}'?"));
                }
                Some(diag)
            }
        }
    }
}

/// Columns a table in scope provides. `None` if the table is unknown.
fn columns_of<'a>(
    tree: &'a StatementTree,
    snapshot: &'a MetadataSnapshot,
    table: &TableRef,
) -> Option<Columns<'a>> {
    if table.schema.is_none() {
        if let Some(cte) = tree.cte(&table.name) {
            if cte.columns.is_empty() || cte.columns.iter().any(|c| c.starts_with("?column?")) {
                return Some(Columns::Unknown);
            }
            return Some(Columns::Known(
                cte.columns.iter().map(String::as_str).collect(),
            ));
        }
    }
    let meta = snapshot.table(table.schema.as_deref(), &table.name)?;
    Some(Columns::Known(meta.column_names()))
}

/// Closest column name within edit distance 3
fn find_similar_column<'a, 'b>(
    scope: impl Iterator<Item = &'a Columns<'b>>,
    name: &str,
) -> Option<String>
where
    'b: 'a,
{
    let name_lower = name.to_lowercase();
    let mut best_match: Option<(usize, &str)> = None;

    for columns in scope {
        let Columns::Known(cols) = columns else {
            continue;
        };
        for col_name in cols {
            let distance = levenshtein_distance(&name_lower, &col_name.to_lowercase());
            if distance <= 3 && best_match.map(|(d, _)| distance < d).unwrap_or(true) {
                best_match = Some((distance, *col_name));
            }
        }
    }

    best_match.map(|(_, name)| name.to_string())
}

fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let n = b_chars.len();
    if a_chars.is_empty() {
        return n;
    }

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0; n + 1];
    for (i, ca) in a_chars.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[n]
}
