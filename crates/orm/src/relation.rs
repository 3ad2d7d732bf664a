//! # Relational query compiler
//!
//! Compiles a nested filter against a root table into a single SELECT that
//! returns the root's columns plus one JSON object per joined reference.
//!
//! Compilation runs in two steps. Planning walks the filter, resolving each
//! reference field through the [`Registry`] and ensuring the referenced
//! table's schema. Rendering then assigns aliases (`t0` for the root, then
//! `t1`, `t2`, ... depth first) and emits the joins, predicates, and
//! projections.
//!
//! ```text
//! SELECT "t0".*,
//!        CASE WHEN "t1"."id" IS NULL THEN NULL
//!             ELSE json_object('id', "t1"."id", 'test', "t1"."test") END AS "one"
//! FROM "Two" AS "t0"
//! INNER JOIN "One" AS "t1" ON "t1"."id" = "t0"."one::reference"
//! WHERE "t1"."id" = ?
//! ```

use futures::FutureExt;
use futures::future::BoxFuture;
use sea_query::{Alias, Expr, Func, Keyword, SimpleExpr};

use crate::clause::compile;
use crate::codec::Embedded;
use crate::error::{Error, Result};
use crate::field::{FieldSet, FieldSpec, ID_COLUMN};
use crate::filter::Filter;
use crate::join::Join;
use crate::query::Query;
use crate::registry::Registry;
use crate::select::{SelectBuilder, table_column};
use crate::value::Record;

/// Maximum nesting of reference joins in one query.
pub const MAX_JOIN_DEPTH: usize = 16;

const ROOT_ALIAS: &str = "t0";

/// A compiled relational query and the shape of its embedded references.
#[derive(Debug, Clone)]
pub struct RelationalQuery {
    /// The statement.
    pub query: Query,
    /// Embedded references of the root table, in projection order.
    pub embedded: Vec<Embedded>,
}

/// Compiles `filter` against the root table `table` whose effective fields
/// are `fields`.
///
/// # Errors
///
/// Returns [`Error::ReferenceResolution`] for a joined reference whose target
/// is unknown or unregistered, [`Error::JoinDepthExceeded`] when joins nest
/// deeper than [`MAX_JOIN_DEPTH`], and any error raised while ensuring a
/// referenced table's schema.
pub async fn compile_relational(
    registry: &Registry, table: &str, fields: FieldSet, filter: Record,
) -> Result<RelationalQuery> {
    let root = plan(registry, table.to_string(), fields, filter, 0).await?;
    render(root)
}

#[derive(Debug)]
struct Node {
    table: String,
    fields: FieldSet,
    predicates: Vec<Filter>,
    children: Vec<Child>,
}

#[derive(Debug)]
struct Child {
    field: FieldSpec,
    node: Node,
}

fn plan(
    registry: &Registry, table: String, fields: FieldSet, filter: Record, depth: usize,
) -> BoxFuture<'_, Result<Node>> {
    async move {
        let clause = compile(&fields, &filter)?;

        let mut children = Vec::with_capacity(clause.joins.len());
        for join in clause.joins {
            if depth >= MAX_JOIN_DEPTH {
                return Err(Error::JoinDepthExceeded {
                    table,
                    depth: MAX_JOIN_DEPTH,
                });
            }

            let target = registry.resolve(&table, &join.field)?;
            let target_fields = target.schema().await?;
            let node =
                plan(registry, target.name().to_string(), target_fields, join.filter, depth + 1)
                    .await?;
            children.push(Child {
                field: join.field,
                node,
            });
        }

        Ok(Node {
            table,
            fields,
            predicates: clause.predicates,
            children,
        })
    }
    .boxed()
}

#[derive(Default)]
struct Parts {
    aliases: usize,
    joins: Vec<Join>,
    predicates: Vec<Filter>,
}

impl Parts {
    fn next_alias(&mut self) -> String {
        self.aliases += 1;
        format!("t{}", self.aliases)
    }
}

struct Projection {
    field: String,
    expr: SimpleExpr,
    embedded: Embedded,
}

fn render(root: Node) -> Result<RelationalQuery> {
    let mut parts = Parts::default();
    parts.predicates.extend(root.predicates.into_iter().map(|p| p.on(ROOT_ALIAS)));
    let projections = join_children(root.children, ROOT_ALIAS, false, &mut parts);

    let mut select = SelectBuilder::new(&root.table).alias(ROOT_ALIAS);
    for join in parts.joins {
        select = select.join(join);
    }

    let mut embedded = Vec::with_capacity(projections.len());
    for projection in projections {
        select = select.expr_as(projection.expr, &projection.field);
        embedded.push(projection.embedded);
    }

    if !parts.predicates.is_empty() {
        select = select.r#where(Filter::And(parts.predicates));
    }

    let query = select.order_by(Some(ROOT_ALIAS), ID_COLUMN).build()?;
    Ok(RelationalQuery { query, embedded })
}

// Joins beneath a LEFT join stay LEFT so an unmatched optional reference
// keeps its row.
fn join_children(
    children: Vec<Child>, parent: &str, left: bool, parts: &mut Parts,
) -> Vec<Projection> {
    let mut projections = Vec::with_capacity(children.len());

    for Child { field, node } in children {
        let alias = parts.next_alias();
        let left = left || !field.required;

        let on = Filter::col_eq(&alias, ID_COLUMN, parent, field.column());
        parts.joins.push(if left {
            Join::left(&node.table, &alias, on)
        } else {
            Join::inner(&node.table, &alias, on)
        });
        parts.predicates.extend(node.predicates.into_iter().map(|p| p.on(alias.clone())));

        let nested = join_children(node.children, &alias, left, parts);
        let (exprs, nested): (Vec<_>, Vec<_>) =
            nested.into_iter().map(|p| ((p.field, p.expr), p.embedded)).unzip();

        projections.push(Projection {
            expr: json_projection(&alias, &node.fields, exprs),
            embedded: Embedded {
                field: field.name.clone(),
                fields: node.fields,
                nested,
            },
            field: field.name,
        });
    }

    projections
}

// Keys are physical column names, except nested projections which are keyed
// by field name. NULL when the join found no row.
fn json_projection(alias: &str, fields: &FieldSet, nested: Vec<(String, SimpleExpr)>) -> SimpleExpr {
    let mut args: Vec<SimpleExpr> =
        vec![Expr::val(ID_COLUMN).into(), Expr::col(table_column(alias, ID_COLUMN)).into()];

    for field in fields {
        if nested.iter().any(|(name, _)| *name == field.name) {
            continue;
        }
        let column = field.column();
        args.push(Expr::val(column.as_str()).into());
        args.push(Expr::col(table_column(alias, &column)).into());
    }
    for (name, expr) in nested {
        args.push(Expr::val(name).into());
        args.push(expr);
    }

    let object: SimpleExpr = Func::cust(Alias::new("json_object")).args(args).into();
    Expr::case(Expr::col(table_column(alias, ID_COLUMN)).is_null(), SimpleExpr::Keyword(Keyword::Null))
        .finally(object)
        .into()
}
