//! Single round trips under a [`Context`].
//!
//! Every statement the mapper, query builder and relation loader issue goes
//! through these two functions, which log the statement and race it against
//! the context.

use crate::client::DynClient;
use crate::context::Context;
use crate::error::OrmResult;
use crate::row::Row;
use crate::value::Value;

pub(crate) async fn fetch(
    ctx: &Context,
    conn: &dyn DynClient,
    sql: &str,
    params: &[Value],
) -> OrmResult<Vec<Row>> {
    tracing::debug!(target: "pgmap.sql", sql, params = params.len(), "query");
    let rows = conn.query_dyn(sql, params);
    ctx.run(conn.cancel_token_dyn(), rows).await
}

pub(crate) async fn execute(
    ctx: &Context,
    conn: &dyn DynClient,
    sql: &str,
    params: &[Value],
) -> OrmResult<u64> {
    tracing::debug!(target: "pgmap.sql", sql, params = params.len(), "execute");
    let affected = conn.execute_dyn(sql, params);
    ctx.run(conn.cancel_token_dyn(), affected).await
}
