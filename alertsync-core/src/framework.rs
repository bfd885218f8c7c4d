use sqlx::PgPool;

/// Relational source of truth. Queries are expressed as input structs with a
/// `Processor` impl on this type (see [`crate::entities`]).
#[derive(Clone)]
pub struct DatabaseProcessor {
    pub pool: PgPool,
}
