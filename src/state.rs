use crate::db::{DbPool, OrmConn};

/// Shared handles cloned into every handler: the sqlx pool for the raw SQL
/// paths and the SeaORM connection for transactional workflows.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
}
