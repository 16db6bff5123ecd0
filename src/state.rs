use crate::{
    config::CartLockScope,
    db::{DbPool, OrmConn},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub cart_lock: CartLockScope,
}
