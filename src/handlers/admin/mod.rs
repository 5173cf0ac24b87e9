mod codes;
mod pool;

pub use codes::*;
pub use pool::*;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};

use crate::middleware::admin_auth;
use crate::store::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/codes", post(create_code))
        .route("/admin/codes/{code}", get(inspect_code))
        .route("/admin/codes/{code}/revoke", post(revoke_code))
        .route("/admin/slots", get(list_all_slots))
        .route("/admin/slots/{id}", put(upsert_slot))
        .route("/admin/credentials/{id}", put(upsert_credential))
        .route("/admin/credentials/{id}/lock", post(lock_credential))
        .route("/admin/leases/{code}/hide", post(hide_lease))
        .route_layer(from_fn_with_state(state, admin_auth))
}
