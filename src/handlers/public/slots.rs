use axum::extract::State;
use serde::Serialize;

use crate::error::Result;
use crate::extractors::Json;
use crate::store::{records, AppState};

#[derive(Debug, Serialize)]
pub struct SlotSummary {
    pub id: String,
    pub name: String,
    pub platform: String,
    pub duration_hours: i64,
    pub required_amount: i64,
}

/// GET /slots - Enabled slot categories.
pub async fn list_slots(State(state): State<AppState>) -> Result<Json<Vec<SlotSummary>>> {
    let conn = state.db.get()?;
    let slots = records::list_slots(&conn)?
        .into_iter()
        .filter(|s| s.enabled)
        .map(|s| SlotSummary {
            duration_hours: s.duration.hours(),
            id: s.id,
            name: s.name,
            platform: s.platform,
            required_amount: s.required_amount,
        })
        .collect();
    Ok(Json(slots))
}
