//! Specialty listing, gated on the forum specialty capability.
//!
//! Clients populate their filter dropdowns from this endpoint rather
//! than hard-coding the specialty list; a deployment whose schema has
//! not caught up answers 503 and the client hides the filter.

use axum::{extract::State, Json};
use serde::Serialize;

use mednucleus_core::specialty::OpportunityType;
use mednucleus_schema::FeatureKey;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SpecialtyList {
    pub specialties: Vec<&'static str>,
}

/// GET /api/specialties
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<SpecialtyList>> {
    if !state.boot.capabilities.enabled(FeatureKey::ForumSpecialty) {
        return Err(ApiError::feature_unavailable(
            "specialty filtering is not available on this deployment yet",
        ));
    }
    let specialties = OpportunityType::ALL.iter().map(|s| s.as_str()).collect();
    Ok(Json(SpecialtyList { specialties }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mednucleus_schema::boot;
    use mednucleus_schema::env_check::EnvReport;

    #[tokio::test]
    async fn disabled_capability_answers_unavailable() {
        let report = boot::run_with(EnvReport::default(), None).await;
        let state = AppState::new(report);
        let result = list(State(state)).await;
        assert!(result.is_err());
    }
}
