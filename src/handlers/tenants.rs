use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::auth::OwnerIdentity;
use crate::database::provisioner::tenant_db_name;
use crate::error::ApiError;
use crate::state::AppState;

/// POST /api/tenants/provision - ensure the caller's isolated store exists.
///
/// Called by the signup flow. Idempotent, and failure is fatal: signup must
/// fail visibly rather than leave an owner believing they have a usable
/// tenant when they do not.
pub async fn provision_post(
    State(state): State<AppState>,
    identity: OwnerIdentity,
) -> Result<Json<Value>, ApiError> {
    let tenant_db = tenant_db_name(identity.owner_type, &identity.id);
    state.provisioner.provision(&tenant_db).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "tenant": tenant_db, "status": "provisioned" }
    })))
}
