use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({ "id": 1, "name": "John Doe" }))]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    /// first and last name joined
    #[schema(example = "John Doe")]
    pub name: String,
}
