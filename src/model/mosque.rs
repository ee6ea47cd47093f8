use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Mosque {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Masjid Al-Ikhlas")]
    pub name: String,
    #[schema(example = "Jl. Merdeka No. 1")]
    pub address: Option<String>,
}
