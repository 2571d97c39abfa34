use serde::{Deserialize, Serialize};

/// Body of `POST /topics/{topic_id}/events`.
#[derive(Debug, Deserialize, Serialize)]
pub struct CreateCommentRequest {
    pub body: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub topics: usize,
}
