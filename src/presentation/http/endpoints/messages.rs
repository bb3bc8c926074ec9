use std::sync::Arc;

use poem::Result as PoemResult;
use poem_openapi::{OpenApi, payload::Json};

use crate::presentation::http::{
    endpoints::root::{ApiState, EndpointsTags, internal_error},
    mappers::map_message,
    responses::MessageDto,
};

#[derive(Clone)]
pub struct MessagesEndpoints {
    state: Arc<ApiState>,
}

impl MessagesEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }
}

#[OpenApi]
impl MessagesEndpoints {
    #[oai(path = "/messages", method = "get", tag = EndpointsTags::Messages)]
    pub async fn list_sent(&self) -> PoemResult<Json<Vec<MessageDto>>> {
        let messages = self
            .state
            .list_sent_messages_usecase
            .execute()
            .await
            .map_err(internal_error)?;

        Ok(Json(messages.iter().map(map_message).collect()))
    }
}
