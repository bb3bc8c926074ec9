use std::sync::Arc;

use poem::Result as PoemResult;
use poem_openapi::{OpenApi, payload::PlainText};

use crate::presentation::http::endpoints::root::{ApiState, EndpointsTags, internal_error};

#[derive(Clone)]
pub struct DispatchEndpoints {
    state: Arc<ApiState>,
}

impl DispatchEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }
}

#[OpenApi]
impl DispatchEndpoints {
    #[oai(path = "/start", method = "get", tag = EndpointsTags::Dispatch)]
    pub async fn start(&self) -> PoemResult<PlainText<&'static str>> {
        self.state
            .scheduler
            .start(self.state.shutdown.clone())
            .await
            .map_err(internal_error)?;

        Ok(PlainText("Scheduler started"))
    }

    #[oai(path = "/stop", method = "get", tag = EndpointsTags::Dispatch)]
    pub async fn stop(&self) -> PoemResult<PlainText<&'static str>> {
        self.state.scheduler.stop().await.map_err(internal_error)?;

        Ok(PlainText("Scheduler stopped"))
    }
}
