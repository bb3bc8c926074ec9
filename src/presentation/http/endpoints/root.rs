use std::sync::Arc;

use poem_openapi::Tags;
use tokio_util::sync::CancellationToken;

use crate::application::{
    services::scheduler::DispatchScheduler, usecases::list_sent_messages::ListSentMessagesUseCase,
};

pub struct ApiState {
    pub scheduler: Arc<DispatchScheduler>,
    pub list_sent_messages_usecase: Arc<ListSentMessagesUseCase>,
    /// Process-wide shutdown token handed to the scheduler as the
    /// caller-supplied cancellation source.
    pub shutdown: CancellationToken,
}

/// Enum of API sections (tags)
#[derive(Tags)]
pub enum EndpointsTags {
    Health,
    Dispatch,
    Messages,
}

pub fn internal_error(err: anyhow::Error) -> poem::Error {
    poem::Error::from_string(
        err.to_string(),
        poem::http::StatusCode::INTERNAL_SERVER_ERROR,
    )
}
