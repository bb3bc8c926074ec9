use poem_openapi::Object;
use uuid::Uuid;

use crate::presentation::models::MessageStatusDto;

#[derive(Object)]
pub struct MessageDto {
    pub id: Uuid,
    pub recipient: String,
    pub content: String,
    pub status: MessageStatusDto,
    pub created_at: String,
    pub updated_at: String,
}
