pub mod list_sent_messages;
