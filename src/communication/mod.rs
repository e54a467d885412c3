pub mod messages;
pub mod update_channel;
