pub mod api;
pub mod models;

pub use models::{Channel, ChannelMember, NewChannel, Role, User, email_contains};
