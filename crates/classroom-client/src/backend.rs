use async_trait::async_trait;

use classroom_types::{Channel, NewChannel, User};

use crate::error::ClientError;

/// Read-only user lookup.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Users whose email contains `term`, in directory order.
    async fn search(&self, term: &str) -> Result<Vec<User>, ClientError>;
}

#[async_trait]
pub trait ChannelRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Channel>, ClientError>;

    async fn create(&self, channel: NewChannel) -> Result<Channel, ClientError>;
}
