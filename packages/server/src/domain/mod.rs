//! Domain layer: value objects, entities, errors and the ports the relay depends on.

pub mod entity;
pub mod error;
pub mod message_pusher;
pub mod presence;
pub mod repository;
pub mod value_object;

pub use entity::{ChatMessage, ConnectionRecord, GroupKind, GroupOccupancy, VerifiedUser};
pub use error::{AuthError, MessagePushError, RegistryError, StorageError, ValueObjectError};
pub use message_pusher::{MessagePusher, PusherChannel};
pub use presence::{ConnectionRepository, RoomGroupRepository};
pub use repository::{IdentityProvider, MembershipAuthority, MessageLog};
pub use value_object::{ConnectionId, MessageId, MessageText, RoomId, Timestamp, UserId};
