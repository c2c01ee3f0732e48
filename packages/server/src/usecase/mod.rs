//! UseCase 層: リレーの各操作

pub mod authenticate;
pub mod broadcast;
pub mod chat_history;
pub mod connect_participant;
pub mod disconnect_participant;
pub mod error;
pub mod join_room;
pub mod membership_guard;
pub mod room_overview;
pub mod send_message;
pub mod signaling;

pub use authenticate::AuthenticateUseCase;
pub use broadcast::RoomBroadcaster;
pub use chat_history::ChatHistoryUseCase;
pub use connect_participant::ConnectParticipantUseCase;
pub use disconnect_participant::{DisconnectParticipantUseCase, DisconnectSummary};
pub use error::{AuthenticateError, HistoryError, JoinError, SendMessageError, SignalError};
pub use join_room::JoinRoomUseCase;
pub use membership_guard::{Admission, MembershipGuard};
pub use room_overview::{GetRoomOverviewUseCase, RoomOverview};
pub use send_message::{SendMessageUseCase, SentMessage};
pub use signaling::{SignalingUseCase, VideoJoin};
