//! UseCase layer: orchestrates the domain for each socket/HTTP operation.

mod connect_participant;
mod disconnect_participant;
mod end_session;
mod error;
mod gateway;
mod get_rooms;
mod interview;
mod send_message;

#[cfg(test)]
mod test_support;

pub use connect_participant::{
    Admission, ConnectParticipantUseCase, ConnectRequest, HISTORY_LIMIT, Session,
};
pub use disconnect_participant::DisconnectParticipantUseCase;
pub use end_session::{EndOutcome, EndSessionUseCase, SESSION_ENDED_NOTICE};
pub use error::{FinalizeError, MessageError};
pub use gateway::{ALREADY_ENDED_NOTICE, SessionGateway};
pub use get_rooms::GetRoomsUseCase;
pub use interview::{DEFAULT_GENERATION_TIMEOUT, InterviewService, InterviewSettings};
pub use send_message::{PROCESSING_NOTICE, SUMMARY_NOTICE, SendMessageUseCase};
