//! Session gateway: the single entry point both socket transports drive.
//!
//! ```text
//! admit (authenticate → resolve → authorize) → join → handle* → disconnect
//! ```
//!
//! Transports own the socket; the gateway owns what happens to a frame once
//! it has been decoded. A [`Session`] is consumed by [`SessionGateway::disconnect`],
//! so cleanup runs exactly once per registered connection.

use std::sync::Arc;

use crate::domain::{
    AccessError, FrameError, InboundMessage, MessagePusher, PusherChannel, ServerEvent,
};

use super::{
    connect_participant::{Admission, ConnectParticipantUseCase, ConnectRequest, Session},
    disconnect_participant::DisconnectParticipantUseCase,
    end_session::{EndOutcome, EndSessionUseCase},
    error::{FinalizeError, MessageError},
    send_message::SendMessageUseCase,
};

pub const ALREADY_ENDED_NOTICE: &str = "This AI session has already ended.";

pub struct SessionGateway {
    connect_participant_usecase: Arc<ConnectParticipantUseCase>,
    send_message_usecase: Arc<SendMessageUseCase>,
    end_session_usecase: Arc<EndSessionUseCase>,
    disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl SessionGateway {
    pub fn new(
        connect_participant_usecase: Arc<ConnectParticipantUseCase>,
        send_message_usecase: Arc<SendMessageUseCase>,
        end_session_usecase: Arc<EndSessionUseCase>,
        disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            connect_participant_usecase,
            send_message_usecase,
            end_session_usecase,
            disconnect_participant_usecase,
            message_pusher,
        }
    }

    /// Decide whether a connection attempt may proceed. Nothing is registered.
    pub async fn admit(&self, request: &ConnectRequest) -> Result<Admission, AccessError> {
        let result = self.connect_participant_usecase.admit(request).await;
        if let Err(e) = &result {
            tracing::warn!(
                "Connection to room '{}' refused ({}): {}",
                request.room_id,
                e.code(),
                e
            );
        }
        result
    }

    pub async fn join(&self, admission: Admission, sender: PusherChannel) -> Session {
        self.connect_participant_usecase
            .execute(admission, sender)
            .await
    }

    /// Route one decoded frame. Failures are reported to the sender only.
    pub async fn handle(&self, session: &Session, message: InboundMessage) {
        let result = match message {
            InboundMessage::Chat(draft) => self
                .send_message_usecase
                .relay_chat(session, draft)
                .await
                .map(|_| ()),
            InboundMessage::Utterance(utterance) => self
                .send_message_usecase
                .ask_assistant(session, utterance)
                .await
                .map(|_| ()),
            InboundMessage::EndSession => self.finish(session).await,
        };

        if let Err(e) = result {
            tracing::warn!(
                "Message from '{}' in room '{}' failed: {}",
                session.entity.id,
                session.room.id,
                e
            );
            self.notify_error(session, e.code(), e.to_string()).await;
        }
    }

    /// Report an undecodable frame; the connection stays open.
    pub async fn reject_frame(&self, session: &Session, error: FrameError) {
        tracing::debug!("Rejected frame from '{}': {}", session.connection_id, error);
        self.notify_error(session, "INVALID_MESSAGE", error.to_string())
            .await;
    }

    /// End an AI session on behalf of an HTTP caller, authorized like a connection.
    pub async fn end_session(&self, request: &ConnectRequest) -> Result<EndOutcome, FinalizeError> {
        let admission = self.admit(request).await?;
        self.end_session_usecase.execute(&admission.room).await
    }

    pub async fn disconnect(&self, session: Session) {
        self.disconnect_participant_usecase.execute(session).await;
    }

    async fn finish(&self, session: &Session) -> Result<(), MessageError> {
        let outcome = self.end_session_usecase.execute(&session.room).await?;
        if !outcome.ended_now {
            self.push(session, ServerEvent::system(ALREADY_ENDED_NOTICE))
                .await;
        }
        Ok(())
    }

    async fn notify_error(&self, session: &Session, code: &'static str, content: String) {
        self.push(session, ServerEvent::error(code, content)).await;
    }

    async fn push(&self, session: &Session, event: ServerEvent) {
        if let Err(e) = self
            .message_pusher
            .send_to(&session.connection_id, event)
            .await
        {
            tracing::warn!("Failed to push to '{}': {}", session.connection_id, e);
        }
    }
}
