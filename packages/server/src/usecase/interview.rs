//! UseCase: AI インタビューの進行
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - InterviewService::ask() / conclude() メソッド
//! - セッションごとの状態機械の生成、生成呼び出し、タイムアウト
//!
//! ### なぜこのテストが必要か
//! - 生成に失敗した場合に question_count と phase が進まないことを保証
//! - 同一セッションへの同時発話が直列化されることを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：閾値到達で要約に遷移
//! - 異常系：生成失敗・タイムアウト・終了済みセッション
//! - エッジケース：同一セッションへの並行した発話

use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::{Mutex, RwLock};

use crate::domain::{
    GenerationError, InterviewError, InterviewReply, InterviewState, MessageContent, Room, RoomId,
    TextGenerator,
    interview::{DEFAULT_OPENING_QUESTION, DEFAULT_QUESTION_THRESHOLD},
};

pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct InterviewSettings {
    pub threshold: u32,
    /// First assistant turn of every new transcript
    pub opening: Option<String>,
    pub generation_timeout: Duration,
}

impl Default for InterviewSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_QUESTION_THRESHOLD,
            opening: Some(DEFAULT_OPENING_QUESTION.to_string()),
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }
}

/// AI セッションごとの状態機械を保持し、発話を直列に処理する
pub struct InterviewService {
    /// Key: AI セッションのルーム ID
    sessions: RwLock<HashMap<RoomId, Arc<Mutex<InterviewState>>>>,
    generator: Arc<dyn TextGenerator>,
    settings: InterviewSettings,
}

impl InterviewService {
    pub fn new(generator: Arc<dyn TextGenerator>, settings: InterviewSettings) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            generator,
            settings,
        }
    }

    /// 初回アクセス時に状態を作る（終了済みのルームは concluded から始まる）
    async fn session(&self, room: &Room) -> Arc<Mutex<InterviewState>> {
        if let Some(session) = self.sessions.read().await.get(&room.id) {
            return session.clone();
        }
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(room.id.clone())
            .or_insert_with(|| {
                let state = if room.ended {
                    InterviewState::concluded(self.settings.threshold)
                } else {
                    InterviewState::new(self.settings.threshold, self.settings.opening.as_deref())
                };
                Arc::new(Mutex::new(state))
            })
            .clone()
    }

    /// 発話に対する返答を生成し、状態を進める
    ///
    /// セッションのロックは生成の完了まで保持される。呼び出し側の future が破棄された場合
    /// （コネクションの切断）、生成は中断され状態は変更されない。
    pub async fn ask(
        &self,
        room: &Room,
        utterance: &MessageContent,
    ) -> Result<InterviewReply, InterviewError> {
        // 終了済みのセッションには状態を作らない
        if room.ended {
            return Err(InterviewError::SessionConcluded);
        }
        let session = self.session(room).await;
        let mut state = session.lock().await;

        let pending = state.prepare(utterance)?;

        let timeout = self.settings.generation_timeout;
        let generated = tokio::time::timeout(
            timeout,
            self.generator
                .generate(pending.context(), pending.instruction()),
        )
        .await;

        let text = match generated {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                tracing::warn!("Generation failed for AI session '{}': {}", room.id, e);
                return Err(e.into());
            }
            Err(_) => {
                tracing::warn!(
                    "Generation timed out for AI session '{}' after {:?}",
                    room.id,
                    timeout
                );
                return Err(GenerationError::TimedOut(timeout.as_secs()).into());
            }
        };

        let reply = state.commit(pending, text);
        if reply.is_summary {
            tracing::info!(
                "AI session '{}' moved to summarizing after {} question(s)",
                room.id,
                reply.question_count
            );
        }
        Ok(reply)
    }

    /// セッションを concluded にして保持している状態を破棄する。すでに終了していれば `false`
    ///
    /// 処理中の発話があれば、その完了を待ってから終了する。以降の発話は
    /// 終了済みの `Room` によって拒否される。
    pub async fn conclude(&self, room: &Room) -> bool {
        let session = self.session(room).await;
        let concluded = session.lock().await.conclude();

        let mut sessions = self.sessions.write().await;
        if sessions
            .get(&room.id)
            .is_some_and(|current| Arc::ptr_eq(current, &session))
        {
            sessions.remove(&room.id);
        }
        drop(sessions);

        if concluded {
            tracing::info!("AI session '{}' concluded", room.id);
        }
        concluded
    }

    /// 現在の状態のコピー（未作成なら None）
    pub async fn snapshot(&self, room_id: &RoomId) -> Option<InterviewState> {
        let session = self.sessions.read().await.get(room_id).cloned()?;
        let state = session.lock().await.clone();
        Some(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntityId, Instruction, MockTextGenerator, Phase};

    fn room(ended: bool) -> Room {
        Room::ai_session(
            RoomId::new("session-1".to_string()).unwrap(),
            EntityId::new("p1".to_string()).unwrap(),
            ended,
        )
    }

    fn content(text: &str) -> MessageContent {
        MessageContent::new(text.to_string()).unwrap()
    }

    fn service(generator: MockTextGenerator) -> InterviewService {
        InterviewService::new(Arc::new(generator), InterviewSettings::default())
    }

    #[tokio::test]
    async fn test_fifth_utterance_requests_summary() {
        // テスト項目: 5 回目の発話で要約指示付きの生成が行われ、要約としてタグ付けされる
        // given (前提条件):
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .withf(|_, instruction| *instruction == Instruction::Interview)
            .times(4)
            .returning(|_, _| Ok("Next question?".to_string()));
        generator
            .expect_generate()
            .withf(|transcript, instruction| {
                *instruction == Instruction::Summarize && transcript.len() == 10
            })
            .times(1)
            .returning(|_, _| Ok("Summary".to_string()));
        let service = service(generator);
        let room = room(false);

        // when (操作):
        let mut replies = Vec::new();
        for i in 1..=5 {
            replies.push(service.ask(&room, &content(&format!("answer {}", i))).await.unwrap());
        }

        // then (期待する結果):
        let last = replies.last().unwrap();
        assert!(last.is_summary);
        assert_eq!(last.message, "Summary");
        assert_eq!(last.phase, Phase::Summarizing);
        assert!(replies[..4].iter().all(|r| !r.is_summary));
    }

    #[tokio::test]
    async fn test_generation_failure_leaves_state_unchanged() {
        // テスト項目: 生成失敗時は question_count と phase が変わらず、再送できる
        // given (前提条件):
        let mut generator = MockTextGenerator::new();
        let mut calls = 0;
        generator.expect_generate().times(2).returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Err(GenerationError::Failed("upstream 500".to_string()))
            } else {
                Ok("How long?".to_string())
            }
        });
        let service = service(generator);
        let room = room(false);

        // when (操作):
        let failed = service.ask(&room, &content("I have a fever")).await;
        let after_failure = service.snapshot(&room.id).await.unwrap();
        let retried = service.ask(&room, &content("I have a fever")).await;

        // then (期待する結果):
        assert!(matches!(failed, Err(InterviewError::GenerationFailed(_))));
        assert_eq!(after_failure.question_count(), 0);
        assert_eq!(after_failure.phase(), Phase::Interviewing);
        assert_eq!(after_failure.transcript().len(), 1);
        assert_eq!(retried.unwrap().question_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_generation_timeout_is_reported_as_generation_failed() {
        // テスト項目: 生成がタイムアウトすると GenerationFailed(TimedOut) になる
        // given (前提条件):
        struct SlowGenerator;

        #[async_trait::async_trait]
        impl TextGenerator for SlowGenerator {
            async fn generate(
                &self,
                _transcript: &[crate::domain::Turn],
                _instruction: Instruction,
            ) -> Result<String, GenerationError> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok("too late".to_string())
            }
        }
        let service = InterviewService::new(Arc::new(SlowGenerator), InterviewSettings::default());
        let room = room(false);

        // when (操作):
        let result = service.ask(&room, &content("hello")).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(InterviewError::GenerationFailed(GenerationError::TimedOut(30)))
        );
        assert_eq!(service.snapshot(&room.id).await.unwrap().question_count(), 0);
    }

    #[tokio::test]
    async fn test_concluded_session_rejects_utterances_without_generating() {
        // テスト項目: 終了済みセッションへの発話は生成を呼ばずに拒否される
        // given (前提条件):
        let mut generator = MockTextGenerator::new();
        generator.expect_generate().never();
        let service = service(generator);
        let room = room(true);

        // when (操作):
        let result = service.ask(&room, &content("anyone there?")).await;
        let concluded_again = service.conclude(&room).await;

        // then (期待する結果):
        assert_eq!(result, Err(InterviewError::SessionConcluded));
        assert!(!concluded_again);
        assert!(service.snapshot(&room.id).await.is_none());
    }

    #[tokio::test]
    async fn test_conclude_releases_session_state() {
        // テスト項目: 終了したセッションの状態は保持されず、終了済みの Room での発話は拒否される
        // given (前提条件):
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|_, _| Ok("How long?".to_string()));
        let service = service(generator);
        let open = room(false);
        service.ask(&open, &content("I have a fever")).await.unwrap();
        assert!(service.snapshot(&open.id).await.is_some());

        // when (操作):
        let concluded = service.conclude(&open).await;
        let after = service.ask(&room(true), &content("still there?")).await;

        // then (期待する結果):
        assert!(concluded);
        assert!(service.snapshot(&open.id).await.is_none());
        assert_eq!(after, Err(InterviewError::SessionConcluded));
        assert!(service.snapshot(&open.id).await.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_utterances_are_serialized() {
        // テスト項目: 同一セッションへの同時発話は直列に処理され、カウントが重複しない
        // given (前提条件):
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .times(3)
            .returning(|transcript, _| Ok(format!("reply #{}", transcript.len())));
        let service = Arc::new(service(generator));
        let room = room(false);

        // when (操作):
        let mut handles = Vec::new();
        for i in 0..3 {
            let service = service.clone();
            let room = room.clone();
            handles.push(tokio::spawn(async move {
                service.ask(&room, &content(&format!("u{}", i))).await.unwrap()
            }));
        }
        let mut counts = Vec::new();
        for handle in handles {
            counts.push(handle.await.unwrap().question_count);
        }
        counts.sort();

        // then (期待する結果):
        assert_eq!(counts, vec![1, 2, 3]);
        assert_eq!(service.snapshot(&room.id).await.unwrap().transcript().len(), 7);
    }
}
