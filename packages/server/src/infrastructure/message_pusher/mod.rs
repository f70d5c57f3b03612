//! メッセージ送信（通知）の実装
//!
//! ## 概要
//!
//! このモジュールは `MessagePusher` trait の具体的な実装を提供します。
//!
//! ## 実装
//!
//! - `registry`: ルームごとにロックを持つインプロセスのコネクションレジストリ
//! - 将来的に: 複数ノード構成向けの pub/sub バックプレーン

pub mod registry;

pub use registry::ConnectionRegistry;
