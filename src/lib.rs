//! First-blood Telegram announcements for a competition scoring platform.
//!
//! When a new solve commits, decide whether it is the first solve of its
//! challenge among visible, non-banned accounts and, if so, post a formatted
//! message to a Telegram chat.
//!
//! The crate has two halves:
//!
//! - **Host integration** (library): [`hooks::FirstBloodHook`] hands out
//!   [`hooks::SolveSession`] transaction wrappers; solves inserted (or
//!   recorded) through a session are evaluated by
//!   [`evaluator::FirstBloodEvaluator`] after — and only after — the
//!   transaction commits. Delivery goes through [`notifier::TelegramNotifier`].
//! - **Admin surface** (library + `main.rs` sidecar): [`handlers::routes`]
//!   serves settings management and a manual test send under
//!   `/admin/first_blood_telegram`, reading and writing the host's config
//!   table via [`settings::SettingsStore`].

pub mod config;
pub mod evaluator;
pub mod handlers;
pub mod hooks;
pub mod notifier;
pub mod security;
pub mod settings;
pub mod sig_down;
pub mod store;
pub mod telemetry;

pub use evaluator::{Evaluation, FirstBloodEvaluator};
pub use hooks::{FirstBloodHook, SolveSession};
pub use notifier::{ChatSink, TelegramNotifier};
pub use settings::{Settings, SettingsStore};
