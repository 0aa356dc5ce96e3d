//! Radial quick-action rings: configuration, key bind matching, the
//! interaction state machine and share strings.
//!
//! The host feeds [`engine::Engine::tick`] one [`events::InputSnapshot`] per
//! frame, draws [`menu::draw_requests`] and forwards committed payloads to its
//! [`item::Executor`].

mod macros;

pub mod codec;
pub mod config;
pub mod engine;
pub mod events;
pub mod item;
pub mod keybind;
pub mod menu;
pub mod ring;
pub mod validate;

pub use config::Settings;
pub use engine::{Engine, SessionState, dispatch_commits};
pub use events::{CloseReason, CommitRequest, InputSnapshot, RingEvent};
pub use ring::{Ring, RingList};
