mod config;
mod controller;
mod error;
mod events;
mod state;

pub use config::SessionPolicy;
pub use controller::{SessionController, SessionSnapshot};
pub use error::SessionError;
pub use events::SessionEvent;
pub use state::{
    CancelledSession, FinishedSession, PausedSession, RunningSession, SessionStatus, WorkSession,
};
