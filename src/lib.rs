mod clock;
mod db;
mod logging;
mod session;
pub mod stats;

pub use clock::{Clock, SystemClock};
pub use db::{Database, Project, ProjectInput};
pub use logging::init_logging;
pub use session::{
    CancelledSession, FinishedSession, PausedSession, RunningSession, SessionController,
    SessionError, SessionEvent, SessionPolicy, SessionSnapshot, SessionStatus, WorkSession,
};
