//! Dialogue core: screens, per-user sessions with navigable history, the
//! input classifier, the renderer and the state machine driving them.

pub mod action;
pub mod engine;
pub mod history;
pub mod input;
pub mod render;
pub mod screen;
pub mod session;

pub use action::{Action, ActionKind, ActionToken};
pub use engine::{DialogueEngine, Notice, Outcome, UserIdentity};
pub use history::NavigationHistory;
pub use input::{classify, Input, RawEvent};
pub use render::{render, render_current, Rendered};
pub use screen::{Screen, ScreenData, Workflow};
pub use session::{Session, SessionRegistry};
