//! Interactive, paginated browsing of search results.

pub mod input;
pub mod render;
pub mod session;
pub mod state;

pub use input::{InputSource, LineInput, TerminalInput};
pub use render::{Columns, Palette};
pub use session::{Session, SessionOptions};
pub use state::{Command, Notice, PageLimits, Pager, Transition};
