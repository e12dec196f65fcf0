pub mod error;
pub mod patch;
pub mod reconciler;
pub mod session;

pub use error::PatchError;
pub use reconciler::{LoggedEvent, Reconciler};
pub use session::{Session, SessionSnapshot};
