//! Core operations on users and nodes. Callers authenticate first and pass
//! the resolved user id in.

mod nodes;
mod users;

pub use nodes::{NodeBytes, NodeDraft, NodeService, PAGE_SIZE, THUMBNAIL_WIDTHS};
pub use users::UserService;

pub use crate::error::{CoreError, CoreResult};
