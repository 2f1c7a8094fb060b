//! Command handlers, one module per command group.

mod entries;
mod maintenance;
mod memories;

pub use entries::{handle_add, handle_delete, handle_list, handle_search, handle_show};
pub use maintenance::handle_check;
pub use memories::handle_memories;
