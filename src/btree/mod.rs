pub mod delete;
pub mod insert;
pub mod scan;
pub mod search;
pub mod update;

pub use delete::delete;
pub use insert::insert;
pub use scan::{select_all, VisibleRow};
pub use search::search;
