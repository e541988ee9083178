pub mod mail;
pub mod sheets;

pub use mail::{HttpMailAdapter, LogMailAdapter};
pub use sheets::SheetStoreAdapter;
