pub mod pagination;
pub mod songs;
