pub mod classify;
pub mod resolve;
pub mod rewrite;
