pub mod edits;
pub mod filter;
pub mod highlight;
pub mod layout;
pub mod store;
pub mod tour;
