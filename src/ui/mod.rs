/// UI module exports
pub mod blocked;
pub mod components;
pub mod popup;
