pub mod common;
pub mod layout;
pub mod session;
pub mod shape;
pub mod svg;
pub mod view;
