pub mod board;
pub mod icons;
pub mod session;

pub use session::{Session, spinner};
