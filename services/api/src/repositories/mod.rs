//! Repositories for database operations

pub mod user;
pub mod video;

pub use user::UserRepository;
pub use video::VideoRepository;
