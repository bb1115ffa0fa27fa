mod board;
mod moderation;
mod post;
mod thread;
mod user;

pub use board::{Board, BoardResponse, ThemeConfig};
pub use moderation::{ModerationAction, ModerationLog};
pub use post::{BotType, CreatePostRequest, Post, UpdatePostRequest};
pub use thread::{CreateThreadRequest, Thread, UpdateThreadRequest};
pub use user::{
    LoginRequest, RegisterRequest, Role, User, UserResponse,
};
