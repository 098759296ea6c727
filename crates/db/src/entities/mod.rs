//! Database entities.

pub mod activity;
pub mod comment;
pub mod poll;
pub mod poll_invitation;
pub mod poll_option;
pub mod question;
pub mod user;
pub mod vote;

pub use activity::Entity as Activity;
pub use comment::Entity as Comment;
pub use poll::Entity as Poll;
pub use poll_invitation::Entity as PollInvitation;
pub use poll_option::Entity as PollOption;
pub use question::Entity as Question;
pub use user::Entity as User;
pub use vote::Entity as Vote;
