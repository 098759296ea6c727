//! Business logic services.

#![allow(missing_docs)]

pub mod activity;
pub mod comment;
pub mod invitation;
pub mod poll;
pub mod user;
pub mod vote;

pub use activity::{
    ActivityRecorder, ActivityRecorderService, DbActivityRecorder, NoOpActivityRecorder,
};
pub use comment::{CommentService, CreateCommentInput};
pub use invitation::{InvitationService, InviteInput};
pub use poll::{
    CreatePollInput, CreateQuestionInput, OptionResult, PollDetail, PollResults, PollService,
    QuestionDetail, QuestionResult, UpdatePollInput, UpdateQuestionInput,
};
pub use user::{CreateUserInput, UpdateUserInput, UserService};
pub use vote::{CastVote, Selection, Selections, VoteReceipt, VoteService};
