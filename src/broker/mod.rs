pub mod engine;
pub mod message;
pub mod topic;

pub use engine::{PublishReport, SubscriberRegistry, Subscription};
pub use message::{CommentView, StreamEvent};
pub use topic::SubscriberId;
