// Models module - contains UserProfile, Stream, Recipient, Draft and Message

pub mod draft;
pub mod message;
pub mod recipient;
pub mod stream;
pub mod user;

pub use draft::{Draft, DraftDict, DraftType, NewDraft};
pub use message::{Message, NewMessage};
pub use recipient::Recipient;
pub use stream::Stream;
pub use user::UserProfile;
