//! Wire entities - the platform objects carried by gateway events and REST responses

mod message;
mod user;

pub use message::{
    CreateMessage, Embed, EmbedAuthor, EmbedField, EmbedFooter, EmbedMedia, Message,
    MessageReference,
};
pub use user::User;
