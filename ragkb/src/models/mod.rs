//! Data models mirroring the backend's JSON resources.

mod document;
mod knowledge;
mod message;
mod page;
mod session;
mod user;

pub use document::KnowledgeDocument;
pub use knowledge::{KnowledgeBase, KnowledgeBasePatch};
pub use message::{ChatMessage, ChatReply, MessagePatch, MessageRole, RagSource};
pub use page::Page;
pub use session::ChatSession;
pub use user::{LoginResponse, Role, User};

use serde::{Deserialize, Deserializer};

/// Deserialize `null` the same as a missing field.
///
/// The backend serialises empty slices as `null` in several places.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
