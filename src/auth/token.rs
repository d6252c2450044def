//! Token value types: redacted secrets, structurally validated access tokens, and the
//! credential pair persisted by token stores.

pub mod access;
pub mod credentials;
pub mod secret;
