//! Identity collaborator.
//!
//! Sign-in itself happens elsewhere; the engine only asks who, if anyone,
//! is signed in. No user means local-only mode: sessions are still
//! finalized in memory but nothing is sent to the store.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

pub trait Identity: Send + Sync {
    fn current_user(&self) -> Option<User>;
}

/// A fixed identity, e.g. read from the config file.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    user: Option<User>,
}

impl StaticIdentity {
    pub fn signed_in(user: User) -> Self {
        Self { user: Some(user) }
    }

    pub fn anonymous() -> Self {
        Self { user: None }
    }
}

impl Identity for StaticIdentity {
    fn current_user(&self) -> Option<User> {
        self.user.clone()
    }
}

impl<I: Identity + ?Sized> Identity for std::sync::Arc<I> {
    fn current_user(&self) -> Option<User> {
        (**self).current_user()
    }
}
