use std::{
    collections::HashMap,
    sync::atomic::{AtomicI64, Ordering},
};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use super::{
    model::{NewUser, User},
    repo::{StoreError, UserStore},
};

/// In-memory user store with the same uniqueness rules as the `users` table.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<i64, User>>,
    next_id: AtomicI64,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_unique(
    users: &HashMap<i64, User>,
    skip_id: Option<i64>,
    username: &str,
    email: &str,
) -> Result<(), StoreError> {
    for u in users.values().filter(|u| Some(u.id) != skip_id) {
        if u.username == username {
            return Err(StoreError::Duplicate("username"));
        }
        if u.email == email {
            return Err(StoreError::Duplicate("email"));
        }
    }
    Ok(())
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn fetch_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn fetch_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().any(|u| u.username == username))
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().any(|u| u.email == email))
    }

    async fn persist_new(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        check_unique(&users, None, &user.username, &user.email)?;

        let now = OffsetDateTime::now_utc();
        let stored = User {
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            username: user.username,
            email: user.email,
            gender: user.gender,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        users.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn persist_update(&self, user: &User) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if !users.contains_key(&user.id) {
            return Err(StoreError::NotFound(user.id));
        }
        check_unique(&users, Some(user.id), &user.username, &user.email)?;

        let mut stored = user.clone();
        stored.updated_at = OffsetDateTime::now_utc();
        users.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::model::Gender;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.into(),
            email: email.into(),
            gender: Gender::Unknown,
            password_hash: "$argon2id$placeholder".into(),
        }
    }

    #[tokio::test]
    async fn assigns_ids_and_enforces_uniqueness() {
        let store = MemoryUserStore::new();
        let a = store.persist_new(new_user("alice", "alice@example.com")).await.unwrap();
        let b = store.persist_new(new_user("bob", "bob@example.com")).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);

        let dup = store.persist_new(new_user("alice", "other@example.com")).await;
        assert!(matches!(dup, Err(StoreError::Duplicate("username"))));
        let dup = store.persist_new(new_user("carol", "bob@example.com")).await;
        assert!(matches!(dup, Err(StoreError::Duplicate("email"))));

        assert!(store.exists_by_username("alice").await.unwrap());
        assert!(!store.exists_by_email("carol@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn update_keeps_own_values_and_rejects_others() {
        let store = MemoryUserStore::new();
        let mut a = store.persist_new(new_user("alice", "alice@example.com")).await.unwrap();
        store.persist_new(new_user("bob", "bob@example.com")).await.unwrap();

        a.gender = Gender::Female;
        let updated = store.persist_update(&a).await.unwrap();
        assert_eq!(updated.gender, Gender::Female);
        assert!(updated.updated_at >= updated.created_at);

        a.email = "bob@example.com".into();
        assert!(matches!(
            store.persist_update(&a).await,
            Err(StoreError::Duplicate("email"))
        ));

        let mut ghost = a.clone();
        ghost.id = 99;
        assert!(matches!(
            store.persist_update(&ghost).await,
            Err(StoreError::NotFound(99))
        ));
    }
}
