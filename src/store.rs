use std::path::PathBuf;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::models::{Course, Exam, User};

const USERS_FILE: &str = "users.json";
const COURSES_FILE: &str = "courses.json";
const EXAMS_FILE: &str = "exams.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed store file: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Flat JSON-file store over a data directory, one file per collection.
/// Reads and whole-collection replacement writes; a missing file is the empty
/// collection. Mutations run a read-apply-write cycle serialized behind a
/// mutex, so two in-process requests cannot interleave their cycles. Across
/// processes the semantics remain last-write-wins.
pub struct JsonStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn read_collection<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>, StoreError> {
        match tokio::fs::read(self.dir.join(file)).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn write_collection<T: Serialize>(
        &self,
        file: &str,
        items: &[T],
    ) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let body = serde_json::to_vec_pretty(items)?;
        tokio::fs::write(self.dir.join(file), body).await?;
        Ok(())
    }

    async fn update_collection<T, F, R>(&self, file: &str, apply: F) -> Result<R, StoreError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut Vec<T>) -> R,
    {
        let _guard = self.write_lock.lock().await;
        let mut items = self.read_collection(file).await?;
        let result = apply(&mut items);
        self.write_collection(file, &items).await?;
        Ok(result)
    }

    pub async fn load_users(&self) -> Result<Vec<User>, StoreError> {
        self.read_collection(USERS_FILE).await
    }

    pub async fn load_courses(&self) -> Result<Vec<Course>, StoreError> {
        self.read_collection(COURSES_FILE).await
    }

    pub async fn load_exams(&self) -> Result<Vec<Exam>, StoreError> {
        self.read_collection(EXAMS_FILE).await
    }

    pub async fn update_users<F, R>(&self, apply: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut Vec<User>) -> R,
    {
        self.update_collection(USERS_FILE, apply).await
    }

    pub async fn update_courses<F, R>(&self, apply: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut Vec<Course>) -> R,
    {
        self.update_collection(COURSES_FILE, apply).await
    }

    pub async fn update_exams<F, R>(&self, apply: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut Vec<Exam>) -> R,
    {
        self.update_collection(EXAMS_FILE, apply).await
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::models::Role;

    fn user(email: &str) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Sara".to_string(),
            email: email.to_string(),
            password_hash: "0".repeat(64),
            role: Role::Student,
        }
    }

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        assert!(store.load_users().await.unwrap().is_empty());
        assert!(store.load_courses().await.unwrap().is_empty());
        assert!(store.load_exams().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_persists_across_reads() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());

        let created = store
            .update_users(|users| {
                let user = user("sara@example.com");
                users.push(user.clone());
                user
            })
            .await
            .unwrap();

        let users = store.load_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, created.id);
        assert_eq!(users[0].email, "sara@example.com");
    }

    #[tokio::test]
    async fn test_update_sees_prior_writes() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());

        store
            .update_users(|users| users.push(user("a@example.com")))
            .await
            .unwrap();
        let count = store
            .update_users(|users| {
                users.push(user("b@example.com"));
                users.len()
            })
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("users.json"), b"not json")
            .await
            .unwrap();
        let store = JsonStore::new(dir.path());
        let err = store.load_users().await.unwrap_err();
        assert!(matches!(err, StoreError::Malformed(_)));
    }
}
