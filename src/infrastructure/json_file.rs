use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::errors::DomainError;
use crate::domain::order::Order;
use crate::domain::ports::{OrderRepository, ProductSource, UserRepository};
use crate::domain::product::Product;
use crate::domain::user::User;

// ── Document helpers ─────────────────────────────────────────────────────────

/// Reads a JSON array document; a missing file is an empty collection.
fn read_document<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, DomainError> {
    match fs::read_to_string(path) {
        Ok(text) if text.trim().is_empty() => Ok(Vec::new()),
        Ok(text) => serde_json::from_str(&text).map_err(|e| {
            DomainError::Persistence(format!("{} is not valid JSON: {}", path.display(), e))
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

/// Rewrites the whole document. Two writers racing here lose one update;
/// there is no merge.
fn write_document<T: Serialize>(path: &Path, items: &[T]) -> Result<(), DomainError> {
    let text = serde_json::to_string_pretty(items)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, text)?;
    Ok(())
}

// ── Orders ───────────────────────────────────────────────────────────────────

pub struct JsonFileOrderRepository {
    path: PathBuf,
}

impl JsonFileOrderRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl OrderRepository for JsonFileOrderRepository {
    fn load_all(&self) -> Result<Vec<Order>, DomainError> {
        read_document(&self.path)
    }

    fn replace_all(&self, orders: &[Order]) -> Result<(), DomainError> {
        write_document(&self.path, orders)
    }
}

// ── Products ─────────────────────────────────────────────────────────────────

pub struct JsonFileProductSource {
    path: PathBuf,
}

impl JsonFileProductSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ProductSource for JsonFileProductSource {
    fn load_all(&self) -> Result<Vec<Product>, DomainError> {
        read_document(&self.path)
    }
}

// ── Users ────────────────────────────────────────────────────────────────────

pub struct JsonFileUserRepository {
    path: PathBuf,
}

impl JsonFileUserRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl UserRepository for JsonFileUserRepository {
    fn find(&self, id: &str) -> Result<Option<User>, DomainError> {
        let users: Vec<User> = read_document(&self.path)?;
        Ok(users.into_iter().find(|u| u.id == id))
    }

    fn save_address(&self, id: &str, address: &str) -> Result<(), DomainError> {
        let mut users: Vec<User> = read_document(&self.path)?;
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| DomainError::NotFound(format!("User {id}")))?;
        user.address = Some(address.to_string());
        write_document(&self.path, &users)
    }
}
