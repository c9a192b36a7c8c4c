//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`StoragePort`] over an in-memory map keyed by
//! `namespace::key`.  It mirrors the constraints of the flash NVS the
//! flower runs on: namespace and key names are limited to 15 bytes, each
//! write replaces the whole value atomically, and the partition can fill
//! up.  The host build, the simulator and every test use this backend.

use std::cell::RefCell;
use std::collections::HashMap;

use log::{debug, info};

use crate::app::ports::StoragePort;
use crate::error::StorageError;

/// NVS limit for namespace and key names (excluding the NUL terminator).
pub const MAX_NAME_LEN: usize = 15;

pub struct NvsAdapter {
    store: RefCell<HashMap<String, Vec<u8>>>,
    /// Maximum number of distinct entries, `None` for unbounded.
    capacity: Option<usize>,
    writes: u32,
}

impl Default for NvsAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl NvsAdapter {
    pub fn new() -> Self {
        info!("NvsAdapter: simulation backend");
        Self {
            store: RefCell::new(HashMap::new()),
            capacity: None,
            writes: 0,
        }
    }

    /// A store that reports [`StorageError::Full`] once it holds `entries`
    /// distinct keys.
    pub fn with_capacity(entries: usize) -> Self {
        Self {
            capacity: Some(entries),
            ..Self::new()
        }
    }

    /// Successful writes since construction.
    pub fn write_count(&self) -> u32 {
        self.writes
    }

    /// Number of stored entries across all namespaces.
    pub fn len(&self) -> usize {
        self.store.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.borrow().is_empty()
    }

    /// Drop every entry (factory reset).
    pub fn erase_all(&mut self) {
        self.store.borrow_mut().clear();
    }

    fn composite_key(namespace: &str, key: &str) -> Result<String, StorageError> {
        if namespace.is_empty()
            || key.is_empty()
            || namespace.len() > MAX_NAME_LEN
            || key.len() > MAX_NAME_LEN
        {
            return Err(StorageError::IoError);
        }
        Ok(format!("{}::{}", namespace, key))
    }
}

impl StoragePort for NvsAdapter {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let composite = Self::composite_key(namespace, key)?;
        match self.store.borrow().get(&composite) {
            Some(data) => {
                let len = data.len().min(buf.len());
                buf[..len].copy_from_slice(&data[..len]);
                Ok(len)
            }
            None => Err(StorageError::NotFound),
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let composite = Self::composite_key(namespace, key)?;
        let mut store = self.store.borrow_mut();
        let full = self
            .capacity
            .is_some_and(|limit| store.len() >= limit && !store.contains_key(&composite));
        if full {
            return Err(StorageError::Full);
        }
        debug!("NVS write {composite} ({} bytes)", data.len());
        store.insert(composite, data.to_vec());
        self.writes += 1;
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        let composite = Self::composite_key(namespace, key)?;
        self.store.borrow_mut().remove(&composite);
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        Self::composite_key(namespace, key).is_ok_and(|k| self.store.borrow().contains_key(&k))
    }
}
