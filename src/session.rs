//! Client-side session cache: bearer token + user profile.
//!
//! The store is a thin layer over a [`Storage`] backend with a change
//! notification channel. Mutations never fail toward the caller: a broken
//! backing medium costs persistence, not the running command. Reads degrade
//! to "absent" on any failure, including a corrupt stored profile.
//!
//! Token and user are independent entries. Login/logout flows write and
//! clear both together, but the store does not enforce the pairing; callers
//! must treat a user without a token as logged out.

use std::cell::{Cell, RefCell};

use crate::models::User;
use crate::storage::Storage;

/// Storage key holding the raw bearer token.
pub const TOKEN_KEY: &str = "auth.token";
/// Storage key holding the JSON-encoded user profile.
pub const USER_KEY: &str = "auth.user";

/// Result of a mutating session-store call.
///
/// Failures have already been reported on stderr by the time the caller sees
/// the outcome; ignoring it is the normal fire-and-forget mode, checking it
/// lets a caller surface its own warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Saved,
    StorageUnavailable,
    CorruptData,
}

impl WriteOutcome {
    pub fn is_saved(self) -> bool {
        matches!(self, WriteOutcome::Saved)
    }
}

/// Handle returned by [`SessionStore::on_change`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription(u64);

type ChangeCallback = Box<dyn FnMut()>;

/// Durable, synchronous session cache with change notification.
///
/// Construct one per process over the shared scope directory (or over
/// [`crate::storage::MemoryStorage`] for an isolated instance) and pass it by
/// reference to consumers.
pub struct SessionStore {
    storage: Box<dyn Storage>,
    listeners: RefCell<Vec<(u64, ChangeCallback)>>,
    next_subscription: Cell<u64>,
}

impl SessionStore {
    pub fn new(storage: Box<dyn Storage>) -> Self {
        Self {
            storage,
            listeners: RefCell::new(Vec::new()),
            next_subscription: Cell::new(0),
        }
    }

    /// Persist the bearer token and notify listeners.
    pub fn save_token(&self, token: &str) -> WriteOutcome {
        let outcome = self.write(TOKEN_KEY, token);
        self.emit_change();
        outcome
    }

    /// Cached bearer token, or `None` when absent or unreadable.
    pub fn token(&self) -> Option<String> {
        self.storage.get(TOKEN_KEY).ok().flatten()
    }

    /// Remove the bearer token and notify listeners.
    pub fn clear_token(&self) -> WriteOutcome {
        let outcome = self.delete(TOKEN_KEY);
        self.emit_change();
        outcome
    }

    /// Persist the user profile as JSON and notify listeners.
    pub fn save_user(&self, user: &User) -> WriteOutcome {
        let outcome = match serde_json::to_string(user) {
            Ok(json) => self.write(USER_KEY, &json),
            Err(e) => {
                eprintln!("Warning: could not encode user profile: {}", e);
                WriteOutcome::CorruptData
            }
        };
        self.emit_change();
        outcome
    }

    /// Cached user profile. A missing or unparsable entry reads as `None`,
    /// so a corrupted file cannot wedge every subsequent command.
    pub fn user(&self) -> Option<User> {
        let raw = self.storage.get(USER_KEY).ok().flatten()?;
        serde_json::from_str(&raw).ok()
    }

    /// Remove the user profile and notify listeners.
    pub fn clear_user(&self) -> WriteOutcome {
        let outcome = self.delete(USER_KEY);
        self.emit_change();
        outcome
    }

    /// True when a bearer token is cached. Token absence is the canonical
    /// logged-out signal regardless of any cached profile.
    pub fn is_logged_in(&self) -> bool {
        self.token().is_some()
    }

    /// Register a callback invoked once after every session mutation in this
    /// process. Callbacks carry no payload; listeners re-read state through
    /// [`SessionStore::token`] / [`SessionStore::user`].
    pub fn on_change<F: FnMut() + 'static>(&self, callback: F) -> Subscription {
        let id = self.next_subscription.get();
        self.next_subscription.set(id + 1);
        self.listeners.borrow_mut().push((id, Box::new(callback)));
        Subscription(id)
    }

    #[allow(dead_code)] // CLI commands drop listeners with the store at exit
    pub fn unsubscribe(&self, subscription: Subscription) {
        self.listeners
            .borrow_mut()
            .retain(|(id, _)| *id != subscription.0);
    }

    /// Feed a change observed on the storage medium by another process
    /// (another "tab"). Only the two session keys are relevant; changes to
    /// any other key are ignored.
    pub fn external_change(&self, key: &str) {
        if key == TOKEN_KEY || key == USER_KEY {
            self.emit_change();
        }
    }

    fn write(&self, key: &str, value: &str) -> WriteOutcome {
        match self.storage.set(key, value) {
            Ok(()) => WriteOutcome::Saved,
            Err(e) => {
                eprintln!("Warning: could not save {}: {}", key, e);
                WriteOutcome::StorageUnavailable
            }
        }
    }

    fn delete(&self, key: &str) -> WriteOutcome {
        match self.storage.remove(key) {
            Ok(()) => WriteOutcome::Saved,
            Err(e) => {
                eprintln!("Warning: could not clear {}: {}", key, e);
                WriteOutcome::StorageUnavailable
            }
        }
    }

    // Dispatch over a detached list so the RefCell is free while user code
    // runs; callbacks may re-read the store or register new listeners.
    fn emit_change(&self) {
        let mut active = self.listeners.take();
        for (_, callback) in active.iter_mut() {
            callback();
        }
        let registered_during_dispatch = self.listeners.take();
        active.extend(registered_during_dispatch);
        *self.listeners.borrow_mut() = active;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserKind;
    use crate::storage::{FileStorage, MemoryStorage, StorageError};
    use std::rc::Rc;

    fn store() -> SessionStore {
        SessionStore::new(Box::new(MemoryStorage::new()))
    }

    fn ana() -> User {
        User {
            id: 1,
            nome: "Ana".to_string(),
            email: "a@x.com".to_string(),
            tipo: UserKind::Doador,
            foto_url: None,
        }
    }

    /// Storage whose writes always fail, for the degraded-medium paths.
    struct BrokenStorage;

    impl Storage for BrokenStorage {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("disk on fire".to_string()))
        }
        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disk on fire".to_string()))
        }
        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disk on fire".to_string()))
        }
    }

    #[test]
    fn test_user_round_trip() {
        let store = store();
        let user = ana();
        assert!(store.save_user(&user).is_saved());
        assert_eq!(store.user(), Some(user));
    }

    #[test]
    fn test_token_absent_after_clear() {
        let store = store();
        store.save_token("abc");
        store.clear_token();
        assert_eq!(store.token(), None);
    }

    #[test]
    fn test_token_and_user_are_independent() {
        let store = store();
        store.save_token("tok");
        store.save_user(&ana());

        store.clear_token();
        assert_eq!(store.user(), Some(ana()));

        store.save_token("tok2");
        store.clear_user();
        assert_eq!(store.token().as_deref(), Some("tok2"));
    }

    #[test]
    fn test_corrupt_user_entry_reads_as_absent() {
        let storage = MemoryStorage::new();
        storage.set(USER_KEY, "not json at all {").unwrap();
        let store = SessionStore::new(Box::new(storage));
        assert_eq!(store.user(), None);
    }

    #[test]
    fn test_mutation_notifies_exactly_once_after_the_write() {
        let store = Rc::new(store());
        let seen: Rc<RefCell<Vec<Option<String>>>> = Rc::new(RefCell::new(Vec::new()));

        let store_in_listener = Rc::clone(&store);
        let seen_in_listener = Rc::clone(&seen);
        store.on_change(move || {
            seen_in_listener
                .borrow_mut()
                .push(store_in_listener.token());
        });

        store.save_token("abc");

        // One notification, delivered synchronously, with the new value
        // already readable inside the listener.
        assert_eq!(*seen.borrow(), vec![Some("abc".to_string())]);
    }

    #[test]
    fn test_every_mutating_operation_notifies() {
        let store = Rc::new(store());
        let count = Rc::new(Cell::new(0u32));
        let count_in_listener = Rc::clone(&count);
        store.on_change(move || count_in_listener.set(count_in_listener.get() + 1));

        store.save_token("t");
        store.clear_token();
        store.save_user(&ana());
        store.clear_user();
        assert_eq!(count.get(), 4);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let store = store();
        let count = Rc::new(Cell::new(0u32));
        let count_in_listener = Rc::clone(&count);
        let subscription = store.on_change(move || {
            count_in_listener.set(count_in_listener.get() + 1);
        });

        store.save_token("t");
        store.unsubscribe(subscription);
        store.save_token("u");
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_external_change_filters_on_session_keys() {
        let store = store();
        let count = Rc::new(Cell::new(0u32));
        let count_in_listener = Rc::clone(&count);
        store.on_change(move || count_in_listener.set(count_in_listener.get() + 1));

        store.external_change(USER_KEY);
        assert_eq!(count.get(), 1);

        store.external_change("theme.preference");
        assert_eq!(count.get(), 1);

        store.external_change(TOKEN_KEY);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_listener_may_register_another_listener() {
        let store = Rc::new(store());
        let count = Rc::new(Cell::new(0u32));

        let store_in_listener = Rc::clone(&store);
        let count_in_listener = Rc::clone(&count);
        store.on_change(move || {
            let count_inner = Rc::clone(&count_in_listener);
            store_in_listener.on_change(move || {
                count_inner.set(count_inner.get() + 1);
            });
        });

        // Must not panic; the listener added here fires from the next
        // mutation on.
        store.save_token("t");
        assert_eq!(count.get(), 0);
        store.save_token("u");
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_broken_storage_degrades_without_raising() {
        let store = SessionStore::new(Box::new(BrokenStorage));

        assert_eq!(store.save_token("t"), WriteOutcome::StorageUnavailable);
        assert_eq!(store.save_user(&ana()), WriteOutcome::StorageUnavailable);
        assert_eq!(store.clear_token(), WriteOutcome::StorageUnavailable);
        assert_eq!(store.token(), None);
        assert_eq!(store.user(), None);
        assert!(!store.is_logged_in());
    }

    #[test]
    fn test_broken_storage_still_notifies() {
        let store = Rc::new(SessionStore::new(Box::new(BrokenStorage)));
        let count = Rc::new(Cell::new(0u32));
        let count_in_listener = Rc::clone(&count);
        store.on_change(move || count_in_listener.set(count_in_listener.get() + 1));

        store.save_token("t");
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_login_then_read_back() {
        let store = store();
        store.save_token("tok1");
        store.save_user(&ana());

        assert_eq!(store.token().as_deref(), Some("tok1"));
        assert_eq!(store.user().unwrap().tipo, UserKind::Doador);
    }

    #[test]
    fn test_fresh_storage_reads_absent() {
        let store = store();
        assert_eq!(store.token(), None);
        assert_eq!(store.user(), None);
    }

    #[test]
    fn test_clear_user_is_idempotent() {
        let store = store();
        let inst = User {
            id: 2,
            nome: "Inst".to_string(),
            email: "i@x.com".to_string(),
            tipo: UserKind::Instituicao,
            foto_url: None,
        };
        store.save_user(&inst);
        store.clear_user();
        assert_eq!(store.user(), None);
        store.clear_user();
        assert_eq!(store.user(), None);
    }

    #[test]
    fn test_two_stores_share_one_file_scope() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SessionStore::new(Box::new(FileStorage::new(dir.path())));
        let reader = SessionStore::new(Box::new(FileStorage::new(dir.path())));

        writer.save_token("shared");
        writer.save_user(&ana());

        // The second "tab" sees the write on its next read.
        assert_eq!(reader.token().as_deref(), Some("shared"));
        assert_eq!(reader.user(), Some(ana()));

        reader.clear_token();
        assert_eq!(writer.token(), None);
    }
}
