//! Optimistic update controller.
//!
//! Mutations are applied to an in-memory mirror of the item list at once and
//! confirmed against the server in the background. Every entity with writes
//! in flight has a lane holding its last confirmed server state and the queue
//! of local mutations not yet confirmed; the mirror always shows the
//! confirmed state with the queue replayed on top.
//!
//! Writes to one entity run strictly in submission order, each carrying the
//! fencing token of the previous confirmation as `If-Unmodified-Since`.
//! Writes to different entities run concurrently.

use super::error::{ClientError, ClientResult, ErrorKind};
use super::session::SessionHandle;
use crate::database::models::{Item, ItemPatch, StockPatch};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// The server operations the controller needs.
#[async_trait]
pub trait InventoryRemote: Send + Sync {
    async fn fetch_items(&self) -> ClientResult<Vec<Item>>;

    async fn update_item(
        &self,
        id: i64,
        patch: &ItemPatch,
        since: Option<DateTime<Utc>>,
    ) -> ClientResult<Item>;

    async fn patch_stock(
        &self,
        id: i64,
        patch: &StockPatch,
        since: Option<DateTime<Utc>>,
    ) -> ClientResult<Item>;

    async fn delete_item(&self, id: i64) -> ClientResult<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    SetQuantity(f64),
    AdjustQuantity(f64),
    Rename(String),
    UpdateNotes(String),
    Delete,
}

impl Mutation {
    /// The item after this mutation, or the reason it cannot apply.
    /// `Delete` is handled by the caller.
    fn applied_to(&self, item: &Item) -> ClientResult<Item> {
        let mut next = item.clone();
        match self {
            Mutation::SetQuantity(quantity) => {
                next.quantity = checked_quantity(*quantity)?;
            }
            Mutation::AdjustQuantity(delta) => {
                next.quantity = checked_quantity(item.quantity + delta)?;
            }
            Mutation::Rename(name) => {
                let name = name.trim();
                if name.is_empty() || name.chars().count() > 200 {
                    return Err(ClientError::new(
                        ErrorKind::Validation,
                        "Name must be between 1-200 characters",
                    ));
                }
                next.name = name.to_string();
            }
            Mutation::UpdateNotes(notes) => {
                if notes.chars().count() > 2000 {
                    return Err(ClientError::new(
                        ErrorKind::Validation,
                        "Notes must be at most 2000 characters",
                    ));
                }
                next.notes = notes.clone();
            }
            Mutation::Delete => {}
        }
        Ok(next)
    }
}

fn checked_quantity(quantity: f64) -> ClientResult<f64> {
    if !quantity.is_finite() || quantity < 0.0 {
        return Err(ClientError::new(
            ErrorKind::Validation,
            "Quantity must be a non-negative number",
        ));
    }
    Ok(quantity)
}

/// Replays `queue` on top of `base`. Mutations that no longer apply are
/// skipped; the server will reject them when their turn comes.
fn project<'a>(base: Option<&Item>, queue: impl Iterator<Item = &'a Mutation>) -> Option<Item> {
    let mut current = base.cloned();
    for mutation in queue {
        current = match (current, mutation) {
            (Some(_), Mutation::Delete) | (None, _) => None,
            (Some(item), mutation) => Some(mutation.applied_to(&item).unwrap_or(item)),
        };
    }
    current
}

fn place(mirror: &mut Vec<Item>, id: i64, item: Option<Item>) {
    let position = mirror.iter().position(|existing| existing.id == id);
    match (position, item) {
        (Some(index), Some(item)) => mirror[index] = item,
        (Some(index), None) => {
            mirror.remove(index);
        }
        (None, Some(item)) => {
            let index = mirror.partition_point(|existing| existing.name < item.name);
            mirror.insert(index, item);
        }
        (None, None) => {}
    }
}

struct Lane {
    /// Last state confirmed by the server; `None` once it is known gone.
    base: Option<Item>,
    /// Unconfirmed mutations in submission order; the front one is in flight.
    queue: VecDeque<Mutation>,
    /// Resolves when the most recently submitted write has finished.
    tail: Option<oneshot::Receiver<()>>,
}

#[derive(Default)]
struct Book {
    lanes: HashMap<i64, Lane>,
    /// Bumped on every confirmed write.
    sequence: u64,
    /// Sequence of the latest confirmation per entity, kept while a list
    /// fetch that could predate it is in flight.
    confirmed: HashMap<i64, u64>,
    fetches_in_flight: usize,
}

struct Inner {
    remote: Arc<dyn InventoryRemote>,
    session: SessionHandle,
    mirror: Mutex<Vec<Item>>,
    // Lock order: book before mirror.
    book: Mutex<Book>,
}

#[derive(Clone)]
pub struct OptimisticController {
    inner: Arc<Inner>,
}

impl OptimisticController {
    pub fn new(remote: Arc<dyn InventoryRemote>, session: SessionHandle) -> Self {
        Self {
            inner: Arc::new(Inner {
                remote,
                session,
                mirror: Mutex::new(Vec::new()),
                book: Mutex::new(Book::default()),
            }),
        }
    }

    /// Replaces the mirror with the server's list.
    pub async fn load(&self) -> ClientResult<()> {
        self.inner.refetch().await
    }

    pub fn items(&self) -> Vec<Item> {
        self.inner.mirror.lock().clone()
    }

    pub fn item(&self, id: i64) -> Option<Item> {
        self.inner
            .mirror
            .lock()
            .iter()
            .find(|item| item.id == id)
            .cloned()
    }

    /// Number of entities with unconfirmed writes.
    pub fn pending(&self) -> usize {
        self.inner.book.lock().lanes.len()
    }

    /// Applies `mutation` to the mirror and schedules the server write.
    ///
    /// Fails immediately, leaving the mirror untouched, when the item is not
    /// in the mirror or the mutation is invalid for its current local state.
    /// Otherwise returns a handle resolving to the server's verdict; by then
    /// the mirror has been reconciled. Must be called within a Tokio runtime.
    pub fn apply(
        &self,
        id: i64,
        mutation: Mutation,
    ) -> ClientResult<JoinHandle<ClientResult<()>>> {
        let mut book = self.inner.book.lock();
        let mut mirror = self.inner.mirror.lock();

        let current = mirror
            .iter()
            .find(|item| item.id == id)
            .cloned()
            .ok_or_else(|| {
                ClientError::new(ErrorKind::NotFound, format!("Item '{}' not found", id))
            })?;

        let next = match &mutation {
            Mutation::Delete => None,
            other => Some(other.applied_to(&current)?),
        };
        place(&mut mirror, id, next);
        drop(mirror);

        let lane = book.lanes.entry(id).or_insert_with(|| Lane {
            base: Some(current),
            queue: VecDeque::new(),
            tail: None,
        });
        lane.queue.push_back(mutation.clone());

        let (done, tail) = oneshot::channel();
        let previous = lane.tail.replace(tail);
        drop(book);

        debug!(item_id = id, ?mutation, "Applied optimistic mutation");

        let inner = Arc::clone(&self.inner);
        Ok(tokio::spawn(async move {
            if let Some(previous) = previous {
                // A dropped sender means the earlier write's task died; go on.
                let _ = previous.await;
            }
            let outcome = inner.confirm(id, &mutation).await;
            let _ = done.send(());
            outcome
        }))
    }
}

impl Inner {
    async fn confirm(&self, id: i64, mutation: &Mutation) -> ClientResult<()> {
        let result = match self.fencing_token(id) {
            Ok(since) => self.send(id, mutation, since).await,
            Err(error) => Err(error),
        };

        match result {
            Ok(confirmed) => {
                self.settle(id, true, |lane| lane.base = confirmed);
                Ok(())
            }
            Err(error) if error.is(ErrorKind::Unauthenticated) => {
                warn!(item_id = id, "Session lost during optimistic write, restoring item");
                self.session.invalidate();
                self.settle(id, false, |_| {});
                Err(error)
            }
            Err(error) => {
                info!(item_id = id, error = %error, "Optimistic write rejected, re-fetching");
                self.settle(id, false, |_| {});
                if let Err(refetch_error) = self.refetch().await {
                    warn!(error = %refetch_error, "Re-fetch after rejected write failed");
                    if refetch_error.is(ErrorKind::Unauthenticated) {
                        self.session.invalidate();
                    }
                }
                Err(error)
            }
        }
    }

    /// `If-Unmodified-Since` for the next write to `id`.
    fn fencing_token(&self, id: i64) -> ClientResult<DateTime<Utc>> {
        if !self.session.is_authenticated() {
            return Err(ClientError::new(
                ErrorKind::Unauthenticated,
                "Not authenticated",
            ));
        }

        self.book
            .lock()
            .lanes
            .get(&id)
            .and_then(|lane| lane.base.as_ref())
            .map(|item| item.updated_at)
            .ok_or_else(|| ClientError::new(ErrorKind::NotFound, format!("Item '{}' not found", id)))
    }

    async fn send(
        &self,
        id: i64,
        mutation: &Mutation,
        since: DateTime<Utc>,
    ) -> ClientResult<Option<Item>> {
        let since = Some(since);
        let item = match mutation {
            Mutation::SetQuantity(quantity) => {
                let patch = StockPatch {
                    delta: None,
                    new_qty: Some(*quantity),
                };
                self.remote.patch_stock(id, &patch, since).await?
            }
            Mutation::AdjustQuantity(delta) => {
                let patch = StockPatch {
                    delta: Some(*delta),
                    new_qty: None,
                };
                self.remote.patch_stock(id, &patch, since).await?
            }
            Mutation::Rename(name) => {
                let patch = ItemPatch {
                    name: Some(name.trim().to_string()),
                    ..Default::default()
                };
                self.remote.update_item(id, &patch, since).await?
            }
            Mutation::UpdateNotes(notes) => {
                let patch = ItemPatch {
                    notes: Some(notes.clone()),
                    ..Default::default()
                };
                self.remote.update_item(id, &patch, since).await?
            }
            Mutation::Delete => {
                self.remote.delete_item(id).await?;
                return Ok(None);
            }
        };
        Ok(Some(item))
    }

    /// Retires the front mutation of the lane, lets `update` adjust the
    /// confirmed base and re-projects the entity into the mirror.
    fn settle(&self, id: i64, confirmed: bool, update: impl FnOnce(&mut Lane)) {
        let mut book = self.book.lock();
        if confirmed && book.fetches_in_flight > 0 {
            book.sequence += 1;
            let sequence = book.sequence;
            book.confirmed.insert(id, sequence);
        }

        let Some(lane) = book.lanes.get_mut(&id) else {
            return;
        };
        lane.queue.pop_front();
        update(lane);

        let projected = project(lane.base.as_ref(), lane.queue.iter());
        place(&mut self.mirror.lock(), id, projected);

        if lane.queue.is_empty() {
            book.lanes.remove(&id);
        }
    }

    /// Fetches the server list and installs it over the mirror.
    async fn refetch(&self) -> ClientResult<()> {
        let started = {
            let mut book = self.book.lock();
            book.fetches_in_flight += 1;
            book.sequence
        };

        let fetched = self.remote.fetch_items().await;

        let mut book = self.book.lock();
        book.fetches_in_flight -= 1;
        let outcome = fetched.map(|items| self.replace_all(&mut book, items, started));
        if book.fetches_in_flight == 0 {
            book.confirmed.clear();
        }
        outcome
    }

    /// Installs a server list fetched at sequence `started`, keeping pending
    /// mutations on top. Entities confirmed after the fetch began keep their
    /// local state, since the list may predate the confirmation.
    fn replace_all(&self, book: &mut Book, items: Vec<Item>, started: u64) {
        let Book {
            lanes, confirmed, ..
        } = book;
        let mut mirror = self.mirror.lock();
        let previous = std::mem::replace(&mut *mirror, items);

        let newer: Vec<i64> = confirmed
            .iter()
            .filter(|(_, sequence)| **sequence > started)
            .map(|(id, _)| *id)
            .collect();
        for id in &newer {
            let local = previous.iter().find(|item| item.id == *id).cloned();
            place(&mut mirror, *id, local);
        }

        for (id, lane) in lanes.iter_mut() {
            if !newer.contains(id) {
                lane.base = mirror.iter().find(|item| item.id == *id).cloned();
            }
            let projected = project(lane.base.as_ref(), lane.queue.iter());
            place(&mut mirror, *id, projected);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::session::{SessionEvent, SessionState};
    use crate::database::models::ItemType;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    fn item(id: i64, name: &str, quantity: f64) -> Item {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        Item {
            id,
            name: name.to_string(),
            item_type: ItemType::Food,
            category_id: None,
            unit_id: None,
            quantity,
            notes: String::new(),
            mealie_food_id: None,
            created_at: at,
            updated_at: at,
        }
    }

    /// In-memory server with `updated_at` preconditions.
    #[derive(Default)]
    struct FakeRemote {
        items: Mutex<Vec<Item>>,
        revoked: AtomicBool,
        fail_deletes: AtomicBool,
        writes: AtomicUsize,
        latency: Duration,
        /// Lists are snapshotted when requested and delivered after this delay.
        fetch_latency: Duration,
    }

    impl FakeRemote {
        fn with_items(items: Vec<Item>) -> Self {
            Self {
                items: Mutex::new(items),
                latency: Duration::from_millis(10),
                fetch_latency: Duration::from_millis(10),
                ..Default::default()
            }
        }

        fn snapshot(&self) -> Vec<Item> {
            self.items.lock().clone()
        }

        /// A change made by another client.
        fn touch(&self, id: i64, change: impl FnOnce(&mut Item)) {
            let mut items = self.items.lock();
            let item = items.iter_mut().find(|item| item.id == id).unwrap();
            change(item);
            item.updated_at += chrono::Duration::seconds(1);
        }

        async fn write(
            &self,
            id: i64,
            since: Option<DateTime<Utc>>,
            change: impl FnOnce(&mut Item) -> ClientResult<()>,
        ) -> ClientResult<Item> {
            tokio::time::sleep(self.latency).await;
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.revoked.load(Ordering::SeqCst) {
                return Err(ClientError::new(ErrorKind::Unauthenticated, "Not authenticated"));
            }

            let mut items = self.items.lock();
            let item = items
                .iter_mut()
                .find(|item| item.id == id)
                .ok_or_else(|| ClientError::new(ErrorKind::NotFound, "Item not found"))?;
            if since.is_some_and(|since| item.updated_at > since) {
                return Err(ClientError::new(ErrorKind::Conflict, "Item was modified"));
            }

            change(item)?;
            item.updated_at += chrono::Duration::seconds(1);
            Ok(item.clone())
        }
    }

    #[async_trait]
    impl InventoryRemote for FakeRemote {
        async fn fetch_items(&self) -> ClientResult<Vec<Item>> {
            if self.revoked.load(Ordering::SeqCst) {
                return Err(ClientError::new(ErrorKind::Unauthenticated, "Not authenticated"));
            }
            let items = self.snapshot();
            tokio::time::sleep(self.fetch_latency).await;
            Ok(items)
        }

        async fn update_item(
            &self,
            id: i64,
            patch: &ItemPatch,
            since: Option<DateTime<Utc>>,
        ) -> ClientResult<Item> {
            self.write(id, since, |item| {
                if let Some(name) = &patch.name {
                    item.name = name.clone();
                }
                if let Some(notes) = &patch.notes {
                    item.notes = notes.clone();
                }
                Ok(())
            })
            .await
        }

        async fn patch_stock(
            &self,
            id: i64,
            patch: &StockPatch,
            since: Option<DateTime<Utc>>,
        ) -> ClientResult<Item> {
            self.write(id, since, |item| {
                let next = match (patch.delta, patch.new_qty) {
                    (Some(delta), None) => item.quantity + delta,
                    (None, Some(quantity)) => quantity,
                    _ => return Err(ClientError::new(ErrorKind::Validation, "delta xor new_qty")),
                };
                if next < 0.0 {
                    return Err(ClientError::new(ErrorKind::Validation, "Negative stock"));
                }
                item.quantity = next;
                Ok(())
            })
            .await
        }

        async fn delete_item(&self, id: i64) -> ClientResult<()> {
            tokio::time::sleep(self.latency).await;
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail_deletes.load(Ordering::SeqCst) {
                return Err(ClientError::new(ErrorKind::Unexpected, "Connection reset"));
            }
            let mut items = self.items.lock();
            let before = items.len();
            items.retain(|item| item.id != id);
            if items.len() == before {
                return Err(ClientError::new(ErrorKind::NotFound, "Item not found"));
            }
            Ok(())
        }
    }

    async fn setup(items: Vec<Item>) -> (Arc<FakeRemote>, SessionHandle, OptimisticController) {
        let remote = Arc::new(FakeRemote::with_items(items));
        let session = SessionHandle::new();
        session.set_authenticated("alice");
        let controller = OptimisticController::new(remote.clone(), session.clone());
        controller.load().await.unwrap();
        (remote, session, controller)
    }

    #[tokio::test]
    async fn test_confirmed_write_adopts_server_state() {
        let (remote, _, controller) = setup(vec![item(1, "Milk", 2.0)]).await;

        let handle = controller.apply(1, Mutation::AdjustQuantity(1.0)).unwrap();
        assert_eq!(controller.item(1).unwrap().quantity, 3.0);
        assert_eq!(controller.pending(), 1);

        handle.await.unwrap().unwrap();
        assert_eq!(controller.items(), remote.snapshot());
        assert_eq!(controller.pending(), 0);
    }

    #[tokio::test]
    async fn test_conflict_reconciles_to_server_state() {
        let (remote, _, controller) = setup(vec![item(1, "Milk", 2.0)]).await;
        remote.touch(1, |item| item.name = "Oat milk".to_string());

        let handle = controller
            .apply(1, Mutation::Rename("Whole milk".to_string()))
            .unwrap();
        assert_eq!(controller.item(1).unwrap().name, "Whole milk");

        let error = handle.await.unwrap().unwrap_err();
        assert_eq!(error.kind, ErrorKind::Conflict);
        assert_eq!(controller.items(), remote.snapshot());
        assert_eq!(controller.item(1).unwrap().name, "Oat milk");
    }

    #[tokio::test]
    async fn test_unauthenticated_restores_snapshot() {
        let (remote, session, controller) = setup(vec![item(1, "Milk", 2.0)]).await;
        let before = controller.items();
        let mut events = session.subscribe();
        remote.revoked.store(true, Ordering::SeqCst);

        let handle = controller.apply(1, Mutation::SetQuantity(5.0)).unwrap();
        let error = handle.await.unwrap().unwrap_err();

        assert_eq!(error.kind, ErrorKind::Unauthenticated);
        assert_eq!(controller.items(), before);
        assert_eq!(session.state(), SessionState::Anonymous);
        assert_eq!(events.try_recv().unwrap(), SessionEvent::Invalidated);
    }

    #[tokio::test]
    async fn test_no_writes_after_session_lost() {
        let (remote, session, controller) = setup(vec![item(1, "Milk", 2.0)]).await;
        let before = controller.items();
        session.invalidate();

        let handle = controller.apply(1, Mutation::AdjustQuantity(1.0)).unwrap();
        let error = handle.await.unwrap().unwrap_err();

        assert_eq!(error.kind, ErrorKind::Unauthenticated);
        assert_eq!(remote.writes.load(Ordering::SeqCst), 0);
        assert_eq!(controller.items(), before);
    }

    #[tokio::test]
    async fn test_same_entity_writes_are_serialized() {
        let (remote, _, controller) = setup(vec![item(1, "Milk", 2.0)]).await;

        let handles: Vec<_> = (0..3)
            .map(|_| controller.apply(1, Mutation::AdjustQuantity(1.0)).unwrap())
            .collect();
        assert_eq!(controller.item(1).unwrap().quantity, 5.0);

        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(remote.snapshot()[0].quantity, 5.0);
        assert_eq!(controller.items(), remote.snapshot());
    }

    #[tokio::test]
    async fn test_queued_write_survives_earlier_conflict() {
        let (remote, _, controller) = setup(vec![item(1, "Milk", 2.0)]).await;
        remote.touch(1, |item| item.name = "Oat milk".to_string());

        let rename = controller
            .apply(1, Mutation::Rename("Whole milk".to_string()))
            .unwrap();
        let restock = controller.apply(1, Mutation::AdjustQuantity(1.0)).unwrap();

        assert_eq!(rename.await.unwrap().unwrap_err().kind, ErrorKind::Conflict);
        restock.await.unwrap().unwrap();

        let current = controller.item(1).unwrap();
        assert_eq!(current.name, "Oat milk");
        assert_eq!(current.quantity, 3.0);
        assert_eq!(controller.items(), remote.snapshot());
    }

    #[tokio::test]
    async fn test_slow_refetch_keeps_newer_confirmations() {
        let remote = Arc::new(FakeRemote {
            fetch_latency: Duration::from_millis(150),
            ..FakeRemote::with_items(vec![
                item(1, "Milk", 2.0),
                item(2, "Soap", 1.0),
                item(3, "Tea", 1.0),
            ])
        });
        let session = SessionHandle::new();
        session.set_authenticated("alice");
        let controller = OptimisticController::new(remote.clone(), session.clone());
        controller.load().await.unwrap();
        remote.touch(1, |item| item.name = "Oat milk".to_string());

        // The conflict starts a re-fetch whose list predates the writes below.
        let rename = controller
            .apply(1, Mutation::Rename("Whole milk".to_string()))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;

        let restock = controller.apply(2, Mutation::AdjustQuantity(4.0)).unwrap();
        let removal = controller.apply(3, Mutation::Delete).unwrap();
        restock.await.unwrap().unwrap();
        removal.await.unwrap().unwrap();
        assert_eq!(controller.item(2).unwrap().quantity, 5.0);

        assert_eq!(rename.await.unwrap().unwrap_err().kind, ErrorKind::Conflict);
        assert_eq!(controller.item(1).unwrap().name, "Oat milk");
        assert_eq!(controller.item(2).unwrap().quantity, 5.0);
        assert!(controller.item(3).is_none());
        assert_eq!(controller.items(), remote.snapshot());

        // Later fetches see the server directly again.
        remote.touch(2, |item| item.quantity = 9.0);
        controller.load().await.unwrap();
        assert_eq!(controller.items(), remote.snapshot());
    }

    #[tokio::test]
    async fn test_failed_delete_brings_item_back() {
        let (remote, _, controller) =
            setup(vec![item(1, "Flour", 1.0), item(2, "Milk", 2.0)]).await;
        remote.fail_deletes.store(true, Ordering::SeqCst);

        let handle = controller.apply(1, Mutation::Delete).unwrap();
        assert!(controller.item(1).is_none());

        let error = handle.await.unwrap().unwrap_err();
        assert_eq!(error.kind, ErrorKind::Unexpected);
        assert_eq!(controller.items(), remote.snapshot());
        assert_eq!(controller.items()[0].name, "Flour");
    }

    #[tokio::test]
    async fn test_invalid_mutation_is_rejected_locally() {
        let (remote, _, controller) = setup(vec![item(1, "Milk", 2.0)]).await;

        let error = controller
            .apply(1, Mutation::AdjustQuantity(-5.0))
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::Validation);

        let error = controller.apply(7, Mutation::Delete).unwrap_err();
        assert_eq!(error.kind, ErrorKind::NotFound);

        assert_eq!(controller.pending(), 0);
        assert_eq!(remote.writes.load(Ordering::SeqCst), 0);
        assert_eq!(controller.items(), remote.snapshot());
    }

    #[test]
    fn test_projection_replays_queue() {
        let base = item(1, "Milk", 2.0);
        let queue = [
            Mutation::AdjustQuantity(1.0),
            Mutation::AdjustQuantity(-10.0),
            Mutation::Rename("Whole milk".to_string()),
        ];
        let projected = project(Some(&base), queue.iter()).unwrap();
        assert_eq!(projected.quantity, 3.0);
        assert_eq!(projected.name, "Whole milk");

        let queue = [Mutation::Delete, Mutation::AdjustQuantity(1.0)];
        assert!(project(Some(&base), queue.iter()).is_none());
    }
}
