//! Character sheet synchronization.
//!
//! [`SheetController`] owns the signed-in user's character list and the one
//! open sheet, and keeps both in step with the record store:
//!
//! - session start fetches the list; nothing is loaded until a character is
//!   selected
//! - selection fetches the stored document and merges it onto the starter
//!   template
//! - every edit after a successful load schedules a debounced write of the
//!   whole sheet; a successful write mirrors name, level, class and race
//!   into the list entry
//! - an edit to experience also recomputes the level
//!
//! Store failures are logged and swallowed. A failed load leaves the prior
//! state in place and a failed write is not retried.

mod error;

pub use error::SheetSyncError;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, RwLock};
use tokio_util::sync::CancellationToken;

use charsheet_domain::{
    merge_onto_defaults, starter_template, CharacterId, CharacterName, CharacterSheet,
    CharacterSummary, DerivedStats, SheetEdit, UserId,
};

use crate::infrastructure::debounce::{DebounceSink, DebouncedWriter};
use crate::infrastructure::ports::{
    AuthSession, CharacterStore, CharacterUpdate, ClockPort, NewCharacterRecord,
    StoredCharacterRow,
};

/// A sheet waiting for its quiet period to elapse.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSave {
    pub id: CharacterId,
    pub sheet: CharacterSheet,
}

#[derive(Debug, Default)]
enum Selection {
    #[default]
    None,
    /// Fetch in flight. Edits apply locally but are never written.
    Loading { id: CharacterId, sheet: CharacterSheet },
    Loaded { id: CharacterId, sheet: CharacterSheet },
}

impl Selection {
    fn id(&self) -> Option<CharacterId> {
        match self {
            Self::None => None,
            Self::Loading { id, .. } | Self::Loaded { id, .. } => Some(*id),
        }
    }

    fn sheet(&self) -> Option<&CharacterSheet> {
        match self {
            Self::None => None,
            Self::Loading { sheet, .. } | Self::Loaded { sheet, .. } => Some(sheet),
        }
    }

    fn is_loading(&self, target: CharacterId) -> bool {
        matches!(self, Self::Loading { id, .. } if *id == target)
    }
}

#[derive(Debug, Default)]
struct SessionState {
    owner: Option<UserId>,
    selection: Selection,
}

type SummaryList = Arc<RwLock<Vec<CharacterSummary>>>;

/// Debounce sink that writes a sheet and mirrors it into the list.
struct SheetSaver {
    store: Arc<dyn CharacterStore>,
    clock: Arc<dyn ClockPort>,
    summaries: SummaryList,
}

impl SheetSaver {
    async fn save(&self, save: &PendingSave) -> Result<(), SheetSyncError> {
        let update = CharacterUpdate {
            name: save.sheet.name.clone(),
            data: serde_json::to_value(&save.sheet)?,
            updated_at: self.clock.now(),
        };
        self.store.update(save.id, update).await?;

        if let Some(summary) = self
            .summaries
            .write()
            .await
            .iter_mut()
            .find(|s| s.id == save.id)
        {
            summary.mirror(&save.sheet);
        }
        tracing::info!(
            character_id = %save.id,
            name = %save.sheet.name,
            level = save.sheet.level,
            "Character saved"
        );
        Ok(())
    }
}

#[async_trait]
impl DebounceSink<PendingSave> for SheetSaver {
    async fn write(&self, save: PendingSave) {
        if let Err(e) = self.save(&save).await {
            tracing::error!(character_id = %save.id, error = %e, "Failed to save character");
        }
    }
}

pub struct SheetController {
    store: Arc<dyn CharacterStore>,
    writer: DebouncedWriter<PendingSave>,
    state: RwLock<SessionState>,
    summaries: SummaryList,
}

impl SheetController {
    pub fn new(
        store: Arc<dyn CharacterStore>,
        clock: Arc<dyn ClockPort>,
        debounce: Duration,
    ) -> Self {
        let summaries: SummaryList = Arc::new(RwLock::new(Vec::new()));
        let saver = Arc::new(SheetSaver {
            store: store.clone(),
            clock,
            summaries: summaries.clone(),
        });
        Self {
            store,
            writer: DebouncedWriter::new(debounce, saver),
            state: RwLock::new(SessionState::default()),
            summaries,
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn owner(&self) -> Option<UserId> {
        self.state.read().await.owner
    }

    pub async fn summaries(&self) -> Vec<CharacterSummary> {
        self.summaries.read().await.clone()
    }

    pub async fn active_id(&self) -> Option<CharacterId> {
        self.state.read().await.selection.id()
    }

    /// The open sheet, including one still loading.
    pub async fn active_sheet(&self) -> Option<CharacterSheet> {
        self.state.read().await.selection.sheet().cloned()
    }

    /// Whether the open sheet finished loading (and so is being saved).
    pub async fn is_loaded(&self) -> bool {
        matches!(self.state.read().await.selection, Selection::Loaded { .. })
    }

    pub async fn derived(&self) -> Option<DerivedStats> {
        self.state
            .read()
            .await
            .selection
            .sheet()
            .map(DerivedStats::compute)
    }

    pub async fn has_pending_write(&self) -> bool {
        self.writer.has_pending().await
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Begin a session for `owner` and fetch their character list.
    pub async fn start_session(&self, owner: UserId) -> Vec<CharacterSummary> {
        self.writer.flush().await;
        {
            let mut state = self.state.write().await;
            if state.owner != Some(owner) {
                self.summaries.write().await.clear();
            }
            state.owner = Some(owner);
            state.selection = Selection::None;
        }
        tracing::info!(user_id = %owner, "Session started");
        self.refresh_list().await
    }

    /// Write anything pending, then forget the user and their characters.
    pub async fn end_session(&self) {
        self.writer.flush().await;
        let mut state = self.state.write().await;
        let owner = state.owner.take();
        state.selection = Selection::None;
        self.summaries.write().await.clear();
        if let Some(owner) = owner {
            tracing::info!(user_id = %owner, "Session ended");
        }
    }

    /// Restart for a different user, clear on sign-out, ignore a refresh of
    /// the same user's session.
    pub async fn handle_session_change(&self, session: Option<&AuthSession>) {
        match session {
            Some(session) if self.owner().await == Some(session.user_id) => {}
            Some(session) => {
                self.start_session(session.user_id).await;
            }
            None => self.end_session().await,
        }
    }

    /// Follow auth session changes until cancelled or the auth side goes away.
    pub async fn run_session_watcher(
        self: Arc<Self>,
        mut sessions: watch::Receiver<Option<AuthSession>>,
        cancel_token: CancellationToken,
    ) {
        let initial = sessions.borrow_and_update().clone();
        self.handle_session_change(initial.as_ref()).await;

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    tracing::info!("Session watcher shutting down");
                    break;
                }
                changed = sessions.changed() => {
                    if changed.is_err() {
                        tracing::info!("Auth service closed, session watcher stopping");
                        break;
                    }
                    let session = sessions.borrow_and_update().clone();
                    self.handle_session_change(session.as_ref()).await;
                }
            }
        }
    }

    /// Re-fetch the list. Clears the selection on success.
    pub async fn refresh_list(&self) -> Vec<CharacterSummary> {
        match self.try_refresh_list().await {
            Ok(list) => list,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load character list");
                self.summaries().await
            }
        }
    }

    async fn try_refresh_list(&self) -> Result<Vec<CharacterSummary>, SheetSyncError> {
        let owner = self.owner().await.ok_or(SheetSyncError::NoSession)?;
        let rows = self.store.list_by_owner(owner).await?;
        let list: Vec<CharacterSummary> = rows.iter().map(summary_from_row).collect();

        let mut state = self.state.write().await;
        if state.owner != Some(owner) {
            return Err(SheetSyncError::SessionChanged);
        }
        state.selection = Selection::None;
        *self.summaries.write().await = list.clone();
        tracing::debug!(user_id = %owner, count = list.len(), "Character list loaded");
        Ok(list)
    }

    // =========================================================================
    // Selection, creation, deletion
    // =========================================================================

    /// Load a stored character. `None` if the load failed, in which case the
    /// previous selection is kept.
    pub async fn select_character(&self, id: CharacterId) -> Option<CharacterSheet> {
        match self.try_select(id).await {
            Ok(sheet) => Some(sheet),
            Err(e) => {
                tracing::error!(character_id = %id, error = %e, "Failed to load character");
                None
            }
        }
    }

    async fn try_select(&self, id: CharacterId) -> Result<CharacterSheet, SheetSyncError> {
        self.writer.flush().await;

        let previous = {
            let mut state = self.state.write().await;
            if state.owner.is_none() {
                return Err(SheetSyncError::NoSession);
            }
            std::mem::replace(
                &mut state.selection,
                Selection::Loading {
                    id,
                    sheet: starter_template(),
                },
            )
        };

        let loaded = self.load(id).await;

        let reconciled = {
            let mut state = self.state.write().await;
            if !state.selection.is_loading(id) {
                return Err(SheetSyncError::SelectionChanged(id));
            }
            let sheet = match loaded {
                Ok(sheet) => sheet,
                Err(e) => {
                    state.selection = previous;
                    return Err(e);
                }
            };

            // a stored level that disagrees with experience is corrected like
            // any other experience-driven change
            let stale_level = sheet.level != sheet.expected_level();
            let sheet = if stale_level { sheet.reconcile_level() } else { sheet };
            state.selection = Selection::Loaded {
                id,
                sheet: sheet.clone(),
            };
            tracing::info!(character_id = %id, name = %sheet.name, "Character loaded");
            if stale_level {
                tracing::debug!(character_id = %id, level = sheet.level, "Stored level corrected");
                self.writer
                    .schedule(PendingSave {
                        id,
                        sheet: sheet.clone(),
                    })
                    .await;
            }
            sheet
        };

        Ok(reconciled)
    }

    async fn load(&self, id: CharacterId) -> Result<CharacterSheet, SheetSyncError> {
        let row = self
            .store
            .get(id)
            .await?
            .ok_or(SheetSyncError::CharacterNotFound(id))?;
        Ok(merge_onto_defaults(&row.data)?)
    }

    /// Create a character from the starter template and select it.
    pub async fn create_character(&self, name: &str) -> Option<CharacterSummary> {
        match self.try_create(name).await {
            Ok(summary) => Some(summary),
            Err(e) => {
                tracing::error!(name, error = %e, "Failed to create character");
                None
            }
        }
    }

    async fn try_create(&self, name: &str) -> Result<CharacterSummary, SheetSyncError> {
        let name = CharacterName::new(name)?;
        let owner = self.owner().await.ok_or(SheetSyncError::NoSession)?;
        self.writer.flush().await;

        let sheet = CharacterSheet::new_named(&name);
        let id = self
            .store
            .insert(NewCharacterRecord {
                owner,
                name: name.to_string(),
                data: serde_json::to_value(&sheet)?,
            })
            .await?;

        let summary = CharacterSummary::from_sheet(id, &sheet);
        let mut state = self.state.write().await;
        if state.owner != Some(owner) {
            return Err(SheetSyncError::SessionChanged);
        }
        self.summaries.write().await.push(summary.clone());
        state.selection = Selection::Loaded { id, sheet };
        tracing::info!(character_id = %id, name = %summary.name, "Character created");
        Ok(summary)
    }

    /// Delete a character. Returns whether the store accepted the delete.
    pub async fn delete_character(&self, id: CharacterId) -> bool {
        match self.try_delete(id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(character_id = %id, error = %e, "Failed to delete character");
                false
            }
        }
    }

    async fn try_delete(&self, id: CharacterId) -> Result<(), SheetSyncError> {
        if self.owner().await.is_none() {
            return Err(SheetSyncError::NoSession);
        }
        self.store.delete(id).await?;

        if self.writer.cancel_where(|p| p.id == id).await.is_some() {
            tracing::debug!(character_id = %id, "Dropped pending write for deleted character");
        }
        let mut state = self.state.write().await;
        self.summaries.write().await.retain(|s| s.id != id);
        if state.selection.id() == Some(id) {
            state.selection = Selection::None;
        }
        tracing::info!(character_id = %id, "Character deleted");
        Ok(())
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Apply an edit to the open sheet and schedule its write.
    ///
    /// Returns the edited sheet, or `None` when nothing is selected. While
    /// the sheet is still loading the edit is applied but not written.
    pub async fn apply_edit(&self, edit: SheetEdit) -> Option<CharacterSheet> {
        let reconcile = edit.touches_experience();
        // scheduled under the state guard so write order matches edit order
        let mut state = self.state.write().await;
        let (id, sheet, loaded) = match &mut state.selection {
            Selection::None => {
                tracing::debug!("Edit ignored, no character selected");
                return None;
            }
            Selection::Loading { id, sheet } => (*id, sheet, false),
            Selection::Loaded { id, sheet } => (*id, sheet, true),
        };

        let before = sheet.clone();
        let mut after = std::mem::take(sheet).apply(edit);
        if reconcile {
            after = after.reconcile_level();
        }
        *sheet = after.clone();

        if after == before {
            return Some(after);
        }
        if !loaded {
            tracing::debug!(character_id = %id, "Write suppressed until load completes");
            return Some(after);
        }
        self.writer
            .schedule(PendingSave {
                id,
                sheet: after.clone(),
            })
            .await;
        Some(after)
    }

    /// Write any pending sheet now.
    pub async fn flush(&self) {
        self.writer.flush().await;
    }
}

/// List entry for a stored row. The row's name column wins over the
/// document's; the rest comes from the merged document.
fn summary_from_row(row: &StoredCharacterRow) -> CharacterSummary {
    let sheet = merge_onto_defaults(&row.data).unwrap_or_else(|e| {
        tracing::warn!(
            character_id = %row.id,
            error = %e,
            "Malformed stored document, listing defaults"
        );
        starter_template()
    });
    CharacterSummary {
        name: row.name.clone(),
        ..CharacterSummary::from_sheet(row.id, &sheet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::memory::{InMemoryAuth, InMemoryCharacterStore};
    use crate::infrastructure::ports::{AuthPort, MockCharacterStore, RepoError};
    use charsheet_domain::{DetailField, FieldValue, HeaderField};
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use tokio::sync::Notify;

    const WINDOW: Duration = Duration::from_millis(1000);

    fn controller(store: Arc<dyn CharacterStore>) -> Arc<SheetController> {
        let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()));
        Arc::new(SheetController::new(store, clock, WINDOW))
    }

    fn stored_row(id: CharacterId, name: &str) -> StoredCharacterRow {
        let sheet = CharacterSheet::new_named(&CharacterName::new(name).unwrap());
        StoredCharacterRow {
            id,
            name: name.to_string(),
            data: serde_json::to_value(&sheet).unwrap(),
        }
    }

    fn rename(name: &str) -> SheetEdit {
        SheetEdit::SetHeaderField {
            field: HeaderField::Name,
            value: name.to_string(),
        }
    }

    fn set_xp(xp: f64) -> SheetEdit {
        SheetEdit::SetDetailField {
            field: DetailField::Xp,
            value: FieldValue::Number(Some(xp)),
        }
    }

    async fn stored_sheet(store: &InMemoryCharacterStore, id: CharacterId) -> CharacterSheet {
        let row = store.get(id).await.unwrap().unwrap();
        merge_onto_defaults(&row.data).unwrap()
    }

    /// Holds every `get` until released.
    struct GatedStore {
        inner: InMemoryCharacterStore,
        gate: Notify,
    }

    #[async_trait]
    impl CharacterStore for GatedStore {
        async fn list_by_owner(
            &self,
            owner: UserId,
        ) -> Result<Vec<StoredCharacterRow>, RepoError> {
            self.inner.list_by_owner(owner).await
        }

        async fn get(&self, id: CharacterId) -> Result<Option<StoredCharacterRow>, RepoError> {
            self.gate.notified().await;
            self.inner.get(id).await
        }

        async fn insert(&self, record: NewCharacterRecord) -> Result<CharacterId, RepoError> {
            self.inner.insert(record).await
        }

        async fn update(&self, id: CharacterId, update: CharacterUpdate) -> Result<(), RepoError> {
            self.inner.update(id, update).await
        }

        async fn delete(&self, id: CharacterId) -> Result<(), RepoError> {
            self.inner.delete(id).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_edits_writes_once_with_final_state() {
        let owner = UserId::new();
        let id = CharacterId::new();

        let mut store = MockCharacterStore::new();
        store
            .expect_list_by_owner()
            .returning(move |_| Ok(vec![stored_row(id, "Ilvara")]));
        store
            .expect_get()
            .returning(move |_| Ok(Some(stored_row(id, "Ilvara"))));
        store
            .expect_update()
            .withf(move |target, update| {
                *target == id && update.name == "Third" && update.data["name"] == "Third"
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let sheets = controller(Arc::new(store));
        sheets.start_session(owner).await;
        sheets.select_character(id).await.unwrap();

        for name in ["First", "Second", "Third"] {
            sheets.apply_edit(rename(name)).await.unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(sheets.has_pending_write().await);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!sheets.has_pending_write().await);
        assert_eq!(sheets.summaries().await[0].name, "Third");
    }

    #[tokio::test(start_paused = true)]
    async fn edits_while_loading_are_never_written() {
        let owner = UserId::new();
        let id = CharacterId::new();
        let store = Arc::new(GatedStore {
            inner: InMemoryCharacterStore::new(),
            gate: Notify::new(),
        });
        store
            .inner
            .seed(id, owner, "Ilvara", stored_row(id, "Ilvara").data)
            .await;

        let sheets = controller(store.clone());
        sheets.start_session(owner).await;

        let loading = tokio::spawn({
            let sheets = sheets.clone();
            async move { sheets.select_character(id).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(sheets.active_id().await, Some(id));
        assert!(!sheets.is_loaded().await);

        let edited = sheets.apply_edit(rename("Too Early")).await.unwrap();
        assert_eq!(edited.name, "Too Early");
        assert!(!sheets.has_pending_write().await);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(store.inner.updated_at(id).await.is_none());

        store.gate.notify_one();
        let loaded = loading.await.unwrap().unwrap();
        assert_eq!(loaded.name, "Ilvara");
        assert!(sheets.is_loaded().await);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(store.inner.updated_at(id).await.is_none());
    }

    #[tokio::test]
    async fn create_then_select_returns_named_template() {
        let store = Arc::new(InMemoryCharacterStore::new());
        let sheets = controller(store.clone());
        assert!(sheets.start_session(UserId::new()).await.is_empty());

        let summary = sheets.create_character("  Ilvara ").await.unwrap();
        assert_eq!(summary.name, "Ilvara");
        assert_eq!(summary.level, 1);
        assert_eq!(summary.class, "Fighter");
        assert_eq!(summary.race, "Human");
        assert_eq!(sheets.active_id().await, Some(summary.id));
        assert!(sheets.is_loaded().await);

        let listed = sheets.refresh_list().await;
        assert_eq!(listed, vec![summary.clone()]);
        assert_eq!(sheets.active_id().await, None);

        let sheet = sheets.select_character(summary.id).await.unwrap();
        let expected = CharacterSheet::new_named(&CharacterName::new("Ilvara").unwrap());
        assert_eq!(sheet, expected);
    }

    #[tokio::test]
    async fn create_rejects_blank_names_and_missing_session() {
        let store = Arc::new(InMemoryCharacterStore::new());
        let sheets = controller(store.clone());

        assert!(sheets.create_character("Ilvara").await.is_none());

        sheets.start_session(UserId::new()).await;
        assert!(sheets.create_character("   ").await.is_none());
        assert!(store.is_empty().await);
        assert!(sheets.summaries().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn delete_drops_selection_and_pending_write() {
        let store = Arc::new(InMemoryCharacterStore::new());
        let sheets = controller(store.clone());
        sheets.start_session(UserId::new()).await;

        let keep = sheets.create_character("Keeper").await.unwrap();
        let doomed = sheets.create_character("Doomed").await.unwrap();
        sheets.apply_edit(rename("Renamed")).await.unwrap();
        assert!(sheets.has_pending_write().await);

        assert!(sheets.delete_character(doomed.id).await);
        assert!(!sheets.has_pending_write().await);
        assert_eq!(sheets.active_id().await, None);
        assert_eq!(sheets.summaries().await, vec![keep]);
        assert_eq!(store.len().await, 1);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn failed_list_is_swallowed() {
        let mut store = MockCharacterStore::new();
        store
            .expect_list_by_owner()
            .returning(|_| Err(RepoError::database("list_by_owner", "connection refused")));

        let sheets = controller(Arc::new(store));
        assert!(sheets.start_session(UserId::new()).await.is_empty());
        assert_eq!(sheets.active_id().await, None);
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_selection() {
        let store = Arc::new(InMemoryCharacterStore::new());
        let sheets = controller(store.clone());
        sheets.start_session(UserId::new()).await;
        let current = sheets.create_character("Ilvara").await.unwrap();

        assert!(sheets.select_character(CharacterId::new()).await.is_none());
        assert_eq!(sheets.active_id().await, Some(current.id));
        assert!(sheets.is_loaded().await);
        assert_eq!(sheets.active_sheet().await.unwrap().name, "Ilvara");
    }

    #[tokio::test]
    async fn malformed_document_fails_load() {
        let owner = UserId::new();
        let id = CharacterId::new();
        let store = Arc::new(InMemoryCharacterStore::new());
        store.seed(id, owner, "Broken", json!({"level": "high"})).await;

        let sheets = controller(store.clone());
        let listed = sheets.start_session(owner).await;
        assert_eq!(listed[0].name, "Broken");
        assert_eq!(listed[0].class, "Fighter");

        assert!(sheets.select_character(id).await.is_none());
        assert_eq!(sheets.active_id().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_write_leaves_summary_unmirrored() {
        let id = CharacterId::new();
        let mut store = MockCharacterStore::new();
        store
            .expect_list_by_owner()
            .returning(move |_| Ok(vec![stored_row(id, "Ilvara")]));
        store
            .expect_get()
            .returning(move |_| Ok(Some(stored_row(id, "Ilvara"))));
        store
            .expect_update()
            .times(1)
            .returning(|_, _| Err(RepoError::constraint("update rejected (401)")));

        let sheets = controller(Arc::new(store));
        sheets.start_session(UserId::new()).await;
        sheets.select_character(id).await.unwrap();
        sheets.apply_edit(rename("Unsaved")).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(sheets.summaries().await[0].name, "Ilvara");
        assert_eq!(sheets.active_sheet().await.unwrap().name, "Unsaved");
    }

    #[tokio::test(start_paused = true)]
    async fn experience_edit_levels_up_in_one_write() {
        let store = Arc::new(InMemoryCharacterStore::new());
        let sheets = controller(store.clone());
        sheets.start_session(UserId::new()).await;
        let summary = sheets.create_character("Ilvara").await.unwrap();

        let sheet = sheets.apply_edit(set_xp(900.0)).await.unwrap();
        assert_eq!(sheet.level, 3);
        assert_eq!(sheets.summaries().await[0].level, 1);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(sheets.summaries().await[0].level, 3);
        let stored = stored_sheet(&store, summary.id).await;
        assert_eq!(stored.level, 3);
        assert_eq!(stored.details.xp, Some(900));
        assert_eq!(
            store.updated_at(summary.id).await,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_edits_store_the_final_sheet() {
        let store = Arc::new(InMemoryCharacterStore::new());
        let sheets = controller(store.clone());
        sheets.start_session(UserId::new()).await;
        let summary = sheets.create_character("Ilvara").await.unwrap();

        for _ in 0..20 {
            let edits: Vec<_> = (1..=16)
                .map(|n| {
                    let sheets = sheets.clone();
                    tokio::spawn(async move { sheets.apply_edit(set_xp(f64::from(n))).await })
                })
                .collect();
            for edit in edits {
                edit.await.unwrap().unwrap();
            }
            sheets.flush().await;

            let active = sheets.active_sheet().await.unwrap();
            let stored = stored_sheet(&store, summary.id).await;
            assert_eq!(stored.details.xp, active.details.xp);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stale_stored_level_is_corrected_on_load() {
        let owner = UserId::new();
        let id = CharacterId::new();
        let store = Arc::new(InMemoryCharacterStore::new());
        store
            .seed(
                id,
                owner,
                "Veteran",
                json!({"name": "Veteran", "level": 1, "details": {"xp": 2700}}),
            )
            .await;

        let sheets = controller(store.clone());
        sheets.start_session(owner).await;
        let sheet = sheets.select_character(id).await.unwrap();
        assert_eq!(sheet.level, 4);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(stored_sheet(&store, id).await.level, 4);
        assert_eq!(sheets.summaries().await[0].level, 4);
    }

    #[tokio::test]
    async fn unchanged_edit_schedules_nothing() {
        let store = Arc::new(InMemoryCharacterStore::new());
        let sheets = controller(store);
        sheets.start_session(UserId::new()).await;
        sheets.create_character("Ilvara").await.unwrap();

        sheets.apply_edit(rename("Ilvara")).await.unwrap();
        assert!(!sheets.has_pending_write().await);
    }

    #[tokio::test]
    async fn edits_without_selection_are_ignored() {
        let sheets = controller(Arc::new(InMemoryCharacterStore::new()));
        sheets.start_session(UserId::new()).await;
        assert!(sheets.apply_edit(rename("Nobody")).await.is_none());
        assert!(sheets.derived().await.is_none());
    }

    #[tokio::test]
    async fn session_changes_restart_or_clear() {
        let alice = UserId::new();
        let bob = UserId::new();
        let store = Arc::new(InMemoryCharacterStore::new());
        store
            .seed(CharacterId::new(), alice, "Ilvara", json!({"name": "Ilvara"}))
            .await;
        store
            .seed(CharacterId::new(), bob, "Borin", json!({"name": "Borin", "race": "Dwarf"}))
            .await;
        let session = |user_id| AuthSession {
            user_id,
            email: None,
            access_token: "token".to_string(),
        };

        let sheets = controller(store);
        sheets.handle_session_change(Some(&session(alice))).await;
        assert_eq!(sheets.summaries().await[0].name, "Ilvara");

        sheets.handle_session_change(Some(&session(bob))).await;
        let listed = sheets.summaries().await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].race, "Dwarf");
        assert_eq!(sheets.owner().await, Some(bob));

        sheets.handle_session_change(None).await;
        assert!(sheets.summaries().await.is_empty());
        assert_eq!(sheets.owner().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn session_watcher_follows_auth() {
        let auth = InMemoryAuth::new(false);
        let sheets = controller(Arc::new(InMemoryCharacterStore::new()));
        let cancel_token = CancellationToken::new();
        let watcher = tokio::spawn(
            sheets
                .clone()
                .run_session_watcher(auth.subscribe(), cancel_token.clone()),
        );

        let session = auth.sign_up("a@b.c", "hunter22").await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(sheets.owner().await, Some(session.user_id));

        auth.sign_out().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(sheets.owner().await, None);

        cancel_token.cancel();
        watcher.await.unwrap();
    }
}
