//! Per-entity list state: fetch lifecycle, filters, paging and the modal
//! session for the selected item.

use std::{future::Future, marker::PhantomData, pin::Pin};

use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    client::{CollectionClient, ListParams},
    entity::Entity,
    error::{ClientError, ExportError, ModalError, Result},
    modal::{Commit, ModalMode, ModalSession},
    session::SessionContext,
    view::{self, FilterState, FilterValue},
};

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// What happens to the local collection after a successful write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
    /// Patch the record in place from the write response.
    #[default]
    Optimistic,
    /// Patch, then reload the whole collection.
    Refetch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// One-shot feedback for a write; consumed by [`ListController::take_notice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Written,
    /// Nothing to write; no request was sent.
    Unchanged,
    /// The confirmation step declined; no request was sent.
    Declined,
}

#[derive(Debug, Clone)]
pub struct ListState<T> {
    pub items: Vec<T>,
    pub loading: bool,
    /// Sticky until the next successful refresh or `dismiss_error`.
    pub error: Option<String>,
}

impl<T> Default for ListState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            loading: false,
            error: None,
        }
    }
}

/// An in-flight `list` call that does not borrow its controller.
///
/// Responses are applied in completion order: when two requests overlap, the
/// one that finishes last wins.
pub struct RefreshRequest<T> {
    epoch: u64,
    tracked: bool,
    future: BoxFuture<Result<Vec<T>>>,
}

impl<T> RefreshRequest<T> {
    pub async fn run(self) -> RefreshOutcome<T> {
        RefreshOutcome {
            epoch: self.epoch,
            tracked: self.tracked,
            result: self.future.await,
        }
    }
}

pub struct RefreshOutcome<T> {
    epoch: u64,
    tracked: bool,
    pub result: Result<Vec<T>>,
}

impl<T> RefreshOutcome<T> {
    /// Session epoch the request was issued under.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn error(&self) -> Option<&ClientError> {
        self.result.as_ref().err()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum WriteOp {
    Create,
    Edit(String),
    Delete(String),
    Status { id: String, status: String },
}

impl WriteOp {
    fn action(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Edit(_) => "edit",
            Self::Delete(_) => "delete",
            Self::Status { .. } => "status change",
        }
    }
}

/// A validated write that has not been sent yet. Like [`RefreshRequest`] it
/// owns everything it needs, so it can run on another task.
pub struct WriteRequest<T> {
    epoch: u64,
    op: WriteOp,
    from_modal: bool,
    future: BoxFuture<Result<Option<T>>>,
}

impl<T> WriteRequest<T> {
    pub async fn run(self) -> WriteOutcome<T> {
        WriteOutcome {
            epoch: self.epoch,
            op: self.op,
            from_modal: self.from_modal,
            result: self.future.await,
        }
    }
}

pub struct WriteOutcome<T> {
    epoch: u64,
    op: WriteOp,
    from_modal: bool,
    result: Result<Option<T>>,
}

impl<T> WriteOutcome<T> {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn error(&self) -> Option<&ClientError> {
        self.result.as_ref().err()
    }
}

/// Result of starting a write: either a request to send, or an answer that
/// needed no network call.
pub enum WriteStart<T> {
    Send(WriteRequest<T>),
    Done(Applied),
}

/// A folded write, plus the reload to run under [`WritePolicy::Refetch`].
pub struct WriteCompletion<T> {
    pub result: Result<Applied>,
    pub refetch: Option<RefreshRequest<T>>,
}

/// Issues background refreshes (polling) for a controller's collection.
pub struct RefreshSource<T, C> {
    client: C,
    params: ListParams,
    session: SessionContext,
    _marker: PhantomData<fn() -> T>,
}

impl<T, C: Clone> Clone for RefreshSource<T, C> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            params: self.params.clone(),
            session: self.session.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Entity, C: CollectionClient<T>> RefreshSource<T, C> {
    /// A refresh that does not toggle the controller's loading flag.
    pub fn request(&self) -> RefreshRequest<T> {
        refresh_request(&self.client, &self.params, &self.session, false)
    }
}

fn refresh_request<T: Entity, C: CollectionClient<T>>(
    client: &C,
    params: &ListParams,
    session: &SessionContext,
    tracked: bool,
) -> RefreshRequest<T> {
    let client = client.clone();
    let params = params.clone();
    RefreshRequest {
        epoch: session.epoch(),
        tracked,
        future: Box::pin(async move { client.list(&params).await }),
    }
}

pub struct ListController<T, C> {
    client: C,
    session: SessionContext,
    params: ListParams,
    state: ListState<T>,
    in_flight: usize,
    /// Session epoch the `in_flight` count belongs to.
    in_flight_epoch: u64,
    filters: FilterState,
    page_index: usize,
    page_size: usize,
    modal: ModalSession<T>,
    notice: Option<Notice>,
    policy: WritePolicy,
}

impl<T: Entity, C: CollectionClient<T>> ListController<T, C> {
    pub fn new(client: C, session: SessionContext, page_size: usize) -> Result<Self> {
        if page_size == 0 {
            return Err(ClientError::Validation(
                "page size must be greater than zero".to_string(),
            ));
        }
        let in_flight_epoch = session.epoch();
        Ok(Self {
            client,
            session,
            params: ListParams::default(),
            state: ListState::default(),
            in_flight: 0,
            in_flight_epoch,
            filters: FilterState::default(),
            page_index: 1,
            page_size,
            modal: ModalSession::new(),
            notice: None,
            policy: WritePolicy::default(),
        })
    }

    pub fn with_write_policy(mut self, policy: WritePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Query parameters sent with every `list` call.
    pub fn with_params(mut self, params: ListParams) -> Self {
        self.params = params;
        self
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn state(&self) -> &ListState<T> {
        &self.state
    }

    pub fn items(&self) -> &[T] {
        &self.state.items
    }

    pub fn is_loading(&self) -> bool {
        self.state.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.state.error = None;
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    pub fn find(&self, id: &str) -> Option<&T> {
        self.state.items.iter().find(|item| item.id() == id)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.state.items.iter().position(|item| item.id() == id)
    }

    // --- fetch lifecycle ---

    pub fn refresh_source(&self) -> RefreshSource<T, C> {
        RefreshSource {
            client: self.client.clone(),
            params: self.params.clone(),
            session: self.session.clone(),
            _marker: PhantomData,
        }
    }

    /// Marks the list as loading and returns the request to run.
    pub fn begin_refresh(&mut self) -> RefreshRequest<T> {
        self.sync_epoch();
        self.in_flight += 1;
        self.state.loading = true;
        refresh_request(&self.client, &self.params, &self.session, true)
    }

    /// Applies a finished request. Failures leave the previous items in place.
    pub fn complete_refresh(&mut self, outcome: RefreshOutcome<T>) {
        self.sync_epoch();
        if outcome.tracked && outcome.epoch == self.in_flight_epoch {
            self.in_flight = self.in_flight.saturating_sub(1);
        }
        self.state.loading = self.in_flight > 0;

        if outcome.epoch != self.session.epoch() {
            tracing::debug!("{}: dropping response from a previous session", T::LABEL);
            return;
        }

        match outcome.result {
            Ok(items) => {
                tracing::debug!(count = items.len(), "{} refreshed", T::LABEL);
                self.state.items = items;
                self.state.error = None;
                self.clamp_page();
            }
            Err(err) => {
                tracing::warn!("{} refresh failed: {err}", T::LABEL);
                self.state.error = Some(err.user_message());
            }
        }
    }

    /// Requests counted under an earlier session no longer hold `loading`.
    fn sync_epoch(&mut self) {
        let epoch = self.session.epoch();
        if self.in_flight_epoch != epoch {
            self.in_flight_epoch = epoch;
            self.in_flight = 0;
        }
    }

    pub async fn refresh(&mut self) {
        let outcome = self.begin_refresh().run().await;
        self.complete_refresh(outcome);
    }

    /// Drops everything fetched so far, e.g. after logout.
    pub fn reset(&mut self) {
        self.state = ListState::default();
        self.in_flight = 0;
        self.in_flight_epoch = self.session.epoch();
        self.filters.clear();
        self.page_index = 1;
        self.modal.reset();
        self.notice = None;
    }

    // --- filters and paging ---

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn set_filter(&mut self, field: &str, value: FilterValue) -> Result<()> {
        if T::filter_field(field).is_none() {
            return Err(ClientError::Validation(format!(
                "unknown filter \"{field}\" for {}",
                T::LABEL
            )));
        }
        self.filters.set(field, value);
        self.page_index = 1;
        Ok(())
    }

    /// Parses `input` according to the field's kind, then applies it.
    pub fn set_filter_input(&mut self, field: &str, input: &str) -> Result<()> {
        let declared = T::filter_field(field).ok_or_else(|| {
            ClientError::Validation(format!("unknown filter \"{field}\" for {}", T::LABEL))
        })?;
        let value = FilterValue::parse(declared.kind, input).map_err(ClientError::Validation)?;
        self.set_filter(field, value)
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
        self.page_index = 1;
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_count(&self) -> usize {
        view::page_count(self.filtered_count(), self.page_size)
    }

    pub fn set_page(&mut self, page_index: usize) {
        self.page_index = page_index.clamp(1, self.page_count());
    }

    pub fn next_page(&mut self) {
        self.set_page(self.page_index.saturating_add(1));
    }

    pub fn prev_page(&mut self) {
        self.set_page(self.page_index.saturating_sub(1));
    }

    fn clamp_page(&mut self) {
        self.set_page(self.page_index);
    }

    // --- derived views ---

    pub fn filtered(&self) -> Vec<&T> {
        view::filtered(&self.state.items, &self.filters)
    }

    pub fn filtered_count(&self) -> usize {
        self.filtered().len()
    }

    /// Items on the current page.
    pub fn page(&self) -> Vec<&T> {
        let filtered = self.filtered();
        view::paginated(&filtered, self.page_index, self.page_size).to_vec()
    }

    /// Export rows for every filtered item, not just the current page.
    pub fn export_rows(&self) -> Vec<Vec<String>> {
        view::export_rows(self.filtered(), &T::columns())
    }

    pub fn export_csv(&self, delimiter: u8) -> std::result::Result<String, ExportError> {
        view::to_csv(&T::columns(), &self.export_rows(), delimiter)
    }

    pub fn print_snapshot(&self) -> String {
        view::print_snapshot(T::LABEL, &T::columns(), &self.export_rows())
    }

    // --- writes ---

    fn fail(&mut self, action: &str, err: ClientError) -> ClientError {
        tracing::warn!("{} {action} failed: {err}", T::LABEL);
        self.notice = Some(Notice {
            level: NoticeLevel::Error,
            message: err.user_message(),
        });
        err
    }

    fn unknown(&mut self, action: &str, id: &str) -> ClientError {
        self.fail(
            action,
            ClientError::Validation(format!("item \"{id}\" is no longer in the list")),
        )
    }

    fn write_request(
        &self,
        op: WriteOp,
        future: BoxFuture<Result<Option<T>>>,
    ) -> WriteRequest<T> {
        WriteRequest {
            epoch: self.session.epoch(),
            op,
            from_modal: false,
            future,
        }
    }

    pub fn begin_create(&mut self, payload: Value) -> WriteRequest<T> {
        let client = self.client.clone();
        self.write_request(
            WriteOp::Create,
            Box::pin(async move { client.create(&payload).await.map(Some) }),
        )
    }

    pub fn begin_edit(&mut self, id: &str, patch: Value) -> Result<WriteRequest<T>> {
        if self.position(id).is_none() {
            return Err(self.unknown("edit", id));
        }
        let client = self.client.clone();
        let target = id.to_string();
        Ok(self.write_request(
            WriteOp::Edit(id.to_string()),
            Box::pin(async move { client.update(&target, &patch).await.map(Some) }),
        ))
    }

    pub fn begin_delete(
        &mut self,
        id: &str,
        confirm: impl FnOnce(&T) -> bool,
    ) -> Result<WriteStart<T>> {
        let Some(pos) = self.position(id) else {
            return Err(self.unknown("delete", id));
        };
        if !confirm(&self.state.items[pos]) {
            tracing::debug!(id, "delete declined");
            return Ok(WriteStart::Done(Applied::Declined));
        }
        let client = self.client.clone();
        let target = id.to_string();
        Ok(WriteStart::Send(self.write_request(
            WriteOp::Delete(id.to_string()),
            Box::pin(async move { client.remove(&target).await.map(|()| None) }),
        )))
    }

    pub fn begin_status_change(&mut self, id: &str, status: &str) -> Result<WriteStart<T>> {
        let Some(pos) = self.position(id) else {
            return Err(self.unknown("status change", id));
        };
        if self.state.items[pos].status() == Some(status) {
            tracing::debug!(id, status, "status unchanged, nothing to send");
            return Ok(WriteStart::Done(Applied::Unchanged));
        }
        if !T::STATUSES.iter().any(|known| *known == status) {
            let err = ClientError::Validation(format!(
                "\"{status}\" is not a valid status for {}",
                T::LABEL
            ));
            return Err(self.fail("status change", err));
        }
        let client = self.client.clone();
        let target = id.to_string();
        let patch = json!({ "status": status });
        Ok(WriteStart::Send(self.write_request(
            WriteOp::Status {
                id: id.to_string(),
                status: status.to_string(),
            },
            Box::pin(async move { client.update(&target, &patch).await.map(Some) }),
        )))
    }

    /// Folds a finished write into the collection and leaves a notice.
    ///
    /// A response from an earlier session is dropped.
    pub fn complete_write(&mut self, outcome: WriteOutcome<T>) -> WriteCompletion<T> {
        let WriteOutcome {
            epoch,
            op,
            from_modal,
            result,
        } = outcome;

        if epoch != self.session.epoch() {
            tracing::debug!("{}: dropping write response from a previous session", T::LABEL);
            if from_modal {
                self.modal.reset();
            }
            return WriteCompletion {
                result: result.map(|_| Applied::Written),
                refetch: None,
            };
        }

        let result = match result {
            Ok(item) => {
                let message = self.fold(op, item);
                self.notice = Some(Notice {
                    level: NoticeLevel::Success,
                    message,
                });
                self.clamp_page();
                Ok(Applied::Written)
            }
            Err(err) => Err(self.fail(op.action(), err)),
        };
        if from_modal {
            self.modal
                .finish_submit(result.as_ref().map(|_| ()).map_err(|err| err.user_message()));
        }

        let refetch = (result.is_ok() && self.policy == WritePolicy::Refetch)
            .then(|| self.begin_refresh());
        WriteCompletion { result, refetch }
    }

    fn fold(&mut self, op: WriteOp, item: Option<T>) -> String {
        match op {
            WriteOp::Create => {
                if let Some(item) = item {
                    tracing::info!(id = item.id(), "{} record created", T::LABEL);
                    self.state.items.push(item);
                }
                "Created".to_string()
            }
            WriteOp::Edit(id) => {
                tracing::info!(id = %id, "{} record updated", T::LABEL);
                self.replace(&id, item);
                "Changes saved".to_string()
            }
            WriteOp::Delete(id) => {
                tracing::info!(id = %id, "{} record deleted", T::LABEL);
                self.state.items.retain(|item| item.id() != id);
                "Deleted".to_string()
            }
            WriteOp::Status { id, status } => {
                tracing::info!(id = %id, status = %status, "{} status changed", T::LABEL);
                self.replace(&id, item);
                format!("Status set to {status}")
            }
        }
    }

    /// Swaps the returned record in at the position of `id`.
    fn replace(&mut self, id: &str, item: Option<T>) {
        if let (Some(pos), Some(item)) = (self.position(id), item) {
            self.state.items[pos] = item;
        }
    }

    /// Runs a write to completion on the current task, including the reload
    /// under [`WritePolicy::Refetch`].
    async fn finish_write(&mut self, request: WriteRequest<T>) -> Result<Applied> {
        let outcome = request.run().await;
        let WriteCompletion { result, refetch } = self.complete_write(outcome);
        if let Some(refetch) = refetch {
            let outcome = refetch.run().await;
            self.complete_refresh(outcome);
        }
        result
    }

    pub async fn apply_create(&mut self, payload: Value) -> Result<()> {
        let request = self.begin_create(payload);
        self.finish_write(request).await.map(|_| ())
    }

    /// Sends `patch` and swaps the returned record in at the same position.
    pub async fn apply_edit(&mut self, id: &str, patch: Value) -> Result<()> {
        let request = self.begin_edit(id, patch)?;
        self.finish_write(request).await.map(|_| ())
    }

    /// Deletes `id` once `confirm` approves it.
    pub async fn apply_delete(
        &mut self,
        id: &str,
        confirm: impl FnOnce(&T) -> bool,
    ) -> Result<Applied> {
        match self.begin_delete(id, confirm)? {
            WriteStart::Send(request) => self.finish_write(request).await,
            WriteStart::Done(applied) => Ok(applied),
        }
    }

    /// Sets the `status` field. An unchanged status sends nothing.
    pub async fn apply_status_change(&mut self, id: &str, status: &str) -> Result<Applied> {
        match self.begin_status_change(id, status)? {
            WriteStart::Send(request) => self.finish_write(request).await,
            WriteStart::Done(applied) => Ok(applied),
        }
    }

    // --- modal session ---

    pub fn modal(&self) -> &ModalSession<T> {
        &self.modal
    }

    pub fn modal_mut(&mut self) -> &mut ModalSession<T> {
        &mut self.modal
    }

    pub fn open_modal(&mut self, mode: ModalMode, id: &str) -> std::result::Result<(), ModalError> {
        let item = self
            .find(id)
            .cloned()
            .ok_or_else(|| ModalError::UnknownItem(id.to_string()))?;
        self.modal.open(mode, item)
    }

    pub fn open_create_modal(&mut self) -> std::result::Result<(), ModalError> {
        self.modal.open_create()
    }

    /// Moves the open modal to `Submitting` and returns the write to send.
    ///
    /// The delete-confirm modal is itself the confirmation step. Writes that
    /// need no request close the modal right away.
    pub fn begin_submit_modal(&mut self) -> std::result::Result<WriteStart<T>, ModalError> {
        let started = match self.modal.begin_submit()? {
            Commit::Create { payload } => Ok(WriteStart::Send(self.begin_create(payload))),
            Commit::Edit { id, patch } => self.begin_edit(&id, patch).map(WriteStart::Send),
            Commit::Delete { id } => self.begin_delete(&id, |_| true),
            Commit::Status { id, status } => self.begin_status_change(&id, &status),
        };

        match started {
            Ok(WriteStart::Send(mut request)) => {
                request.from_modal = true;
                Ok(WriteStart::Send(request))
            }
            Ok(WriteStart::Done(applied)) => {
                self.modal.finish_submit(Ok(()));
                Ok(WriteStart::Done(applied))
            }
            Err(err) => {
                self.modal.finish_submit(Err(err.user_message()));
                Err(err.into())
            }
        }
    }

    /// Submits the open modal and folds the result into the collection.
    pub async fn submit_modal(&mut self) -> std::result::Result<Applied, ModalError> {
        match self.begin_submit_modal()? {
            WriteStart::Send(request) => Ok(self.finish_write(request).await?),
            WriteStart::Done(applied) => Ok(applied),
        }
    }

    pub fn cancel_modal(&mut self) -> std::result::Result<(), ModalError> {
        self.modal.cancel()
    }
}
