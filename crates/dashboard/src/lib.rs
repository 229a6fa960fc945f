//! Client-side core of the vendor dashboard.
//!
//! Each managed collection (orders, medicines, prescriptions, ...) gets a
//! [`ListController`] that owns the fetched items, the filter predicates,
//! the page cursor and a [`ModalSession`] for the selected record. All
//! network access goes through [`CollectionClient`], scoped to the vendor in
//! the shared [`SessionContext`].

pub use client::{AuthClient, CollectionClient, ListParams, RestCollection};
pub use entity::{Column, EditableField, Entity, FieldKind, FieldValue, FilterField, FilterKind};
pub use error::{ClientError, ExportError, FALLBACK_MESSAGE, ModalError, Result};
pub use list::{
    Applied, ListController, ListState, Notice, NoticeLevel, RefreshOutcome, RefreshRequest,
    RefreshSource, WriteCompletion, WriteOutcome, WritePolicy, WriteRequest, WriteStart,
};
pub use modal::{Commit, Draft, DraftField, ModalMode, ModalSession, ModalState};
pub use poll::PollTask;
pub use session::{Session, SessionContext};
pub use view::{FilterState, FilterValue};

pub mod client;
pub mod entities;
pub mod entity;
pub mod error;
pub mod list;
pub mod modal;
pub mod poll;
pub mod session;
pub mod view;
