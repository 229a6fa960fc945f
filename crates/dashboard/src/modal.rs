//! Modal workflow bound to one selected item.
//!
//! ```text
//! Closed --open--> Open --begin_submit--> Submitting --finish(ok)--> Closed
//!                   ^                          |
//!                   +-------finish(err)--------+
//! ```
//!
//! `cancel` leaves any state but `Submitting`. A second `begin_submit` while
//! submitting is refused, so a double click cannot issue a second write.

use serde_json::{Map, Number, Value};

use crate::{
    entity::{Entity, FieldKind},
    error::ModalError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalMode {
    View,
    Invoice,
    Edit,
    DeleteConfirm,
    StatusEdit,
    /// A new record built from an empty draft.
    Create,
}

impl ModalMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::View => "Details",
            Self::Invoice => "Invoice",
            Self::Edit => "Edit",
            Self::DeleteConfirm => "Delete",
            Self::StatusEdit => "Status",
            Self::Create => "New",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DraftField {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Draft {
    Empty,
    Fields { fields: Vec<DraftField>, focus: usize },
    Status(String),
}

/// The write a submitted modal asks the list controller to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum Commit {
    Create { payload: Value },
    Edit { id: String, patch: Value },
    Delete { id: String },
    Status { id: String, status: String },
}

#[derive(Debug, Clone)]
pub enum ModalState<T> {
    Closed,
    Open {
        mode: ModalMode,
        item: T,
        draft: Draft,
        error: Option<String>,
    },
    Submitting {
        mode: ModalMode,
        item: T,
        draft: Draft,
    },
}

#[derive(Debug, Clone)]
pub struct ModalSession<T> {
    state: ModalState<T>,
}

impl<T: Entity> Default for ModalSession<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> ModalSession<T> {
    pub fn new() -> Self {
        Self {
            state: ModalState::Closed,
        }
    }

    pub fn state(&self) -> &ModalState<T> {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, ModalState::Closed)
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self.state, ModalState::Submitting { .. })
    }

    pub fn mode(&self) -> Option<ModalMode> {
        match &self.state {
            ModalState::Closed => None,
            ModalState::Open { mode, .. } | ModalState::Submitting { mode, .. } => Some(*mode),
        }
    }

    pub fn item(&self) -> Option<&T> {
        match &self.state {
            ModalState::Closed => None,
            ModalState::Open { item, .. } | ModalState::Submitting { item, .. } => Some(item),
        }
    }

    pub fn draft(&self) -> Option<&Draft> {
        match &self.state {
            ModalState::Closed => None,
            ModalState::Open { draft, .. } | ModalState::Submitting { draft, .. } => Some(draft),
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            ModalState::Open { error, .. } => error.as_deref(),
            _ => None,
        }
    }

    pub fn supports(mode: ModalMode) -> bool {
        match mode {
            ModalMode::View | ModalMode::DeleteConfirm => true,
            ModalMode::Invoice => T::supports_invoice(),
            ModalMode::Edit => !T::editable().is_empty(),
            ModalMode::StatusEdit => !T::STATUSES.is_empty(),
            ModalMode::Create => T::supports_create() && !T::editable().is_empty(),
        }
    }

    pub fn open(&mut self, mode: ModalMode, item: T) -> Result<(), ModalError> {
        if self.is_open() {
            return Err(ModalError::AlreadyOpen);
        }
        if !Self::supports(mode) {
            return Err(ModalError::Unsupported(mode));
        }

        let draft = match mode {
            ModalMode::Create => Draft::Fields {
                fields: T::editable()
                    .into_iter()
                    .map(|field| DraftField {
                        name: field.name,
                        label: field.label,
                        kind: field.kind,
                        required: field.required,
                        value: String::new(),
                    })
                    .collect(),
                focus: 0,
            },
            ModalMode::Edit => Draft::Fields {
                fields: T::editable()
                    .into_iter()
                    .map(|field| DraftField {
                        name: field.name,
                        label: field.label,
                        kind: field.kind,
                        required: field.required,
                        value: (field.current)(&item),
                    })
                    .collect(),
                focus: 0,
            },
            ModalMode::StatusEdit => Draft::Status(
                item.status()
                    .or_else(|| T::STATUSES.first().copied())
                    .unwrap_or_default()
                    .to_string(),
            ),
            _ => Draft::Empty,
        };

        tracing::debug!(?mode, id = item.id(), "modal opened");
        self.state = ModalState::Open {
            mode,
            item,
            draft,
            error: None,
        };
        Ok(())
    }

    /// Opens the create modal on a blank record.
    pub fn open_create(&mut self) -> Result<(), ModalError> {
        self.open(ModalMode::Create, T::default())
    }

    fn open_draft_mut(&mut self) -> Option<&mut Draft> {
        match &mut self.state {
            ModalState::Open { draft, error, .. } => {
                *error = None;
                Some(draft)
            }
            _ => None,
        }
    }

    /// Appends to the focused edit field.
    pub fn input(&mut self, ch: char) {
        if let Some(Draft::Fields { fields, focus }) = self.open_draft_mut() {
            if let Some(field) = fields.get_mut(*focus) {
                field.value.push(ch);
            }
        }
    }

    pub fn backspace(&mut self) {
        if let Some(Draft::Fields { fields, focus }) = self.open_draft_mut() {
            if let Some(field) = fields.get_mut(*focus) {
                field.value.pop();
            }
        }
    }

    pub fn next_field(&mut self) {
        if let Some(Draft::Fields { fields, focus }) = self.open_draft_mut() {
            if !fields.is_empty() {
                *focus = (*focus + 1) % fields.len();
            }
        }
    }

    pub fn set_field(&mut self, name: &str, value: &str) -> Result<(), ModalError> {
        match self.open_draft_mut() {
            Some(Draft::Fields { fields, .. }) => {
                let field = fields
                    .iter_mut()
                    .find(|field| field.name == name)
                    .ok_or_else(|| ModalError::Validation(format!("unknown field \"{name}\"")))?;
                field.value = value.to_string();
                Ok(())
            }
            Some(_) => Err(ModalError::Validation("nothing to edit".to_string())),
            None => Err(ModalError::NotOpen),
        }
    }

    /// Moves the chosen status to the next (or previous) allowed one.
    pub fn cycle_status(&mut self, forward: bool) {
        if let Some(Draft::Status(current)) = self.open_draft_mut() {
            let statuses = T::STATUSES;
            if statuses.is_empty() {
                return;
            }
            let pos = statuses.iter().position(|s| *s == current.as_str());
            let next = match (pos, forward) {
                (None, _) => 0,
                (Some(i), true) => (i + 1) % statuses.len(),
                (Some(i), false) => (i + statuses.len() - 1) % statuses.len(),
            };
            *current = statuses[next].to_string();
        }
    }

    pub fn set_status(&mut self, status: &str) -> Result<(), ModalError> {
        match self.open_draft_mut() {
            Some(Draft::Status(current)) => {
                *current = status.to_string();
                Ok(())
            }
            Some(_) => Err(ModalError::Validation("not a status modal".to_string())),
            None => Err(ModalError::NotOpen),
        }
    }

    /// Validates the draft and moves to `Submitting`.
    ///
    /// On validation failure the session stays open with the error attached.
    pub fn begin_submit(&mut self) -> Result<Commit, ModalError> {
        let state = std::mem::replace(&mut self.state, ModalState::Closed);
        let (mode, item, draft, error) = match state {
            ModalState::Closed => return Err(ModalError::NotOpen),
            submitting @ ModalState::Submitting { .. } => {
                self.state = submitting;
                return Err(ModalError::Busy);
            }
            ModalState::Open {
                mode,
                item,
                draft,
                error,
            } => (mode, item, draft, error),
        };

        let id = item.id().to_string();
        let commit = match (mode, &draft) {
            (ModalMode::Edit, Draft::Fields { fields, .. }) => {
                build_patch(fields).map(|patch| Commit::Edit { id, patch })
            }
            (ModalMode::Create, Draft::Fields { fields, .. }) => {
                build_patch(fields).map(|patch| Commit::Create {
                    payload: without_nulls(patch),
                })
            }
            (ModalMode::DeleteConfirm, _) => Ok(Commit::Delete { id }),
            (ModalMode::StatusEdit, Draft::Status(status)) => Ok(Commit::Status {
                id,
                status: status.clone(),
            }),
            _ => Err(ModalError::ReadOnly(mode)),
        };

        match commit {
            Ok(commit) => {
                tracing::debug!(?mode, "modal submitting");
                self.state = ModalState::Submitting { mode, item, draft };
                Ok(commit)
            }
            Err(ModalError::Validation(message)) => {
                self.state = ModalState::Open {
                    mode,
                    item,
                    draft,
                    error: Some(message.clone()),
                };
                Err(ModalError::Validation(message))
            }
            Err(err) => {
                self.state = ModalState::Open {
                    mode,
                    item,
                    draft,
                    error,
                };
                Err(err)
            }
        }
    }

    /// Closes on success; reopens with `error` attached on failure.
    pub fn finish_submit(&mut self, result: Result<(), String>) {
        let state = std::mem::replace(&mut self.state, ModalState::Closed);
        match (state, result) {
            (ModalState::Submitting { .. }, Ok(())) => {}
            (ModalState::Submitting { mode, item, draft }, Err(error)) => {
                self.state = ModalState::Open {
                    mode,
                    item,
                    draft,
                    error: Some(error),
                };
            }
            (other, _) => {
                tracing::warn!("finish_submit called while not submitting");
                self.state = other;
            }
        }
    }

    pub fn cancel(&mut self) -> Result<(), ModalError> {
        if self.is_submitting() {
            return Err(ModalError::Busy);
        }
        self.state = ModalState::Closed;
        Ok(())
    }

    /// Drops the session unconditionally, e.g. on logout.
    pub fn reset(&mut self) {
        self.state = ModalState::Closed;
    }
}

/// Blank optional fields are left out of a new record.
fn without_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(map.into_iter().filter(|(_, v)| !v.is_null()).collect()),
        other => other,
    }
}

fn build_patch(fields: &[DraftField]) -> Result<Value, ModalError> {
    let mut patch = Map::new();
    for field in fields {
        let raw = field.value.trim();
        let value = if raw.is_empty() {
            if field.required {
                return Err(ModalError::Validation(format!("{} is required", field.label)));
            }
            Value::Null
        } else {
            match field.kind {
                FieldKind::Text => Value::String(raw.to_string()),
                FieldKind::Number => raw
                    .replace(',', ".")
                    .parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .ok_or_else(|| {
                        ModalError::Validation(format!("{} must be a number", field.label))
                    })?,
                FieldKind::Integer => raw.parse::<i64>().map(Value::from).map_err(|_| {
                    ModalError::Validation(format!("{} must be a whole number", field.label))
                })?,
                FieldKind::Bool => match raw.to_lowercase().as_str() {
                    "yes" | "y" | "true" | "1" => Value::Bool(true),
                    "no" | "n" | "false" | "0" => Value::Bool(false),
                    _ => {
                        return Err(ModalError::Validation(format!(
                            "{} must be yes or no",
                            field.label
                        )));
                    }
                },
            }
        };
        patch.insert(field.name.to_string(), value);
    }
    Ok(Value::Object(patch))
}
