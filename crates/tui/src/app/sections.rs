//! One list controller per tab, plus the glue to address them by [`Section`].

use api_types::{
    category::Category, medicine::Medicine, notification::Notification, order::Order,
    pharmacy::Pharmacy, prescription::Prescription, user::User,
};
use dashboard::{
    Applied, ClientError, Entity, ListController, ModalMode, RefreshOutcome, RefreshRequest,
    RestCollection, Session, SessionContext, WriteCompletion, WriteOutcome, WritePolicy,
    WriteRequest,
};
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    app::view::{ModalView, TableView, invoice_lines},
    section::Section,
};

pub type Controller<T> = ListController<T, RestCollection<T>>;

/// Runs `$body` with `$ctrl` bound to the controller for `$section`.
///
/// `mut` binds a mutable reference.
macro_rules! with_section {
    (mut $sections:expr, $section:expr, |$ctrl:ident| $body:expr) => {
        match $section {
            $crate::section::Section::Orders => {
                let $ctrl = &mut $sections.orders;
                $body
            }
            $crate::section::Section::Medicines => {
                let $ctrl = &mut $sections.medicines;
                $body
            }
            $crate::section::Section::Prescriptions => {
                let $ctrl = &mut $sections.prescriptions;
                $body
            }
            $crate::section::Section::Categories => {
                let $ctrl = &mut $sections.categories;
                $body
            }
            $crate::section::Section::Pharmacies => {
                let $ctrl = &mut $sections.pharmacies;
                $body
            }
            $crate::section::Section::Users => {
                let $ctrl = &mut $sections.users;
                $body
            }
            $crate::section::Section::Notifications => {
                let $ctrl = &mut $sections.notifications;
                $body
            }
        }
    };
    ($sections:expr, $section:expr, |$ctrl:ident| $body:expr) => {
        match $section {
            $crate::section::Section::Orders => {
                let $ctrl = &$sections.orders;
                $body
            }
            $crate::section::Section::Medicines => {
                let $ctrl = &$sections.medicines;
                $body
            }
            $crate::section::Section::Prescriptions => {
                let $ctrl = &$sections.prescriptions;
                $body
            }
            $crate::section::Section::Categories => {
                let $ctrl = &$sections.categories;
                $body
            }
            $crate::section::Section::Pharmacies => {
                let $ctrl = &$sections.pharmacies;
                $body
            }
            $crate::section::Section::Users => {
                let $ctrl = &$sections.users;
                $body
            }
            $crate::section::Section::Notifications => {
                let $ctrl = &$sections.notifications;
                $body
            }
        }
    };
}

pub(crate) use with_section;

pub struct Sections {
    pub orders: Controller<Order>,
    pub medicines: Controller<Medicine>,
    pub prescriptions: Controller<Prescription>,
    pub categories: Controller<Category>,
    pub pharmacies: Controller<Pharmacy>,
    pub users: Controller<User>,
    pub notifications: Controller<Notification>,
}

fn controller<T: Entity>(
    base_url: &str,
    session: &SessionContext,
    http: &reqwest::Client,
    page_size: usize,
    policy: WritePolicy,
) -> dashboard::Result<Controller<T>> {
    let client = RestCollection::new(base_url, session.clone())?.with_http(http.clone());
    Ok(ListController::new(client, session.clone(), page_size)?.with_write_policy(policy))
}

impl Sections {
    pub fn new(
        base_url: &str,
        session: &SessionContext,
        http: &reqwest::Client,
        page_size: usize,
        policy: WritePolicy,
    ) -> dashboard::Result<Self> {
        Ok(Self {
            orders: controller(base_url, session, http, page_size, policy)?,
            medicines: controller(base_url, session, http, page_size, policy)?,
            prescriptions: controller(base_url, session, http, page_size, policy)?,
            categories: controller(base_url, session, http, page_size, policy)?,
            pharmacies: controller(base_url, session, http, page_size, policy)?,
            users: controller(base_url, session, http, page_size, policy)?,
            notifications: controller(base_url, session, http, page_size, policy)?,
        })
    }

    pub fn reset(&mut self) {
        for section in Section::ALL {
            with_section!(mut self, section, |ctrl| ctrl.reset());
        }
    }

    pub fn table(&self, section: Section, selected: usize) -> TableView {
        with_section!(self, section, |ctrl| TableView::build(ctrl, selected))
    }

    /// Id of the `selected` row on the current page.
    pub fn selected_id(&self, section: Section, selected: usize) -> Option<String> {
        with_section!(self, section, |ctrl| ctrl
            .page()
            .get(selected)
            .map(|item| item.id().to_string()))
    }

    pub fn modal(&self, section: Section, tz: chrono_tz::Tz) -> Option<ModalView> {
        let mut view = with_section!(self, section, |ctrl| ModalView::build(ctrl.modal()))?;
        if view.mode == ModalMode::Invoice {
            view.invoice = self.orders.modal().item().map(|order| invoice_lines(order, tz));
        }
        Some(view)
    }

    pub fn unread_notifications(&self) -> usize {
        self.notifications
            .items()
            .iter()
            .filter(|notification| !notification.read)
            .count()
    }
}

/// Work finished on a background task, drained by the event loop.
pub enum AppEvent {
    Refreshed(Refreshed),
    Written(Written),
    LoggedIn(dashboard::Result<Session>),
}

/// Declares an enum with one variant per section wrapping `$outcome<T>`,
/// plus the conversions and accessors the event loop needs.
macro_rules! section_outcome {
    ($(#[$meta:meta])* $name:ident($outcome:ident) {
        $($variant:ident => $ty:ty),* $(,)?
    }) => {
        $(#[$meta])*
        pub enum $name {
            $($variant($outcome<$ty>),)*
        }

        $(
            impl From<$outcome<$ty>> for $name {
                fn from(outcome: $outcome<$ty>) -> Self {
                    Self::$variant(outcome)
                }
            }
        )*

        impl From<$name> for AppEvent {
            fn from(event: $name) -> Self {
                Self::$name(event)
            }
        }

        impl $name {
            pub fn section(&self) -> Section {
                match self {
                    $(Self::$variant(_) => Section::$variant,)*
                }
            }

            pub fn epoch(&self) -> u64 {
                match self {
                    $(Self::$variant(outcome) => outcome.epoch(),)*
                }
            }

            pub fn is_unauthorized(&self) -> bool {
                match self {
                    $(Self::$variant(outcome) => outcome.error().is_some_and(is_session_error),)*
                }
            }
        }
    };
}

section_outcome! {
    /// A finished refresh for one of the sections.
    Refreshed(RefreshOutcome) {
        Orders => Order,
        Medicines => Medicine,
        Prescriptions => Prescription,
        Categories => Category,
        Pharmacies => Pharmacy,
        Users => User,
        Notifications => Notification,
    }
}

section_outcome! {
    /// A finished create, edit, delete or status change.
    Written(WriteOutcome) {
        Orders => Order,
        Medicines => Medicine,
        Prescriptions => Prescription,
        Categories => Category,
        Pharmacies => Pharmacy,
        Users => User,
        Notifications => Notification,
    }
}

impl Refreshed {
    pub fn apply(self, sections: &mut Sections) {
        match self {
            Self::Orders(outcome) => sections.orders.complete_refresh(outcome),
            Self::Medicines(outcome) => sections.medicines.complete_refresh(outcome),
            Self::Prescriptions(outcome) => sections.prescriptions.complete_refresh(outcome),
            Self::Categories(outcome) => sections.categories.complete_refresh(outcome),
            Self::Pharmacies(outcome) => sections.pharmacies.complete_refresh(outcome),
            Self::Users(outcome) => sections.users.complete_refresh(outcome),
            Self::Notifications(outcome) => sections.notifications.complete_refresh(outcome),
        }
    }
}

impl Written {
    /// Folds the write into its section. A reload requested by the write
    /// policy is started on `tx`.
    pub fn apply(
        self,
        sections: &mut Sections,
        tx: &UnboundedSender<AppEvent>,
    ) -> dashboard::Result<Applied> {
        match self {
            Self::Orders(outcome) => finish_write(&mut sections.orders, outcome, tx),
            Self::Medicines(outcome) => finish_write(&mut sections.medicines, outcome, tx),
            Self::Prescriptions(outcome) => finish_write(&mut sections.prescriptions, outcome, tx),
            Self::Categories(outcome) => finish_write(&mut sections.categories, outcome, tx),
            Self::Pharmacies(outcome) => finish_write(&mut sections.pharmacies, outcome, tx),
            Self::Users(outcome) => finish_write(&mut sections.users, outcome, tx),
            Self::Notifications(outcome) => finish_write(&mut sections.notifications, outcome, tx),
        }
    }
}

fn finish_write<T: Entity>(
    ctrl: &mut Controller<T>,
    outcome: WriteOutcome<T>,
    tx: &UnboundedSender<AppEvent>,
) -> dashboard::Result<Applied>
where
    Refreshed: From<RefreshOutcome<T>>,
{
    let WriteCompletion { result, refetch } = ctrl.complete_write(outcome);
    if let Some(request) = refetch {
        spawn_refresh(request, tx.clone());
    }
    result
}

/// Runs `request` on a background task and reports back on `tx`.
pub fn spawn_refresh<T: Entity>(request: RefreshRequest<T>, tx: UnboundedSender<AppEvent>)
where
    Refreshed: From<RefreshOutcome<T>>,
{
    tokio::spawn(async move {
        let outcome = request.run().await;
        let _ = tx.send(Refreshed::from(outcome).into());
    });
}

pub fn spawn_write<T: Entity>(request: WriteRequest<T>, tx: UnboundedSender<AppEvent>)
where
    Written: From<WriteOutcome<T>>,
{
    tokio::spawn(async move {
        let outcome = request.run().await;
        let _ = tx.send(Written::from(outcome).into());
    });
}

/// A rejected token, as opposed to a signed-out context.
fn is_session_error(err: &ClientError) -> bool {
    err.is_unauthorized() && !matches!(err, ClientError::SignedOut)
}

