pub mod sections;
pub mod view;

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use clap::ValueEnum;
use crossterm::event::{self, Event, KeyEvent};
use dashboard::{
    Applied, AuthClient, Entity, ModalError, ModalMode, Notice, NoticeLevel, PollTask, Session,
    SessionContext, WriteStart,
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::{
    config::AppConfig,
    error::{AppError, Result},
    local_state::LocalState,
    section::Section,
    ui::{
        self,
        keymap::{AppAction, map_key},
    },
};
use sections::{
    AppEvent, Refreshed, Sections, Written, spawn_refresh, spawn_write, with_section,
};
use view::{ModalView, TableView};

const TOAST_TTL: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Dashboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Email,
    Password,
}

#[derive(Debug)]
pub struct LoginState {
    pub email: String,
    pub password: String,
    pub focus: LoginField,
    pub message: Option<String>,
    /// A login request is on its way.
    pub submitting: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct ToastState {
    pub level: ToastLevel,
    pub message: String,
    expires_at: Instant,
}

impl From<Notice> for ToastState {
    fn from(notice: Notice) -> Self {
        let level = match notice.level {
            NoticeLevel::Success => ToastLevel::Success,
            NoticeLevel::Error => ToastLevel::Error,
        };
        Self::new(level, notice.message)
    }
}

impl ToastState {
    fn new(level: ToastLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            expires_at: Instant::now() + TOAST_TTL,
        }
    }
}

/// The filter bar being typed into.
#[derive(Debug, Clone)]
pub struct FilterPrompt {
    /// `(name, label)` of every filter the section declares.
    pub fields: Vec<(&'static str, &'static str)>,
    pub focus: usize,
    pub buffer: String,
}

#[derive(Debug)]
pub struct AppState {
    pub screen: Screen,
    pub login: LoginState,
    pub section: Section,
    /// Selected row on the current page, per section.
    pub selected: [usize; Section::ALL.len()],
    pub filter: Option<FilterPrompt>,
    pub toast: Option<ToastState>,
    pub vendor: Option<String>,
    pub last_refresh: Option<DateTime<Tz>>,
    pub unread: usize,
    pub base_url: String,
}

impl AppState {
    fn selected(&self) -> usize {
        self.selected[self.section.index()]
    }

    fn select(&mut self, row: usize) {
        self.selected[self.section.index()] = row;
    }
}

/// Everything the dashboard screen draws for the active section.
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub table: TableView,
    pub modal: Option<ModalView>,
}

pub struct App {
    config: AppConfig,
    tz: Tz,
    delimiter: u8,
    auth: AuthClient,
    session: SessionContext,
    sections: Sections,
    poll: PollTask,
    events_tx: UnboundedSender<AppEvent>,
    events_rx: UnboundedReceiver<AppEvent>,
    local: LocalState,
    loaded: HashSet<Section>,
    pub state: AppState,
    should_quit: bool,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        let session = SessionContext::new();
        let auth = AuthClient::new(&config.base_url)?.with_http(http.clone());
        let sections = Sections::new(
            &config.base_url,
            &session,
            &http,
            config.page_size,
            config.write_policy,
        )?;
        let local = LocalState::load(&config.state_path)?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let section = local
            .last_section
            .as_deref()
            .and_then(|slug| Section::from_str(slug, true).ok())
            .unwrap_or(Section::Orders);
        let state = AppState {
            screen: Screen::Login,
            login: LoginState {
                email: config.email.clone(),
                password: String::new(),
                focus: if config.email.is_empty() {
                    LoginField::Email
                } else {
                    LoginField::Password
                },
                message: None,
                submitting: false,
            },
            section,
            selected: [0; Section::ALL.len()],
            filter: None,
            toast: None,
            vendor: None,
            last_refresh: None,
            unread: 0,
            base_url: config.base_url.clone(),
        };

        Ok(Self {
            tz: config.timezone()?,
            delimiter: config.delimiter()?,
            config,
            auth,
            session,
            sections,
            poll: PollTask::default(),
            events_tx,
            events_rx,
            local,
            loaded: HashSet::new(),
            state,
            should_quit: false,
        })
    }

    /// Must be called from within a Tokio runtime; requests run on spawned
    /// tasks while this loop keeps drawing.
    pub fn run(&mut self) -> Result<()> {
        if let Some(session) = self.local.session.clone() {
            tracing::info!(vendor = %session.vendor_id, "resuming saved session");
            self.state.vendor = Some(session.email.clone());
            self.session.login(session);
            self.enter_dashboard();
        }

        let mut terminal = ui::setup_terminal()?;
        let result = self.event_loop(&mut terminal);
        ui::restore_terminal(&mut terminal)?;

        self.poll.stop();
        self.local.last_section = Some(self.state.section.slug().to_string());
        self.save_local();
        result
    }

    fn event_loop(&mut self, terminal: &mut ui::Terminal) -> Result<()> {
        let tick_rate = Duration::from_millis(100);

        while !self.should_quit {
            self.drain_events();
            if self
                .state
                .toast
                .as_ref()
                .is_some_and(|toast| toast.expires_at <= Instant::now())
            {
                self.state.toast = None;
            }

            let view = self.dashboard_view();
            terminal
                .draw(|frame| ui::render(frame, &self.state, view.as_ref()))
                .map_err(|err| AppError::Terminal(err.to_string()))?;

            if event::poll(tick_rate)? {
                match event::read()? {
                    Event::Key(key) => self.handle_key(key),
                    Event::Resize(_, _) => {}
                    _ => {}
                }
            }
        }

        Ok(())
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                AppEvent::Refreshed(refreshed) => self.apply_refresh(refreshed),
                AppEvent::Written(written) => self.apply_written(written),
                AppEvent::LoggedIn(result) => self.finish_login(result),
            }
        }
    }

    fn dashboard_view(&self) -> Option<DashboardView> {
        if self.state.screen != Screen::Dashboard {
            return None;
        }
        let section = self.state.section;
        Some(DashboardView {
            table: self.sections.table(section, self.state.selected()),
            modal: self.sections.modal(section, self.tz),
        })
    }

    // --- session lifecycle ---

    fn enter_dashboard(&mut self) {
        self.state.screen = Screen::Dashboard;
        self.state.login.password.clear();
        self.state.login.message = None;
        self.loaded.clear();
        self.refresh(self.state.section);
        self.refresh(Section::Notifications);
        self.start_polling();
    }

    fn start_polling(&mut self) {
        let source = self.sections.notifications.refresh_source();
        let tx = self.events_tx.clone();
        self.poll.start(
            Duration::from_secs(self.config.poll_interval_secs),
            move || {
                let request = source.request();
                let tx = tx.clone();
                async move {
                    let outcome = request.run().await;
                    let _ = tx.send(Refreshed::from(outcome).into());
                }
            },
        );
    }

    /// Sends the credentials on a background task; the answer arrives as
    /// [`AppEvent::LoggedIn`].
    fn attempt_login(&mut self) {
        if self.state.login.submitting {
            return;
        }
        self.state.login.submitting = true;
        self.state.login.message = None;

        let auth = self.auth.clone();
        let email = self.state.login.email.trim().to_string();
        let password = self.state.login.password.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = auth.login(&email, &password).await;
            let _ = tx.send(AppEvent::LoggedIn(result));
        });
    }

    fn finish_login(&mut self, result: dashboard::Result<Session>) {
        self.state.login.submitting = false;
        if self.state.screen != Screen::Login {
            return;
        }
        match result {
            Ok(session) => {
                tracing::info!(vendor = %session.vendor_id, "signed in");
                self.state.vendor = Some(session.email.clone());
                self.local.session = Some(session.clone());
                self.save_local();
                self.session.login(session);
                self.enter_dashboard();
            }
            Err(err) => {
                tracing::warn!("login failed: {err}");
                self.state.login.message = Some(err.user_message());
            }
        }
    }

    fn logout(&mut self, message: Option<String>) {
        tracing::info!("signing out");
        self.poll.stop();
        self.session.logout();
        self.sections.reset();
        self.loaded.clear();
        self.local.session = None;
        self.save_local();

        self.state.screen = Screen::Login;
        self.state.login.password.clear();
        self.state.login.focus = LoginField::Password;
        self.state.login.message = message;
        self.state.vendor = None;
        self.state.filter = None;
        self.state.selected = [0; Section::ALL.len()];
        self.state.unread = 0;
        self.state.last_refresh = None;
    }

    fn save_local(&self) {
        if let Err(err) = self.local.save(&self.config.state_path) {
            tracing::warn!("failed to save local state: {err}");
        }
    }

    // --- refresh ---

    fn refresh(&mut self, section: Section) {
        self.loaded.insert(section);
        let tx = self.events_tx.clone();
        with_section!(mut self.sections, section, |ctrl| {
            spawn_refresh(ctrl.begin_refresh(), tx)
        });
    }

    /// A rejected token on a request from the current session signs out.
    fn session_expired(&mut self, unauthorized: bool, epoch: u64) -> bool {
        if !unauthorized
            || epoch != self.session.epoch()
            || self.state.screen != Screen::Dashboard
        {
            return false;
        }
        self.logout(Some(
            "Your session has expired. Please sign in again.".to_string(),
        ));
        true
    }

    fn apply_refresh(&mut self, refreshed: Refreshed) {
        if self.session_expired(refreshed.is_unauthorized(), refreshed.epoch()) {
            return;
        }
        let section = refreshed.section();
        refreshed.apply(&mut self.sections);
        self.state.last_refresh = Some(Utc::now().with_timezone(&self.tz));
        self.state.unread = self.sections.unread_notifications();
        if section == self.state.section {
            self.clamp_selection();
        }
    }

    fn clamp_selection(&mut self) {
        let rows = self.sections.table(self.state.section, 0).rows.len();
        let selected = self.state.selected().min(rows.saturating_sub(1));
        self.state.select(selected);
    }

    fn switch_section(&mut self, section: Section) {
        self.state.section = section;
        self.state.filter = None;
        if !self.loaded.contains(&section) {
            self.refresh(section);
        }
    }

    // --- input ---

    fn handle_key(&mut self, key: KeyEvent) {
        let action = map_key(key);
        if action == AppAction::Quit {
            self.should_quit = true;
            return;
        }

        match self.state.screen {
            Screen::Login => self.handle_login_key(action),
            Screen::Dashboard => {
                let section = self.state.section;
                let modal_open = with_section!(self.sections, section, |ctrl| ctrl
                    .modal()
                    .is_open());
                if modal_open {
                    self.handle_modal_key(action)
                } else if self.state.filter.is_some() {
                    self.handle_filter_key(action)
                } else {
                    self.handle_list_key(action)
                }
            }
        }
    }

    fn handle_login_key(&mut self, action: AppAction) {
        match action {
            AppAction::NextField | AppAction::PrevField | AppAction::Up | AppAction::Down => {
                self.state.login.focus = match self.state.login.focus {
                    LoginField::Email => LoginField::Password,
                    LoginField::Password => LoginField::Email,
                };
            }
            AppAction::Submit => self.attempt_login(),
            AppAction::Backspace => {
                self.active_login_field().pop();
            }
            AppAction::Input(ch) => self.active_login_field().push(ch),
            AppAction::Cancel => self.should_quit = true,
            _ => {}
        }
    }

    fn active_login_field(&mut self) -> &mut String {
        match self.state.login.focus {
            LoginField::Email => &mut self.state.login.email,
            LoginField::Password => &mut self.state.login.password,
        }
    }

    fn handle_list_key(&mut self, action: AppAction) {
        let section = self.state.section;
        match action {
            AppAction::NextField => self.switch_section(section.next()),
            AppAction::PrevField => self.switch_section(section.prev()),
            AppAction::Up => self.state.select(self.state.selected().saturating_sub(1)),
            AppAction::Down => {
                self.state.select(self.state.selected().saturating_add(1));
                self.clamp_selection();
            }
            AppAction::Submit => self.open_modal(ModalMode::View),
            AppAction::Cancel => {
                with_section!(mut self.sections, section, |ctrl| ctrl.dismiss_error());
            }
            AppAction::Input(ch) => self.handle_shortcut(ch),
            _ => {}
        }
    }

    fn handle_shortcut(&mut self, ch: char) {
        let section = self.state.section;
        match ch {
            'q' => self.should_quit = true,
            'n' => {
                with_section!(mut self.sections, section, |ctrl| ctrl.next_page());
                self.state.select(0);
            }
            'p' => {
                with_section!(mut self.sections, section, |ctrl| ctrl.prev_page());
                self.state.select(0);
            }
            '/' => self.open_filter_prompt(),
            'c' => {
                with_section!(mut self.sections, section, |ctrl| ctrl.clear_filters());
                self.state.select(0);
            }
            'r' => self.refresh(section),
            'a' => self.open_create_modal(),
            'i' => self.open_modal(ModalMode::Invoice),
            'e' => self.open_modal(ModalMode::Edit),
            's' => self.open_modal(ModalMode::StatusEdit),
            'd' => self.open_modal(ModalMode::DeleteConfirm),
            'x' => self.export_csv(),
            'P' => self.print_snapshot(),
            'L' => self.logout(None),
            _ => {}
        }
    }

    fn open_filter_prompt(&mut self) {
        let section = self.state.section;
        let fields = with_section!(self.sections, section, |ctrl| filter_fields(ctrl));
        let Some((first, _)) = fields.first().copied() else {
            return;
        };
        let buffer = self.current_filter_text(first);
        self.state.filter = Some(FilterPrompt {
            fields,
            focus: 0,
            buffer,
        });
    }

    fn current_filter_text(&self, field: &str) -> String {
        let section = self.state.section;
        with_section!(self.sections, section, |ctrl| ctrl
            .filters()
            .get(field)
            .map(view::filter_text)
            .unwrap_or_default())
    }

    fn handle_filter_key(&mut self, action: AppAction) {
        let Some(mut prompt) = self.state.filter.take() else {
            return;
        };
        match action {
            AppAction::Cancel => return,
            AppAction::NextField | AppAction::PrevField => {
                let len = prompt.fields.len();
                prompt.focus = if action == AppAction::NextField {
                    (prompt.focus + 1) % len
                } else {
                    (prompt.focus + len - 1) % len
                };
                prompt.buffer = self.current_filter_text(prompt.fields[prompt.focus].0);
            }
            AppAction::Backspace => {
                prompt.buffer.pop();
            }
            AppAction::Input(ch) => prompt.buffer.push(ch),
            AppAction::Submit => {
                let section = self.state.section;
                let field = prompt.fields[prompt.focus].0;
                let result = with_section!(mut self.sections, section, |ctrl| {
                    ctrl.set_filter_input(field, &prompt.buffer)
                });
                match result {
                    Ok(()) => {
                        self.state.select(0);
                        return;
                    }
                    Err(err) => {
                        self.state.toast = Some(ToastState::new(ToastLevel::Error, err.user_message()));
                    }
                }
            }
            _ => {}
        }
        self.state.filter = Some(prompt);
    }

    fn open_modal(&mut self, mode: ModalMode) {
        let section = self.state.section;
        let Some(id) = self.sections.selected_id(section, self.state.selected()) else {
            return;
        };
        let result = with_section!(mut self.sections, section, |ctrl| ctrl.open_modal(mode, &id));
        self.modal_refused(result);
    }

    fn open_create_modal(&mut self) {
        let section = self.state.section;
        let result = with_section!(mut self.sections, section, |ctrl| ctrl.open_create_modal());
        self.modal_refused(result);
    }

    fn modal_refused(&mut self, result: std::result::Result<(), ModalError>) {
        let Err(err) = result else {
            return;
        };
        let message = match err {
            ModalError::Unsupported(mode) => format!(
                "{} is not available for {}",
                mode.label(),
                self.state.section.label()
            ),
            other => other.to_string(),
        };
        self.state.toast = Some(ToastState::new(ToastLevel::Info, message));
    }

    fn handle_modal_key(&mut self, action: AppAction) {
        let section = self.state.section;
        let Some(mode) = with_section!(self.sections, section, |ctrl| ctrl.modal().mode()) else {
            return;
        };

        match (mode, action) {
            (_, AppAction::Cancel)
            | (ModalMode::View | ModalMode::Invoice, AppAction::Submit)
            | (ModalMode::DeleteConfirm, AppAction::Input('n')) => {
                let cancelled = with_section!(mut self.sections, section, |ctrl| ctrl.cancel_modal());
                if let Err(err) = cancelled {
                    tracing::debug!("modal stays open: {err}");
                }
            }
            (ModalMode::View, AppAction::Input('i')) => {
                with_section!(mut self.sections, section, |ctrl| ctrl.modal_mut().reset());
                self.open_modal(ModalMode::Invoice);
            }
            (ModalMode::DeleteConfirm, AppAction::Input('y')) | (_, AppAction::Submit) => {
                self.submit_modal();
            }
            (ModalMode::Edit | ModalMode::Create, AppAction::NextField | AppAction::Down) => {
                with_section!(mut self.sections, section, |ctrl| ctrl.modal_mut().next_field());
            }
            (ModalMode::Edit | ModalMode::Create, AppAction::Backspace) => {
                with_section!(mut self.sections, section, |ctrl| ctrl.modal_mut().backspace());
            }
            (ModalMode::Edit | ModalMode::Create, AppAction::Input(ch)) => {
                with_section!(mut self.sections, section, |ctrl| ctrl.modal_mut().input(ch));
            }
            (ModalMode::StatusEdit, AppAction::Up | AppAction::Left) => {
                with_section!(mut self.sections, section, |ctrl| ctrl
                    .modal_mut()
                    .cycle_status(false));
            }
            (ModalMode::StatusEdit, AppAction::Down | AppAction::Right | AppAction::NextField) => {
                with_section!(mut self.sections, section, |ctrl| ctrl
                    .modal_mut()
                    .cycle_status(true));
            }
            _ => {}
        }
    }

    /// Starts the modal's write on a background task. The modal shows
    /// "Saving…" until [`AppEvent::Written`] comes back.
    fn submit_modal(&mut self) {
        let section = self.state.section;
        let tx = self.events_tx.clone();
        let started = with_section!(mut self.sections, section, |ctrl| {
            ctrl.begin_submit_modal().map(|start| match start {
                WriteStart::Send(request) => {
                    spawn_write(request, tx);
                    None
                }
                WriteStart::Done(applied) => Some(applied),
            })
        });

        match started {
            Ok(None) => {}
            Ok(Some(applied)) => self.show_applied(section, Ok(applied)),
            // shown inside the modal
            Err(err) => tracing::debug!("modal submit refused: {err}"),
        }
    }

    fn apply_written(&mut self, written: Written) {
        if self.session_expired(written.is_unauthorized(), written.epoch()) {
            return;
        }
        let section = written.section();
        let current = written.epoch() == self.session.epoch();
        let result = written.apply(&mut self.sections, &self.events_tx);
        if current {
            self.show_applied(section, result);
        }
    }

    fn show_applied(&mut self, section: Section, result: dashboard::Result<Applied>) {
        let notice = with_section!(mut self.sections, section, |ctrl| ctrl.take_notice());
        match result {
            Ok(Applied::Unchanged) => {
                self.state.toast = Some(ToastState::new(ToastLevel::Info, "Nothing to change"));
            }
            Ok(_) => {
                self.state.toast = notice.map(ToastState::from);
                self.state.unread = self.sections.unread_notifications();
                if section == self.state.section {
                    self.clamp_selection();
                }
            }
            // the open modal shows the error itself
            Err(err) if section == self.state.section => {
                tracing::debug!("write failed: {err}");
            }
            Err(_) => self.state.toast = notice.map(ToastState::from),
        }
    }

    // --- export ---

    fn export_path(&self, extension: &str) -> PathBuf {
        let stamp = Utc::now().with_timezone(&self.tz).format("%Y%m%d-%H%M%S");
        Path::new(&self.config.export_dir).join(format!(
            "{}-{stamp}.{extension}",
            self.state.section.slug()
        ))
    }

    /// Writes an export file. Failures become an error toast.
    fn write_export(&mut self, path: &Path, content: &str, rows: usize) {
        match write_file(path, content) {
            Ok(()) => {
                tracing::info!(path = %path.display(), rows, "export written");
                self.state.toast = Some(ToastState::new(
                    ToastLevel::Success,
                    format!("{rows} row(s) written to {}", path.display()),
                ));
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), "export failed: {err}");
                self.state.toast = Some(ToastState::new(
                    ToastLevel::Error,
                    format!("Could not write {}: {err}", path.display()),
                ));
            }
        }
    }

    fn export_csv(&mut self) {
        let section = self.state.section;
        let delimiter = self.delimiter;
        let (csv, rows) = with_section!(self.sections, section, |ctrl| (
            ctrl.export_csv(delimiter),
            ctrl.filtered_count()
        ));
        let path = self.export_path("csv");
        match csv {
            Ok(csv) => self.write_export(&path, &csv, rows),
            Err(err) => {
                tracing::warn!("export failed: {err}");
                self.state.toast = Some(ToastState::new(ToastLevel::Error, err.to_string()));
            }
        }
    }

    fn print_snapshot(&mut self) {
        let section = self.state.section;
        let (text, rows) = with_section!(self.sections, section, |ctrl| (
            ctrl.print_snapshot(),
            ctrl.filtered_count()
        ));
        let path = self.export_path("txt");
        self.write_export(&path, &text, rows)
    }
}

fn write_file(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)
}

fn filter_fields<T, C>(_: &dashboard::ListController<T, C>) -> Vec<(&'static str, &'static str)>
where
    T: Entity,
    C: dashboard::CollectionClient<T>,
{
    T::filters()
        .into_iter()
        .map(|field| (field.name, field.label))
        .collect()
}
