use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use api_types::{category::Category, medicine::Medicine, order::Order};
use dashboard::{
    Applied, ClientError, CollectionClient, Entity, FilterValue, ListController, ListParams,
    ModalError, ModalMode, NoticeLevel, Session, SessionContext, WritePolicy, WriteStart,
};
use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio::sync::{mpsc, oneshot};

#[derive(Default)]
struct Calls {
    list: usize,
    create: usize,
    update: usize,
    remove: usize,
}

struct Backend<T> {
    items: Vec<T>,
    fail: Option<String>,
    calls: Calls,
    patches: Vec<(String, Value)>,
}

/// In-memory collection with call counters and switchable failures.
struct MockClient<T> {
    backend: Arc<Mutex<Backend<T>>>,
}

impl<T> Clone for MockClient<T> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
        }
    }
}

impl<T: Entity> MockClient<T> {
    fn with_items(items: Vec<T>) -> Self {
        Self {
            backend: Arc::new(Mutex::new(Backend {
                items,
                fail: None,
                calls: Calls::default(),
                patches: Vec::new(),
            })),
        }
    }

    fn fail_with(&self, message: Option<&str>) {
        self.backend.lock().unwrap().fail = message.map(str::to_string);
    }

    fn check(&self) -> dashboard::Result<()> {
        match &self.backend.lock().unwrap().fail {
            Some(message) => Err(ClientError::server(
                StatusCode::INTERNAL_SERVER_ERROR,
                Some(message.clone()),
            )),
            None => Ok(()),
        }
    }

    fn calls(&self, f: impl Fn(&Calls) -> usize) -> usize {
        f(&self.backend.lock().unwrap().calls)
    }

    fn patches(&self) -> Vec<(String, Value)> {
        self.backend.lock().unwrap().patches.clone()
    }
}

impl<T: Entity> CollectionClient<T> for MockClient<T> {
    async fn list(&self, _: &ListParams) -> dashboard::Result<Vec<T>> {
        self.backend.lock().unwrap().calls.list += 1;
        self.check()?;
        Ok(self.backend.lock().unwrap().items.clone())
    }

    async fn fetch(&self, id: &str) -> dashboard::Result<T> {
        self.check()?;
        let backend = self.backend.lock().unwrap();
        backend
            .items
            .iter()
            .find(|item| item.id() == id)
            .cloned()
            .ok_or_else(|| ClientError::server(StatusCode::NOT_FOUND, None))
    }

    async fn create(&self, payload: &Value) -> dashboard::Result<T> {
        self.backend.lock().unwrap().calls.create += 1;
        self.check()?;
        let mut payload = payload.clone();
        if payload.get("_id").is_none() {
            let created = self.calls(|c| c.create);
            payload["_id"] = json!(format!("new-{created}"));
        }
        let item: T = serde_json::from_value(payload).unwrap();
        self.backend.lock().unwrap().items.push(item.clone());
        Ok(item)
    }

    async fn update(&self, id: &str, patch: &Value) -> dashboard::Result<T> {
        let mut backend = self.backend.lock().unwrap();
        backend.calls.update += 1;
        backend.patches.push((id.to_string(), patch.clone()));
        if let Some(message) = &backend.fail {
            return Err(ClientError::server(
                StatusCode::BAD_REQUEST,
                Some(message.clone()),
            ));
        }
        let item = backend
            .items
            .iter_mut()
            .find(|item| item.id() == id)
            .ok_or_else(|| ClientError::server(StatusCode::NOT_FOUND, None))?;
        let mut value = serde_json::to_value(&*item).unwrap();
        for (key, field) in patch.as_object().unwrap() {
            value[key] = field.clone();
        }
        *item = serde_json::from_value(value).unwrap();
        Ok(item.clone())
    }

    async fn remove(&self, id: &str) -> dashboard::Result<()> {
        self.backend.lock().unwrap().calls.remove += 1;
        self.check()?;
        self.backend
            .lock()
            .unwrap()
            .items
            .retain(|item| item.id() != id);
        Ok(())
    }
}

fn session() -> SessionContext {
    SessionContext::signed_in(Session {
        token: "token-1".to_string(),
        vendor_id: "vendor-1".to_string(),
        email: "shop@example.com".to_string(),
    })
}

fn medicine(id: &str, name: &str) -> Medicine {
    serde_json::from_value(json!({
        "_id": id,
        "name": name,
        "category": "Pain",
        "price": 2.5,
        "stock": 10,
    }))
    .unwrap()
}

fn order(id: &str, status: &str) -> Order {
    serde_json::from_value(json!({
        "_id": id,
        "orderNumber": format!("ORD-{id}"),
        "customerName": "Ada",
        "status": status,
        "totalAmount": 12.0,
    }))
    .unwrap()
}

async fn loaded<T: Entity>(
    items: Vec<T>,
    page_size: usize,
) -> (ListController<T, MockClient<T>>, MockClient<T>) {
    let client = MockClient::with_items(items);
    let mut ctrl = ListController::new(client.clone(), session(), page_size).unwrap();
    ctrl.refresh().await;
    (ctrl, client)
}

#[tokio::test]
async fn refresh_then_filter_is_case_insensitive() {
    let (mut ctrl, _) = loaded(
        vec![
            medicine("1", "Paracetamol 500mg"),
            medicine("2", "Ibuprofen"),
            medicine("3", "PARACETAMOL syrup"),
        ],
        10,
    )
    .await;
    assert!(!ctrl.is_loading());
    assert_eq!(ctrl.items().len(), 3);

    ctrl.set_filter("name", FilterValue::text("para")).unwrap();
    let ids = ctrl.filtered().iter().map(|m| m.id.clone()).collect::<Vec<_>>();
    assert_eq!(ids, ["1", "3"]);

    ctrl.clear_filters();
    assert_eq!(ctrl.filtered_count(), 3);
}

#[tokio::test]
async fn twenty_three_items_make_three_pages() {
    let items = (1..=23)
        .map(|i| medicine(&i.to_string(), &format!("Medicine {i}")))
        .collect();
    let (mut ctrl, _) = loaded(items, 10).await;

    assert_eq!(ctrl.page_count(), 3);
    assert_eq!(ctrl.page().len(), 10);
    ctrl.set_page(3);
    let last = ctrl.page();
    assert_eq!(last.len(), 3);
    assert_eq!(last[0].id, "21");
}

#[tokio::test]
async fn delete_removes_item_once_confirmed() {
    let (mut ctrl, client) = loaded(
        vec![medicine("1", "A"), medicine("2", "B"), medicine("3", "C")],
        10,
    )
    .await;

    let declined = ctrl.apply_delete("2", |_| false).await.unwrap();
    assert_eq!(declined, Applied::Declined);
    assert_eq!(client.calls(|c| c.remove), 0);

    let applied = ctrl
        .apply_delete("2", |item| item.name == "B")
        .await
        .unwrap();
    assert_eq!(applied, Applied::Written);
    assert_eq!(client.calls(|c| c.remove), 1);
    assert!(ctrl.find("2").is_none());
    assert_eq!(ctrl.items().len(), 2);

    let notice = ctrl.take_notice().unwrap();
    assert_eq!(notice.level, NoticeLevel::Success);
    assert!(ctrl.take_notice().is_none());
}

#[tokio::test]
async fn failed_delete_keeps_item_and_reports_server_message() {
    let (mut ctrl, client) = loaded(vec![medicine("1", "A"), medicine("2", "B")], 10).await;
    client.fail_with(Some("Medicine is referenced by an order"));

    let err = ctrl.apply_delete("1", |_| true).await.unwrap_err();
    assert_eq!(err.user_message(), "Medicine is referenced by an order");
    assert!(ctrl.find("1").is_some());

    let notice = ctrl.take_notice().unwrap();
    assert_eq!(notice.level, NoticeLevel::Error);
    assert_eq!(notice.message, "Medicine is referenced by an order");
}

#[tokio::test]
async fn unknown_id_is_rejected_before_any_request() {
    let (mut ctrl, client) = loaded(vec![medicine("1", "A")], 10).await;

    let err = ctrl.apply_edit("404", json!({"name": "X"})).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
    assert!(ctrl.apply_delete("404", |_| true).await.is_err());
    assert_eq!(client.calls(|c| c.update), 0);
    assert_eq!(client.calls(|c| c.remove), 0);
}

#[tokio::test]
async fn edit_replaces_item_in_place() {
    let (mut ctrl, client) = loaded(
        vec![medicine("1", "A"), medicine("2", "B"), medicine("3", "C")],
        10,
    )
    .await;

    ctrl.apply_edit("2", json!({"name": "Bee", "stock": 4}))
        .await
        .unwrap();

    let names = ctrl.items().iter().map(|m| m.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, ["A", "Bee", "C"]);
    assert_eq!(ctrl.find("2").unwrap().stock, 4);
    assert_eq!(client.calls(|c| c.list), 1);
}

#[tokio::test]
async fn refetch_policy_reloads_after_write() {
    let client = MockClient::with_items(vec![medicine("1", "A")]);
    let mut ctrl = ListController::new(client.clone(), session(), 10)
        .unwrap()
        .with_write_policy(WritePolicy::Refetch);
    ctrl.refresh().await;

    ctrl.apply_edit("1", json!({"name": "B"})).await.unwrap();
    assert_eq!(client.calls(|c| c.list), 2);
    assert_eq!(ctrl.find("1").unwrap().name, "B");
}

#[tokio::test]
async fn create_appends_record() {
    let (mut ctrl, client) = loaded(vec![medicine("1", "A")], 10).await;
    ctrl.apply_create(json!({"_id": "2", "name": "New"}))
        .await
        .unwrap();
    assert_eq!(client.calls(|c| c.create), 1);
    assert_eq!(ctrl.items().last().unwrap().name, "New");
}

#[tokio::test]
async fn unchanged_status_sends_nothing() {
    let (mut ctrl, client) = loaded(vec![order("1", "Pending")], 10).await;

    let applied = ctrl.apply_status_change("1", "Pending").await.unwrap();
    assert_eq!(applied, Applied::Unchanged);
    assert_eq!(client.calls(|c| c.update), 0);
    assert!(ctrl.take_notice().is_none());
}

#[tokio::test]
async fn status_change_patches_only_status() {
    let (mut ctrl, client) = loaded(vec![order("1", "Pending"), order("2", "Accepted")], 10).await;

    let applied = ctrl.apply_status_change("1", "Dispatched").await.unwrap();
    assert_eq!(applied, Applied::Written);
    assert_eq!(ctrl.find("1").unwrap().status, "Dispatched");
    assert_eq!(
        client.patches(),
        [("1".to_string(), json!({"status": "Dispatched"}))]
    );

    let err = ctrl.apply_status_change("2", "Teleported").await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
    assert_eq!(client.calls(|c| c.update), 1);
}

#[tokio::test]
async fn refresh_failure_keeps_items_until_next_success() {
    let (mut ctrl, client) = loaded(vec![medicine("1", "A")], 10).await;

    client.fail_with(Some("Database unavailable"));
    ctrl.refresh().await;
    assert_eq!(ctrl.error(), Some("Database unavailable"));
    assert_eq!(ctrl.items().len(), 1);
    assert!(!ctrl.is_loading());

    // sticky across later reads
    assert_eq!(ctrl.error(), Some("Database unavailable"));

    client.fail_with(None);
    ctrl.refresh().await;
    assert!(ctrl.error().is_none());
}

#[tokio::test]
async fn server_error_without_message_uses_fallback() {
    let (mut ctrl, client) = loaded(vec![medicine("1", "A")], 10).await;
    client.fail_with(Some("  "));
    ctrl.refresh().await;
    assert_eq!(ctrl.error(), Some(dashboard::FALLBACK_MESSAGE));
    ctrl.dismiss_error();
    assert!(ctrl.error().is_none());
}

#[tokio::test]
async fn narrowing_filter_clamps_page() {
    let mut items = (1..=30)
        .map(|i| medicine(&i.to_string(), &format!("Ibuprofen {i}")))
        .collect::<Vec<_>>();
    items.push(medicine("31", "Paracetamol"));
    let (mut ctrl, client) = loaded(items, 10).await;
    ctrl.set_page(4);
    assert_eq!(ctrl.page_index(), 4);

    // the server shrinks the collection under the cursor
    client.backend.lock().unwrap().items.truncate(12);
    ctrl.refresh().await;
    assert_eq!(ctrl.page_index(), 2);
    assert_eq!(ctrl.page().len(), 2);
}

#[tokio::test]
async fn response_from_previous_session_is_dropped() {
    let client = MockClient::with_items(vec![medicine("1", "A")]);
    let ctx = session();
    let mut ctrl = ListController::new(client, ctx.clone(), 10).unwrap();

    let request = ctrl.begin_refresh();
    ctx.logout();
    let outcome = request.run().await;
    ctrl.complete_refresh(outcome);

    assert!(ctrl.items().is_empty());
    assert!(!ctrl.is_loading());
}

#[tokio::test]
async fn refresh_from_previous_session_leaves_new_one_loading() {
    let client = MockClient::with_items(vec![medicine("1", "A")]);
    let ctx = session();
    let mut ctrl = ListController::new(client, ctx.clone(), 10).unwrap();

    let stale = ctrl.begin_refresh();
    ctx.logout();
    ctrl.reset();
    ctx.login(Session {
        token: "token-2".to_string(),
        vendor_id: "vendor-1".to_string(),
        email: "shop@example.com".to_string(),
    });
    let current = ctrl.begin_refresh();
    assert!(ctrl.is_loading());

    ctrl.complete_refresh(stale.run().await);
    assert!(ctrl.is_loading());
    assert!(ctrl.items().is_empty());

    ctrl.complete_refresh(current.run().await);
    assert!(!ctrl.is_loading());
    assert_eq!(ctrl.items().len(), 1);
}

#[tokio::test]
async fn signed_out_reset_clears_state() {
    let (mut ctrl, _) = loaded(vec![medicine("1", "A")], 10).await;
    ctrl.set_filter("name", FilterValue::text("a")).unwrap();
    ctrl.open_modal(ModalMode::View, "1").unwrap();

    ctrl.reset();
    assert!(ctrl.items().is_empty());
    assert!(ctrl.filters().is_empty());
    assert!(!ctrl.modal().is_open());
}

/// Each `list` call waits for the next queued gate to be released.
#[derive(Clone, Default)]
struct GatedClient {
    gates: Arc<Mutex<VecDeque<oneshot::Receiver<Vec<Medicine>>>>>,
    calls: Arc<AtomicUsize>,
}

impl CollectionClient<Medicine> for GatedClient {
    async fn list(&self, _: &ListParams) -> dashboard::Result<Vec<Medicine>> {
        let gate = self.gates.lock().unwrap().pop_front();
        self.calls.fetch_add(1, Ordering::SeqCst);
        match gate {
            Some(gate) => gate
                .await
                .map_err(|_| ClientError::Validation("gate dropped".to_string())),
            None => Ok(Vec::new()),
        }
    }

    async fn fetch(&self, id: &str) -> dashboard::Result<Medicine> {
        Err(ClientError::Validation(id.to_string()))
    }

    async fn create(&self, _: &Value) -> dashboard::Result<Medicine> {
        Err(ClientError::Validation("create".to_string()))
    }

    async fn update(&self, id: &str, _: &Value) -> dashboard::Result<Medicine> {
        Err(ClientError::Validation(id.to_string()))
    }

    async fn remove(&self, _: &str) -> dashboard::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn overlapping_refreshes_apply_in_completion_order() {
    let client = GatedClient::default();
    let (first_tx, first_rx) = oneshot::channel();
    let (second_tx, second_rx) = oneshot::channel();
    client.gates.lock().unwrap().extend([first_rx, second_rx]);

    let mut ctrl: ListController<Medicine, _> =
        ListController::new(client.clone(), session(), 10).unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let first = ctrl.begin_refresh();
    let sender = tx.clone();
    tokio::spawn(async move {
        let _ = sender.send(first.run().await);
    });
    while client.calls.load(Ordering::SeqCst) < 1 {
        tokio::task::yield_now().await;
    }

    let second = ctrl.begin_refresh();
    tokio::spawn(async move {
        let _ = tx.send(second.run().await);
    });
    while client.calls.load(Ordering::SeqCst) < 2 {
        tokio::task::yield_now().await;
    }
    assert!(ctrl.is_loading());

    // second request answers first
    second_tx
        .send(vec![medicine("a", "A"), medicine("b", "B")])
        .unwrap();
    ctrl.complete_refresh(rx.recv().await.unwrap());
    assert_eq!(ctrl.items().len(), 2);
    assert!(ctrl.is_loading());

    first_tx.send(vec![medicine("a", "A")]).unwrap();
    ctrl.complete_refresh(rx.recv().await.unwrap());
    assert_eq!(ctrl.items().len(), 1);
    assert!(!ctrl.is_loading());
}

#[tokio::test]
async fn background_refresh_does_not_toggle_loading() {
    let (mut ctrl, client) = loaded(vec![medicine("1", "A")], 10).await;
    client.backend.lock().unwrap().items.push(medicine("2", "B"));

    let source = ctrl.refresh_source();
    let outcome = source.request().run().await;
    assert!(!ctrl.is_loading());
    ctrl.complete_refresh(outcome);
    assert_eq!(ctrl.items().len(), 2);
    assert!(!ctrl.is_loading());
}

#[tokio::test]
async fn modal_edit_submits_typed_patch() {
    let (mut ctrl, client) = loaded(vec![medicine("1", "Aspirin")], 10).await;

    ctrl.open_modal(ModalMode::Edit, "1").unwrap();
    ctrl.modal_mut().set_field("price", "3,75").unwrap();
    ctrl.modal_mut().set_field("stock", "42").unwrap();

    let applied = ctrl.submit_modal().await.unwrap();
    assert_eq!(applied, Applied::Written);
    assert!(!ctrl.modal().is_open());

    let updated = ctrl.find("1").unwrap();
    assert_eq!(updated.price, 3.75);
    assert_eq!(updated.stock, 42);
    let (id, patch) = &client.patches()[0];
    assert_eq!(id, "1");
    assert_eq!(patch["price"], json!(3.75));
}

#[tokio::test]
async fn modal_delete_is_its_own_confirmation() {
    let (mut ctrl, client) = loaded(vec![medicine("1", "A"), medicine("2", "B")], 10).await;

    ctrl.open_modal(ModalMode::DeleteConfirm, "2").unwrap();
    assert_eq!(ctrl.submit_modal().await.unwrap(), Applied::Written);
    assert_eq!(client.calls(|c| c.remove), 1);
    assert!(ctrl.find("2").is_none());
    assert!(!ctrl.modal().is_open());
}

#[tokio::test]
async fn failed_modal_submit_stays_open_with_message() {
    let (mut ctrl, client) = loaded(vec![order("1", "Pending")], 10).await;
    client.fail_with(Some("Order already dispatched"));

    ctrl.open_modal(ModalMode::StatusEdit, "1").unwrap();
    ctrl.modal_mut().set_status("Cancelled").unwrap();
    let err = ctrl.submit_modal().await.unwrap_err();
    assert!(matches!(err, ModalError::Client(_)));

    assert!(ctrl.modal().is_open());
    assert_eq!(ctrl.modal().error(), Some("Order already dispatched"));
    assert_eq!(ctrl.find("1").unwrap().status, "Pending");

    ctrl.cancel_modal().unwrap();
    assert!(!ctrl.modal().is_open());
}

#[tokio::test]
async fn modal_for_missing_item_is_rejected() {
    let (mut ctrl, _) = loaded(vec![medicine("1", "A")], 10).await;
    let err = ctrl.open_modal(ModalMode::View, "9").unwrap_err();
    assert!(matches!(err, ModalError::UnknownItem(_)));
    assert!(matches!(
        ctrl.open_modal(ModalMode::Invoice, "1"),
        Err(ModalError::Unsupported(ModalMode::Invoice))
    ));
}

#[tokio::test]
async fn modal_write_runs_off_the_controller() {
    let (mut ctrl, client) = loaded(vec![order("1", "Pending")], 10).await;

    ctrl.open_modal(ModalMode::StatusEdit, "1").unwrap();
    ctrl.modal_mut().set_status("Shipped").unwrap();
    let Ok(WriteStart::Send(request)) = ctrl.begin_submit_modal() else {
        panic!("expected a request to send");
    };
    assert!(ctrl.modal().is_submitting());
    assert!(matches!(
        ctrl.begin_submit_modal(),
        Err(ModalError::Busy)
    ));

    let outcome = tokio::spawn(request.run()).await.unwrap();
    assert_eq!(client.calls(|c| c.update), 1);
    let completion = ctrl.complete_write(outcome);
    assert_eq!(completion.result.unwrap(), Applied::Written);
    assert!(completion.refetch.is_none());
    assert!(!ctrl.modal().is_open());
    assert_eq!(ctrl.find("1").unwrap().status, "Shipped");
    assert_eq!(ctrl.take_notice().unwrap().message, "Status set to Shipped");
}

#[tokio::test]
async fn write_from_previous_session_is_dropped() {
    let client = MockClient::with_items(vec![medicine("1", "A")]);
    let ctx = session();
    let mut ctrl = ListController::new(client.clone(), ctx.clone(), 10).unwrap();
    ctrl.refresh().await;

    ctrl.open_modal(ModalMode::DeleteConfirm, "1").unwrap();
    let Ok(WriteStart::Send(request)) = ctrl.begin_submit_modal() else {
        panic!("expected a request to send");
    };
    ctx.logout();
    let completion = ctrl.complete_write(request.run().await);

    assert!(completion.refetch.is_none());
    assert!(ctrl.find("1").is_some());
    assert!(!ctrl.modal().is_open());
    assert!(ctrl.take_notice().is_none());
}

#[tokio::test]
async fn refetch_policy_hands_back_a_reload() {
    let client = MockClient::with_items(vec![medicine("1", "A")]);
    let mut ctrl = ListController::new(client.clone(), session(), 10)
        .unwrap()
        .with_write_policy(WritePolicy::Refetch);
    ctrl.refresh().await;

    let request = ctrl.begin_edit("1", json!({"name": "B"})).unwrap();
    let completion = ctrl.complete_write(request.run().await);
    let refetch = completion.refetch.expect("refetch requested");
    assert!(ctrl.is_loading());

    ctrl.complete_refresh(refetch.run().await);
    assert!(!ctrl.is_loading());
    assert_eq!(client.calls(|c| c.list), 2);
}

#[tokio::test]
async fn create_modal_posts_filled_fields() {
    let (mut ctrl, client) = loaded(Vec::<Category>::new(), 10).await;

    ctrl.open_create_modal().unwrap();
    ctrl.modal_mut().set_field("name", "Vitamins").unwrap();
    assert_eq!(ctrl.submit_modal().await.unwrap(), Applied::Written);

    assert_eq!(client.calls(|c| c.create), 1);
    assert_eq!(ctrl.items().len(), 1);
    assert_eq!(ctrl.items()[0].name, "Vitamins");
    assert_eq!(ctrl.take_notice().unwrap().message, "Created");
}

#[tokio::test]
async fn create_modal_is_not_offered_for_orders() {
    let (mut ctrl, _) = loaded(vec![order("1", "Pending")], 10).await;
    assert!(matches!(
        ctrl.open_create_modal(),
        Err(ModalError::Unsupported(ModalMode::Create))
    ));
}
