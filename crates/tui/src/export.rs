//! `pharmadesk export`: fetch one collection, filter it and write CSV.

use std::{path::Path, time::Duration};

use api_types::{
    category::Category, medicine::Medicine, notification::Notification, order::Order,
    pharmacy::Pharmacy, prescription::Prescription, user::User,
};
use dashboard::{CollectionClient, Entity, ListController, RestCollection, SessionContext};

use crate::{
    config::AppConfig,
    error::{AppError, Result},
    local_state::LocalState,
    section::Section,
};

pub async fn run(
    config: &AppConfig,
    entity: Section,
    out: &Path,
    filters: &[(String, String)],
) -> Result<usize> {
    let local = LocalState::load(&config.state_path)?;
    let session = SessionContext::signed_in(local.session.ok_or(AppError::NotSignedIn)?);
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()?;

    let (csv, rows) = match entity {
        Section::Orders => export::<Order>(config, &session, &http, filters).await?,
        Section::Medicines => export::<Medicine>(config, &session, &http, filters).await?,
        Section::Prescriptions => {
            export::<Prescription>(config, &session, &http, filters).await?
        }
        Section::Categories => export::<Category>(config, &session, &http, filters).await?,
        Section::Pharmacies => export::<Pharmacy>(config, &session, &http, filters).await?,
        Section::Users => export::<User>(config, &session, &http, filters).await?,
        Section::Notifications => {
            export::<Notification>(config, &session, &http, filters).await?
        }
    };

    if let Some(parent) = out.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(out, csv)?;
    tracing::info!(entity = entity.slug(), rows, path = %out.display(), "export written");
    Ok(rows)
}

async fn export<T: Entity>(
    config: &AppConfig,
    session: &SessionContext,
    http: &reqwest::Client,
    filters: &[(String, String)],
) -> Result<(String, usize)> {
    let client = RestCollection::<T>::new(&config.base_url, session.clone())?.with_http(http.clone());
    let ctrl = ListController::new(client, session.clone(), config.page_size)?;
    filtered_csv(ctrl, filters, config.delimiter()?).await
}

/// Loads the collection, applies `filters` and renders every match.
async fn filtered_csv<T, C>(
    mut ctrl: ListController<T, C>,
    filters: &[(String, String)],
    delimiter: u8,
) -> Result<(String, usize)>
where
    T: Entity,
    C: CollectionClient<T>,
{
    for (field, value) in filters {
        ctrl.set_filter_input(field, value)?;
    }
    ctrl.refresh().await;
    if let Some(message) = ctrl.error() {
        return Err(AppError::Fetch(format!("{}: {message}", T::LABEL)));
    }
    let csv = ctrl.export_csv(delimiter)?;
    Ok((csv, ctrl.filtered_count()))
}
