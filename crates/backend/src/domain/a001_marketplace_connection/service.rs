use chrono::{DateTime, Utc};
use contracts::domain::a001_marketplace_connection::{
    ConnectionState, MarketplaceConnection, MarketplaceConnectionDto, MarketplaceCredentials,
};
use contracts::domain::common::TenantId;
use contracts::enums::MarketplaceKind;

use super::repository;
use crate::shared::config::get_config;
use crate::shared::credentials;
use crate::shared::error::OrchestratorError;
use crate::shared::logger;
use crate::shared::marketplaces;
use crate::shared::sync_gate;

/// Список подключений арендатора (без каких-либо секретов)
pub async fn get_connections(
    tenant: &TenantId,
) -> Result<Vec<MarketplaceConnectionDto>, OrchestratorError> {
    let connections = repository::list_for_tenant(tenant).await?;
    Ok(connections.iter().map(MarketplaceConnectionDto::from).collect())
}

/// Подключение арендатора к маркетплейсу.
///
/// Учётные данные сохраняются до рукопожатия; при неудаче рукопожатия
/// они затираются, запись возвращается в Disconnected, а причина отказа
/// адаптера уходит вызывающему как ConnectionError.
pub async fn connect(
    tenant: &TenantId,
    kind: MarketplaceKind,
    credentials_dto: MarketplaceCredentials,
) -> Result<MarketplaceConnectionDto, OrchestratorError> {
    credentials_dto
        .validate_for(kind)
        .map_err(OrchestratorError::Validation)?;

    let adapter = marketplaces::adapter_for(kind)
        .ok_or_else(|| OrchestratorError::Adapter(marketplaces::unsupported_kind_message(kind)))?;

    let mut connection = match repository::get_active(tenant, kind).await? {
        Some(existing) if existing.state == ConnectionState::Disconnected => existing,
        Some(existing) => {
            return Err(OrchestratorError::InvalidState(format!(
                "Подключение {} уже в состоянии {}; сначала выполните отключение",
                kind.display_name(),
                existing.state
            )));
        }
        None => {
            let fresh = MarketplaceConnection::new_for_connect(*tenant, kind);
            repository::insert(&fresh).await?;
            fresh
        }
    };

    connection
        .transition_to(ConnectionState::Connecting)
        .map_err(OrchestratorError::InvalidState)?;
    let credential_ref = credentials::put(tenant, kind, &credentials_dto).await?;
    connection.credential_ref = Some(credential_ref);
    repository::update(&connection).await?;

    let timeout_secs = get_config().sync.adapter_timeout_seconds;
    let verify_result = match tokio::time::timeout(
        std::time::Duration::from_secs(timeout_secs),
        adapter.verify_credentials(&credentials_dto),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!(
            "Превышено время ожидания ответа от {} API ({} сек)",
            kind.display_name(),
            timeout_secs
        )),
    };

    match verify_result {
        Ok(()) => {
            connection
                .transition_to(ConnectionState::Connected)
                .map_err(OrchestratorError::InvalidState)?;
            connection.last_sync_error = None;
            repository::update(&connection).await?;

            logger::log(
                "connection",
                &format!(
                    "Подключение установлено: tenant={} marketplace={}",
                    tenant.value(),
                    kind.code()
                ),
            );
            Ok(MarketplaceConnectionDto::from(&connection))
        }
        Err(e) => {
            let reason = e.to_string();
            if let Err(wipe_err) = credentials::delete(tenant, kind).await {
                tracing::error!(
                    "Failed to wipe credentials after connect failure: {:#}",
                    wipe_err
                );
            }
            connection.credential_ref = None;
            connection.last_sync_error = Some(reason.clone());
            connection
                .transition_to(ConnectionState::Disconnected)
                .map_err(OrchestratorError::InvalidState)?;
            repository::update(&connection).await?;

            logger::log(
                "connection",
                &format!(
                    "Подключение отклонено: tenant={} marketplace={} причина={}",
                    tenant.value(),
                    kind.code(),
                    reason
                ),
            );
            Err(OrchestratorError::Connection(reason))
        }
    }
}

/// Отключение пары (tenant, kind). Идемпотентно.
///
/// Учётные данные затираются сразу, текущей синхронизации пары
/// выставляется флаг отмены, запись помечается удалённой с сохранением
/// истории синхронизаций.
pub async fn disconnect(tenant: &TenantId, kind: MarketplaceKind) -> Result<(), OrchestratorError> {
    let Some(mut connection) = repository::get_active(tenant, kind).await? else {
        return Ok(());
    };

    sync_gate::request_cancel(tenant, kind);
    credentials::delete(tenant, kind).await?;

    connection.credential_ref = None;
    connection
        .transition_to(ConnectionState::Disconnected)
        .map_err(OrchestratorError::InvalidState)?;
    repository::update(&connection).await?;
    repository::soft_delete(connection.base.id.value()).await?;

    logger::log(
        "connection",
        &format!(
            "Подключение разорвано: tenant={} marketplace={}",
            tenant.value(),
            kind.code()
        ),
    );
    Ok(())
}

/// Зафиксировать успешную синхронизацию пары
pub async fn record_sync_success(
    tenant: &TenantId,
    kind: MarketplaceKind,
    at: DateTime<Utc>,
) -> Result<(), OrchestratorError> {
    let Some(mut connection) = repository::get_active(tenant, kind).await? else {
        // Пара отключена, пока шла синхронизация
        return Ok(());
    };
    connection.record_sync_success(at);
    repository::update(&connection).await?;
    Ok(())
}

/// Зафиксировать ошибку синхронизации: Connected -> SyncError,
/// данные и учётные данные сохраняются
pub async fn record_sync_failure(
    tenant: &TenantId,
    kind: MarketplaceKind,
    error: &str,
) -> Result<(), OrchestratorError> {
    let Some(mut connection) = repository::get_active(tenant, kind).await? else {
        return Ok(());
    };
    connection.record_sync_failure(error);
    repository::update(&connection).await?;
    Ok(())
}
