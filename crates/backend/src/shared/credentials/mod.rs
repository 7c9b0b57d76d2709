//! Хранилище учётных данных маркетплейсов.
//!
//! Секреты лежат в таблице credential_vault в зашифрованном виде
//! (AES-256-GCM, см. shared::crypto). В журнал пишутся только факты
//! операций: tenant, kind, действие. Сами значения токенов никогда
//! не логируются.

pub mod repository;

use anyhow::Context;
use contracts::domain::a001_marketplace_connection::MarketplaceCredentials;
use contracts::domain::common::TenantId;
use contracts::enums::MarketplaceKind;
use uuid::Uuid;

use crate::shared::crypto;
use crate::shared::logger;

/// Записать учётные данные пары (tenant, kind).
///
/// Прежняя запись, если была, затирается, и выдаётся новый credential_ref.
pub async fn put(
    tenant: &TenantId,
    kind: MarketplaceKind,
    credentials: &MarketplaceCredentials,
) -> anyhow::Result<Uuid> {
    let plaintext = serde_json::to_string(credentials)?;
    let ciphertext = crypto::encrypt_secret(&plaintext, crypto::get_credential_key())?;
    let credential_ref = repository::replace(tenant, kind, ciphertext).await?;

    logger::log(
        "credentials",
        &format!(
            "Credentials stored: tenant={} marketplace={}",
            tenant.value(),
            kind.code()
        ),
    );
    Ok(credential_ref)
}

/// Прочитать и расшифровать учётные данные пары.
///
/// None означает, что записи нет. Ошибка расшифровки (смена ключа после
/// рестарта без настроенного credential_key) возвращается как Err.
pub async fn get(
    tenant: &TenantId,
    kind: MarketplaceKind,
) -> anyhow::Result<Option<MarketplaceCredentials>> {
    let Some(ciphertext) = repository::get_ciphertext(tenant, kind).await? else {
        return Ok(None);
    };
    let plaintext = crypto::decrypt_secret(&ciphertext, crypto::get_credential_key())
        .context("Stored credentials cannot be decrypted")?;
    let credentials = serde_json::from_str(&plaintext)?;
    Ok(Some(credentials))
}

/// Удалить учётные данные пары. Идемпотентно.
pub async fn delete(tenant: &TenantId, kind: MarketplaceKind) -> anyhow::Result<()> {
    let removed = repository::delete(tenant, kind).await?;
    if removed {
        logger::log(
            "credentials",
            &format!(
                "Credentials deleted: tenant={} marketplace={}",
                tenant.value(),
                kind.code()
            ),
        );
    }
    Ok(())
}
