//! Шлюз записи для пары (tenant, marketplace_kind).
//!
//! Полная синхронизация и применение webhook-событий пишут в одни и те же
//! таблицы товаров и заказов. Чтобы они не перемешивали частичные состояния,
//! обе стороны берут мьютекс пары на время фазы записи. Чтение дашбордов
//! шлюз не трогает.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use contracts::domain::common::TenantId;
use contracts::enums::MarketplaceKind;
use once_cell::sync::Lazy;

static GATES: Lazy<Mutex<HashMap<(TenantId, MarketplaceKind), Arc<tokio::sync::Mutex<()>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

static CANCEL_FLAGS: Lazy<Mutex<HashMap<(TenantId, MarketplaceKind), Arc<AtomicBool>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Мьютекс фазы записи для пары. Держать только на время записи в БД,
/// не через вызовы адаптера.
pub fn write_gate(tenant: &TenantId, kind: MarketplaceKind) -> Arc<tokio::sync::Mutex<()>> {
    let mut gates = match GATES.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    gates
        .entry((*tenant, kind))
        .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
        .clone()
}

/// Флаг кооперативной отмены синхронизации пары.
///
/// Синхронизация сбрасывает флаг на старте и проверяет его между шагами;
/// отключение подключения выставляет его через request_cancel.
pub fn cancel_flag(tenant: &TenantId, kind: MarketplaceKind) -> Arc<AtomicBool> {
    let mut flags = match CANCEL_FLAGS.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    flags
        .entry((*tenant, kind))
        .or_insert_with(|| Arc::new(AtomicBool::new(false)))
        .clone()
}

/// Запросить отмену текущей синхронизации пары
pub fn request_cancel(tenant: &TenantId, kind: MarketplaceKind) {
    cancel_flag(tenant, kind).store(true, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_pair_shares_one_gate() {
        let tenant = TenantId::new_v4();
        let a = write_gate(&tenant, MarketplaceKind::Ozon);
        let b = write_gate(&tenant, MarketplaceKind::Ozon);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn different_pairs_get_independent_gates() {
        let tenant = TenantId::new_v4();
        let other = TenantId::new_v4();
        let a = write_gate(&tenant, MarketplaceKind::Ozon);
        let b = write_gate(&tenant, MarketplaceKind::Wildberries);
        let c = write_gate(&other, MarketplaceKind::Ozon);
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn request_cancel_raises_the_pair_flag_only() {
        let tenant = TenantId::new_v4();
        let flag = cancel_flag(&tenant, MarketplaceKind::Ozon);
        assert!(!flag.load(Ordering::SeqCst));

        request_cancel(&tenant, MarketplaceKind::Ozon);
        assert!(flag.load(Ordering::SeqCst));
        assert!(!cancel_flag(&tenant, MarketplaceKind::Wildberries).load(Ordering::SeqCst));

        flag.store(false, Ordering::SeqCst);
        assert!(!cancel_flag(&tenant, MarketplaceKind::Ozon).load(Ordering::SeqCst));
    }
}
