use super::{EntityMetadata, Origin};

/// Трейт для корня агрегата
///
/// Определяет обязательные методы и метаданные для всех агрегатов системы
pub trait AggregateRoot {
    /// Тип идентификатора агрегата
    type Id;

    // ============================================================================
    // Методы экземпляра (данные конкретной записи)
    // ============================================================================

    /// Получить ID записи
    fn id(&self) -> Self::Id;

    /// Получить бизнес-код записи
    fn code(&self) -> &str;

    /// Получить описание/название записи
    fn description(&self) -> &str;

    /// Получить метаданные жизненного цикла
    fn metadata(&self) -> &EntityMetadata;

    /// Получить изменяемые метаданные
    fn metadata_mut(&mut self) -> &mut EntityMetadata;

    // ============================================================================
    // Метаданные класса агрегата (статические данные)
    // ============================================================================

    /// Индекс агрегата в системе (например, "a001")
    fn aggregate_index() -> &'static str;

    /// Имя коллекции для БД (например, "marketplace_connection")
    fn collection_name() -> &'static str;

    /// Имя элемента для UI (единственное число, например, "Подключение")
    fn element_name() -> &'static str;

    /// Имя списка для UI (множественное число, например, "Подключения")
    fn list_name() -> &'static str;

    /// Источник данных агрегата
    fn origin() -> Origin;

    // ============================================================================
    // Методы с реализацией по умолчанию
    // ============================================================================

    /// Полное имя агрегата, оно же имя таблицы БД
    /// (например, "a001_marketplace_connection")
    fn full_name() -> String {
        format!("{}_{}", Self::aggregate_index(), Self::collection_name())
    }
}
