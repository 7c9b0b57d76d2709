/// Метаданные UseCase для идентификации и документирования
pub trait UseCaseMetadata {
    /// Индекс UseCase (например, "u601")
    fn usecase_index() -> &'static str;

    /// Техническое имя (например, "sync_marketplace")
    fn usecase_name() -> &'static str;

    /// Отображаемое имя для UI (например, "Синхронизация маркетплейса")
    fn display_name() -> &'static str;

    /// Описание UseCase
    fn description() -> &'static str {
        ""
    }

    /// Полное имя вида "u601_sync_marketplace"
    fn full_name() -> String {
        format!("{}_{}", Self::usecase_index(), Self::usecase_name())
    }
}
