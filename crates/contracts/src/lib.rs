//! Контракты данных, разделяемые backend-сервисом и клиентами консоли:
//! агрегаты, перечисления, DTO запросов/ответов и модели дашбордов.

pub mod dashboards;
pub mod domain;
pub mod enums;
pub mod shared;
pub mod usecases;
