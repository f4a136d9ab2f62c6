pub mod entity;
pub mod orchestrator;
pub mod translator;
pub mod use_case;

pub use entity::{CompletionTickerStrategy, DollarTickerStrategy, EntityStrategy, TickerStrategyKind};
pub use orchestrator::{filter_and_sort_by_age, filter_and_sort_by_age_at, SearchOrchestrator};
pub use translator::{PromptTranslator, Translation};
pub use use_case::{AnalyzeResponse, AnalyzeUseCase, ReplayResponse};

#[cfg(test)]
pub(crate) mod test_support;
