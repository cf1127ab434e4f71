pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::config::Config;
use crate::database::store::MemoryStore;
use crate::error::Result;
use crate::services::{
    analytics_service::AnalyticsService,
    grading_service::GradingService,
    payment_gateway::{PaymentGateway, SandboxPaymentGateway},
    progress_service::ProgressService,
    question_service::QuestionService,
    session_service::SessionService,
    subscription_service::SubscriptionService,
};
use crate::utils::random::{RandomSource, SeededRandom};
use crate::utils::time::{Clock, SystemClock};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub question_service: QuestionService,
    pub grading_service: GradingService,
    pub session_service: SessionService,
    pub progress_service: ProgressService,
    pub analytics_service: AnalyticsService,
    pub subscription_service: SubscriptionService,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self> {
        let random: Arc<dyn RandomSource> = match config.grading_seed {
            Some(seed) => Arc::new(SeededRandom::from_seed(seed)),
            None => Arc::new(SeededRandom::from_entropy()),
        };
        Self::with_parts(
            config,
            Arc::new(SystemClock),
            random,
            Arc::new(SandboxPaymentGateway),
        )
    }

    /// Wires every service over fresh in-memory stores.
    pub fn with_parts(
        config: &Config,
        clock: Arc<dyn Clock>,
        random: Arc<dyn RandomSource>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Result<Self> {
        let question_service = QuestionService::builtin()?;
        let grading_service = GradingService::new(random);
        let progress_service = ProgressService::new(Arc::new(MemoryStore::new()), clock.clone());
        let analytics_service = AnalyticsService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
            clock.clone(),
        );
        let session_service = SessionService::new(
            Arc::new(MemoryStore::new()),
            question_service.clone(),
            grading_service.clone(),
            progress_service.clone(),
            analytics_service.clone(),
            clock.clone(),
            config.strict_answer_submission,
        );
        let subscription_service = SubscriptionService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
            gateway,
            clock,
        );

        Ok(Self {
            config: Arc::new(config.clone()),
            question_service,
            grading_service,
            session_service,
            progress_service,
            analytics_service,
            subscription_service,
        })
    }
}
