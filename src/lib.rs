// Library interface for ReadyRS modules
// This allows integration tests and benches to access the core functionality

pub mod calibration;
pub mod config;
pub mod decay;
pub mod error;
pub mod export;
pub mod forecast;
pub mod hooper;
pub mod impulse;
pub mod logging;
pub mod models;
pub mod pmc;
pub mod recovery;
pub mod service;
pub mod store;
pub mod wellness;

// Re-export commonly used types for convenience
pub use models::*;
pub use config::AppConfig;
pub use error::{ReadyRsError, Result};
pub use forecast::{ForecastPoint, Forecaster, TrainingRecommendation};
pub use hooper::{HooperAssessment, HooperBand, HooperRecord};
pub use impulse::{DecayParameters, Impulse, ImpulseGenerator, ImpulseParameterSet};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use pmc::{PmcCalculator, PmcMetrics, TsbTier};
pub use recovery::{RecoveryComponents, RecoveryEstimator, RecoveryScore};
pub use service::ReadinessService;
pub use store::{EventStore, FactorCatalog, InMemoryStore, ParameterStore};
pub use wellness::{WellnessAggregator, WellnessResult};
