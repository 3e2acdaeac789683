// Trade-Flow Dashboard - Core Library
// Exposes all modules for use in the CLI, the terminal UI, and tests

pub mod error;
pub mod records;      // Flow records, entity table, option enumeration
pub mod loader;       // CSV ingestion with lenient coercion
pub mod filter;       // Filter Engine
pub mod aggregation;  // Aggregation Engine
pub mod compare;      // Compare State Machine
pub mod view_model;   // View-Model Builder
pub mod dashboard;    // Session state + render epoch
pub mod render;       // Renderer trait, JSON renderer
pub mod config;
pub mod logger;

// Re-export commonly used types
pub use error::{DashboardError, Result};
pub use records::{
    DataStore, EntityInfo, EntityLookup, FilterOptions, FlowRecord, PartnerOption,
};
pub use loader::{CsvLoader, LoadReport};
pub use filter::{
    coerce_top_n, ApplyOptions, CriteriaUpdate, FilterCriteria, FilterEngine, Metric, DEFAULT_TOP_N,
};
pub use aggregation::{AggregationEngine, RankedEntry, UsaSummary};
pub use compare::{
    labels_for, CompareAxis, CompareMode, CompareState, Side, Visibility,
};
pub use view_model::{
    format_compact, rebuild_view_model, BarEntry, CompareSide, CompareView, DashboardState, LineChart,
    LineSeries, LineToggles, MapLayout, MapPoint, MapSeries, MapSource, SingleView, UsaCard, ViewContent,
    ViewModel, ViewModelBuilder,
};
pub use dashboard::{Dashboard, EpochToken, RenderEpoch, RenderPass};
pub use render::{JsonRenderer, Renderer};
pub use config::{Config, DashboardConfig, DataConfig, LoggingConfig};
pub use logger::{init_from_config, init_logger, LogSink};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
