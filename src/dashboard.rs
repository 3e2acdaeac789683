// Dashboard - owns the data store, the UI state and the render epoch
//
// Every rebuild advances the epoch; a render pass carries the epoch it was
// built under, so renderers can drop passes that a newer rebuild superseded.

use crate::compare::{CompareAxis, Side};
use crate::config::DashboardConfig;
use crate::error::{DashboardError, Result};
use crate::filter::CriteriaUpdate;
use crate::records::{DataStore, FilterOptions};
use crate::view_model::{rebuild_view_model, DashboardState, ViewModel};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

// ============================================================================
// RENDER EPOCH
// ============================================================================

/// Monotonic counter shared between the dashboard and the passes it hands out.
#[derive(Debug, Clone, Default)]
pub struct RenderEpoch {
    current: Arc<AtomicU64>,
}

impl RenderEpoch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::Acquire)
    }

    /// Invalidate everything issued so far
    pub fn advance(&self) -> u64 {
        self.current.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Advance and hand out a token for the new epoch
    pub fn next_token(&self) -> EpochToken {
        EpochToken {
            epoch: self.advance(),
            source: Arc::clone(&self.current),
        }
    }
}

/// Snapshot of the epoch at the time a pass was built.
#[derive(Debug, Clone)]
pub struct EpochToken {
    epoch: u64,
    source: Arc<AtomicU64>,
}

impl EpochToken {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// False once a newer epoch has been issued
    pub fn is_current(&self) -> bool {
        self.source.load(Ordering::Acquire) == self.epoch
    }
}

/// One complete recomputation, tagged with its epoch.
#[derive(Debug, Clone)]
pub struct RenderPass {
    pub epoch: EpochToken,
    pub view: ViewModel,
}

impl RenderPass {
    pub fn is_stale(&self) -> bool {
        !self.epoch.is_current()
    }
}

// ============================================================================
// DASHBOARD
// ============================================================================

pub struct Dashboard {
    store: Option<DataStore>,
    options: FilterOptions,
    state: DashboardState,
    settings: DashboardConfig,
    epoch: RenderEpoch,
}

impl Dashboard {
    /// Empty dashboard; every rebuild fails with DataUnavailable until `load`.
    pub fn new(settings: DashboardConfig) -> Self {
        Dashboard {
            store: None,
            options: FilterOptions::default(),
            state: DashboardState::default(),
            settings,
            epoch: RenderEpoch::new(),
        }
    }

    pub fn with_store(settings: DashboardConfig, store: DataStore) -> Self {
        let mut dashboard = Self::new(settings);
        dashboard.load(store);
        dashboard
    }

    /// Install a data set and start over from the initial selection.
    pub fn load(&mut self, store: DataStore) {
        self.options = store.options();
        self.state = DashboardState::initial(
            &self.options,
            self.settings.default_top_n,
            self.settings.default_metric,
        );
        info!(
            records = store.len(),
            partners = self.options.partners.len(),
            years = self.options.years.len(),
            "dashboard data installed"
        );
        self.store = Some(store);
    }

    pub fn store(&self) -> Option<&DataStore> {
        self.store.as_ref()
    }

    pub fn options(&self) -> &FilterOptions {
        &self.options
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn settings(&self) -> &DashboardConfig {
        &self.settings
    }

    pub fn epoch(&self) -> &RenderEpoch {
        &self.epoch
    }

    // ------------------------------------------------------------------------
    // State transitions
    // ------------------------------------------------------------------------

    pub fn set_criteria<I>(&mut self, updates: I)
    where
        I: IntoIterator<Item = CriteriaUpdate>,
    {
        self.state.criteria.apply_updates(updates);
        self.changed("criteria");
    }

    pub fn enter_compare(&mut self, axis: CompareAxis) {
        let DashboardState { criteria, compare, .. } = &mut self.state;
        compare.enter_compare(axis, criteria, &self.options);
        self.changed("enter_compare");
    }

    pub fn exit_compare(&mut self) {
        self.state.compare.exit_compare();
        self.changed("exit_compare");
    }

    pub fn toggle_visibility(&mut self, side: Side) {
        self.state.compare.toggle_visibility(side);
        self.changed("visibility");
    }

    pub fn set_show_total(&mut self, on: bool) {
        self.state.line_toggles.set_total(on);
        self.changed("line_toggles");
    }

    pub fn set_show_breakdown(&mut self, on: bool) {
        self.state.line_toggles.set_breakdown(on);
        self.changed("line_toggles");
    }

    /// Back to the start-up selection for the loaded data.
    pub fn reset(&mut self) {
        self.state.reset(
            &self.options,
            self.settings.default_top_n,
            self.settings.default_metric,
        );
        self.changed("reset");
    }

    fn changed(&self, what: &str) {
        debug!(change = what, mode = ?self.state.compare.mode(), "dashboard state changed");
    }

    // ------------------------------------------------------------------------
    // Recompute
    // ------------------------------------------------------------------------

    /// Build the full view-model under a fresh epoch.
    pub fn rebuild_view_model(&self) -> Result<RenderPass> {
        let epoch = self.epoch.next_token();
        let view = rebuild_view_model(
            self.store.as_ref(),
            &self.state,
            &self.settings.distinguished_entity,
        )?;
        debug!(epoch = epoch.epoch(), mode = ?self.state.compare.mode(), "view-model rebuilt");
        Ok(RenderPass { epoch, view })
    }

    /// Shortcut for callers that only need the snapshot.
    pub fn view(&self) -> Result<ViewModel> {
        self.rebuild_view_model().map(|pass| pass.view)
    }

    pub fn require_store(&self) -> Result<&DataStore> {
        self.store
            .as_ref()
            .ok_or_else(|| DashboardError::DataUnavailable("no data set loaded".to_string()))
    }
}

// ============================================================================
// TESTS
// ============================================================================
