//! The coordinator between the presentation layer and the derived views.
//!
//! All derived views are recomputed from scratch by [`recompute`], a pure function of an
//! [`EngineContext`] and a [`FilterState`]. The [`Engine`] wraps that function with a
//! generation counter: every submitted filter state and every table reload takes a new
//! generation, and only a result carrying the current generation may be published.
//! Results of superseded requests are discarded, so consumers only ever observe views
//! matching the latest filter state.

use crate::analysis::aggregate::{aggregate_cities, AggregateReport};
use crate::analysis::completeness::{summarize_city, CitySummary};
use crate::analysis::density::{density_histogram, DensityHistogram};
use crate::analysis::weather_groups::metric_by_weather_group;
use crate::analysis::wind_rose::{circular_histogram, CircularHistogram};
use crate::config::EngineConfig;
use crate::error::AirshedError;
use crate::filter_state::FilterState;
use crate::filtering::{time_window_filter, Scope};
use crate::table::observation_frame::ObservationFrame;
use crate::table::observation_table::ObservationTable;
use crate::types::city::CityDirectory;
use crate::types::observation::WeatherGroup;
use bon::bon;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Everything the derived views are computed from: the table, the city metadata and the
/// configuration. A context is immutable; reloading data means building a new one.
#[derive(Debug, Clone)]
pub struct EngineContext {
    table: ObservationTable,
    cities: CityDirectory,
    config: EngineConfig,
    num_years: u32,
}

#[bon]
impl EngineContext {
    /// Validates `config` and derives the number of years used for completeness.
    ///
    /// The year count is the table's first-through-last year span unless
    /// [`EngineConfig::num_years_override`] is set. Duplicate timestamps are logged as a
    /// data-quality warning but do not fail construction.
    ///
    /// ```rust
    /// use airshed::{CityDirectory, EngineConfig, EngineContext, ObservationTable};
    ///
    /// let context = EngineContext::builder()
    ///     .table(ObservationTable::from_observations(&[]).unwrap())
    ///     .cities(CityDirectory::default())
    ///     .config(EngineConfig::builder().num_years_override(5).build())
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(context.num_years(), 5);
    /// ```
    #[builder]
    pub fn new(
        table: ObservationTable,
        cities: CityDirectory,
        #[builder(default)] config: EngineConfig,
    ) -> Result<Self, AirshedError> {
        config.validate()?;
        let num_years = match config.num_years_override {
            Some(years) => years.max(1),
            None => table.num_years()?,
        };
        for duplicate in table.duplicate_timestamps()? {
            warn!(
                "City '{}' has {} duplicate timestamps; completeness may exceed 100%",
                duplicate.city, duplicate.duplicates
            );
        }
        Ok(Self {
            table,
            cities,
            config,
            num_years,
        })
    }
}

impl EngineContext {
    pub fn table(&self) -> &ObservationTable {
        &self.table
    }

    pub fn cities(&self) -> &CityDirectory {
        &self.cities
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Years used as the multi-year and monthly completeness multiplier.
    pub fn num_years(&self) -> u32 {
        self.num_years
    }

    /// Same metadata and configuration over a different table.
    pub fn with_table(&self, table: ObservationTable) -> Result<Self, AirshedError> {
        Self::builder()
            .table(table)
            .cities(self.cities.clone())
            .config(self.config.clone())
            .build()
    }
}

/// All outputs the presentation layer consumes for one filter state.
#[derive(Debug, Clone)]
pub struct DerivedViews {
    pub filter: FilterState,
    /// Per-city means over all cities, for the map.
    pub aggregates: AggregateReport,
    /// Rows of the selected city; empty when no city is selected.
    pub city_subset: ObservationFrame,
    /// Row count and completeness of the selected city.
    pub summary: Option<CitySummary>,
    pub wind_rose: CircularHistogram,
    pub density: DensityHistogram,
    /// Values of the selected metric in the city subset, by weather group.
    pub weather_groups: BTreeMap<WeatherGroup, Vec<f64>>,
}

/// Recomputes every derived view of `filter` over `context`.
///
/// The result depends only on the two inputs: calling it twice with equal inputs gives
/// equal views.
pub fn recompute(
    context: &EngineContext,
    filter: &FilterState,
) -> Result<DerivedViews, AirshedError> {
    let config = context.config();
    let all_cities = time_window_filter(context.table(), filter, Scope::AllCities)?;
    let city_subset = time_window_filter(context.table(), filter, Scope::SingleCity)?;

    let aggregates = aggregate_cities(&all_cities, context.cities())?;
    let summary = summarize_city(&city_subset, filter, context.num_years());
    let wind_rose = circular_histogram(&city_subset, config.n_sectors, &config.speed_cut_points)?;
    let density = density_histogram(
        &city_subset,
        config.density_x,
        config.density_y,
        config.density_bins,
    )?;
    let weather_groups = metric_by_weather_group(&city_subset, filter.selected_metric())?;

    debug!(
        "Recomputed views: {} rows in window, {} cities aggregated, {} rows for {}",
        all_cities.height(),
        aggregates.rows.len(),
        city_subset.height(),
        filter.selected_city().unwrap_or("<no city>")
    );

    Ok(DerivedViews {
        filter: filter.clone(),
        aggregates,
        city_subset,
        summary,
        wind_rose,
        density,
        weather_groups,
    })
}

/// Derived views stamped with the generation of the request that produced them.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub generation: u64,
    pub views: DerivedViews,
}

/// A pending recomputation: a filter state bound to the context and generation that were
/// current when it was submitted.
#[derive(Debug, Clone)]
pub struct Ticket {
    generation: u64,
    context: Arc<EngineContext>,
    filter: FilterState,
}

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    /// Runs the recomputation. Safe to call off the thread that submitted the ticket.
    pub fn compute(&self) -> Result<Snapshot, AirshedError> {
        Ok(Snapshot {
            generation: self.generation,
            views: recompute(&self.context, &self.filter)?,
        })
    }
}

/// Owns the current [`EngineContext`] and the latest published [`Snapshot`].
///
/// ```rust
/// use airshed::{AveragingMode, Engine, EngineContext, FilterState, ObservationTable};
///
/// let context = EngineContext::builder()
///     .table(ObservationTable::from_observations(&[]).unwrap())
///     .cities(Default::default())
///     .build()
///     .unwrap();
/// let engine = Engine::new(context);
///
/// let filter = FilterState::builder()
///     .averaging_mode(AveragingMode::MultiYear)
///     .build()
///     .unwrap();
/// let snapshot = engine.apply(filter).unwrap().unwrap();
/// assert!(snapshot.views.aggregates.rows.is_empty());
/// assert!(snapshot.views.summary.is_none());
/// ```
#[derive(Debug)]
pub struct Engine {
    context: RwLock<Arc<EngineContext>>,
    generation: AtomicU64,
    latest: Mutex<Option<Arc<Snapshot>>>,
}

impl Engine {
    pub fn new(context: EngineContext) -> Self {
        Self {
            context: RwLock::new(Arc::new(context)),
            generation: AtomicU64::new(0),
            latest: Mutex::new(None),
        }
    }

    /// The context new tickets are computed against.
    pub fn context(&self) -> Arc<EngineContext> {
        self.context
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The most recently issued generation.
    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Replaces the table in one step, keeping metadata and configuration.
    ///
    /// Tickets issued before the reload become stale. The previously published snapshot
    /// stays readable until the next result is published.
    pub fn reload_table(&self, table: ObservationTable) -> Result<(), AirshedError> {
        let next = Arc::new(self.context().with_table(table)?);
        let rows = next.table().height();
        let mut context = self.context.write().unwrap_or_else(PoisonError::into_inner);
        *context = next;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!("Swapped in a table of {} rows (generation {})", rows, generation);
        Ok(())
    }

    /// Registers `filter` as the latest request and returns the ticket to compute it.
    pub fn submit(&self, filter: FilterState) -> Ticket {
        let context = self.context.read().unwrap_or_else(PoisonError::into_inner);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        Ticket {
            generation,
            context: Arc::clone(&context),
            filter,
        }
    }

    /// Publishes `snapshot` if it belongs to the latest generation.
    ///
    /// Returns the published snapshot, or `None` when a newer request or a table reload
    /// has superseded it.
    pub fn publish(&self, snapshot: Snapshot) -> Option<Arc<Snapshot>> {
        let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.current_generation();
        if snapshot.generation != current {
            warn!(
                "Discarding stale result of generation {} (current is {})",
                snapshot.generation, current
            );
            return None;
        }
        let snapshot = Arc::new(snapshot);
        *latest = Some(Arc::clone(&snapshot));
        Some(snapshot)
    }

    /// Submits, computes and publishes `filter` in one call.
    ///
    /// `Ok(None)` means another request overtook this one while it was computing.
    pub fn apply(&self, filter: FilterState) -> Result<Option<Arc<Snapshot>>, AirshedError> {
        let ticket = self.submit(filter);
        let snapshot = ticket.compute()?;
        Ok(self.publish(snapshot))
    }

    /// The latest published snapshot, if any.
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter_state::{AveragingMode, PeriodValue};
    use crate::test_fixtures::{fixture_directory, fixture_table, obs};
    use crate::types::calendar::Month;
    use crate::types::metric::Metric;

    fn context() -> EngineContext {
        EngineContext::builder()
            .table(fixture_table())
            .cities(fixture_directory())
            .build()
            .unwrap()
    }

    fn multi_year(city: Option<&str>) -> FilterState {
        FilterState::builder()
            .averaging_mode(AveragingMode::MultiYear)
            .maybe_selected_city(city)
            .build()
            .unwrap()
    }

    #[test]
    fn test_context_derives_num_years_from_table() {
        assert_eq!(context().num_years(), 2);

        let overridden = EngineContext::builder()
            .table(fixture_table())
            .cities(fixture_directory())
            .config(EngineConfig::builder().num_years_override(5).build())
            .build()
            .unwrap();
        assert_eq!(overridden.num_years(), 5);
    }

    #[test]
    fn test_context_rejects_invalid_config() {
        let result = EngineContext::builder()
            .table(fixture_table())
            .cities(fixture_directory())
            .config(EngineConfig::builder().n_sectors(0).build())
            .build();
        assert!(matches!(result, Err(AirshedError::Config(_))));
    }

    #[test]
    fn test_recompute_single_city() {
        let views = recompute(&context(), &multi_year(Some("austin"))).unwrap();

        assert_eq!(views.aggregates.rows.len(), 2);
        assert_eq!(views.aggregates.missing_metadata, vec!["Ghost Town".to_string()]);
        assert_eq!(views.city_subset.height(), 27);

        let summary = views.summary.unwrap();
        assert_eq!(summary.observation_count, 27);
        assert_eq!(summary.expected_count, 365 * 24 * 2);
        assert_eq!(summary.completeness_percent, 0.2);

        // Default rows blow from 180° at 5 mph: sector 8 of 16, bucket 3.
        assert_eq!(views.wind_rose.total(), 27);
        assert_eq!(views.wind_rose.count(8, 3), 27);
        assert_eq!(views.density.total, 27);
        assert_eq!(views.weather_groups[&WeatherGroup::Clear].len(), 27);
    }

    #[test]
    fn test_recompute_without_selection_yields_empty_city_views() {
        let views = recompute(&context(), &multi_year(None)).unwrap();
        assert_eq!(views.aggregates.rows.len(), 2);
        assert!(views.city_subset.is_empty());
        assert!(views.summary.is_none());
        assert!(views.wind_rose.is_empty());
        assert_eq!(views.wind_rose.cells().count(), 16 * 8);
        assert!(views.density.is_empty());
        assert!(views.weather_groups.is_empty());
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let context = context();
        let filter = FilterState::builder()
            .averaging_mode(AveragingMode::Monthly)
            .period_value(PeriodValue::Month(Month::February))
            .hour_start(6)
            .hour_end(12)
            .selected_city("Austin")
            .selected_metric(Metric::Ozone)
            .build()
            .unwrap();

        let first = recompute(&context, &filter).unwrap();
        let second = recompute(&context, &filter).unwrap();
        assert_eq!(first.aggregates, second.aggregates);
        assert_eq!(first.summary, second.summary);
        assert_eq!(first.wind_rose, second.wind_rose);
        assert_eq!(first.density, second.density);
        assert_eq!(first.weather_groups, second.weather_groups);
        assert!(first
            .city_subset
            .frame()
            .equals_missing(second.city_subset.frame()));
        assert_eq!(first.city_subset.height(), 2);
    }

    #[test]
    fn test_stale_result_is_discarded() {
        let engine = Engine::new(context());
        let older = engine.submit(multi_year(Some("Austin")));
        let newer = engine.submit(multi_year(Some("Boston")));

        let newer_snapshot = newer.compute().unwrap();
        let older_snapshot = older.compute().unwrap();

        assert!(engine.publish(older_snapshot).is_none());
        assert!(engine.latest().is_none());

        let published = engine.publish(newer_snapshot).unwrap();
        assert_eq!(published.generation, newer.generation());
        assert_eq!(published.views.summary.as_ref().unwrap().city, "Boston");
        assert_eq!(engine.latest().unwrap().generation, newer.generation());
    }

    #[test]
    fn test_apply_publishes_latest() {
        let engine = Engine::new(context());
        let first = engine.apply(multi_year(Some("Austin"))).unwrap().unwrap();
        let second = engine.apply(multi_year(Some("Boston"))).unwrap().unwrap();
        assert!(second.generation > first.generation);
        assert_eq!(
            engine.latest().unwrap().views.filter.selected_city(),
            Some("Boston")
        );
    }

    #[test]
    fn test_reload_swaps_table_and_invalidates_pending() {
        let engine = Engine::new(context());
        engine.apply(multi_year(Some("Austin"))).unwrap();
        let pending = engine.submit(multi_year(Some("Austin")));

        let replacement =
            ObservationTable::from_observations(&[obs("Austin", 2021, 1, 1, 0)]).unwrap();
        engine.reload_table(replacement).unwrap();

        let stale = pending.compute().unwrap();
        assert_eq!(stale.views.city_subset.height(), 27);
        assert!(engine.publish(stale).is_none());
        assert_eq!(
            engine.latest().unwrap().views.city_subset.height(),
            27,
            "previous snapshot stays readable"
        );

        let fresh = engine.apply(multi_year(Some("Austin"))).unwrap().unwrap();
        assert_eq!(fresh.views.city_subset.height(), 1);
        assert_eq!(engine.context().num_years(), 1);
        assert_eq!(engine.context().cities().len(), 3);
    }
}
