use crate::error::AirshedError;
use crate::table::observation_frame::ObservationFrame;
use crate::types::metric::Metric;
use crate::types::observation::WeatherGroup;
use std::collections::BTreeMap;

/// Non-missing values of `metric` in `subset`, grouped by weather group.
///
/// Groups iterate in [`WeatherGroup`] order. A group appears only if it holds at least
/// one value; within a group, values keep the subset's row order.
pub fn metric_by_weather_group(
    subset: &ObservationFrame,
    metric: Metric,
) -> Result<BTreeMap<WeatherGroup, Vec<f64>>, AirshedError> {
    let groups = subset.weather_groups()?;
    let values = subset.metric_values(metric)?;

    let mut by_group: BTreeMap<WeatherGroup, Vec<f64>> = BTreeMap::new();
    for (group, value) in groups.into_iter().zip(values) {
        if let Some(value) = value {
            by_group.entry(group).or_default().push(value);
        }
    }
    Ok(by_group)
}
