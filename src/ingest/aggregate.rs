//! Pure aggregation over validated equipment rows.

use super::EquipmentRecord;

/// Summary statistics for one upload, ready for persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub total_count: i64,
    pub avg_flowrate: f64,
    pub avg_pressure: f64,
    pub avg_temperature: f64,
    /// Per-type counts in first-seen order from the source rows.
    pub type_counts: Vec<(String, i64)>,
}

/// Computes count, three arithmetic means and the per-type distribution.
///
/// An empty upload reports all averages as 0 rather than dividing by zero.
pub fn summarize(records: &[EquipmentRecord]) -> Aggregate {
    let total_count = records.len() as i64;

    let (mut flow_sum, mut pressure_sum, mut temperature_sum) = (0.0, 0.0, 0.0);
    let mut type_counts: Vec<(String, i64)> = Vec::new();

    for record in records {
        flow_sum += record.flowrate;
        pressure_sum += record.pressure;
        temperature_sum += record.temperature;

        match type_counts
            .iter_mut()
            .find(|(name, _)| *name == record.equipment_type)
        {
            Some((_, count)) => *count += 1,
            None => type_counts.push((record.equipment_type.clone(), 1)),
        }
    }

    let mean = |sum: f64| {
        if total_count == 0 {
            0.0
        } else {
            sum / total_count as f64
        }
    };

    Aggregate {
        total_count,
        avg_flowrate: mean(flow_sum),
        avg_pressure: mean(pressure_sum),
        avg_temperature: mean(temperature_sum),
        type_counts,
    }
}
