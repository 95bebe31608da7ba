//! Financial and production figures derived from the proposal input.

use crate::model::{DerivedMetrics, PaybackYear, ProposalInput};

/// First schedule entry whose balance turned positive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Payback {
    pub year: u32,
    pub balance: f64,
}

pub fn total_investment(kit: f64, labor: f64) -> f64 {
    kit + labor
}

/// Scans the schedule in order and returns the first entry with `balance > 0`.
pub fn find_payback(schedule: &[PaybackYear]) -> Option<Payback> {
    schedule
        .iter()
        .find(|entry| entry.balance > 0.0)
        .map(|entry| Payback {
            year: entry.year,
            balance: entry.balance,
        })
}

/// Balance of the last schedule entry, `0` for an empty schedule.
pub fn cumulative_savings(schedule: &[PaybackYear]) -> f64 {
    schedule.last().map_or(0.0, |entry| entry.balance)
}

/// Generation attributed to a single module; `0` when there are no modules.
pub fn per_module_generation(total_kwh: f64, module_count: u32) -> f64 {
    if module_count == 0 {
        0.0
    } else {
        total_kwh / f64::from(module_count)
    }
}

/// Installed power in kWp.
pub fn system_power_kwp(module_count: u32, module_watts: u32) -> f64 {
    f64::from(module_count) * f64::from(module_watts) / 1000.0
}

/// Extracts the nominal wattage from a module description such as
/// `"620W Mono Honor Solar"` or `"Canadian 550 W"`.
pub fn module_watts(spec: &str) -> Option<u32> {
    let bytes = spec.as_bytes();
    let mut index = 0;
    while index < bytes.len() {
        if !bytes[index].is_ascii_digit() {
            index += 1;
            continue;
        }
        let start = index;
        while index < bytes.len() && bytes[index].is_ascii_digit() {
            index += 1;
        }
        let digits = &spec[start..index];
        let unit = spec[index..].trim_start();
        let is_watt = unit.starts_with(['W', 'w'])
            && !unit[1..].starts_with(|c: char| c.is_ascii_alphabetic());
        if is_watt {
            if let Ok(watts) = digits.parse::<u32>() {
                if watts > 0 {
                    return Some(watts);
                }
            }
        }
    }
    None
}

impl DerivedMetrics {
    pub fn from_input(input: &ProposalInput) -> Self {
        let payback = find_payback(&input.payback_schedule);
        Self {
            total_investment: total_investment(input.kit_investment, input.labor_investment),
            payback_year: payback.map(|p| p.year),
            payback_value: payback.map(|p| p.balance),
            cumulative_savings_25y: cumulative_savings(&input.payback_schedule),
        }
    }
}
