use serde::{Serialize, Deserialize};

use crate::errors::*;

/// Number of entities not yet absorbed, as a right-continuous step function.
///
/// The first point is `(0, initial_size)`; each later point is a time at which
/// one or more absorptions happened and the count just after them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliveCurve {
    points: Vec<(f64, usize)>,
}

impl AliveCurve {
    /// Fails if there are more absorption times than entities.
    pub fn new(initial_size: usize, absorption_times: &[f64]) -> Result<Self> {
        if absorption_times.len() > initial_size {
            return Err(Error::InconsistentOutcome(format!(
                "{} absorptions among {} entities", absorption_times.len(), initial_size
            )));
        }
        let mut times = absorption_times.to_vec();
        times.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let mut points = Vec::with_capacity(times.len() + 1);
        points.push((0.0, initial_size));
        let mut count = initial_size;
        for t in times {
            count -= 1;
            match points.last_mut() {
                Some(last) if last.0 == t => last.1 = count,
                _ => points.push((t, count)),
            }
        }

        Ok(Self { points })
    }

    pub fn points(&self) -> &[(f64, usize)] {
        &self.points
    }

    pub fn initial_size(&self) -> usize {
        self.points[0].1
    }

    pub fn final_count(&self) -> usize {
        self.points[self.points.len() - 1].1
    }

    pub fn count_at(&self, t: f64) -> usize {
        let mut count = self.initial_size();
        for (time, c) in &self.points {
            if *time > t {
                break;
            }
            count = *c;
        }
        count
    }

    /// Integral of the count over `[0, until]`: total entity-time alive.
    pub fn area(&self, until: f64) -> f64 {
        let mut area = 0.0;
        for (i, (time, count)) in self.points.iter().enumerate() {
            if *time >= until {
                break;
            }
            let end = match self.points.get(i + 1) {
                Some((next_time, _)) => next_time.min(until),
                None => until,
            };
            area += *count as f64 * (end - time);
        }
        area
    }
}
