use std::ops::Range;

use chrono::NaiveDate;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::aligned::AlignedDataset;
use crate::domain::calendar::days_inclusive;
use crate::domain::records::{MeterRecord, TelemetryRecord};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResamplingError {
    #[error("relative sigma must be finite and positive, got {0}")]
    InvalidSigma(f64),
}

/// How each Monte Carlo draw resamples the aligned dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum ResamplingScheme {
    #[default]
    /// Whole calendar days drawn with replacement. Telemetry and meter
    /// records of a sampled day travel together.
    DailyBlockBootstrap,
    /// Every day kept once; the meter series is scaled by a single
    /// `Normal(1, relative_sigma)` factor per draw, floored at zero.
    MeterPerturbation { relative_sigma: f64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DayBlock {
    date: NaiveDate,
    telemetry: Range<usize>,
    meter: Range<usize>,
}

/// Index of the record ranges belonging to each day of the aligned window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyBlocks {
    days: Vec<DayBlock>,
}

impl DailyBlocks {
    pub fn new(dataset: &AlignedDataset) -> Self {
        let mut telemetry_cursor = 0;
        let mut meter_cursor = 0;
        let days = days_inclusive(dataset.start_date(), dataset.effective_end)
            .map(|date| {
                let telemetry = advance_through(&dataset.telemetry, &mut telemetry_cursor, date, |r| {
                    r.timestamp.date()
                });
                let meter =
                    advance_through(&dataset.meter, &mut meter_cursor, date, |r| r.timestamp.date());
                DayBlock {
                    date,
                    telemetry,
                    meter,
                }
            })
            .collect();
        Self { days }
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn date(&self, day: usize) -> Option<NaiveDate> {
        self.days.get(day).map(|block| block.date)
    }
}

fn advance_through<T>(
    records: &[T],
    cursor: &mut usize,
    date: NaiveDate,
    date_of: impl Fn(&T) -> NaiveDate,
) -> Range<usize> {
    while *cursor < records.len() && date_of(&records[*cursor]) < date {
        *cursor += 1;
    }
    let start = *cursor;
    while *cursor < records.len() && date_of(&records[*cursor]) == date {
        *cursor += 1;
    }
    start..*cursor
}

/// One draw: a list of day indices into the shared dataset plus a meter
/// scale. The dataset itself is only read.
#[derive(Debug, Clone)]
pub struct AlignedResample<'a> {
    dataset: &'a AlignedDataset,
    blocks: &'a DailyBlocks,
    picks: Vec<usize>,
    meter_scale: f64,
}

impl<'a> AlignedResample<'a> {
    pub fn new(
        dataset: &'a AlignedDataset,
        blocks: &'a DailyBlocks,
        picks: Vec<usize>,
        meter_scale: f64,
    ) -> Self {
        Self {
            dataset,
            blocks,
            picks,
            meter_scale,
        }
    }

    pub fn day_count(&self) -> usize {
        self.picks.len()
    }

    pub fn picks(&self) -> &[usize] {
        &self.picks
    }

    pub fn meter_scale(&self) -> f64 {
        self.meter_scale
    }

    pub fn telemetry(&self) -> impl Iterator<Item = &'a TelemetryRecord> + '_ {
        let dataset = self.dataset;
        self.blocks_iter()
            .flat_map(move |block| dataset.telemetry[block.telemetry.clone()].iter())
    }

    /// Meter records of the sampled days with the draw's scale applied.
    pub fn meter(&self) -> impl Iterator<Item = MeterRecord> + '_ {
        let dataset = self.dataset;
        let scale = self.meter_scale;
        self.blocks_iter().flat_map(move |block| {
            dataset.meter[block.meter.clone()].iter().map(move |record| MeterRecord {
                energy_kwh: record.energy_kwh.map(|energy| energy * scale),
                ..*record
            })
        })
    }

    fn blocks_iter(&self) -> impl Iterator<Item = &'a DayBlock> + '_ {
        let blocks = self.blocks;
        self.picks.iter().filter_map(move |day| blocks.days.get(*day))
    }
}

/// Produces independent resamples of one aligned dataset.
#[derive(Debug, Clone)]
pub struct Resampler<'a> {
    dataset: &'a AlignedDataset,
    blocks: DailyBlocks,
    scheme: ResamplingScheme,
    perturbation: Option<Normal<f64>>,
}

impl<'a> Resampler<'a> {
    pub fn new(dataset: &'a AlignedDataset, scheme: ResamplingScheme) -> Result<Self, ResamplingError> {
        let perturbation = match scheme {
            ResamplingScheme::DailyBlockBootstrap => None,
            ResamplingScheme::MeterPerturbation { relative_sigma } => {
                if !(relative_sigma.is_finite() && relative_sigma > 0.0) {
                    return Err(ResamplingError::InvalidSigma(relative_sigma));
                }
                Some(
                    Normal::new(1.0, relative_sigma)
                        .map_err(|_| ResamplingError::InvalidSigma(relative_sigma))?,
                )
            }
        };
        Ok(Self {
            dataset,
            blocks: DailyBlocks::new(dataset),
            scheme,
            perturbation,
        })
    }

    pub fn scheme(&self) -> ResamplingScheme {
        self.scheme
    }

    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> AlignedResample<'_> {
        let day_count = self.blocks.len();
        let (picks, meter_scale) = match self.perturbation {
            None => {
                let picks = (0..day_count).map(|_| rng.gen_range(0..day_count)).collect();
                (picks, 1.0)
            }
            Some(normal) => ((0..day_count).collect(), normal.sample(rng).max(0.0)),
        };
        AlignedResample::new(self.dataset, &self.blocks, picks, meter_scale)
    }
}
