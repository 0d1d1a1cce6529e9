use std::cmp::Ordering;

use tracing::trace;

use crate::config::Config;
use crate::feature::Candidate;
use crate::field::{self, ScalarField};
use crate::maps::PerceptualMaps;
use crate::regions::find_regions;

/// Turns the combined skin and foreground evidence into ordered candidates
pub struct Detector {
    blur_size: usize,
    blur_threshold: f32,
    min_region_area: usize,
    max_candidates: usize,
}

impl Detector {
    pub fn new(config: &Config) -> Self {
        Detector {
            blur_size: config.blur_size,
            blur_threshold: config.blur_threshold,
            min_region_area: config.min_region_area,
            max_candidates: config.max_candidates,
        }
    }

    /// Skin that is also foreground
    pub fn combine(maps: &PerceptualMaps) -> ScalarField {
        field::product(&maps.foreground, &maps.skin)
    }

    pub fn detect(&self, maps: &PerceptualMaps) -> Vec<Candidate> {
        self.extract(&Self::combine(maps))
    }

    /// Candidates widest first. Equal widths keep raster order, so the
    /// output is deterministic for a given field. At most `max_candidates`
    /// are returned when that is non-zero.
    pub fn extract(&self, combined: &ScalarField) -> Vec<Candidate> {
        // smoothing removes speckle before the regions are cut out
        let mask = field::threshold(&field::box_blur(combined, self.blur_size), self.blur_threshold);

        let mut candidates: Vec<Candidate> = find_regions(&mask, 0.5)
            .iter()
            .filter(|region| region.area >= self.min_region_area)
            .filter_map(|region| match Candidate::try_from(region) {
                Ok(candidate) => Some(candidate),
                Err(err) => {
                    trace!("skipping region: {err}");
                    None
                }
            })
            .collect();

        candidates.sort_by(|a, b| b.extent().partial_cmp(&a.extent()).unwrap_or(Ordering::Equal));
        if self.max_candidates > 0 {
            candidates.truncate(self.max_candidates);
        }
        candidates
    }
}
