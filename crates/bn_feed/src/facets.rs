use bn_core::{Error, Facets, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

pub const COUNTRIES: &[&str] = &["in", "us", "gb"];

pub const CATEGORIES: &[&str] = &[
    "top",
    "politics",
    "technology",
    "sports",
    "entertainment",
    "business",
    "science",
    "health",
    "tourism",
    "world",
    "environment",
];

pub const CATEGORIES_PER_QUERY: usize = 3;

/// Chooses the facets for a fresh feed query.
pub trait FacetSampler: Send + Sync {
    fn sample(&self) -> Facets;
}

/// One random country and three distinct random categories per call, so
/// repeated runs spread across the pools instead of fetching the same slice.
pub struct RandomFacetSampler {
    rng: Mutex<StdRng>,
    countries: Vec<String>,
    categories: Vec<String>,
}

impl RandomFacetSampler {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Reproducible sampling for tests and replays.
    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
            countries: COUNTRIES.iter().map(|c| c.to_string()).collect(),
            categories: CATEGORIES.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn with_pools(mut self, countries: Vec<String>, categories: Vec<String>) -> Result<Self> {
        if countries.is_empty() || categories.is_empty() {
            return Err(Error::Config(
                "Facet pools must contain at least one country and one category".to_string(),
            ));
        }
        self.countries = countries;
        self.categories = categories;
        Ok(self)
    }
}

impl Default for RandomFacetSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl FacetSampler for RandomFacetSampler {
    fn sample(&self) -> Facets {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let country = self.countries[rng.gen_range(0..self.countries.len())].clone();
        let categories = self
            .categories
            .choose_multiple(&mut *rng, CATEGORIES_PER_QUERY)
            .cloned()
            .collect();
        Facets {
            country,
            categories,
        }
    }
}

/// Always returns the same facets.
pub struct FixedFacetSampler(pub Facets);

impl FacetSampler for FixedFacetSampler {
    fn sample(&self) -> Facets {
        self.0.clone()
    }
}
