pub mod facets;
pub mod manager;
pub mod newsdata;

pub use facets::{FacetSampler, FixedFacetSampler, RandomFacetSampler};
pub use manager::{
    ArticleOutcome, FailureStage, PipelineManager, PipelineOptions, RunReport, RunTrigger,
};
pub use newsdata::{FeedConfig, FeedSampler, DEFAULT_FEED_URL};

pub mod prelude {
    pub use super::facets::*;
    pub use super::manager::*;
    pub use super::newsdata::*;
    pub use bn_core::{FeedBatch, FeedSource, PageToken};
}
