use crate::{
    accumulate::AccumulateError, aggregate::AggregateError, catalog::CatalogError,
    config::ConfigError, grid::GridError, intensity::IntensityError, pattern::PatternError,
    subtract::SubtractError,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Error in the `config` module")]
    Config(#[from] ConfigError),
    #[error("Error in the `grid` module")]
    Grid(#[from] GridError),
    #[error("Error in the `catalog` module")]
    Catalog(#[from] CatalogError),
    #[error("Error in the `pattern` module")]
    Pattern(#[from] PatternError),
    #[error("Error in the `accumulate` module")]
    Accumulate(#[from] AccumulateError),
    #[error("Error in the `aggregate` module")]
    Aggregate(#[from] AggregateError),
    #[error("Error in the `subtract` module")]
    Subtract(#[from] SubtractError),
    #[error("Error in the `intensity` module")]
    Intensity(#[from] IntensityError),
}
