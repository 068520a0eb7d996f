mod aggregate;
mod completeness;
mod marketing_source;
mod normalize;
mod order_source;
mod output;
mod pipeline;
mod ranking;
mod roi;
mod run;

pub use run::run;
