pub mod config;
pub mod corpus;
pub mod error;
pub mod geometry;
pub mod heatmap;
pub mod labels;
pub mod output;
pub mod page;
pub mod pipeline;
pub mod segmentation;
