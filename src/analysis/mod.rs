pub mod graham_screener;

pub use graham_screener::{GrahamScreener, Ratio, Valuation, YearSeries};
