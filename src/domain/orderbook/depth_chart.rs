//! Depth-chart projection of a raw book.
//!
//! No row cap and no crossing resolution: the chart shows the ladder as the
//! feed has it.

use super::{BookLevel, OrderbookSnapshot};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DepthChartSeries {
    Bids,
    Asks,
}

/// A raw level tagged with the series it is drawn in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepthChartDatum {
    #[serde(flatten)]
    pub level: BookLevel,
    pub series: DepthChartSeries,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DepthChart {
    /// Bids, best (highest) first.
    pub bids: Vec<DepthChartDatum>,
    /// Asks, best (lowest) first.
    pub asks: Vec<DepthChartDatum>,
    pub lowest_bid: Option<DepthChartDatum>,
    pub highest_bid: Option<DepthChartDatum>,
    pub lowest_ask: Option<DepthChartDatum>,
    pub highest_ask: Option<DepthChartDatum>,
    pub mid_price: Option<Decimal>,
    /// `lowest ask - highest bid`, a missing side counting as zero.
    pub spread: Decimal,
    pub spread_percent: Option<Decimal>,
}

impl DepthChart {
    /// Both sides merged into one price-ascending sequence.
    pub fn series(&self) -> Vec<&DepthChartDatum> {
        let mut all: Vec<&DepthChartDatum> = self.bids.iter().rev().chain(self.asks.iter()).collect();
        all.sort_by(|a, b| a.level.price.cmp(&b.level.price));
        all
    }
}

pub fn depth_chart(snapshot: Option<&OrderbookSnapshot>) -> DepthChart {
    let Some(snapshot) = snapshot else {
        return DepthChart::default();
    };

    let tag = |levels: &[BookLevel], series: DepthChartSeries| -> Vec<DepthChartDatum> {
        levels
            .iter()
            .map(|level| DepthChartDatum {
                level: level.clone(),
                series,
            })
            .collect()
    };

    let bids = tag(&snapshot.bids, DepthChartSeries::Bids);
    let asks = tag(&snapshot.asks, DepthChartSeries::Asks);

    let highest_bid = bids.first().cloned();
    let lowest_bid = bids.last().cloned();
    let lowest_ask = asks.first().cloned();
    let highest_ask = asks.last().cloned();

    let price_or_zero = |datum: &Option<DepthChartDatum>| {
        datum.as_ref().map(|d| d.level.price).unwrap_or(Decimal::ZERO)
    };
    let spread = price_or_zero(&lowest_ask) - price_or_zero(&highest_bid);

    DepthChart {
        bids,
        asks,
        lowest_bid,
        highest_bid,
        lowest_ask,
        highest_ask,
        mid_price: snapshot.mid_price,
        spread,
        spread_percent: snapshot.spread_percent,
    }
}
