// =============================================================================
// DASHBOARD MODULE
// =============================================================================
// Turns the order collection into the numbers shown on the admin dashboard:
// revenue, order counts, the five most recent orders and a 7-day revenue
// series for the chart.
//
// LEARNING NOTES:
// - `aggregate` is a pure function, so most tests need no store at all
// - The view owns its last computed stats; nothing else writes them
// - Read failures degrade to empty stats instead of failing the page
// =============================================================================

use std::sync::Arc;

use chrono::{Datelike, Duration, FixedOffset, NaiveDate, Utc, Weekday};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::chart;
use crate::metrics;
use crate::models::{ChartPoint, Order};
use crate::sample_data::SampleDataProvider;
use crate::store::{decode_rows_skipping, Collection, OrderBy, RowStore, StoreResult};

/// Number of orders listed under "recent orders"
pub const RECENT_ORDERS: usize = 5;

/// Days covered by the revenue series
pub const SERIES_DAYS: i64 = 7;

// =============================================================================
// STATS
// =============================================================================
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_revenue: Decimal,
    pub total_orders: usize,
    pub pending_orders: usize,
    pub recent_orders: Vec<Order>,

    /// Revenue per weekday, oldest day first. Empty when there are no orders.
    pub series: Vec<ChartPoint>,
}

// -----------------------------------------------------------------------------
// DAY LABELS
// -----------------------------------------------------------------------------

pub fn weekday_label(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}

/// Short weekday names of the seven calendar days ending at `today`,
/// oldest first
pub fn weekday_labels(today: NaiveDate) -> Vec<&'static str> {
    (0..SERIES_DAYS)
        .rev()
        .map(|back| weekday_label((today - Duration::days(back)).weekday()))
        .collect()
}

// =============================================================================
// AGGREGATION
// =============================================================================
/// Compute dashboard stats from orders already sorted newest first.
///
/// Every order lands in the bucket whose weekday label matches its creation
/// day (in `offset`), regardless of how many weeks ago it was placed.
/// Sums saturate at `Decimal::MAX` instead of overflowing.
pub fn aggregate(orders: &[Order], today: NaiveDate, offset: FixedOffset) -> DashboardStats {
    let total_revenue = orders
        .iter()
        .map(Order::amount_or_zero)
        .fold(Decimal::ZERO, Decimal::saturating_add);
    let pending_orders = orders.iter().filter(|o| o.is_pending()).count();
    let recent_orders = orders.iter().take(RECENT_ORDERS).cloned().collect();

    let series = if orders.is_empty() {
        Vec::new()
    } else {
        let labels = weekday_labels(today);
        let mut buckets = vec![Decimal::ZERO; labels.len()];
        for order in orders {
            let label = weekday_label(order.created_at.with_timezone(&offset).weekday());
            if let Some(slot) = labels.iter().position(|l| *l == label) {
                buckets[slot] = buckets[slot].saturating_add(order.amount_or_zero());
            }
        }
        labels
            .into_iter()
            .zip(buckets)
            .map(|(label, sum)| ChartPoint::new(label, sum.to_f64().unwrap_or(0.0)))
            .collect()
    };

    DashboardStats {
        total_revenue,
        total_orders: orders.len(),
        pending_orders,
        recent_orders,
        series,
    }
}

// =============================================================================
// DASHBOARD VIEW
// =============================================================================
pub struct DashboardView {
    store: Arc<dyn RowStore>,
    offset: FixedOffset,
    stats: Mutex<DashboardStats>,
}

impl DashboardView {
    pub fn new(store: Arc<dyn RowStore>, offset: FixedOffset) -> Self {
        Self {
            store,
            offset,
            stats: Mutex::new(DashboardStats::default()),
        }
    }

    /// Today's date in the shop's local calendar
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset).date_naive()
    }

    async fn fetch_orders(&self) -> StoreResult<Vec<Order>> {
        let rows = self
            .store
            .list(Collection::Orders, &OrderBy::desc("created_at"))
            .await?;
        Ok(decode_rows_skipping(Collection::Orders, rows))
    }

    /// Re-read all orders and recompute the stats.
    ///
    /// A failed read is logged and yields empty stats.
    pub async fn refresh(&self) -> DashboardStats {
        let orders = match self.fetch_orders().await {
            Ok(orders) => orders,
            Err(e) => {
                warn!(error = %e, "Failed to load orders, showing empty dashboard");
                Vec::new()
            }
        };

        let stats = aggregate(&orders, self.today(), self.offset);
        debug!(
            total_orders = stats.total_orders,
            pending_orders = stats.pending_orders,
            "Dashboard refreshed"
        );
        metrics::set_dashboard_revenue(stats.total_revenue.to_f64().unwrap_or(0.0));

        *self.stats.lock().await = stats.clone();
        stats
    }

    /// Stats from the last refresh
    pub async fn stats(&self) -> DashboardStats {
        self.stats.lock().await.clone()
    }

    /// Series to draw: the real one, or sample data when it is too short
    pub async fn chart_series(&self, samples: &dyn SampleDataProvider) -> Vec<ChartPoint> {
        let series = self.stats.lock().await.series.clone();
        chart::series_or_sample(series, samples, self.today())
    }
}
