//! Wraps a scripted order-execution driver so its reports are delivered as
//! scheduler events, interleaving with market-data replay in strict
//! timestamp order rather than firing synchronously at submit time.

use super::scheduler::BacktesterEventScheduler;
use crate::domain::{ExecutionReport, OrderInfo};
use std::sync::Arc;

/// Produces the execution reports a submitted order will receive during a
/// backtest run. Each report carries its own absolute timestamp; the
/// scripted driver decides fill timing, partial fills and rejections.
pub trait ScriptedOrderExecutionDriver: Send + Sync {
    fn submit(&self, order: &OrderInfo) -> Vec<ExecutionReport>;
}

/// Routes submissions through a [`ScriptedOrderExecutionDriver`] and
/// schedules its reports as events on the backtester's own clock.
pub struct BacktesterOrderExecutionClient<D> {
    driver: Arc<D>,
}

impl<D: ScriptedOrderExecutionDriver + 'static> BacktesterOrderExecutionClient<D> {
    pub fn new(driver: Arc<D>) -> Self {
        BacktesterOrderExecutionClient { driver }
    }

    /// Submits `order`, scheduling each scripted report to invoke
    /// `on_report` at its own timestamp.
    pub fn submit(
        &self,
        scheduler: &mut BacktesterEventScheduler,
        order: OrderInfo,
        on_report: impl Fn(ExecutionReport) + Send + Sync + 'static,
    ) {
        let reports = self.driver.submit(&order);
        let on_report = Arc::new(on_report);
        for report in reports {
            let on_report = on_report.clone();
            scheduler.schedule(report.timestamp, move |_scheduler| on_report(report));
        }
    }
}
