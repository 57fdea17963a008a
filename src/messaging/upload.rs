use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::domain::order::Order;
use crate::metrics::Metrics;
use crate::persistence::OrderSaved;

// ============================================================================
// Order Sheet Upload
// ============================================================================
//
// Stored orders are filed remotely as
//   <root>/<YYYY>/<MM>/Pedido-<clientCode>-<orderId>.pdf
//
// The notifier listens to repository notifications; the order session never
// calls it directly. Delivery itself is simulated (logged).
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadPlan {
    pub order_id: String,
    pub folder: String,
    pub file_name: String,
}

impl UploadPlan {
    pub fn for_order(order: &Order, root_folder: &str) -> Self {
        Self {
            order_id: order.id.clone(),
            folder: format!("{}/{}", root_folder, order.date.format("%Y/%m")),
            file_name: format!("Pedido-{}-{}.pdf", order.client_code, order.id),
        }
    }

    pub fn path(&self) -> String {
        format!("{}/{}", self.folder, self.file_name)
    }
}

pub struct UploadNotifier {
    root_folder: String,
    metrics: Arc<Metrics>,
}

impl UploadNotifier {
    pub fn new(root_folder: impl Into<String>, metrics: Arc<Metrics>) -> Self {
        Self {
            root_folder: root_folder.into(),
            metrics,
        }
    }

    /// Plan and (simulated) upload one stored order
    pub fn handle(&self, saved: &OrderSaved) -> UploadPlan {
        let plan = UploadPlan::for_order(&saved.order, &self.root_folder);

        tracing::info!(
            order_id = %plan.order_id,
            client = %saved.order.client_name,
            path = %plan.path(),
            "📤 Uploading order sheet (simulated)"
        );
        self.metrics.uploads_planned.inc();

        plan
    }

    /// Process notifications until the repository goes away. Returns the
    /// plans produced, in arrival order.
    pub fn spawn(self, mut notifications: broadcast::Receiver<OrderSaved>) -> JoinHandle<Vec<UploadPlan>> {
        tokio::spawn(async move {
            let mut plans = Vec::new();
            loop {
                match notifications.recv().await {
                    Ok(saved) => plans.push(self.handle(&saved)),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped = skipped, "Upload notifier fell behind; orders skipped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            tracing::debug!(uploads = plans.len(), "Upload notifier stopped");
            plans
        })
    }
}
