//! Local state of one transaction consumption.

use std::sync::Arc;

use ewallet_sdk::client::{ClientError, EWalletClient, RequestExecutor};
use ewallet_sdk::objects::socket::SocketEventKind;
use ewallet_sdk::objects::{
    ApiErrorBody, Topic, TransactionConsumption, TransactionConsumptionStatus,
};
use time::OffsetDateTime;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

use super::machine::{IgnoreReason, Transition, merge};
use crate::error::SocketError;
use crate::listeners::TransactionConsumptionListener;
use crate::registry::SubscriptionHandle;
use crate::socket::SocketClient;

/// Owns the local snapshot of one consumption and advances it from
/// dispatched events and action responses.
///
/// The snapshot lives in a `watch` channel: every update is applied under
/// the channel lock, so readers see either the old or the new snapshot,
/// never a status without its timestamp.
#[derive(Debug)]
pub struct ConsumptionTracker {
    state: watch::Sender<TransactionConsumption>,
}

impl ConsumptionTracker {
    pub fn new(initial: TransactionConsumption) -> Self {
        let (state, _) = watch::channel(initial);
        Self { state }
    }

    pub fn snapshot(&self) -> TransactionConsumption {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> TransactionConsumptionStatus {
        self.state.borrow().status
    }

    pub fn topic(&self) -> Topic {
        self.state.borrow().socket_topic.clone()
    }

    /// Receiver notified on every change of the snapshot.
    pub fn watch(&self) -> watch::Receiver<TransactionConsumption> {
        self.state.subscribe()
    }

    /// The current snapshot, then one item per change.
    pub fn updates(&self) -> WatchStream<TransactionConsumption> {
        WatchStream::new(self.state.subscribe())
    }

    /// Apply a snapshot delivered with a socket event of `kind`.
    pub fn apply_event(&self, kind: &SocketEventKind, update: &TransactionConsumption) -> Transition {
        self.apply(Some(kind), update)
    }

    /// Apply a snapshot obtained out of band, e.g. from an HTTP response.
    pub fn reconcile(&self, update: &TransactionConsumption) -> Transition {
        self.apply(None, update)
    }

    fn apply(&self, kind: Option<&SocketEventKind>, update: &TransactionConsumption) -> Transition {
        let mut transition = Transition::Ignored(IgnoreReason::Duplicate);
        self.state.send_if_modified(|current| {
            transition = merge(current, update, kind, OffsetDateTime::now_utc());
            transition.changed()
        });

        match transition {
            Transition::Advanced { from, to } | Transition::Replaced { from, to } => {
                info!(consumption = %update.id, %from, %to, "Consumption status changed");
            }
            Transition::Merged => {
                debug!(consumption = %update.id, "Consumption snapshot completed");
            }
            Transition::Ignored(reason) => {
                debug!(consumption = %update.id, ?reason, "Consumption update ignored");
            }
        }
        transition
    }

    /// Ask the server to approve the consumption.
    ///
    /// Does not advance the local state by itself: the returned snapshot is
    /// reconciled like any other update, and the socket event that follows
    /// converges on the same state.
    pub async fn approve<E: RequestExecutor>(
        &self,
        client: &EWalletClient<E>,
    ) -> Result<Transition, ClientError> {
        let id = self.state.borrow().id.clone();
        let updated = client.approve_transaction_consumption(&id).await?;
        Ok(self.reconcile(&updated))
    }

    /// Ask the server to reject the consumption. See [`approve`](Self::approve).
    pub async fn reject<E: RequestExecutor>(
        &self,
        client: &EWalletClient<E>,
    ) -> Result<Transition, ClientError> {
        let id = self.state.borrow().id.clone();
        let updated = client.reject_transaction_consumption(&id).await?;
        Ok(self.reconcile(&updated))
    }

    /// Subscribe this tracker to its consumption's topic on `socket`.
    pub async fn listen(self: &Arc<Self>, socket: &SocketClient) -> Result<SubscriptionHandle, SocketError> {
        let listener: Arc<dyn TransactionConsumptionListener> = self.clone();
        socket.listen(&self.snapshot(), listener).await
    }
}

impl TransactionConsumptionListener for ConsumptionTracker {
    fn on_consumption_approved(&self, consumption: &TransactionConsumption) {
        self.apply_event(&SocketEventKind::ConsumptionApproved, consumption);
    }

    fn on_consumption_rejected(&self, consumption: &TransactionConsumption) {
        self.apply_event(&SocketEventKind::ConsumptionRejected, consumption);
    }

    fn on_consumption_finalized(&self, consumption: &TransactionConsumption) {
        self.apply_event(&SocketEventKind::ConsumptionFinalized, consumption);
    }

    fn on_consumption_expired(&self, consumption: &TransactionConsumption) {
        self.apply_event(&SocketEventKind::ConsumptionExpired, consumption);
    }

    fn on_error(&self, error: &ApiErrorBody) {
        warn!(
            consumption = %self.state.borrow().id,
            code = %error.code,
            description = %error.description,
            "Consumption channel reported an error"
        );
    }
}
