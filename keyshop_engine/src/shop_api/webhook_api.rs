use std::fmt::Debug;

use log::*;

use crate::{
    events::{DepositCompletedEvent, EventProducers, OrderPaidEvent},
    publish,
    shop_api::{
        fulfillment_api::FulfillmentApi,
        webhook_objects::{CombinedWebhookResult, DepositWebhookResult, OrderWebhookResult, TransferNotification},
    },
    traits::{DepositOutcome, InventoryManagement, OrderPaymentOutcome, PaymentError, PaymentReconciliation},
};

/// `PaymentWebhookApi` reconciles provider transfer notifications with pending order payments and deposit requests.
///
/// Providers retry on anything but a clean 2xx, so every handler is safe to call repeatedly with the same
/// notification. A transfer that is already settled is reported as success and changes nothing.
pub struct PaymentWebhookApi<B> {
    db: B,
    fulfillment: FulfillmentApi<B>,
    producers: EventProducers,
}

impl<B: Debug> Debug for PaymentWebhookApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentWebhookApi ({:?})", self.db)
    }
}

impl<B: Clone> PaymentWebhookApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        let fulfillment = FulfillmentApi::new(db.clone(), producers.clone());
        Self { db, fulfillment, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> PaymentWebhookApi<B>
where B: PaymentReconciliation + InventoryManagement
{
    /// Handles a notification about an order payment.
    ///
    /// A successful transfer settles the payment, marks the order paid and then fulfills it. A fulfillment failure
    /// does not fail the webhook: the money has been received, so the provider must not retry.
    pub async fn process_order_payment(
        &self,
        notification: &TransferNotification,
    ) -> Result<OrderWebhookResult, PaymentError> {
        let code = notification.order_code().ok_or(PaymentError::MissingCode)?;
        trace!("🔔️ Order payment notification for {code}: {}", notification.amount);
        if !notification.is_success() {
            return match self.db.fail_order_payment(&code, notification.provider_tx_id.clone()).await? {
                OrderPaymentOutcome::AlreadyProcessed(payment) => Ok(OrderWebhookResult::AlreadyProcessed { payment }),
                OrderPaymentOutcome::Failed(payment) | OrderPaymentOutcome::Confirmed { payment, .. } => {
                    Ok(OrderWebhookResult::MarkedFailed { payment })
                },
            };
        }
        let outcome =
            self.db.confirm_order_payment(&code, notification.amount, notification.provider_tx_id.clone()).await?;
        match outcome {
            OrderPaymentOutcome::Confirmed { order, payment } => {
                publish!(self.producers.order_paid_producer, OrderPaidEvent::new(order.clone()).with_payment(payment.clone()));
                let fulfilled = self.fulfillment.fulfill_order(&order.id).await.is_ok();
                Ok(OrderWebhookResult::Paid { order, payment, fulfilled })
            },
            OrderPaymentOutcome::AlreadyProcessed(payment) => {
                debug!("🔔️ Payment {code} was already settled. Ignoring the duplicate notification.");
                Ok(OrderWebhookResult::AlreadyProcessed { payment })
            },
            OrderPaymentOutcome::Failed(payment) => Ok(OrderWebhookResult::MarkedFailed { payment }),
        }
    }

    /// Handles a notification about a wallet deposit. The wallet is credited with the requested amount, even when
    /// more was transferred.
    pub async fn process_deposit(
        &self,
        notification: &TransferNotification,
    ) -> Result<DepositWebhookResult, PaymentError> {
        let code = notification.deposit_code().ok_or(PaymentError::MissingCode)?;
        trace!("🔔️ Deposit notification for {code}: {}", notification.amount);
        match self.db.confirm_deposit(&code, notification.amount, notification.provider_tx_id.clone()).await? {
            DepositOutcome::Completed { deposit, transaction } => {
                publish!(
                    self.producers.deposit_completed_producer,
                    DepositCompletedEvent::new(deposit.clone(), transaction.clone())
                );
                Ok(DepositWebhookResult::Completed { deposit, transaction })
            },
            DepositOutcome::AlreadyProcessed(deposit) => {
                debug!("🔔️ Deposit {code} is already {}. Ignoring the notification.", deposit.status);
                Ok(DepositWebhookResult::AlreadyProcessed { deposit })
            },
        }
    }

    /// Runs the order flow and the deposit flow for whichever codes the notification carries. The two are
    /// independent, and a failure in one does not prevent the other from running.
    pub async fn process_notification(&self, notification: &TransferNotification) -> CombinedWebhookResult {
        let mut result = CombinedWebhookResult::default();
        if notification.order_code().is_some() {
            let order = self.process_order_payment(notification).await;
            if let Err(e) = &order {
                warn!("🔔️ Order payment flow failed for '{}': {e}", notification.content);
            }
            result.order = Some(order);
        }
        if notification.deposit_code().is_some() {
            let deposit = self.process_deposit(notification).await;
            if let Err(e) = &deposit {
                warn!("🔔️ Deposit flow failed for '{}': {e}", notification.content);
            }
            result.deposit = Some(deposit);
        }
        if result.order.is_none() && result.deposit.is_none() {
            info!("🔔️ Notification without a payment code received: '{}'", notification.content);
        }
        result
    }
}
