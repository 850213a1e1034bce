use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    DepositCompletedEvent,
    EventHandler,
    EventProducer,
    FulfillmentFailedEvent,
    Handler,
    OrderFulfilledEvent,
    OrderPaidEvent,
    OrderRefundedEvent,
};

/// Generates the hook registry, the running handlers and the producer handles for each event type.
macro_rules! event_hooks {
    ($($hook:ident, $producer:ident : $event:ty);+ $(;)?) => {
        /// The producer side handed to the API objects. Each vector may be empty, in which case publishing is a no-op.
        #[derive(Default, Clone)]
        pub struct EventProducers {
            $(pub $producer: Vec<EventProducer<$event>>,)+
        }

        pub struct EventHandlers {
            $(pub $hook: Option<EventHandler<$event>>,)+
        }

        impl EventHandlers {
            pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
                Self {
                    $($hook: hooks.$hook.map(|f| EventHandler::new(buffer_size, f)),)+
                }
            }

            pub fn producers(&self) -> EventProducers {
                let mut result = EventProducers::default();
                $(
                    if let Some(handler) = &self.$hook {
                        result.$producer.push(handler.subscribe());
                    }
                )+
                result
            }

            pub async fn start_handlers(self) {
                $(
                    if let Some(handler) = self.$hook {
                        tokio::spawn(async move {
                            handler.start_handler().await;
                        });
                    }
                )+
            }
        }

        #[derive(Default, Clone)]
        pub struct EventHooks {
            $(pub $hook: Option<Handler<$event>>,)+
        }

        impl EventHooks {
            $(
                pub fn $hook<F>(&mut self, f: F) -> &mut Self
                where F: (Fn($event) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
                    self.$hook = Some(Arc::new(f));
                    self
                }
            )+
        }
    };
}

event_hooks! {
    on_order_paid, order_paid_producer: OrderPaidEvent;
    on_order_fulfilled, order_fulfilled_producer: OrderFulfilledEvent;
    on_fulfillment_failed, fulfillment_failed_producer: FulfillmentFailedEvent;
    on_order_refunded, order_refunded_producer: OrderRefundedEvent;
    on_deposit_completed, deposit_completed_producer: DepositCompletedEvent;
}

/// Publishes `$event` on every producer in `$producers`.
#[macro_export]
macro_rules! publish {
    ($producers:expr, $event:expr) => {{
        let event = $event;
        for emitter in &$producers {
            emitter.publish_event(event.clone()).await;
        }
    }};
}
