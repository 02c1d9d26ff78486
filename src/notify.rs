// =============================================================================
// NOTIFICATIONS MODULE
// =============================================================================
// Order confirmation emails, sent outside the request path.
//
// Placing an order only pushes a message onto a bounded queue. One worker
// task drains the queue and hands each message to a `Mailer`. Nothing here
// can fail, slow down or roll back an order: a full queue drops the message,
// a failed send is logged and counted.
//
// LEARNING NOTE:
// `try_send` on a bounded mpsc channel returns immediately with `Full` when
// the queue is at capacity, unlike `send().await`, which would wait.
// =============================================================================

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::config::SmtpConfig;
use crate::metrics;
use crate::models::OrderDetails;

// -----------------------------------------------------------------------------
// MESSAGE
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationLine {
    pub name: String,
    pub color: String,
    pub quantity: i32,
    pub unit_price: i64,
}

/// Everything needed to write the confirmation, copied out of the order so
/// the worker never touches the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderConfirmation {
    pub order_number: String,
    pub email: String,
    pub customer_name: String,
    pub delivery_address: String,
    pub city: String,
    pub total_amount: i64,
    pub lines: Vec<ConfirmationLine>,
}

impl OrderConfirmation {
    /// `None` when the customer left no email address
    pub fn from_order(details: &OrderDetails) -> Option<Self> {
        let email = details.order.customer_email.clone()?;
        Some(Self {
            order_number: details.order.order_number.clone(),
            email,
            customer_name: details.order.customer_name.clone(),
            delivery_address: details.order.delivery_address.clone(),
            city: details.order.city.clone(),
            total_amount: details.order.total_amount,
            lines: details
                .items
                .iter()
                .map(|i| ConfirmationLine {
                    name: i.product.product.name.clone(),
                    color: i.product.product.color.clone(),
                    quantity: i.item.quantity,
                    unit_price: i.item.price,
                })
                .collect(),
        })
    }

    pub fn subject(&self, site_name: &str) -> String {
        format!("{site_name}: order {} received", self.order_number)
    }

    pub fn body(&self, site_name: &str) -> String {
        let mut body = format!(
            "Hello {},\n\nThank you for your order {}.\n\n",
            self.customer_name, self.order_number
        );
        for line in &self.lines {
            body.push_str(&format!(
                "  {} x {} ({}) @ {}\n",
                line.quantity, line.name, line.color, line.unit_price
            ));
        }
        body.push_str(&format!(
            "\nTotal: {}\nPayment: cash on delivery\nDelivery to: {}, {}\n\n\
             We will call you to confirm delivery.\n\n{site_name}\n",
            self.total_amount, self.delivery_address, self.city
        ));
        body
    }
}

// -----------------------------------------------------------------------------
// MAILERS
// -----------------------------------------------------------------------------

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, confirmation: &OrderConfirmation) -> Result<()>;
}

/// SMTP delivery via lettre
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    site_name: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig, site_name: &str) -> Result<Self> {
        // 465 is implicit TLS, everything else negotiates STARTTLS
        let relay = if config.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        };
        let mut builder = relay
            .context("Failed to configure SMTP relay")?
            .port(config.port);

        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from: config
                .from
                .parse()
                .context("SMTP_FROM is not a valid mailbox")?,
            site_name: site_name.to_string(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, confirmation: &OrderConfirmation) -> Result<()> {
        let to: Mailbox = confirmation
            .email
            .parse()
            .context("customer email is not a valid mailbox")?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(confirmation.subject(&self.site_name))
            .header(ContentType::TEXT_PLAIN)
            .body(confirmation.body(&self.site_name))
            .context("Failed to build confirmation email")?;

        self.transport
            .send(message)
            .await
            .context("SMTP send failed")?;
        Ok(())
    }
}

/// Used when SMTP is not configured: the confirmation only shows up in logs.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, confirmation: &OrderConfirmation) -> Result<()> {
        tracing::info!(
            order_number = %confirmation.order_number,
            email = %confirmation.email,
            "SMTP not configured, confirmation email not sent"
        );
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// NOTIFIER (queue + worker)
// -----------------------------------------------------------------------------

#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<OrderConfirmation>,
}

impl Notifier {
    /// Starts the worker. It exits once every `Notifier` clone is dropped
    /// and the queue is drained.
    pub fn spawn(mailer: Arc<dyn Mailer>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity);
        let handle = tokio::spawn(run_worker(rx, mailer));
        (Self { tx }, handle)
    }

    /// Queues a confirmation for a freshly committed order. Never blocks.
    pub fn order_placed(&self, details: &OrderDetails) {
        let Some(confirmation) = OrderConfirmation::from_order(details) else {
            return;
        };

        match self.tx.try_send(confirmation) {
            Ok(()) => {}
            Err(TrySendError::Full(c)) => {
                metrics::record_notification("dropped");
                tracing::warn!(order_number = %c.order_number, "Notification queue full, confirmation dropped");
            }
            Err(TrySendError::Closed(c)) => {
                metrics::record_notification("dropped");
                tracing::warn!(order_number = %c.order_number, "Notification worker stopped, confirmation dropped");
            }
        }
    }
}

async fn run_worker(mut rx: mpsc::Receiver<OrderConfirmation>, mailer: Arc<dyn Mailer>) {
    while let Some(confirmation) = rx.recv().await {
        match mailer.send(&confirmation).await {
            Ok(()) => {
                metrics::record_notification("sent");
                tracing::debug!(order_number = %confirmation.order_number, "Confirmation email sent");
            }
            Err(e) => {
                metrics::record_notification("failed");
                tracing::warn!(
                    order_number = %confirmation.order_number,
                    error = %e,
                    "Confirmation email failed"
                );
            }
        }
    }
    tracing::debug!("Notification worker stopped");
}
