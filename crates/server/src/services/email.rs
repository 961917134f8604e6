//! Transactional email for orders and vendor onboarding.
//!
//! Uses SMTP via lettre for delivery with Askama HTML and plain text
//! templates. Without SMTP settings the rendered message is logged instead,
//! which keeps development setups working without a mail server.

use std::fmt::Display;

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use sellor_core::{CurrencyCode, Money, StoreSlug};

use crate::config::EmailConfig;
use crate::models::Order;

/// An order formatted for email templates.
#[derive(Debug, Clone)]
pub struct OrderEmail {
    pub number: String,
    pub customer_name: String,
    pub lines: Vec<OrderEmailLine>,
    pub subtotal: String,
    pub shipping: String,
    pub total: String,
}

/// One formatted order line.
#[derive(Debug, Clone)]
pub struct OrderEmailLine {
    pub title: String,
    pub quantity: i32,
    pub amount: String,
}

impl OrderEmail {
    /// Format a stored order.
    #[must_use]
    pub fn from_order(order: &Order, currency: CurrencyCode) -> Self {
        let lines = order
            .items
            .iter()
            .map(|item| OrderEmailLine {
                title: item.title.clone(),
                quantity: item.quantity,
                amount: Money::from_cents(item.line_total_cents(), currency).display(),
            })
            .collect();

        Self {
            number: order.id.to_string(),
            customer_name: order.customer_name.clone(),
            lines,
            subtotal: Money::from_cents(order.subtotal_cents, currency).display(),
            shipping: Money::from_cents(order.shipping_cents, currency).display(),
            total: Money::from_cents(order.total_cents, currency).display(),
        }
    }
}

#[derive(Template)]
#[template(path = "email/new_order_vendor.html")]
struct NewOrderVendorHtml<'a> {
    store_name: &'a str,
    order: &'a OrderEmail,
    order_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/new_order_vendor.txt")]
struct NewOrderVendorText<'a> {
    store_name: &'a str,
    order: &'a OrderEmail,
    order_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    store_name: &'a str,
    store_contact: &'a str,
    order: &'a OrderEmail,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    store_name: &'a str,
    store_contact: &'a str,
    order: &'a OrderEmail,
}

#[derive(Template)]
#[template(path = "email/shipping_confirmation.html")]
struct ShippingConfirmationHtml<'a> {
    store_name: &'a str,
    order: &'a OrderEmail,
    tracking_number: &'a str,
}

#[derive(Template)]
#[template(path = "email/shipping_confirmation.txt")]
struct ShippingConfirmationText<'a> {
    store_name: &'a str,
    order: &'a OrderEmail,
    tracking_number: &'a str,
}

#[derive(Template)]
#[template(path = "email/welcome_vendor.html")]
struct WelcomeVendorHtml<'a> {
    name: &'a str,
    store_name: &'a str,
    store_host: &'a str,
    login_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/welcome_vendor.txt")]
struct WelcomeVendorText<'a> {
    name: &'a str,
    store_name: &'a str,
    store_host: &'a str,
    login_url: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// A rendered message ready for delivery.
#[derive(Debug, Clone)]
pub struct RenderedEmail {
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from_address: String,
    base_url: String,
    root_domain: String,
}

impl EmailService {
    /// Create a new email service.
    ///
    /// With `smtp` set to `None`, messages are logged rather than sent.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(
        smtp: Option<&EmailConfig>,
        from_address: &str,
        base_url: &str,
        root_domain: &str,
    ) -> Result<Self, SmtpError> {
        let mailer = match smtp {
            Some(config) => {
                let credentials = Credentials::new(
                    config.smtp_username.clone(),
                    config.smtp_password.expose_secret().to_owned(),
                );

                Some(
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
                        .port(config.smtp_port)
                        .credentials(credentials)
                        .build(),
                )
            }
            None => None,
        };

        Ok(Self {
            mailer,
            from_address: from_address.to_owned(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            root_domain: root_domain.to_owned(),
        })
    }

    /// Tell a vendor about a new paid order.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_new_order_vendor(
        &self,
        to: &str,
        store_name: &str,
        order: &OrderEmail,
    ) -> Result<(), EmailError> {
        let message = self.render_new_order_vendor(store_name, order)?;
        self.deliver(to, &message).await
    }

    /// Confirm an order to the customer who placed it.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_order_confirmation(
        &self,
        to: &str,
        store_name: &str,
        store_contact: Option<&str>,
        order: &OrderEmail,
    ) -> Result<(), EmailError> {
        let message = render_order_confirmation(store_name, store_contact, order)?;
        self.deliver(to, &message).await
    }

    /// Tell a customer their order has shipped.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_shipping_confirmation(
        &self,
        to: &str,
        store_name: &str,
        order: &OrderEmail,
        tracking_number: &str,
    ) -> Result<(), EmailError> {
        let message = render_shipping_confirmation(store_name, order, tracking_number)?;
        self.deliver(to, &message).await
    }

    /// Welcome a newly registered vendor.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_welcome_vendor(
        &self,
        to: &str,
        name: &str,
        store_name: &str,
        slug: &StoreSlug,
    ) -> Result<(), EmailError> {
        let message = self.render_welcome_vendor(name, store_name, slug)?;
        self.deliver(to, &message).await
    }

    fn render_new_order_vendor(
        &self,
        store_name: &str,
        order: &OrderEmail,
    ) -> Result<RenderedEmail, EmailError> {
        let order_url = format!("{}/vendor/orders/{}", self.base_url, order.number);
        Ok(RenderedEmail {
            subject: format!("You have a new order! (#{}) - {store_name}", order.number),
            html: NewOrderVendorHtml {
                store_name,
                order,
                order_url: &order_url,
            }
            .render()?,
            text: NewOrderVendorText {
                store_name,
                order,
                order_url: &order_url,
            }
            .render()?,
        })
    }

    fn render_welcome_vendor(
        &self,
        name: &str,
        store_name: &str,
        slug: &StoreSlug,
    ) -> Result<RenderedEmail, EmailError> {
        let store_host = format!("{slug}.{}", self.root_domain);
        let login_url = format!("{}/vendor/login", self.base_url);
        Ok(RenderedEmail {
            subject: format!("Welcome to sellor.ai! Your store {store_name} is ready"),
            html: WelcomeVendorHtml {
                name,
                store_name,
                store_host: &store_host,
                login_url: &login_url,
            }
            .render()?,
            text: WelcomeVendorText {
                name,
                store_name,
                store_host: &store_host,
                login_url: &login_url,
            }
            .render()?,
        })
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn deliver(&self, to: &str, message: &RenderedEmail) -> Result<(), EmailError> {
        let Some(mailer) = &self.mailer else {
            tracing::info!(
                to = %to,
                subject = %message.subject,
                body = %message.text,
                "SMTP not configured, logging email instead of sending"
            );
            return Ok(());
        };

        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_owned()))?)
            .subject(&message.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(message.text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(message.html.clone()),
                    ),
            )?;

        mailer.send(email).await?;

        tracing::info!(to = %to, subject = %message.subject, "Email sent successfully");
        Ok(())
    }
}

fn render_order_confirmation(
    store_name: &str,
    store_contact: Option<&str>,
    order: &OrderEmail,
) -> Result<RenderedEmail, EmailError> {
    let store_contact = store_contact.unwrap_or("the store owner");
    Ok(RenderedEmail {
        subject: format!("Your Order #{} from {store_name} is Confirmed!", order.number),
        html: OrderConfirmationHtml {
            store_name,
            store_contact,
            order,
        }
        .render()?,
        text: OrderConfirmationText {
            store_name,
            store_contact,
            order,
        }
        .render()?,
    })
}

fn render_shipping_confirmation(
    store_name: &str,
    order: &OrderEmail,
    tracking_number: &str,
) -> Result<RenderedEmail, EmailError> {
    Ok(RenderedEmail {
        subject: format!("Your Order #{} from {store_name} has Shipped!", order.number),
        html: ShippingConfirmationHtml {
            store_name,
            order,
            tracking_number,
        }
        .render()?,
        text: ShippingConfirmationText {
            store_name,
            order,
            tracking_number,
        }
        .render()?,
    })
}

/// Log a failed non-critical email and carry on.
pub fn log_email_failure(kind: &str, to: &str, err: &impl Display) {
    tracing::warn!(kind, to = %to, error = %err, "Failed to send email");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_order() -> OrderEmail {
        OrderEmail {
            number: "42".to_owned(),
            customer_name: "Ada".to_owned(),
            lines: vec![
                OrderEmailLine {
                    title: "Ceramic Mug".to_owned(),
                    quantity: 2,
                    amount: "$24.00".to_owned(),
                },
                OrderEmailLine {
                    title: "Tea <Sampler>".to_owned(),
                    quantity: 1,
                    amount: "$8.50".to_owned(),
                },
            ],
            subtotal: "$32.50".to_owned(),
            shipping: "$5.00".to_owned(),
            total: "$37.50".to_owned(),
        }
    }

    fn service() -> EmailService {
        EmailService::new(
            None,
            "notifications@sellor.ai",
            "https://sellor.ai/",
            "sellor.ai",
        )
        .unwrap()
    }

    #[test]
    fn test_new_order_vendor_renders_lines_and_totals() {
        let message = service()
            .render_new_order_vendor("Clay Corner", &sample_order())
            .unwrap();

        assert_eq!(message.subject, "You have a new order! (#42) - Clay Corner");
        assert!(message.html.contains("Ceramic Mug"));
        assert!(message.html.contains("$37.50"));
        assert!(message.html.contains("https://sellor.ai/vendor/orders/42"));
        assert!(message.text.contains("Ceramic Mug x 2: $24.00"));
        assert!(message.text.contains("Total:    $37.50"));
    }

    #[test]
    fn test_html_escapes_titles_but_text_does_not() {
        let message = service()
            .render_new_order_vendor("Clay Corner", &sample_order())
            .unwrap();
        assert!(message.html.contains("Tea &#60;Sampler&#62;") || message.html.contains("Tea &lt;Sampler&gt;"));
        assert!(message.text.contains("Tea <Sampler>"));
    }

    #[test]
    fn test_order_confirmation_falls_back_to_store_owner() {
        let message = render_order_confirmation("Clay Corner", None, &sample_order()).unwrap();
        assert_eq!(message.subject, "Your Order #42 from Clay Corner is Confirmed!");
        assert!(message.text.contains("the store owner"));
    }

    #[test]
    fn test_shipping_confirmation_includes_tracking() {
        let message =
            render_shipping_confirmation("Clay Corner", &sample_order(), "1Z999AA10123456784")
                .unwrap();
        assert_eq!(message.subject, "Your Order #42 from Clay Corner has Shipped!");
        assert!(message.html.contains("1Z999AA10123456784"));
        assert!(message.text.contains("1Z999AA10123456784"));
    }

    #[test]
    fn test_welcome_vendor_links_store_subdomain() {
        let slug = StoreSlug::parse("clay-corner").unwrap();
        let message = service()
            .render_welcome_vendor("Ada", "Clay Corner", &slug)
            .unwrap();
        assert_eq!(
            message.subject,
            "Welcome to sellor.ai! Your store Clay Corner is ready"
        );
        assert!(message.text.contains("https://clay-corner.sellor.ai"));
        assert!(message.text.contains("https://sellor.ai/vendor/login"));
    }

    #[tokio::test]
    async fn test_deliver_without_smtp_is_ok() {
        let svc = service();
        let order = sample_order();
        assert!(
            svc.send_new_order_vendor("vendor@example.com", "Clay Corner", &order)
                .await
                .is_ok()
        );
    }
}
